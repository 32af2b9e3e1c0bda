use crate::{MurmurError, Result};
use reqwest::Client;
use std::time::Duration;

/// Build the shared HTTP client for remote services.
///
/// `timeout` of `None` means requests wait indefinitely for a response.
pub fn build_http_client(timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| MurmurError::ConfigError(format!("Failed to build HTTP client: {}", e)))
}

/// Truncate a response body for log output.
pub(crate) fn snippet(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
