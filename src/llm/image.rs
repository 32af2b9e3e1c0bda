//! Image-generation client
//!
//! Failures here are never fatal to a turn. Callers map any error to "no image".

use crate::llm::config::ImageConfig;
use crate::utils::http::{build_http_client, snippet};
use crate::{MurmurError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Body of an image-generation request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub n: u8,
    pub size: String,
    pub quality: String,
}

impl ImageRequest {
    pub fn new(config: &ImageConfig, prompt: &str) -> Self {
        Self {
            model: config.model.clone(),
            prompt: prompt.to_string(),
            n: 1,
            size: config.size.clone(),
            quality: config.quality.clone(),
        }
    }
}

/// A remote service that renders a prompt into a single image URL.
#[async_trait]
pub trait ImageService: Send + Sync {
    /// `Ok(None)` means the service answered but produced no image.
    async fn generate(&self, request: &ImageRequest) -> Result<Option<String>>;
}

/// Extract the image URL from a generation response body.
pub fn parse_image_url(body: &serde_json::Value) -> Result<Option<String>> {
    let data = body
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| MurmurError::ImageGenerationError("Response has no data array".into()))?;

    Ok(data
        .first()
        .and_then(|item| item.get("url"))
        .and_then(|url| url.as_str())
        .filter(|url| !url.is_empty())
        .map(str::to_string))
}

/// Image client for the OpenAI images API
pub struct OpenAIImageClient {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAIImageClient {
    pub fn new(config: &ImageConfig, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            endpoint: config.endpoint(),
            api_key: config.api_key.clone(),
            client: build_http_client(timeout)?,
        })
    }
}

#[async_trait]
impl ImageService for OpenAIImageClient {
    async fn generate(&self, request: &ImageRequest) -> Result<Option<String>> {
        debug!("Requesting image from {}", self.endpoint);

        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| MurmurError::ImageGenerationError(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MurmurError::ImageGenerationError(format!(
                "HTTP {}: {}",
                status,
                snippet(&body)
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MurmurError::ImageGenerationError(format!("Invalid JSON: {}", e)))?;

        parse_image_url(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_uses_prompt_verbatim() {
        let request = ImageRequest::new(&ImageConfig::default(), "draw me a cat");
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["prompt"], "draw me a cat");
        assert_eq!(body["size"], "1024x1024");
        assert_eq!(body["quality"], "standard");
        assert_eq!(body["n"], 1);
    }

    #[test]
    fn test_parse_url() {
        let body = json!({ "created": 1, "data": [ { "url": "https://img.example/cat.png" } ] });
        assert_eq!(
            parse_image_url(&body).unwrap().as_deref(),
            Some("https://img.example/cat.png")
        );
    }

    #[test]
    fn test_parse_null_url_is_no_image() {
        let body = json!({ "data": [ { "url": null } ] });
        assert_eq!(parse_image_url(&body).unwrap(), None);

        let body = json!({ "data": [] });
        assert_eq!(parse_image_url(&body).unwrap(), None);
    }

    #[test]
    fn test_parse_malformed_is_error() {
        let body = json!({ "error": "content policy" });
        assert!(parse_image_url(&body).is_err());
    }
}
