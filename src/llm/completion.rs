//! Chat completion client for OpenAI-compatible endpoints
//!
//! Each turn sends the fixed system instruction plus the latest user text
//! only. Conversation history is not forwarded.

use crate::llm::config::CompletionConfig;
use crate::utils::http::{build_http_client, snippet};
use crate::{MurmurError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Role of a message sent to the completion service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

/// A message in a completion request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Body of a chat completion request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// Build the request for one turn: system instruction, then the user text.
    pub fn single_turn(config: &CompletionConfig, user_text: &str) -> Self {
        Self {
            model: config.model.clone(),
            messages: vec![
                ChatMessage::system(config.system_prompt.clone()),
                ChatMessage::user(user_text),
            ],
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// The user text carried by this request
    pub fn user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
    }
}

/// A remote service that turns a request into assistant reply text.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Extract the reply from a chat completion response body.
///
/// Missing choices, a missing message, or blank content are all treated as a
/// malformed response.
pub fn parse_completion(body: &serde_json::Value) -> Result<String> {
    let content = body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or_else(|| {
            MurmurError::CompletionError("Response has no choices[0].message.content".into())
        })?;

    let content = content.trim();
    if content.is_empty() {
        return Err(MurmurError::CompletionError("Response content is empty".into()));
    }
    Ok(content.to_string())
}

/// Completion client for OpenRouter and other OpenAI-compatible APIs
pub struct OpenRouterClient {
    endpoint: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenRouterClient {
    pub fn new(config: &CompletionConfig, timeout: Option<Duration>) -> Result<Self> {
        if config.api_key.is_none() {
            warn!("No completion API key configured; sending unauthenticated requests");
        }
        Ok(Self {
            endpoint: config.endpoint(),
            api_key: config.api_key.clone(),
            client: build_http_client(timeout)?,
        })
    }
}

#[async_trait]
impl CompletionService for OpenRouterClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        debug!("Requesting completion from {} ({})", self.endpoint, request.model);

        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| MurmurError::CompletionError(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MurmurError::CompletionError(format!(
                "HTTP {}: {}",
                status,
                snippet(&body)
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MurmurError::CompletionError(format!("Invalid JSON: {}", e)))?;

        parse_completion(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_turn_request_shape() {
        let config = CompletionConfig::default();
        let request = CompletionRequest::single_turn(&config, "What's 2+2?");
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], "qwen/qwen-2.5-7b-instruct");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "What's 2+2?");
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
        assert_eq!(request.user_text(), Some("What's 2+2?"));
    }

    #[test]
    fn test_parse_first_choice() {
        let body = json!({
            "choices": [
                { "message": { "role": "assistant", "content": "  Four.  " } },
                { "message": { "role": "assistant", "content": "ignored" } }
            ]
        });
        assert_eq!(parse_completion(&body).unwrap(), "Four.");
    }

    #[test]
    fn test_parse_missing_choices_is_error() {
        let body = json!({ "error": { "message": "rate limited" } });
        assert!(matches!(
            parse_completion(&body),
            Err(MurmurError::CompletionError(_))
        ));
    }

    #[test]
    fn test_parse_empty_content_is_error() {
        let body = json!({ "choices": [ { "message": { "content": "   " } } ] });
        assert!(parse_completion(&body).is_err());

        let body = json!({ "choices": [] });
        assert!(parse_completion(&body).is_err());
    }
}
