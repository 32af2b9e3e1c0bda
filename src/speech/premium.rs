//! Premium remote text-to-speech (ElevenLabs)

use crate::speech::config::VoiceConfig;
use crate::utils::http::{build_http_client, snippet};
use crate::{MurmurError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Backend that turns text into encoded audio bytes (MP3).
#[async_trait]
pub trait PremiumSynthesis: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
}

/// Body of a premium synthesis request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PremiumRequest {
    pub text: String,
    pub model_id: String,
    pub voice_settings: VoiceSettings,
}

impl PremiumRequest {
    pub fn new(config: &VoiceConfig, text: &str) -> Self {
        Self {
            text: text.to_string(),
            model_id: config.model_id.clone(),
            voice_settings: VoiceSettings {
                stability: config.stability,
                similarity_boost: config.similarity_boost,
            },
        }
    }
}

/// ElevenLabs synthesis client
pub struct ElevenLabsClient {
    endpoint: String,
    api_key: String,
    config: VoiceConfig,
    client: Client,
}

impl ElevenLabsClient {
    /// Returns `Ok(None)` when no premium credential is configured.
    pub fn from_config(config: &VoiceConfig, timeout: Option<Duration>) -> Result<Option<Self>> {
        if !config.has_premium() {
            return Ok(None);
        }
        let api_key = config.premium_api_key.clone().unwrap_or_default();
        Ok(Some(Self {
            endpoint: config.premium_endpoint(),
            api_key,
            config: config.clone(),
            client: build_http_client(timeout)?,
        }))
    }
}

#[async_trait]
impl PremiumSynthesis for ElevenLabsClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let body = PremiumRequest::new(&self.config, text);
        debug!("Requesting premium speech for {} chars", text.len());

        let response = self
            .client
            .post(&self.endpoint)
            .header("xi-api-key", &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| MurmurError::SynthesisError(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MurmurError::SynthesisError(format!(
                "HTTP {}: {}",
                status,
                snippet(&body)
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MurmurError::SynthesisError(format!("Failed to read audio: {}", e)))?;

        if bytes.is_empty() {
            return Err(MurmurError::SynthesisError("Empty audio payload".into()));
        }
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let config = VoiceConfig::default();
        let body = serde_json::to_value(PremiumRequest::new(&config, "Hi there")).unwrap();
        assert_eq!(body["text"], "Hi there");
        assert_eq!(body["model_id"], "eleven_multilingual_v2");
        assert_eq!(body["voice_settings"]["stability"], 0.5);
        assert_eq!(body["voice_settings"]["similarity_boost"], 0.5);
    }

    #[test]
    fn test_no_client_without_credential() {
        let client = ElevenLabsClient::from_config(&VoiceConfig::default(), None).unwrap();
        assert!(client.is_none());

        let config = VoiceConfig::default().with_premium_key("xi-test");
        assert!(ElevenLabsClient::from_config(&config, None).unwrap().is_some());
    }
}
