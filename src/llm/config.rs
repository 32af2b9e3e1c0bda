//! Configuration for the remote completion and image-generation services

use crate::llm::prompts::SYSTEM_PROMPT;
use serde::{Deserialize, Serialize};

/// Configuration for the chat completion service
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`)
    pub api_base: String,

    /// Bearer credential, injected from the environment only
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Model identifier
    pub model: String,

    /// Temperature for sampling (0.0 = deterministic, 2.0 = maximum)
    pub temperature: f32,

    /// Maximum tokens to generate per reply
    pub max_tokens: u32,

    /// Fixed system instruction sent ahead of every user request
    pub system_prompt: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_base: "https://openrouter.ai/api/v1".to_string(),
            api_key: None,
            model: "qwen/qwen-2.5-7b-instruct".to_string(),
            temperature: 0.7,
            max_tokens: 500,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }
}

impl CompletionConfig {
    /// Create a configuration for the specified model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Set the API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set the credential
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set maximum tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Replace the system instruction
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Full endpoint URL for chat completions
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

/// Configuration for the image-generation service
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Whether image requests are made at all
    pub enabled: bool,

    /// Base URL of an OpenAI-compatible images API
    pub api_base: String,

    /// Bearer credential, injected from the environment only
    #[serde(skip)]
    pub api_key: Option<String>,

    /// Model identifier
    pub model: String,

    /// Output size, e.g. `1024x1024`
    pub size: String,

    /// Quality tier, e.g. `standard` or `hd`
    pub quality: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "dall-e-3".to_string(),
            size: "1024x1024".to_string(),
            quality: "standard".to_string(),
        }
    }
}

impl ImageConfig {
    /// Set the credential
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the output size
    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    /// Set the quality tier
    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = quality.into();
        self
    }

    /// Disable image generation entirely
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Full endpoint URL for image generation
    pub fn endpoint(&self) -> String {
        format!("{}/images/generations", self.api_base.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_completion_config() {
        let config = CompletionConfig::default();
        assert_eq!(config.model, "qwen/qwen-2.5-7b-instruct");
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_tokens, 500);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_completion_builder_pattern() {
        let config = CompletionConfig::new("meta-llama/llama-3.1-8b-instruct")
            .with_api_base("http://localhost:8080/v1/")
            .with_temperature(0.2)
            .with_max_tokens(64);

        assert_eq!(config.model, "meta-llama/llama-3.1-8b-instruct");
        assert_eq!(config.endpoint(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_tokens, 64);
    }

    #[test]
    fn test_image_defaults_and_endpoint() {
        let config = ImageConfig::default().with_quality("hd");
        assert!(config.enabled);
        assert_eq!(config.size, "1024x1024");
        assert_eq!(config.quality, "hd");
        assert_eq!(config.endpoint(), "https://api.openai.com/v1/images/generations");
        assert!(!config.disabled().enabled);
    }
}
