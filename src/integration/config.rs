//! Configuration for the assistant
//!
//! Provides centralized configuration for all components. Every field has a
//! default, so a config file only needs the values it changes. Credentials are
//! never read from the file; they come from the environment (or a `.env` file).

use crate::llm::config::{CompletionConfig, ImageConfig};
use crate::llm::intent::MatchMode;
use crate::llm::prompts::GREETING;
use crate::speech::config::{CaptureConfig, VoiceConfig};
use crate::{MurmurError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Environment variables holding credentials, most specific first
pub const COMPLETION_KEY_VARS: &[&str] = &["MURMUR_COMPLETION_API_KEY", "OPENROUTER_API_KEY"];
pub const IMAGE_KEY_VARS: &[&str] = &["MURMUR_IMAGE_API_KEY", "OPENAI_API_KEY"];
pub const VOICE_KEY_VARS: &[&str] = &["MURMUR_VOICE_API_KEY", "ELEVENLABS_API_KEY"];
pub const TRANSCRIPTION_KEY_VARS: &[&str] = &["MURMUR_TRANSCRIPTION_API_KEY", "OPENAI_API_KEY"];

/// Configuration for the complete assistant
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Chat completion service
    pub completion: CompletionConfig,

    /// Image generation service
    pub image: ImageConfig,

    /// Spoken replies
    pub voice: VoiceConfig,

    /// Voice capture
    pub capture: CaptureConfig,

    /// Assistant message placed in the log at session start
    pub greeting: String,

    /// Per-request timeout for remote services; none by default
    pub request_timeout_secs: Option<u64>,

    /// How the image classifier matches trigger phrases
    pub intent_mode: MatchMode,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            completion: CompletionConfig::default(),
            image: ImageConfig::default(),
            voice: VoiceConfig::default(),
            capture: CaptureConfig::default(),
            greeting: GREETING.to_string(),
            request_timeout_secs: None,
            intent_mode: MatchMode::default(),
        }
    }
}

impl AssistantConfig {
    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source)
            .map_err(|e| MurmurError::ConfigError(format!("Invalid config: {}", e)))
    }

    /// Load a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            MurmurError::ConfigError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        info!("Loaded config from {}", path.display());
        Self::from_toml_str(&source)
    }

    /// Fill credentials from the process environment, loading `.env` first
    pub fn apply_env(self) -> Self {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) => debug!("No .env file loaded: {}", e),
        }
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Fill credentials using `lookup` to resolve variable names
    pub fn apply_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(*name))
                .find(|value| !value.trim().is_empty())
        };

        if let Some(key) = first(COMPLETION_KEY_VARS) {
            self.completion.api_key = Some(key);
        }
        if let Some(key) = first(IMAGE_KEY_VARS) {
            self.image.api_key = Some(key);
        }
        if let Some(key) = first(VOICE_KEY_VARS) {
            self.voice.premium_api_key = Some(key);
        }
        if let Some(key) = first(TRANSCRIPTION_KEY_VARS) {
            self.capture.transcription_api_key = Some(key);
        }
        self
    }

    /// Per-request timeout for remote services
    pub fn timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Set the completion configuration
    pub fn with_completion(mut self, completion: CompletionConfig) -> Self {
        self.completion = completion;
        self
    }

    /// Set the image configuration
    pub fn with_image(mut self, image: ImageConfig) -> Self {
        self.image = image;
        self
    }

    /// Set the voice configuration
    pub fn with_voice(mut self, voice: VoiceConfig) -> Self {
        self.voice = voice;
        self
    }

    /// Set the capture configuration
    pub fn with_capture(mut self, capture: CaptureConfig) -> Self {
        self.capture = capture;
        self
    }

    /// Set the greeting
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    /// Set a per-request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = Some(seconds);
        self
    }

    /// Set the classifier match mode
    pub fn with_intent_mode(mut self, mode: MatchMode) -> Self {
        self.intent_mode = mode;
        self
    }

    /// Disable spoken replies (text-only mode)
    pub fn without_speech(mut self) -> Self {
        self.voice.speech_enabled = false;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let require = |value: &str, what: &str| {
            if value.trim().is_empty() {
                Err(MurmurError::ConfigError(format!("{} must not be empty", what)))
            } else {
                Ok(())
            }
        };

        require(&self.completion.api_base, "completion.api_base")?;
        require(&self.completion.model, "completion.model")?;
        require(&self.completion.system_prompt, "completion.system_prompt")?;

        if !(0.0..=2.0).contains(&self.completion.temperature) {
            return Err(MurmurError::ConfigError(format!(
                "completion.temperature must be within 0..=2, got {}",
                self.completion.temperature
            )));
        }
        if self.completion.max_tokens == 0 {
            return Err(MurmurError::ConfigError(
                "completion.max_tokens must be positive".into(),
            ));
        }

        if self.image.enabled {
            require(&self.image.api_base, "image.api_base")?;
            require(&self.image.model, "image.model")?;
        }

        require(&self.voice.premium_api_base, "voice.premium_api_base")?;
        require(&self.voice.voice_id, "voice.voice_id")?;
        if !(0.0..=1.0).contains(&self.voice.volume) {
            return Err(MurmurError::ConfigError(format!(
                "voice.volume must be within 0..=1, got {}",
                self.voice.volume
            )));
        }
        if self.voice.rate <= 0.0 {
            return Err(MurmurError::ConfigError("voice.rate must be positive".into()));
        }

        require(&self.capture.locale, "capture.locale")?;
        if self.capture.max_seconds <= 0.0 {
            return Err(MurmurError::ConfigError(
                "capture.max_seconds must be positive".into(),
            ));
        }

        if self.request_timeout_secs == Some(0) {
            return Err(MurmurError::ConfigError(
                "request_timeout_secs must be positive when set".into(),
            ));
        }

        Ok(())
    }
}
