//! Configuration for speech output and voice capture

use serde::{Deserialize, Serialize};

/// Configuration for spoken replies
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Whether replies are spoken at all
    pub speech_enabled: bool,

    /// Base URL of the premium synthesis API
    pub premium_api_base: String,

    /// Premium credential, injected from the environment only.
    /// When absent, replies use local synthesis directly.
    #[serde(skip)]
    pub premium_api_key: Option<String>,

    /// Premium voice identifier
    pub voice_id: String,

    /// Premium synthesis model identifier
    pub model_id: String,

    /// Premium voice stability (0.0 to 1.0)
    pub stability: f32,

    /// Premium voice similarity boost (0.0 to 1.0)
    pub similarity_boost: f32,

    /// Local speech rate (1.0 = normal)
    pub rate: f32,

    /// Local speech pitch (1.0 = normal)
    pub pitch: f32,

    /// Local speech volume (0.0 to 1.0)
    pub volume: f32,

    /// Override for the local synthesis program (defaults to espeak-ng / espeak on PATH)
    pub local_command: Option<String>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            speech_enabled: true,
            premium_api_base: "https://api.elevenlabs.io".to_string(),
            premium_api_key: None,
            voice_id: "9BWtsMINqrJLrRacOk9x".to_string(),
            model_id: "eleven_multilingual_v2".to_string(),
            stability: 0.5,
            similarity_boost: 0.5,
            rate: 0.9,
            pitch: 1.0,
            volume: 0.8,
            local_command: None,
        }
    }
}

impl VoiceConfig {
    /// Set the premium credential
    pub fn with_premium_key(mut self, api_key: impl Into<String>) -> Self {
        self.premium_api_key = Some(api_key.into());
        self
    }

    /// Set the premium voice
    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }

    /// Set local speech rate, pitch and volume
    pub fn with_local_params(mut self, rate: f32, pitch: f32, volume: f32) -> Self {
        self.rate = rate;
        self.pitch = pitch;
        self.volume = volume;
        self
    }

    /// Disable spoken replies (text-only mode)
    pub fn muted(mut self) -> Self {
        self.speech_enabled = false;
        self
    }

    /// Whether a premium credential is configured
    pub fn has_premium(&self) -> bool {
        self.premium_api_key
            .as_deref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }

    /// Full endpoint URL for premium synthesis with the configured voice
    pub fn premium_endpoint(&self) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.premium_api_base.trim_end_matches('/'),
            self.voice_id
        )
    }
}

/// Configuration for single-shot voice capture
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Recognition locale
    pub locale: String,

    /// Hard limit on a single capture
    pub max_seconds: f32,

    /// Trailing silence that ends a capture once speech has been heard
    pub silence_seconds: f32,

    /// RMS level below which a chunk counts as silence
    pub silence_threshold: f32,

    /// Base URL of an OpenAI-compatible transcription API
    pub transcription_api_base: String,

    /// Transcription credential, injected from the environment only
    #[serde(skip)]
    pub transcription_api_key: Option<String>,

    /// Transcription model identifier
    pub transcription_model: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            max_seconds: 15.0,
            silence_seconds: 1.2,
            silence_threshold: 0.01,
            transcription_api_base: "https://api.openai.com/v1".to_string(),
            transcription_api_key: None,
            transcription_model: "whisper-1".to_string(),
        }
    }
}

impl CaptureConfig {
    /// Set the recognition locale
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Language code sent to the recognizer ("en-US" -> "en")
    pub fn language(&self) -> String {
        locale_language(&self.locale)
    }

    /// Full endpoint URL for transcription
    pub fn transcription_endpoint(&self) -> String {
        format!(
            "{}/audio/transcriptions",
            self.transcription_api_base.trim_end_matches('/')
        )
    }
}

/// Language part of a locale tag ("pt_BR" -> "pt")
pub fn locale_language(locale: &str) -> String {
    match locale.split(['-', '_']).next().map(str::trim) {
        Some(language) if !language.is_empty() => language.to_lowercase(),
        _ => "en".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_defaults() {
        let config = VoiceConfig::default();
        assert!(config.speech_enabled);
        assert!(!config.has_premium());
        assert_eq!(config.rate, 0.9);
        assert_eq!(config.pitch, 1.0);
        assert_eq!(config.volume, 0.8);
        assert_eq!(
            config.premium_endpoint(),
            "https://api.elevenlabs.io/v1/text-to-speech/9BWtsMINqrJLrRacOk9x"
        );
    }

    #[test]
    fn test_blank_premium_key_is_not_premium() {
        assert!(!VoiceConfig::default().with_premium_key("  ").has_premium());
        assert!(VoiceConfig::default().with_premium_key("xi-123").has_premium());
    }

    #[test]
    fn test_capture_language() {
        assert_eq!(CaptureConfig::default().language(), "en");
        assert_eq!(CaptureConfig::default().with_locale("pt_BR").language(), "pt");
        assert_eq!(locale_language("FR-ca"), "fr");
        assert_eq!(locale_language(""), "en");
        assert_eq!(
            CaptureConfig::default().transcription_endpoint(),
            "https://api.openai.com/v1/audio/transcriptions"
        );
    }
}
