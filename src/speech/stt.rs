//! Remote speech-to-text for captured audio
//!
//! Sends a WAV clip to an OpenAI-compatible `/audio/transcriptions` endpoint.

use crate::speech::config::{locale_language, CaptureConfig};
use crate::utils::http::{build_http_client, snippet};
use crate::{MurmurError, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Extract the transcript from a transcription response body
pub fn parse_transcription(body: &serde_json::Value) -> Result<String> {
    body.get("text")
        .and_then(|t| t.as_str())
        .map(|t| t.trim().to_string())
        .ok_or_else(|| MurmurError::CaptureError("Transcription response has no text".into()))
}

/// Whisper-style transcription client
pub struct TranscriptionClient {
    endpoint: String,
    api_key: Option<String>,
    model: String,
    client: Client,
}

impl TranscriptionClient {
    pub fn new(config: &CaptureConfig, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            endpoint: config.transcription_endpoint(),
            api_key: config.transcription_api_key.clone(),
            model: config.transcription_model.clone(),
            client: build_http_client(timeout)?,
        })
    }

    /// Transcribe a WAV clip spoken in `locale`
    pub async fn transcribe(&self, wav: Vec<u8>, locale: &str) -> Result<String> {
        let language = locale_language(locale);
        debug!("Transcribing {} bytes of audio ({})", wav.len(), language);

        let file = Part::bytes(wav)
            .file_name("utterance.wav")
            .mime_str("audio/wav")
            .map_err(|e| MurmurError::CaptureError(format!("Invalid mime type: {}", e)))?;

        let form = Form::new()
            .part("file", file)
            .text("model", self.model.clone())
            .text("language", language)
            .text("response_format", "json");

        let mut builder = self.client.post(&self.endpoint).multipart(form);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| MurmurError::CaptureError(format!("Transcription request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MurmurError::CaptureError(format!(
                "Transcription HTTP {}: {}",
                status,
                snippet(&body)
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| MurmurError::CaptureError(format!("Invalid transcription JSON: {}", e)))?;

        parse_transcription(&body)
    }
}

#[cfg(feature = "audio-io")]
pub use microphone::MicrophoneCapture;

#[cfg(feature = "audio-io")]
mod microphone {
    use super::TranscriptionClient;
    use crate::audio::input::{record_utterance, AudioRecorder, RecordingLimits};
    use crate::audio::wav::encode_wav;
    use crate::speech::config::CaptureConfig;
    use crate::speech::input::{CaptureBackend, CaptureOutcome};
    use crate::Result;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use tracing::{info, warn};

    /// Records one utterance from the microphone and transcribes it remotely
    pub struct MicrophoneCapture {
        limits: RecordingLimits,
        transcriber: Arc<TranscriptionClient>,
    }

    impl MicrophoneCapture {
        pub fn new(config: &CaptureConfig, timeout: Option<Duration>) -> Result<Self> {
            Ok(Self {
                limits: RecordingLimits {
                    max_duration: Duration::from_secs_f32(config.max_seconds.max(0.5)),
                    trailing_silence: Duration::from_secs_f32(config.silence_seconds.max(0.1)),
                    silence_threshold: config.silence_threshold,
                },
                transcriber: Arc::new(TranscriptionClient::new(config, timeout)?),
            })
        }

        /// Probe for an input device and a transcription credential.
        pub fn detect(config: &CaptureConfig, timeout: Option<Duration>) -> Option<Self> {
            if config.transcription_api_key.is_none() {
                warn!("Voice capture disabled: no transcription API key");
                return None;
            }
            if !AudioRecorder::is_available() {
                warn!("Voice capture disabled: no input device");
                return None;
            }
            match Self::new(config, timeout) {
                Ok(capture) => {
                    info!("Voice capture available");
                    Some(capture)
                }
                Err(e) => {
                    warn!("Voice capture disabled: {}", e);
                    None
                }
            }
        }
    }

    #[async_trait]
    impl CaptureBackend for MicrophoneCapture {
        async fn capture(&self, locale: &str, cancel: CancellationToken) -> CaptureOutcome {
            let limits = self.limits;
            let recorder_cancel = cancel.clone();
            let recorded =
                tokio::task::spawn_blocking(move || record_utterance(limits, &recorder_cancel))
                    .await;

            let recording = match recorded {
                Ok(Ok(Some(recording))) => recording,
                Ok(Ok(None)) => return CaptureOutcome::NoResult,
                Ok(Err(e)) => return CaptureOutcome::Error(e.to_string()),
                Err(e) => return CaptureOutcome::Error(format!("Recorder task failed: {}", e)),
            };

            if !recording.heard_speech {
                return CaptureOutcome::Error("No speech detected".to_string());
            }

            let wav = match encode_wav(&recording.samples, recording.sample_rate) {
                Ok(wav) => wav,
                Err(e) => return CaptureOutcome::Error(e.to_string()),
            };

            tokio::select! {
                _ = cancel.cancelled() => CaptureOutcome::NoResult,
                result = self.transcriber.transcribe(wav, locale) => match result {
                    Ok(text) => CaptureOutcome::Transcript(text),
                    Err(e) => CaptureOutcome::Error(e.to_string()),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_transcription() {
        let body = json!({ "text": "  turn on the lights " });
        assert_eq!(parse_transcription(&body).unwrap(), "turn on the lights");
    }

    #[test]
    fn test_parse_transcription_missing_text() {
        let body = json!({ "error": { "message": "bad audio" } });
        assert!(matches!(
            parse_transcription(&body),
            Err(MurmurError::CaptureError(_))
        ));
    }

    #[test]
    fn test_client_from_config() {
        let config = CaptureConfig::default();
        let client = TranscriptionClient::new(&config, None).unwrap();
        assert_eq!(client.model, "whisper-1");
        assert_eq!(client.endpoint, "https://api.openai.com/v1/audio/transcriptions");
    }
}
