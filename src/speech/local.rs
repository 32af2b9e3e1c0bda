//! Local, no-network speech synthesis
//!
//! The host implementation drives the `espeak-ng` (or `espeak`) program and
//! kills it when the utterance is cancelled.

use crate::speech::config::VoiceConfig;
use crate::{MurmurError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Prosody parameters for local synthesis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiceParams {
    /// Speech rate (1.0 = normal)
    pub rate: f32,
    /// Pitch (1.0 = normal)
    pub pitch: f32,
    /// Volume (0.0 to 1.0)
    pub volume: f32,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            rate: 0.9,
            pitch: 1.0,
            volume: 0.8,
        }
    }
}

impl From<&VoiceConfig> for VoiceParams {
    fn from(config: &VoiceConfig) -> Self {
        Self {
            rate: config.rate,
            pitch: config.pitch,
            volume: config.volume,
        }
    }
}

/// Host speech capability. Resolves once the utterance has been spoken, or
/// early when `cancel` fires.
#[async_trait]
pub trait LocalSpeech: Send + Sync {
    async fn speak(&self, text: &str, params: VoiceParams, cancel: CancellationToken)
        -> Result<()>;
}

const ESPEAK_WPM: f32 = 175.0;
const ESPEAK_PITCH: f32 = 50.0;
const ESPEAK_AMPLITUDE: f32 = 100.0;

/// Local synthesis through the espeak command-line program
#[derive(Debug, Clone)]
pub struct EspeakVoice {
    program: PathBuf,
    voice: String,
}

impl EspeakVoice {
    pub fn new(program: impl Into<PathBuf>, locale: &str) -> Self {
        Self {
            program: program.into(),
            voice: locale.to_lowercase().replace('_', "-"),
        }
    }

    /// Probe the host for a usable program. An explicit override wins over PATH lookup.
    pub fn detect(override_program: Option<&str>, locale: &str) -> Option<Self> {
        let program = match override_program {
            Some(program) => Some(PathBuf::from(program)),
            None => ["espeak-ng", "espeak"]
                .iter()
                .find_map(|name| find_on_path(name)),
        }?;
        info!("Local speech synthesis via {}", program.display());
        Some(Self::new(program, locale))
    }

    /// Command-line arguments for one utterance
    pub fn args(&self, text: &str, params: VoiceParams) -> Vec<String> {
        let speed = (ESPEAK_WPM * params.rate).round().clamp(80.0, 450.0) as u32;
        let pitch = (ESPEAK_PITCH * params.pitch).round().clamp(0.0, 99.0) as u32;
        let amplitude = (ESPEAK_AMPLITUDE * params.volume).round().clamp(0.0, 200.0) as u32;
        vec![
            "-v".to_string(),
            self.voice.clone(),
            "-s".to_string(),
            speed.to_string(),
            "-p".to_string(),
            pitch.to_string(),
            "-a".to_string(),
            amplitude.to_string(),
            "--".to_string(),
            text.to_string(),
        ]
    }
}

#[async_trait]
impl LocalSpeech for EspeakVoice {
    async fn speak(
        &self,
        text: &str,
        params: VoiceParams,
        cancel: CancellationToken,
    ) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(self.args(text, params))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MurmurError::SynthesisError(format!(
                    "Failed to start {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                if status.success() {
                    Ok(())
                } else {
                    Err(MurmurError::SynthesisError(format!("Local synthesis exited with {}", status)))
                }
            }
            _ = cancel.cancelled() => {
                debug!("Local synthesis cancelled");
                let _ = child.kill().await;
                Ok(())
            }
        }
    }
}

fn find_on_path(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_map_prosody() {
        let voice = EspeakVoice::new("espeak-ng", "en-US");
        let params = VoiceParams {
            rate: 1.0,
            pitch: 1.0,
            volume: 0.8,
        };
        let args = voice.args("Hello", params);
        assert_eq!(
            args,
            vec!["-v", "en-us", "-s", "175", "-p", "50", "-a", "80", "--", "Hello"]
        );
    }

    #[test]
    fn test_args_clamped() {
        let voice = EspeakVoice::new("espeak", "en");
        let params = VoiceParams {
            rate: 10.0,
            pitch: 5.0,
            volume: 0.0,
        };
        let args = voice.args("x", params);
        assert_eq!(args[3], "450");
        assert_eq!(args[5], "99");
        assert_eq!(args[7], "0");
    }

    #[test]
    fn test_detect_with_override() {
        let voice = EspeakVoice::detect(Some("/opt/tts/speak"), "en-GB").unwrap();
        assert_eq!(voice.program, PathBuf::from("/opt/tts/speak"));
        assert_eq!(voice.voice, "en-gb");
    }

    #[tokio::test]
    async fn test_missing_program_is_synthesis_error() {
        let voice = EspeakVoice::new("/nonexistent/murmur-espeak", "en");
        let result = voice
            .speak("hi", VoiceParams::default(), CancellationToken::new())
            .await;
        assert!(matches!(result, Err(MurmurError::SynthesisError(_))));
    }
}
