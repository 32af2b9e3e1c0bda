//! Speech input and output
//!
//! This module provides:
//! - Single-shot voice capture with remote transcription
//! - Spoken replies through a premium remote voice with a local fallback

pub mod config;
pub mod input;
pub mod local;
pub mod premium;
pub mod stt;
pub mod tts;

// Re-export commonly used types
pub use config::{CaptureConfig, VoiceConfig};
pub use input::{CaptureBackend, CaptureOutcome, SpeechInputController};
pub use local::{EspeakVoice, LocalSpeech, VoiceParams};
pub use premium::{ElevenLabsClient, PremiumSynthesis};
pub use stt::TranscriptionClient;
pub use tts::{PremiumVoice, ResponseSynthesizer, SpeechOutcome, SpeechPath};

#[cfg(feature = "audio-io")]
pub use stt::MicrophoneCapture;
