//! Audio device I/O
//!
//! The playback seam is always present; device-backed implementations
//! (cpal microphone, rodio output, WAV encoding) need the `audio-io` feature.

#[cfg(feature = "audio-io")]
pub mod input;
pub mod output;
#[cfg(feature = "audio-io")]
pub mod wav;

#[cfg(feature = "audio-io")]
pub use input::{record_utterance, AudioRecorder, Recording, RecordingLimits};
pub use output::AudioPlayer;
#[cfg(feature = "audio-io")]
pub use output::RodioPlayer;
#[cfg(feature = "audio-io")]
pub use wav::encode_wav;
