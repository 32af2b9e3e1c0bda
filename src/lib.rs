pub mod audio;
pub mod integration;
pub mod llm;
pub mod messages;
pub mod speech;
pub mod utils;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MurmurError {
    #[error("No voice capture capability on this host")]
    CaptureUnavailable,

    #[error("Capture error: {0}")]
    CaptureError(String),

    #[error("Completion error: {0}")]
    CompletionError(String),

    #[error("Image generation error: {0}")]
    ImageGenerationError(String),

    #[error("Synthesis error: {0}")]
    SynthesisError(String),

    #[error("Playback error: {0}")]
    PlaybackError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl From<std::io::Error> for MurmurError {
    fn from(e: std::io::Error) -> Self {
        MurmurError::IOError(e.to_string())
    }
}

impl MurmurError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Missing hardware will not appear mid-session
            MurmurError::CaptureUnavailable => false,
            MurmurError::CaptureError(_) => true,
            MurmurError::CompletionError(_) => true,
            MurmurError::ImageGenerationError(_) => true,
            MurmurError::SynthesisError(_) => true,
            MurmurError::PlaybackError(_) => true,
            MurmurError::ConfigError(_) => false,
            MurmurError::IOError(_) => false,
            MurmurError::ChannelError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            MurmurError::CaptureUnavailable => {
                "Voice input is not available on this device. Please type your message.".to_string()
            }
            MurmurError::CaptureError(_) => {
                "Could not understand speech. Please try again.".to_string()
            }
            MurmurError::CompletionError(_) => {
                "Failed to get AI response. Please try again.".to_string()
            }
            MurmurError::ImageGenerationError(_) => {
                "Image generation failed. The reply is shown without an image.".to_string()
            }
            MurmurError::SynthesisError(_) => {
                "Text-to-speech failed. Response will be shown as text.".to_string()
            }
            MurmurError::PlaybackError(_) => {
                "Audio playback failed. Please check your speakers.".to_string()
            }
            MurmurError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            MurmurError::IOError(_) => "File system error occurred.".to_string(),
            MurmurError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, MurmurError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(MurmurError::CompletionError("503".into()).is_recoverable());
        assert!(MurmurError::CaptureError("no-speech".into()).is_recoverable());
        assert!(!MurmurError::CaptureUnavailable.is_recoverable());
        assert!(!MurmurError::ConfigError("bad".into()).is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MurmurError = io.into();
        assert!(matches!(err, MurmurError::IOError(ref msg) if msg.contains("missing")));
    }

    #[test]
    fn test_user_message_hides_detail() {
        let err = MurmurError::CompletionError("HTTP 500: upstream exploded".into());
        assert!(!err.user_message().contains("upstream"));
    }
}
