//! Playback of encoded audio returned by premium synthesis

use crate::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Plays one encoded clip (MP3/WAV). Resolves when playback ends or `cancel` fires.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, audio: Vec<u8>, cancel: CancellationToken) -> Result<()>;
}

#[cfg(feature = "audio-io")]
pub use rodio_player::RodioPlayer;

#[cfg(feature = "audio-io")]
mod rodio_player {
    use super::AudioPlayer;
    use crate::{MurmurError, Result};
    use async_trait::async_trait;
    use rodio::{Decoder, OutputStream, Sink};
    use std::io::Cursor;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use tracing::{debug, info, warn};

    const POLL_INTERVAL: Duration = Duration::from_millis(20);

    /// Plays audio on the default output device.
    ///
    /// The output stream is not `Send`, so each clip is played on a blocking
    /// worker that owns its own stream.
    #[derive(Debug, Default, Clone)]
    pub struct RodioPlayer;

    impl RodioPlayer {
        /// Probe for a default output device.
        pub fn detect() -> Option<Self> {
            match OutputStream::try_default() {
                Ok(_) => {
                    info!("Audio output device available");
                    Some(Self)
                }
                Err(e) => {
                    warn!("No audio output device: {}", e);
                    None
                }
            }
        }
    }

    #[async_trait]
    impl AudioPlayer for RodioPlayer {
        async fn play(&self, audio: Vec<u8>, cancel: CancellationToken) -> Result<()> {
            tokio::task::spawn_blocking(move || -> Result<()> {
                let (_stream, handle) = OutputStream::try_default()
                    .map_err(|e| MurmurError::PlaybackError(format!("No output device: {}", e)))?;
                let sink = Sink::try_new(&handle)
                    .map_err(|e| MurmurError::PlaybackError(format!("Sink failed: {}", e)))?;
                let source = Decoder::new(Cursor::new(audio))
                    .map_err(|e| MurmurError::PlaybackError(format!("Decode failed: {}", e)))?;
                sink.append(source);

                while !sink.empty() {
                    if cancel.is_cancelled() {
                        sink.stop();
                        debug!("Playback stopped");
                        return Ok(());
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Ok(())
            })
            .await
            .map_err(|e| MurmurError::PlaybackError(format!("Playback task failed: {}", e)))?
        }
    }
}
