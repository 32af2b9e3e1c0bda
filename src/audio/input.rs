//! Microphone recording for single-shot voice capture
//!
//! Captures from the default input device with cpal, mixes down to mono and
//! stops on trailing silence, a hard time limit, or cancellation.

use crate::{MurmurError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// When a recording ends
#[derive(Debug, Clone, Copy)]
pub struct RecordingLimits {
    pub max_duration: Duration,
    pub trailing_silence: Duration,
    pub silence_threshold: f32,
}

/// Mono samples captured from the microphone
#[derive(Debug, Clone)]
pub struct Recording {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub heard_speech: bool,
}

impl Recording {
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Audio recorder for the default input device
///
/// Holds a cpal stream, which is not `Send`; create and drop it on one thread.
pub struct AudioRecorder {
    stream: Option<Stream>,
    sample_rate: u32,
    channels: u16,
    is_recording: Arc<AtomicBool>,
    device: Device,
    config: StreamConfig,
}

impl AudioRecorder {
    /// Create a recorder on the default input device
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or(MurmurError::CaptureUnavailable)?;

        info!(
            "Using input device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config: StreamConfig = device
            .default_input_config()
            .map_err(|e| MurmurError::CaptureError(format!("Failed to get input config: {}", e)))?
            .into();

        Ok(Self {
            stream: None,
            sample_rate: config.sample_rate.0,
            channels: config.channels,
            is_recording: Arc::new(AtomicBool::new(false)),
            device,
            config,
        })
    }

    /// Whether the host exposes an input device at all
    pub fn is_available() -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    /// Start streaming mono chunks into `audio_tx`
    pub fn start(&mut self, audio_tx: Sender<Vec<f32>>) -> Result<()> {
        if self.is_recording.load(Ordering::SeqCst) {
            warn!("Already recording, ignoring start request");
            return Ok(());
        }

        let channels = self.channels as usize;
        let is_recording = Arc::clone(&self.is_recording);

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !is_recording.load(Ordering::SeqCst) {
                        return;
                    }

                    let samples = if channels == 1 {
                        data.to_vec()
                    } else {
                        data.chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                            .collect()
                    };

                    if let Err(e) = audio_tx.try_send(samples) {
                        warn!("Dropping audio chunk: {}", e);
                    }
                },
                |err| error!("Audio input stream error: {}", err),
                None,
            )
            .map_err(|e| MurmurError::CaptureError(format!("Failed to build input stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| MurmurError::CaptureError(format!("Failed to start input stream: {}", e)))?;

        self.is_recording.store(true, Ordering::SeqCst);
        self.stream = Some(stream);
        debug!("Audio recording started");
        Ok(())
    }

    /// Stop recording
    pub fn stop(&mut self) {
        self.is_recording.store(false, Ordering::SeqCst);
        if self.stream.take().is_some() {
            debug!("Audio recording stopped");
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Drop for AudioRecorder {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Root-mean-square level of a chunk
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Tracks speech and trailing silence across incoming chunks
#[derive(Debug)]
pub struct UtteranceTracker {
    limits: RecordingLimits,
    sample_rate: u32,
    heard_speech: bool,
    silent_samples: usize,
    total_samples: usize,
}

impl UtteranceTracker {
    pub fn new(limits: RecordingLimits, sample_rate: u32) -> Self {
        Self {
            limits,
            sample_rate,
            heard_speech: false,
            silent_samples: 0,
            total_samples: 0,
        }
    }

    /// Feed a chunk; returns true when the utterance is over
    pub fn push(&mut self, chunk: &[f32]) -> bool {
        self.total_samples += chunk.len();
        if rms(chunk) >= self.limits.silence_threshold {
            self.heard_speech = true;
            self.silent_samples = 0;
        } else if self.heard_speech {
            self.silent_samples += chunk.len();
        }

        let silence = Duration::from_secs_f32(self.silent_samples as f32 / self.sample_rate as f32);
        let total = Duration::from_secs_f32(self.total_samples as f32 / self.sample_rate as f32);
        (self.heard_speech && silence >= self.limits.trailing_silence)
            || total >= self.limits.max_duration
    }

    pub fn heard_speech(&self) -> bool {
        self.heard_speech
    }
}

/// Record one utterance. Blocking; run it on a blocking worker.
///
/// Returns `Ok(None)` when cancelled.
pub fn record_utterance(
    limits: RecordingLimits,
    cancel: &CancellationToken,
) -> Result<Option<Recording>> {
    let (audio_tx, audio_rx): (Sender<Vec<f32>>, Receiver<Vec<f32>>) = bounded(256);
    let mut recorder = AudioRecorder::new()?;
    let sample_rate = recorder.sample_rate();
    recorder.start(audio_tx)?;

    let mut tracker = UtteranceTracker::new(limits, sample_rate);
    let mut samples = Vec::with_capacity(sample_rate as usize * 5);
    let deadline = Instant::now() + limits.max_duration + Duration::from_secs(1);

    loop {
        if cancel.is_cancelled() {
            recorder.stop();
            debug!("Recording cancelled");
            return Ok(None);
        }
        if Instant::now() > deadline {
            break;
        }
        match audio_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(chunk) => {
                let done = tracker.push(&chunk);
                samples.extend_from_slice(&chunk);
                if done {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err(MurmurError::CaptureError("Audio stream closed".into()));
            }
        }
    }

    recorder.stop();
    let recording = Recording {
        samples,
        sample_rate,
        heard_speech: tracker.heard_speech(),
    };
    info!("Recorded {:.2}s of audio", recording.duration_secs());
    Ok(Some(recording))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> RecordingLimits {
        RecordingLimits {
            max_duration: Duration::from_secs(2),
            trailing_silence: Duration::from_millis(500),
            silence_threshold: 0.01,
        }
    }

    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        assert!((rms(&[0.5, -0.5]) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_tracker_ends_after_trailing_silence() {
        let mut tracker = UtteranceTracker::new(limits(), 1000);
        assert!(!tracker.push(&[0.0; 100]));
        assert!(!tracker.heard_speech());
        assert!(!tracker.push(&[0.3; 100]));
        assert!(tracker.heard_speech());
        assert!(!tracker.push(&[0.0; 400]));
        assert!(tracker.push(&[0.0; 100]));
    }

    #[test]
    fn test_tracker_stops_at_max_duration_without_speech() {
        let mut tracker = UtteranceTracker::new(limits(), 1000);
        assert!(!tracker.push(&[0.0; 1999]));
        assert!(tracker.push(&[0.0; 1]));
        assert!(!tracker.heard_speech());
    }
}
