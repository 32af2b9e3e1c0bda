//! Single-shot voice capture
//!
//! [`SpeechInputController`] wraps whatever capture backend the host offers.
//! Each call to `start` yields one future that resolves to exactly one
//! [`CaptureOutcome`]; the controller is idle again once it resolves or is
//! dropped.

use crate::utils::capability::Capability;
use crate::{MurmurError, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// Terminal signal of one capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Finalized transcript
    Transcript(String),
    /// Capture or recognition failed
    Error(String),
    /// Capture ended without anything to report (cancelled or nothing recognized)
    NoResult,
}

/// Host facility that records and recognizes one utterance
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Capture one utterance in `locale`, the controller's recognition locale.
    /// Must return promptly once `cancel` fires.
    async fn capture(&self, locale: &str, cancel: CancellationToken) -> CaptureOutcome;
}

struct CaptureSession {
    id: Uuid,
    cancel: CancellationToken,
}

/// Clears the active session when the capture future finishes or is dropped
struct SessionGuard {
    active: Arc<Mutex<Option<CaptureSession>>>,
    id: Uuid,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let mut active = self.active.lock();
        if active.as_ref().map(|s| s.id) == Some(self.id) {
            *active = None;
        }
    }
}

pub struct SpeechInputController {
    backend: Capability<Arc<dyn CaptureBackend>>,
    locale: String,
    active: Arc<Mutex<Option<CaptureSession>>>,
}

impl SpeechInputController {
    pub fn new(backend: Capability<Arc<dyn CaptureBackend>>, locale: impl Into<String>) -> Self {
        Self {
            backend,
            locale: locale.into(),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Controller for a host without any capture facility
    pub fn unavailable() -> Self {
        Self::new(Capability::Unavailable, "en-US")
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn is_listening(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Begin a capture.
    ///
    /// Returns `Ok(None)` when a capture is already running. The returned
    /// future owns the session; dropping it leaves the controller idle.
    pub fn start(&self) -> Result<Option<BoxFuture<'static, CaptureOutcome>>> {
        let backend = match self.backend.available() {
            Some(backend) => backend.clone(),
            None => return Err(MurmurError::CaptureUnavailable),
        };

        let mut active = self.active.lock();
        if active.is_some() {
            debug!("Capture already in progress");
            return Ok(None);
        }

        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        *active = Some(CaptureSession {
            id,
            cancel: cancel.clone(),
        });
        drop(active);

        let guard = SessionGuard {
            active: self.active.clone(),
            id,
        };
        let locale = self.locale.clone();

        info!("Capture started ({})", locale);

        Ok(Some(
            async move {
                let _guard = guard;
                let outcome = backend.capture(&locale, cancel.clone()).await;
                if cancel.is_cancelled() {
                    return CaptureOutcome::NoResult;
                }
                match outcome {
                    CaptureOutcome::Transcript(text) if text.trim().is_empty() => {
                        CaptureOutcome::NoResult
                    }
                    other => other,
                }
            }
            .boxed(),
        ))
    }

    /// Cancel the running capture. Returns whether one was running.
    pub fn stop(&self) -> bool {
        match self.active.lock().take() {
            Some(session) => {
                info!("Capture stopped");
                session.cancel.cancel();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct ScriptedBackend {
        outcome: CaptureOutcome,
    }

    #[async_trait]
    impl CaptureBackend for ScriptedBackend {
        async fn capture(&self, _locale: &str, _cancel: CancellationToken) -> CaptureOutcome {
            self.outcome.clone()
        }
    }

    /// Never finishes on its own
    struct EndlessBackend;

    #[async_trait]
    impl CaptureBackend for EndlessBackend {
        async fn capture(&self, _locale: &str, cancel: CancellationToken) -> CaptureOutcome {
            cancel.cancelled().await;
            CaptureOutcome::Transcript("late words".into())
        }
    }

    fn controller(backend: impl CaptureBackend + 'static) -> SpeechInputController {
        SpeechInputController::new(Capability::Available(Arc::new(backend)), "en-US")
    }

    #[test]
    fn test_start_without_capability() {
        let controller = SpeechInputController::unavailable();
        assert!(matches!(
            controller.start(),
            Err(MurmurError::CaptureUnavailable)
        ));
        assert!(!controller.is_listening());
    }

    #[tokio::test]
    async fn test_transcript_leaves_controller_idle() {
        let controller = controller(ScriptedBackend {
            outcome: CaptureOutcome::Transcript("hello there".into()),
        });

        let capture = controller.start().unwrap().unwrap();
        assert!(controller.is_listening());

        assert_eq!(
            capture.await,
            CaptureOutcome::Transcript("hello there".into())
        );
        assert!(!controller.is_listening());
    }

    #[tokio::test]
    async fn test_blank_transcript_is_no_result() {
        let controller = controller(ScriptedBackend {
            outcome: CaptureOutcome::Transcript("   ".into()),
        });
        let capture = controller.start().unwrap().unwrap();
        assert_eq!(capture.await, CaptureOutcome::NoResult);
    }

    #[tokio::test]
    async fn test_second_start_is_ignored() {
        let controller = controller(EndlessBackend);
        let _first = controller.start().unwrap().unwrap();
        assert!(controller.start().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stop_cancels_capture() {
        let controller = controller(EndlessBackend);
        let capture = controller.start().unwrap().unwrap();

        assert!(controller.stop());
        assert!(!controller.is_listening());

        let outcome = tokio::time::timeout(Duration::from_secs(1), capture)
            .await
            .unwrap();
        assert_eq!(outcome, CaptureOutcome::NoResult);

        // Idle stop is a no-op
        assert!(!controller.stop());
    }

    #[tokio::test]
    async fn test_dropping_future_releases_session() {
        let controller = controller(EndlessBackend);
        let capture = controller.start().unwrap().unwrap();
        drop(capture);
        assert!(!controller.is_listening());
        assert!(controller.start().unwrap().is_some());
    }
}
