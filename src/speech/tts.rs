//! Spoken output for assistant replies
//!
//! [`ResponseSynthesizer`] speaks a reply through the premium voice when one is
//! configured and falls back to the local voice on any premium failure. Only
//! one utterance is active at a time, and it can be stopped at any point.

use crate::audio::output::AudioPlayer;
use crate::speech::local::{LocalSpeech, VoiceParams};
use crate::speech::premium::PremiumSynthesis;
use crate::utils::capability::Capability;
use crate::{MurmurError, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Which voice produced the audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechPath {
    Premium,
    Local,
}

/// Terminal signal of one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// Audio played to the end
    Finished(SpeechPath),
    /// Stopped before the end
    Cancelled,
    /// Every available voice failed
    Failed(String),
    /// No voice on this host
    Unavailable,
}

/// Remote synthesis paired with a device that can play its output
#[derive(Clone)]
pub struct PremiumVoice {
    service: Arc<dyn PremiumSynthesis>,
    player: Arc<dyn AudioPlayer>,
}

impl PremiumVoice {
    pub fn new(service: Arc<dyn PremiumSynthesis>, player: Arc<dyn AudioPlayer>) -> Self {
        Self { service, player }
    }

    async fn speak(&self, text: &str, cancel: &CancellationToken) -> Result<()> {
        let audio = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            audio = self.service.synthesize(text) => audio?,
        };

        if audio.is_empty() {
            return Err(MurmurError::SynthesisError("Empty audio payload".into()));
        }

        debug!("Playing {} bytes of premium audio", audio.len());
        self.player.play(audio, cancel.clone()).await
    }
}

struct SynthesisSession {
    id: Uuid,
    cancel: CancellationToken,
}

/// Clears the session slot when the utterance future finishes or is dropped
struct SessionGuard {
    session: Arc<Mutex<Option<SynthesisSession>>>,
    id: Uuid,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let mut session = self.session.lock();
        if session.as_ref().map(|s| s.id) == Some(self.id) {
            *session = None;
        }
    }
}

pub struct ResponseSynthesizer {
    premium: Option<PremiumVoice>,
    local: Capability<Arc<dyn LocalSpeech>>,
    params: VoiceParams,
    session: Arc<Mutex<Option<SynthesisSession>>>,
}

impl ResponseSynthesizer {
    pub fn new(
        premium: Option<PremiumVoice>,
        local: Capability<Arc<dyn LocalSpeech>>,
        params: VoiceParams,
    ) -> Self {
        Self {
            premium,
            local,
            params,
            session: Arc::new(Mutex::new(None)),
        }
    }

    /// Synthesizer with no voice at all
    pub fn silent() -> Self {
        Self::new(None, Capability::Unavailable, VoiceParams::default())
    }

    pub fn has_premium(&self) -> bool {
        self.premium.is_some()
    }

    /// Whether any voice is present
    pub fn can_speak(&self) -> bool {
        self.premium.is_some() || self.local.is_available()
    }

    pub fn is_speaking(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Speak `text`, stopping whatever was being spoken first.
    ///
    /// The returned future owns the session; dropping it leaves the
    /// synthesizer silent.
    pub fn speak(&self, text: impl Into<String>) -> BoxFuture<'static, SpeechOutcome> {
        self.stop();

        let text = text.into();
        let id = Uuid::new_v4();
        let cancel = CancellationToken::new();
        *self.session.lock() = Some(SynthesisSession {
            id,
            cancel: cancel.clone(),
        });

        let guard = SessionGuard {
            session: self.session.clone(),
            id,
        };
        let premium = self.premium.clone();
        let local = self.local.available().cloned();
        let params = self.params;

        async move {
            let _guard = guard;
            let outcome = utter(premium, local, params, &text, &cancel).await;
            debug!("Utterance finished: {:?}", outcome);
            outcome
        }
        .boxed()
    }

    /// Halt any ongoing utterance. Safe to call when silent.
    pub fn stop(&self) -> bool {
        match self.session.lock().take() {
            Some(session) => {
                info!("Speech stopped");
                session.cancel.cancel();
                true
            }
            None => false,
        }
    }
}

async fn utter(
    premium: Option<PremiumVoice>,
    local: Option<Arc<dyn LocalSpeech>>,
    params: VoiceParams,
    text: &str,
    cancel: &CancellationToken,
) -> SpeechOutcome {
    let tried_premium = premium.is_some();
    if let Some(voice) = premium {
        match voice.speak(text, cancel).await {
            _ if cancel.is_cancelled() => return SpeechOutcome::Cancelled,
            Ok(()) => return SpeechOutcome::Finished(SpeechPath::Premium),
            Err(e) => warn!("Premium voice failed, using local voice: {}", e),
        }
    }

    let Some(local) = local else {
        return if tried_premium {
            SpeechOutcome::Failed("Premium voice failed and no local voice is available".into())
        } else {
            SpeechOutcome::Unavailable
        };
    };

    let result = local.speak(text, params, cancel.clone()).await;
    if cancel.is_cancelled() {
        return SpeechOutcome::Cancelled;
    }
    match result {
        Ok(()) => SpeechOutcome::Finished(SpeechPath::Local),
        Err(e) => {
            warn!("Local voice failed: {}", e);
            SpeechOutcome::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingLocal {
        spoken: Mutex<Vec<String>>,
        hold: bool,
        fail: bool,
    }

    #[async_trait]
    impl LocalSpeech for RecordingLocal {
        async fn speak(
            &self,
            text: &str,
            _params: VoiceParams,
            cancel: CancellationToken,
        ) -> Result<()> {
            self.spoken.lock().push(text.to_string());
            if self.hold {
                cancel.cancelled().await;
            }
            if self.fail {
                return Err(MurmurError::SynthesisError("no voice".into()));
            }
            Ok(())
        }
    }

    struct FixedPremium(Result<Vec<u8>>);

    #[async_trait]
    impl PremiumSynthesis for FixedPremium {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct FakePlayer {
        hold: bool,
        played: Mutex<usize>,
    }

    #[async_trait]
    impl AudioPlayer for FakePlayer {
        async fn play(&self, _audio: Vec<u8>, cancel: CancellationToken) -> Result<()> {
            *self.played.lock() += 1;
            if self.hold {
                cancel.cancelled().await;
            }
            Ok(())
        }
    }

    fn synthesizer(
        premium: Option<PremiumVoice>,
        local: Arc<RecordingLocal>,
    ) -> ResponseSynthesizer {
        let local: Arc<dyn LocalSpeech> = local;
        ResponseSynthesizer::new(premium, Capability::Available(local), VoiceParams::default())
    }

    #[tokio::test]
    async fn test_local_voice_without_premium() {
        let local = Arc::new(RecordingLocal::default());
        let synth = synthesizer(None, local.clone());

        assert!(!synth.has_premium());
        let outcome = synth.speak("Hi there").await;
        assert_eq!(outcome, SpeechOutcome::Finished(SpeechPath::Local));
        assert_eq!(*local.spoken.lock(), vec!["Hi there".to_string()]);
        assert!(!synth.is_speaking());
    }

    #[tokio::test]
    async fn test_premium_plays_when_healthy() {
        let local = Arc::new(RecordingLocal::default());
        let player = Arc::new(FakePlayer::default());
        let premium = PremiumVoice::new(Arc::new(FixedPremium(Ok(vec![1, 2, 3]))), player.clone());
        let synth = synthesizer(Some(premium), local.clone());
        assert!(synth.has_premium());

        let outcome = synth.speak("Hi").await;
        assert_eq!(outcome, SpeechOutcome::Finished(SpeechPath::Premium));
        assert_eq!(*player.played.lock(), 1);
        assert!(local.spoken.lock().is_empty());
    }

    #[tokio::test]
    async fn test_premium_failure_falls_back_with_same_text() {
        for failing in [
            FixedPremium(Err(MurmurError::SynthesisError("HTTP 401".into()))),
            FixedPremium(Ok(Vec::new())),
        ] {
            let local = Arc::new(RecordingLocal::default());
            let premium = PremiumVoice::new(Arc::new(failing), Arc::new(FakePlayer::default()));
            let synth = synthesizer(Some(premium), local.clone());

            let outcome = synth.speak("The answer is four.").await;
            assert_eq!(outcome, SpeechOutcome::Finished(SpeechPath::Local));
            assert_eq!(*local.spoken.lock(), vec!["The answer is four.".to_string()]);
        }
    }

    #[tokio::test]
    async fn test_stop_during_premium_playback_does_not_fall_back() {
        let local = Arc::new(RecordingLocal::default());
        let player = Arc::new(FakePlayer {
            hold: true,
            ..Default::default()
        });
        let premium = PremiumVoice::new(Arc::new(FixedPremium(Ok(vec![9]))), player);
        let synth = synthesizer(Some(premium), local.clone());

        let utterance = tokio::spawn(synth.speak("long reply"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(synth.is_speaking());

        assert!(synth.stop());
        assert!(!synth.is_speaking());
        assert!(!synth.stop());

        let outcome = tokio::time::timeout(Duration::from_secs(1), utterance)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, SpeechOutcome::Cancelled);
        assert!(local.spoken.lock().is_empty());
    }

    #[tokio::test]
    async fn test_new_utterance_stops_previous() {
        let local = Arc::new(RecordingLocal {
            hold: true,
            ..Default::default()
        });
        let synth = synthesizer(None, local.clone());

        let first = tokio::spawn(synth.speak("first"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = synth.speak("second");

        let first = tokio::time::timeout(Duration::from_secs(1), first)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, SpeechOutcome::Cancelled);
        assert!(synth.is_speaking());

        synth.stop();
        assert_eq!(second.await, SpeechOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_local_failure_is_reported() {
        let local = Arc::new(RecordingLocal {
            fail: true,
            ..Default::default()
        });
        let synth = synthesizer(None, local);
        assert!(matches!(synth.speak("x").await, SpeechOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_no_voice_is_unavailable() {
        let synth = ResponseSynthesizer::silent();
        assert!(!synth.can_speak());
        assert_eq!(synth.speak("x").await, SpeechOutcome::Unavailable);
    }
}
