//! Turn-taking orchestrator
//!
//! Serializes capture, completion, image generation and speech into single
//! conversational turns: Voice/Text -> Completion -> (Image) -> Log -> Speech.
//!
//! The orchestrator runs as one tokio task. It owns the turn state, the
//! message log writer, the capture controller and the synthesizer. Callers
//! drive it through an [`OrchestratorHandle`]. Each phase's outstanding I/O
//! is a single boxed future polled alongside the command channel, so a phase
//! finishing and a command arriving are never handled concurrently.

use crate::integration::config::AssistantConfig;
use crate::integration::state::TurnState;
use crate::llm::completion::{CompletionRequest, CompletionService, OpenRouterClient};
use crate::llm::config::{CompletionConfig, ImageConfig};
use crate::llm::image::{ImageRequest, ImageService, OpenAIImageClient};
use crate::llm::intent::ImageIntentClassifier;
use crate::llm::prompts::APOLOGY;
use crate::messages::{Message, MessageLog};
use crate::speech::input::{CaptureBackend, CaptureOutcome, SpeechInputController};
use crate::speech::local::{EspeakVoice, LocalSpeech, VoiceParams};
use crate::speech::premium::ElevenLabsClient;
use crate::speech::tts::{PremiumVoice, ResponseSynthesizer, SpeechOutcome};
use crate::utils::capability::Capability;
use crate::{MurmurError, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Commands that can be sent to the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorCommand {
    /// Start a turn from typed text
    SubmitText(String),

    /// Listen for one spoken utterance
    StartCapture,

    /// Abandon the running capture
    StopCapture,

    /// Cut the spoken reply short
    StopSpeaking,

    /// Turn spoken replies on or off
    SetSpeechEnabled(bool),

    /// Shutdown the orchestrator
    Shutdown,
}

/// Events emitted by the orchestrator
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorEvent {
    /// Turn state changed
    StateChanged(TurnState),

    /// A message was added to the log
    MessageAppended(Message),

    /// Capture could not start or produced an error
    CaptureFailed(String),

    /// Completion request failed; the apology message has been appended
    CompletionFailed(String),

    /// No voice could speak the reply; the text is still in the log
    SpeechFailed(String),

    /// A submit or capture request arrived outside `Idle`
    Rejected { state: TurnState },

    /// Orchestrator has shut down
    Shutdown,
}

/// Result of the phase future currently in flight
enum Step {
    Captured(CaptureOutcome),
    Completed {
        user_text: String,
        result: Result<String>,
    },
    ImageResolved {
        reply: String,
        image_url: Option<String>,
    },
    SpeechFinished(SpeechOutcome),
}

/// Handle for controlling the orchestrator from a front-end
pub struct OrchestratorHandle {
    /// Command sender
    command_tx: mpsc::Sender<OrchestratorCommand>,

    /// Event receiver
    event_rx: mpsc::UnboundedReceiver<OrchestratorEvent>,

    /// Read-only view of the turn state
    state: Arc<RwLock<TurnState>>,

    /// Read-only view of the transcript
    log: MessageLog,
}

impl OrchestratorHandle {
    /// Send a command to the orchestrator
    pub async fn send_command(&self, cmd: OrchestratorCommand) -> Result<()> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|e| MurmurError::ChannelError(format!("Failed to send command: {}", e)))
    }

    pub async fn submit_text(&self, text: impl Into<String>) -> Result<()> {
        self.send_command(OrchestratorCommand::SubmitText(text.into()))
            .await
    }

    pub async fn start_capture(&self) -> Result<()> {
        self.send_command(OrchestratorCommand::StartCapture).await
    }

    pub async fn stop_capture(&self) -> Result<()> {
        self.send_command(OrchestratorCommand::StopCapture).await
    }

    pub async fn stop_speaking(&self) -> Result<()> {
        self.send_command(OrchestratorCommand::StopSpeaking).await
    }

    pub async fn set_speech_enabled(&self, enabled: bool) -> Result<()> {
        self.send_command(OrchestratorCommand::SetSpeechEnabled(enabled))
            .await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send_command(OrchestratorCommand::Shutdown).await
    }

    /// Wait for the next event. `None` once the orchestrator is gone.
    pub async fn next_event(&mut self) -> Option<OrchestratorEvent> {
        self.event_rx.recv().await
    }

    /// Try to receive an event from the orchestrator
    pub fn try_recv_event(&mut self) -> Option<OrchestratorEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Current turn state
    pub fn turn_state(&self) -> TurnState {
        *self.state.read()
    }

    /// Ordered snapshot of the transcript
    pub fn messages(&self) -> Vec<Message> {
        self.log.snapshot()
    }

    /// Shared read-only view of the transcript
    pub fn message_log(&self) -> &MessageLog {
        &self.log
    }
}

/// Main orchestrator that coordinates all components
pub struct Orchestrator {
    /// Command receiver
    command_rx: mpsc::Receiver<OrchestratorCommand>,

    /// Event sender
    event_tx: mpsc::UnboundedSender<OrchestratorEvent>,

    /// Turn state, written only by `transition`
    state: Arc<RwLock<TurnState>>,

    /// Transcript
    log: MessageLog,

    /// Phase future in flight, if any
    phase: Option<BoxFuture<'static, Step>>,

    completion: Arc<dyn CompletionService>,
    completion_config: CompletionConfig,
    images: Option<Arc<dyn ImageService>>,
    image_config: ImageConfig,
    classifier: ImageIntentClassifier,
    input: SpeechInputController,
    synthesizer: ResponseSynthesizer,
    speech_enabled: bool,
}

impl Orchestrator {
    /// Spawn the orchestrator loop on the current runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until a `Shutdown` command arrives or every handle is dropped
    pub async fn run(mut self) {
        info!("Orchestrator started");

        // Announce anything already in the log (the greeting)
        for message in self.log.snapshot() {
            self.emit(OrchestratorEvent::MessageAppended(message));
        }

        loop {
            tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(OrchestratorCommand::Shutdown) => {
                        info!("Orchestrator shutdown requested");
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        warn!("Command channel disconnected");
                        break;
                    }
                },
                step = next_step(&mut self.phase) => {
                    self.phase = None;
                    self.handle_step(step);
                }
            }
        }

        self.input.stop();
        self.synthesizer.stop();
        self.phase = None;
        self.emit(OrchestratorEvent::Shutdown);
        info!("Orchestrator stopped");
    }

    fn handle_command(&mut self, command: OrchestratorCommand) {
        debug!("Command: {:?}", command);
        match command {
            OrchestratorCommand::SubmitText(text) => {
                if text.trim().is_empty() {
                    debug!("Ignoring blank submit");
                } else if self.reject_unless_idle() {
                    self.begin_turn(text);
                }
            }
            OrchestratorCommand::StartCapture => {
                if self.reject_unless_idle() {
                    self.begin_capture();
                }
            }
            OrchestratorCommand::StopCapture => {
                if self.current_state() == TurnState::Capturing {
                    self.input.stop();
                    self.phase = None;
                    self.transition(TurnState::Idle);
                } else {
                    debug!("StopCapture while {}; nothing to stop", self.current_state());
                }
            }
            OrchestratorCommand::StopSpeaking => self.stop_speaking(),
            OrchestratorCommand::SetSpeechEnabled(enabled) => {
                info!("Speech output {}", if enabled { "enabled" } else { "disabled" });
                self.speech_enabled = enabled;
                if !enabled {
                    self.stop_speaking();
                }
            }
            OrchestratorCommand::Shutdown => {}
        }
    }

    fn handle_step(&mut self, step: Step) {
        match step {
            Step::Captured(outcome) => {
                self.transition(TurnState::Idle);
                match outcome {
                    CaptureOutcome::Transcript(text) => {
                        info!("Transcript: {}", text);
                        self.begin_turn(text);
                    }
                    CaptureOutcome::Error(reason) => {
                        warn!("Capture failed: {}", reason);
                        self.emit(OrchestratorEvent::CaptureFailed(reason));
                    }
                    CaptureOutcome::NoResult => debug!("Capture ended without a transcript"),
                }
            }
            Step::Completed { user_text, result } => match result.and_then(non_blank_reply) {
                Ok(reply) => self.resolve_image(user_text, reply),
                Err(e) => {
                    error!("Completion failed: {}", e);
                    self.append(Message::assistant(APOLOGY));
                    self.emit(OrchestratorEvent::CompletionFailed(e.to_string()));
                    self.transition(TurnState::Idle);
                }
            },
            Step::ImageResolved { reply, image_url } => self.finish_turn(reply, image_url),
            Step::SpeechFinished(outcome) => {
                match outcome {
                    SpeechOutcome::Failed(reason) => {
                        error!("Speech failed: {}", reason);
                        self.emit(OrchestratorEvent::SpeechFailed(reason));
                    }
                    other => debug!("Speech ended: {:?}", other),
                }
                self.transition(TurnState::Idle);
            }
        }
    }

    fn begin_capture(&mut self) {
        match self.input.start() {
            Ok(Some(capture)) => {
                self.transition(TurnState::Capturing);
                self.phase = Some(capture.map(Step::Captured).boxed());
            }
            Ok(None) => debug!("Capture already running"),
            Err(e) => {
                warn!("Cannot start capture: {}", e);
                self.emit(OrchestratorEvent::CaptureFailed(e.to_string()));
            }
        }
    }

    /// Steps 1-3 of a turn: log the request and ask for a completion
    fn begin_turn(&mut self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            debug!("Ignoring blank input");
            return;
        }

        self.append(Message::user(text.clone()));
        self.transition(TurnState::Processing);

        let request = CompletionRequest::single_turn(&self.completion_config, &text);
        let completion = Arc::clone(&self.completion);
        self.phase = Some(
            async move {
                let result = completion.complete(&request).await;
                Step::Completed {
                    user_text: text,
                    result,
                }
            }
            .boxed(),
        );
    }

    /// Step 4: optional image for visual requests
    fn resolve_image(&mut self, user_text: String, reply: String) {
        let images = self
            .images
            .clone()
            .filter(|_| self.classifier.wants_image(&user_text));
        let Some(images) = images else {
            self.finish_turn(reply, None);
            return;
        };

        info!("Requesting image for: {}", user_text);
        let request = ImageRequest::new(&self.image_config, &user_text);
        self.phase = Some(
            async move {
                let image_url = match images.generate(&request).await {
                    Ok(url) => url,
                    Err(e) => {
                        warn!("Image generation failed, continuing without image: {}", e);
                        None
                    }
                };
                Step::ImageResolved { reply, image_url }
            }
            .boxed(),
        );
    }

    /// Steps 5-6: log the reply and speak it
    fn finish_turn(&mut self, reply: String, image_url: Option<String>) {
        self.append(Message::assistant(reply.clone()).with_image(image_url));

        if self.speech_enabled && self.synthesizer.can_speak() {
            self.transition(TurnState::Speaking);
            self.phase = Some(
                self.synthesizer
                    .speak(reply)
                    .map(Step::SpeechFinished)
                    .boxed(),
            );
        } else {
            self.transition(TurnState::Idle);
        }
    }

    fn stop_speaking(&mut self) {
        if self.current_state() == TurnState::Speaking {
            self.synthesizer.stop();
            self.phase = None;
            self.transition(TurnState::Idle);
        } else {
            debug!("StopSpeaking while {}; nothing to stop", self.current_state());
        }
    }

    /// Returns true when idle; otherwise emits `Rejected`
    fn reject_unless_idle(&mut self) -> bool {
        let state = self.current_state();
        if state.is_idle() {
            true
        } else {
            info!("Request rejected while {}", state);
            self.emit(OrchestratorEvent::Rejected { state });
            false
        }
    }

    /// The only place the turn state is written
    fn transition(&mut self, next: TurnState) {
        let current = self.current_state();
        if current == next {
            return;
        }
        debug_assert!(
            current.can_transition_to(next),
            "unexpected transition {} -> {}",
            current,
            next
        );
        if !current.can_transition_to(next) {
            error!("Unexpected transition {} -> {}", current, next);
        }
        debug!("Turn state: {} -> {}", current, next);
        *self.state.write() = next;
        self.emit(OrchestratorEvent::StateChanged(next));
    }

    fn current_state(&self) -> TurnState {
        *self.state.read()
    }

    fn append(&mut self, message: Message) {
        self.log.append(message.clone());
        self.emit(OrchestratorEvent::MessageAppended(message));
    }

    fn emit(&self, event: OrchestratorEvent) {
        // Front-ends may drop their handle; the turn still completes
        let _ = self.event_tx.send(event);
    }
}

/// Any completion service may answer with whitespace; the log only takes real text
fn non_blank_reply(reply: String) -> Result<String> {
    if reply.trim().is_empty() {
        Err(MurmurError::CompletionError("Empty reply".into()))
    } else {
        Ok(reply)
    }
}

/// Resolve the in-flight phase, or never if there is none
async fn next_step(phase: &mut Option<BoxFuture<'static, Step>>) -> Step {
    match phase {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}

/// Builder for creating an orchestrator
pub struct OrchestratorBuilder {
    config: AssistantConfig,
    completion: Option<Arc<dyn CompletionService>>,
    images: Option<Arc<dyn ImageService>>,
    capture: Capability<Arc<dyn CaptureBackend>>,
    premium: Option<PremiumVoice>,
    local: Capability<Arc<dyn LocalSpeech>>,
}

impl OrchestratorBuilder {
    /// Create a new builder with default configuration and no services
    pub fn new() -> Self {
        Self {
            config: AssistantConfig::default(),
            completion: None,
            images: None,
            capture: Capability::Unavailable,
            premium: None,
            local: Capability::Unavailable,
        }
    }

    /// Wire the real remote clients and probe host capabilities
    pub fn from_config(config: AssistantConfig) -> Result<Self> {
        let timeout = config.timeout();

        let completion: Arc<dyn CompletionService> =
            Arc::new(OpenRouterClient::new(&config.completion, timeout)?);
        if config.completion.api_key.is_none() {
            warn!("No completion API key; requests will likely be refused");
        }

        let images: Option<Arc<dyn ImageService>> = if !config.image.enabled {
            info!("Image generation disabled");
            None
        } else if config.image.api_key.is_none() {
            warn!("Image generation disabled: no image API key");
            None
        } else {
            Some(Arc::new(OpenAIImageClient::new(&config.image, timeout)?))
        };

        let premium = match ElevenLabsClient::from_config(&config.voice, timeout)? {
            Some(client) => match detect_player() {
                Some(player) => Some(PremiumVoice::new(Arc::new(client), player)),
                None => {
                    warn!("Premium voice disabled: no audio output");
                    None
                }
            },
            None => None,
        };

        let local = EspeakVoice::detect(config.voice.local_command.as_deref(), &config.capture.locale)
            .map(|voice| Arc::new(voice) as Arc<dyn LocalSpeech>);
        if local.is_none() {
            warn!("No local voice found");
        }

        let capture = detect_capture(&config);

        Ok(Self {
            config,
            completion: Some(completion),
            images,
            capture,
            premium,
            local: Capability::from_option(local),
        })
    }

    /// Set the complete configuration
    pub fn with_config(mut self, config: AssistantConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the completion service
    pub fn with_completion(mut self, completion: Arc<dyn CompletionService>) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Set the image service
    pub fn with_images(mut self, images: Arc<dyn ImageService>) -> Self {
        self.images = Some(images);
        self
    }

    /// Set the capture backend
    pub fn with_capture(mut self, capture: Arc<dyn CaptureBackend>) -> Self {
        self.capture = Capability::Available(capture);
        self
    }

    /// Set the premium voice
    pub fn with_premium_voice(mut self, premium: PremiumVoice) -> Self {
        self.premium = Some(premium);
        self
    }

    /// Set the local voice
    pub fn with_local_voice(mut self, local: Arc<dyn LocalSpeech>) -> Self {
        self.local = Capability::Available(local);
        self
    }

    /// Build the orchestrator
    pub fn build(self) -> Result<(Orchestrator, OrchestratorHandle)> {
        self.config.validate()?;
        let completion = self
            .completion
            .ok_or_else(|| MurmurError::ConfigError("No completion service configured".into()))?;

        let config = self.config;
        let (command_tx, command_rx) = mpsc::channel(100);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let state = Arc::new(RwLock::new(TurnState::Idle));
        let log = MessageLog::new();

        let synthesizer =
            ResponseSynthesizer::new(self.premium, self.local, VoiceParams::from(&config.voice));
        if config.voice.speech_enabled && !synthesizer.can_speak() {
            warn!("Speech output enabled but no voice is available; replies will be text only");
        }

        if !config.greeting.trim().is_empty() {
            log.append(Message::assistant(config.greeting.clone()));
        }

        let images = if config.image.enabled { self.images } else { None };

        let handle = OrchestratorHandle {
            command_tx,
            event_rx,
            state: Arc::clone(&state),
            log: log.clone(),
        };

        let orchestrator = Orchestrator {
            command_rx,
            event_tx,
            state,
            log,
            phase: None,
            completion,
            completion_config: config.completion.clone(),
            images,
            image_config: config.image.clone(),
            classifier: ImageIntentClassifier::new(config.intent_mode),
            input: SpeechInputController::new(self.capture, config.capture.locale.clone()),
            synthesizer,
            speech_enabled: config.voice.speech_enabled,
        };

        Ok((orchestrator, handle))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "audio-io")]
fn detect_player() -> Option<Arc<dyn crate::audio::output::AudioPlayer>> {
    crate::audio::output::RodioPlayer::detect()
        .map(|player| Arc::new(player) as Arc<dyn crate::audio::output::AudioPlayer>)
}

#[cfg(not(feature = "audio-io"))]
fn detect_player() -> Option<Arc<dyn crate::audio::output::AudioPlayer>> {
    None
}

#[cfg(feature = "audio-io")]
fn detect_capture(config: &AssistantConfig) -> Capability<Arc<dyn CaptureBackend>> {
    use crate::speech::stt::MicrophoneCapture;
    Capability::from_option(
        MicrophoneCapture::detect(&config.capture, config.timeout())
            .map(|capture| Arc::new(capture) as Arc<dyn CaptureBackend>),
    )
}

#[cfg(not(feature = "audio-io"))]
fn detect_capture(_config: &AssistantConfig) -> Capability<Arc<dyn CaptureBackend>> {
    info!("Voice capture unavailable: built without audio-io");
    Capability::Unavailable
}
