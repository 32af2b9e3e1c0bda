use anyhow::{Context, Result};
use murmur::integration::{
    AssistantConfig, OrchestratorBuilder, OrchestratorEvent, OrchestratorHandle, TurnState,
};
use murmur::messages::Message;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "Type a message and press Enter. Commands: /listen /stop /mute /unmute /quit";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Murmur voice assistant");

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MURMUR_CONFIG").ok());
    let config = match config_path {
        Some(path) => AssistantConfig::load(&path)
            .with_context(|| format!("loading config from {}", path))?,
        None => AssistantConfig::default(),
    }
    .apply_env();

    let (orchestrator, mut handle) = OrchestratorBuilder::from_config(config)
        .context("wiring services")?
        .build()
        .context("building orchestrator")?;
    let task = orchestrator.spawn();

    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !dispatch(&handle, line.trim()).await? {
                        break;
                    }
                }
                None => {
                    handle.shutdown().await?;
                    break;
                }
            },
            event = handle.next_event() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
        }
    }

    // Drain until the orchestrator confirms shutdown
    while let Some(event) = handle.next_event().await {
        print_event(&event);
        if event == OrchestratorEvent::Shutdown {
            break;
        }
    }
    task.await.context("orchestrator task")?;

    Ok(())
}

/// Forward one input line. Returns false once the user asked to quit.
async fn dispatch(handle: &OrchestratorHandle, line: &str) -> Result<bool> {
    match line {
        "" => {}
        "/listen" => handle.start_capture().await?,
        "/stop" => match handle.turn_state() {
            TurnState::Capturing => handle.stop_capture().await?,
            TurnState::Speaking => handle.stop_speaking().await?,
            state => println!("(nothing to stop while {})", state),
        },
        "/mute" => handle.set_speech_enabled(false).await?,
        "/unmute" => handle.set_speech_enabled(true).await?,
        "/quit" => {
            handle.shutdown().await?;
            return Ok(false);
        }
        "/help" => println!("{}", HELP),
        text => handle.submit_text(text).await?,
    }
    Ok(true)
}

fn print_event(event: &OrchestratorEvent) {
    match event {
        OrchestratorEvent::MessageAppended(message) => print_message(message),
        OrchestratorEvent::StateChanged(TurnState::Capturing) => println!("(listening...)"),
        OrchestratorEvent::StateChanged(TurnState::Processing) => println!("(thinking...)"),
        OrchestratorEvent::StateChanged(_) => {}
        OrchestratorEvent::CaptureFailed(reason) => println!("! voice input: {}", reason),
        OrchestratorEvent::CompletionFailed(reason) => println!("! completion: {}", reason),
        OrchestratorEvent::SpeechFailed(reason) => println!("! speech: {}", reason),
        OrchestratorEvent::Rejected { state } => println!("(busy: {}, try again shortly)", state),
        OrchestratorEvent::Shutdown => println!("Goodbye."),
    }
}

fn print_message(message: &Message) {
    let speaker = if message.is_user() { "you" } else { "assistant" };
    println!(
        "[{}] {}: {}",
        message.timestamp().format("%H:%M:%S"),
        speaker,
        message.text()
    );
    if let Some(url) = message.image_url() {
        println!("    image: {}", url);
    }
}
