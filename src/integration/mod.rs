//! Integration layer tying capture, completion, images and speech together
//!
//! - **config**: top-level assistant configuration and credential loading
//! - **state**: the turn state machine
//! - **orchestrator**: the actor that runs conversational turns

pub mod config;
pub mod orchestrator;
pub mod state;

pub use config::AssistantConfig;
pub use orchestrator::{
    Orchestrator, OrchestratorBuilder, OrchestratorCommand, OrchestratorEvent, OrchestratorHandle,
};
pub use state::TurnState;
