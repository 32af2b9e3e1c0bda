//! Fixed texts used by the conversation

/// System instruction sent with every completion request
pub const SYSTEM_PROMPT: &str = "You are a helpful AI voice assistant. Provide concise, friendly, and informative responses. Keep your answers clear and conversational since they will be spoken aloud.";

/// Assistant message placed in the log when a session starts
pub const GREETING: &str = "Hello! I'm your AI voice assistant. You can speak to me or type your questions. How can I help you today?";

/// Assistant message appended when the completion service fails
pub const APOLOGY: &str =
    "Sorry, I encountered an error while processing your request. Please try again.";
