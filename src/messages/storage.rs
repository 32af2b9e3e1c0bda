use super::types::{Message, Role};
use parking_lot::RwLock;
use std::sync::Arc;

/// Append-only conversation transcript.
///
/// Cloning yields another view of the same log. Appending is crate-private:
/// only the orchestrator writes, everyone else reads snapshots.
#[derive(Debug, Clone)]
pub struct MessageLog {
    messages: Arc<RwLock<Vec<Message>>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self {
            messages: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub(crate) fn append(&self, message: Message) {
        self.messages.write().push(message);
    }

    /// Ordered copy of every message; iterate it as many times as needed.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.read().clone()
    }

    pub fn last(&self) -> Option<Message> {
        self.messages.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    /// Checks the pairing invariant: each assistant message follows a user
    /// message with no other assistant message in between. A leading greeting
    /// (assistant message at index 0) is exempt.
    pub fn is_well_formed(&self) -> bool {
        let messages = self.messages.read();
        let mut awaiting_reply = false;
        for (index, message) in messages.iter().enumerate() {
            match message.role() {
                Role::User => awaiting_reply = true,
                Role::Assistant if index == 0 => {}
                Role::Assistant => {
                    if !awaiting_reply {
                        return false;
                    }
                    awaiting_reply = false;
                }
            }
        }
        true
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}
