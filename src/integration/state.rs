//! Turn-taking state shared between the orchestrator and its readers

/// Phase of the current conversational turn. Exactly one holds at a time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TurnState {
    /// Ready for typed input or a capture request
    #[default]
    Idle,
    /// Listening for a single utterance
    Capturing,
    /// Waiting on completion and optional image generation
    Processing,
    /// Reply is being spoken
    Speaking,
}

impl TurnState {
    /// Check if idle
    pub fn is_idle(&self) -> bool {
        matches!(self, TurnState::Idle)
    }

    /// Check if in an active state (not idle)
    pub fn is_busy(&self) -> bool {
        !self.is_idle()
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: TurnState) -> bool {
        use TurnState::*;
        matches!(
            (self, next),
            (Idle, Capturing)
                | (Capturing, Idle)
                | (Idle, Processing)
                | (Processing, Speaking)
                | (Processing, Idle)
                | (Speaking, Idle)
        )
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnState::Idle => write!(f, "Idle"),
            TurnState::Capturing => write!(f, "Capturing"),
            TurnState::Processing => write!(f, "Processing"),
            TurnState::Speaking => write!(f, "Speaking"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert!(TurnState::default().is_idle());
        assert!(TurnState::Speaking.is_busy());
    }

    #[test]
    fn test_legal_transitions() {
        assert!(TurnState::Idle.can_transition_to(TurnState::Capturing));
        assert!(TurnState::Capturing.can_transition_to(TurnState::Idle));
        assert!(TurnState::Processing.can_transition_to(TurnState::Speaking));
        assert!(TurnState::Processing.can_transition_to(TurnState::Idle));
        assert!(TurnState::Speaking.can_transition_to(TurnState::Idle));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!TurnState::Capturing.can_transition_to(TurnState::Processing));
        assert!(!TurnState::Speaking.can_transition_to(TurnState::Processing));
        assert!(!TurnState::Idle.can_transition_to(TurnState::Speaking));
        assert!(!TurnState::Idle.can_transition_to(TurnState::Idle));
    }
}
