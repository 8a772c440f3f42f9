use crate::types::Phase;

pub type GameResult<T> = Result<T, GameError>;

/// Errors surfaced by the round state machine and the participant registry
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("Only the host can do that")]
    NotHost,

    #[error("A round needs 3 to 8 players, found {count}")]
    InvalidPlayerCount { count: usize },

    /// Action arrived outside the phase it belongs to
    #[error("Action not valid during {actual:?} (expected {expected:?})")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("It is not your turn to speak")]
    NotYourTurn,

    #[error("Join the lobby first")]
    UnknownParticipant,

    #[error("Nickname must contain 1 to 8 printable characters")]
    InvalidName,

    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("No words available to start a round")]
    NoWords,
}

impl GameError {
    /// Late or redundant actions lose the race against a phase change and are
    /// dropped without telling the client.
    pub fn is_silent(&self) -> bool {
        matches!(self, GameError::WrongPhase { .. })
    }

    /// Stable machine-readable code sent alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            GameError::NotHost => "NOT_HOST",
            GameError::InvalidPlayerCount { .. } => "INVALID_PLAYER_COUNT",
            GameError::WrongPhase { .. } => "WRONG_PHASE",
            GameError::NotYourTurn => "NOT_YOUR_TURN",
            GameError::UnknownParticipant => "UNKNOWN_PARTICIPANT",
            GameError::InvalidName => "INVALID_NAME",
            GameError::EmptyMessage => "EMPTY_MESSAGE",
            GameError::NoWords => "NO_WORDS",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_wrong_phase_is_silent() {
        let wrong = GameError::WrongPhase {
            expected: Phase::Voting,
            actual: Phase::Result,
        };
        assert!(wrong.is_silent());
        assert!(!GameError::NotHost.is_silent());
        assert!(!GameError::NotYourTurn.is_silent());
        assert!(!GameError::InvalidPlayerCount { count: 2 }.is_silent());
    }

    #[test]
    fn test_player_count_message() {
        let err = GameError::InvalidPlayerCount { count: 9 };
        assert!(err.to_string().contains("found 9"));
    }
}
