//! Poll errors
//!
//! Every variant is non-fatal. The `Display` text is what gets posted back
//! to the channel, so keep it user-facing.

use std::fmt;

/// Result type for poll engine operations
pub type PollResult<T> = Result<T, PollError>;

/// Which command ran into a missing poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    Vote,
    End,
}

impl fmt::Display for PollAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollAction::Vote => f.write_str("vote on"),
            PollAction::End => f.write_str("end"),
        }
    }
}

/// Errors surfaced by the poll engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("Could not create poll: {0}. Usage: !poll <question>,<option1>,<option2>[,...],<durationSeconds>")]
    MalformedCommand(String),

    #[error("No active poll to {0}.")]
    NoActivePoll(PollAction),

    #[error("Invalid option. Please vote for a valid option.")]
    InvalidOption,

    #[error("You have reached the maximum vote limit.")]
    VoteLimitReached,

    #[error("A poll is already running in this channel. End it with !endpoll first.")]
    PollAlreadyActive,
}

impl PollError {
    /// Short machine-readable kind, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            PollError::MalformedCommand(_) => "malformed_command",
            PollError::NoActivePoll(_) => "no_active_poll",
            PollError::InvalidOption => "invalid_option",
            PollError::VoteLimitReached => "vote_limit_reached",
            PollError::PollAlreadyActive => "poll_already_active",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_active_poll_mentions_action() {
        assert_eq!(
            PollError::NoActivePoll(PollAction::Vote).to_string(),
            "No active poll to vote on."
        );
        assert_eq!(
            PollError::NoActivePoll(PollAction::End).to_string(),
            "No active poll to end."
        );
    }

    #[test]
    fn test_malformed_includes_reason_and_usage() {
        let msg = PollError::MalformedCommand("duration must be a whole number".into()).to_string();
        assert!(msg.contains("duration must be a whole number"));
        assert!(msg.contains("Usage: !poll"));
    }

    #[test]
    fn test_kind() {
        assert_eq!(PollError::VoteLimitReached.kind(), "vote_limit_reached");
        assert_eq!(PollError::InvalidOption.kind(), "invalid_option");
    }
}
