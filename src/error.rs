use std::fmt;

use thiserror::Error;

/// Why a session token was refused. Never carries token contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFault {
    Malformed,
    Tampered,
    Expired,
    BudgetMismatch,
    AlreadyUsed,
}

impl fmt::Display for SessionFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Malformed => "malformed",
            Self::Tampered => "failed authentication",
            Self::Expired => "expired",
            Self::BudgetMismatch => "issued for a different budget",
            Self::AlreadyUsed => "already used",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Language model unavailable")]
    GatewayUnavailable,

    #[error("Language model returned an unusable response")]
    MalformedResponse,

    #[error("Invalid transcript: {0}")]
    InvalidTranscript(String),

    #[error("Session invalid: {0}")]
    SessionInvalid(SessionFault),

    #[error("Invalid answer: {0}")]
    AnswerInvalid(String),

    #[error("Commit failed: {0}")]
    CommitFailure(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown budget: {0}")]
    UnknownBudget(i64),

    #[error("No active budget. Run `tally budget use <id>` first.")]
    NoActiveBudget,

    #[error("AI features are not enabled. Run `tally ai on` first.")]
    AiDisabled,

    #[error("Settings error: {0}")]
    Settings(String),
}

impl TallyError {
    /// Text that is safe to show the person who spoke the transcript.
    pub fn user_message(&self) -> String {
        match self {
            Self::GatewayUnavailable | Self::MalformedResponse => {
                "Could not process that right now. Please try again.".to_string()
            }
            Self::InvalidTranscript(reason) => {
                format!("Couldn't understand that: {reason}")
            }
            Self::SessionInvalid(SessionFault::Expired) => {
                "Session expired. Please try again.".to_string()
            }
            Self::SessionInvalid(fault) => {
                format!("Session is no longer valid ({fault}). Please start over.")
            }
            Self::AnswerInvalid(reason) => format!("Invalid answer: {reason}"),
            Self::CommitFailure(_) | Self::Db(_) => {
                "Saving the transactions failed. Nothing was recorded.".to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TallyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_and_malformed_share_generic_message() {
        assert_eq!(
            TallyError::GatewayUnavailable.user_message(),
            TallyError::MalformedResponse.user_message()
        );
    }

    #[test]
    fn test_commit_failure_hides_detail() {
        let msg = TallyError::CommitFailure("UNIQUE constraint failed".into()).user_message();
        assert!(!msg.contains("UNIQUE"));
    }

    #[test]
    fn test_expired_session_message() {
        let msg = TallyError::SessionInvalid(SessionFault::Expired).user_message();
        assert_eq!(msg, "Session expired. Please try again.");
    }
}
