use thiserror::Error;

use crate::models::BallotStatus;

/// Everything the ballot engine reports upward. None of these are fatal;
/// the caller renders the message and lets the user retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BallotError {
    #[error("Ballot is full (maximum {max} entries)")]
    CapacityExceeded { max: usize },

    #[error("Item {0} is already on the ballot")]
    DuplicateItem(String),

    #[error("Item {0} is not on the ballot")]
    NotFound(String),

    #[error("Ballot cannot be submitted: {0}")]
    SubmissionRejected(String),

    #[error("Cannot {action} a ballot that is {from}")]
    InvalidTransition {
        from: BallotStatus,
        action: &'static str,
    },

    #[error("Search is unavailable: {0}")]
    SearchUnavailable(String),

    #[error("Ballot storage is unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("Invalid username or PIN")]
    AuthenticationFailed,

    #[error("Log in first")]
    NotAuthenticated,

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BallotError>;

impl From<sqlx::Error> for BallotError {
    fn from(err: sqlx::Error) -> Self {
        BallotError::PersistenceUnavailable(err.to_string())
    }
}

impl From<reqwest::Error> for BallotError {
    fn from(err: reqwest::Error) -> Self {
        BallotError::SearchUnavailable(err.to_string())
    }
}

impl From<std::io::Error> for BallotError {
    fn from(err: std::io::Error) -> Self {
        BallotError::PersistenceUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for BallotError {
    fn from(err: serde_json::Error) -> Self {
        BallotError::PersistenceUnavailable(format!("malformed ballot data: {}", err))
    }
}
