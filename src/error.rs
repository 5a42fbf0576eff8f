//! Error types for tender-core

use thiserror::Error;

/// Closed error taxonomy for the procurement core.
///
/// Every failure a workflow can produce is one of these variants; the HTTP
/// layer maps them to status codes via [`CoreError::is_client_error`].
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Version {version} not found for {id}")]
    VersionNotFound { id: String, version: i32 },

    #[error("Version {requested} is not earlier than current version {current}")]
    InvalidVersion { requested: i32, current: i32 },

    #[error("Bid {0} already has a decision")]
    AlreadyDecided(String),

    #[error("User {username} already voted on bid {bid_id}")]
    UserAlreadyVoted { bid_id: String, username: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the failure is the caller's fault (4xx) rather than ours (5xx).
    pub fn is_client_error(&self) -> bool {
        !matches!(self, CoreError::Internal(_))
    }
}

impl From<diesel::result::Error> for CoreError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => CoreError::NotFound("row not found".into()),
            other => CoreError::Internal(format!("Database error: {}", other)),
        }
    }
}
