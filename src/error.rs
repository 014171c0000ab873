//! Error types for braid.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BraidError>;

/// Errors surfaced by braid.
///
/// Only setup-time problems (loading an index, invalid configuration) and
/// programming errors are reported this way. Failures of individual search
/// tasks are recorded in a [`SearchBatchResult`](crate::SearchBatchResult)
/// instead of being returned as errors.
#[derive(Error, Debug)]
pub enum BraidError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The lexical index is missing or structurally invalid.
    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The executor was shut down and no longer accepts work.
    #[error("Search executor has been shut down")]
    ExecutorShutdown,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BraidError {
    pub fn invalid_index(msg: impl Into<String>) -> Self {
        BraidError::InvalidIndex(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        BraidError::InvalidArgument(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        BraidError::InvalidConfig(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        BraidError::Internal(msg.into())
    }
}
