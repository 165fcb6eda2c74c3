//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document or attachment does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Revision mismatch on update.
    #[error("revision conflict on {0}")]
    Conflict(String),

    /// Network hiccup worth retrying.
    #[error("transient transport error: {0}")]
    Transient(String),

    /// Server answered with an unexpected status.
    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    /// Malformed database URL.
    #[error("invalid database url: {0}")]
    InvalidUrl(String),

    /// Document serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Document decoding error.
    #[error("invalid document: {0}")]
    Core(#[from] couchsync_core::CoreError),
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
