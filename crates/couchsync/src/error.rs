//! Error types for push and clone.

use std::path::PathBuf;

use couchsync_store::StoreError;
use couchsync_sync::SyncError;
use thiserror::Error;

/// Errors that can occur during push and clone.
#[derive(Debug, Error)]
pub enum AppError {
    /// Serialization, macro or attachment failure.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The design document to clone does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// No database given and no default configured.
    #[error("no database given and no default env in .couchapprc")]
    NoTarget,

    /// Malformed `.couchapprc`.
    #[error("invalid config {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    /// Filesystem failure.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for push and clone.
pub type Result<T> = std::result::Result<T, AppError>;
