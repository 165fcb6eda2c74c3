//! Error types for the sync engine.
//!
//! Only conditions that must abort an operation are errors. Recoverable
//! per-file conditions are [`Warning`](crate::report::Warning)s.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal failures of the macro preprocessor.
#[derive(Debug, Error)]
pub enum MacroError {
    /// A `!code` or `!json` pattern matched no file.
    #[error("no file matching '{pattern}' (in function '{function}')")]
    GlobNoMatch { pattern: String, function: String },

    /// A pattern is not valid glob syntax.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A matched file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The design document does not exist.
    #[error("document not found: {0}")]
    NotFound(String),

    /// Macro expansion failed.
    #[error("macro error: {0}")]
    Macro(#[from] MacroError),

    /// Filesystem failure outside the recoverable per-file cases.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Core type failure.
    #[error("core error: {0}")]
    Core(#[from] couchsync_core::CoreError),

    /// Store operation failed.
    #[error("store error: {0}")]
    Store(#[from] couchsync_store::StoreError),

    /// JSON encoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
