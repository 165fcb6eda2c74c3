//! Sync engine configuration.

use std::time::Duration;

/// Configuration for push and clone behavior.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Retries after a transient attachment upload failure.
    pub upload_retries: u32,
    /// Pause between upload attempts.
    pub retry_backoff: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            upload_retries: 3,
            retry_backoff: Duration::from_millis(400),
        }
    }
}
