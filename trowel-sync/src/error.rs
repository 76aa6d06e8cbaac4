//! Error types for the sync layer.

use thiserror::Error;
use trowel_store::StorageError;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transient network error. The mutation stays queued and will be
    /// retried on a later drain.
    #[error("network error: {0}")]
    Network(String),

    /// The remote store rejected the payload. Retrying will not help;
    /// the mutation is dead-lettered instead of requeued.
    #[error("payload rejected: {0}")]
    Validation(String),

    /// A remote commit exceeded the configured timeout. Treated exactly
    /// like a network failure.
    #[error("remote commit timed out")]
    Timeout,

    /// Local persistence failure.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Whether a failed commit should be retried on a later drain.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Validation(_))
    }
}
