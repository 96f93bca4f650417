//! Storage error model.

use thiserror::Error;

/// Result type used by [`crate::KeyValueStore`] implementations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failure while talking to the durable key-value store.
///
/// None of these are fatal to the shell: callers log them and carry on with
/// in-memory state.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backing document could not be encoded or decoded.
    #[error("storage document is not valid json: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The host refused access (no storage, quota, privacy mode, lock poisoned).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}
