//! Storage trait abstraction.

use async_trait::async_trait;

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key cannot be stored by this backend
    #[error("Invalid key: {0:?}")]
    InvalidKey(String),

    /// Write would exceed the backend's capacity
    #[error("Quota exceeded writing {key}: {needed} bytes needed, quota is {quota}")]
    QuotaExceeded {
        /// Key being written
        key: String,
        /// Total bytes the write would occupy
        needed: usize,
        /// Configured quota in bytes
        quota: usize,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// String key-value storage backend.
///
/// Mirrors what a browser's local storage offers: whole string values under
/// string keys, no partial updates.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&mut self, key: &str) -> Result<()>;
}
