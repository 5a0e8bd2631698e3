//! Persistence medium trait
//!
//! This module defines the StateMedium trait that all persistence backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use thiserror::Error;
use trellis_core::AppError;

/// Storage operation errors
///
/// Every variant is a storage fault: callers decide whether to retry, fall back or
/// propagate. The store never retries on its own.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Listing failed: {0}")]
    ListFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConfigError(msg) => AppError::Configuration(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Durable key to serialized-JSON mapping
///
/// Keys passed here are already namespaced by [`crate::StateDb`]; a medium knows nothing
/// about namespaces. Implementations must replace a single key atomically (a reader sees
/// either the old or the new value, never a mix) and must return consistent values after
/// a crash.
#[async_trait]
pub trait StateMedium: Send + Sync {
    /// Read the raw value for a key, `None` if it was never written or was deleted.
    async fn read(&self, key: &str) -> StorageResult<Option<String>>;

    /// Replace the value for a key.
    async fn write(&self, key: &str, value: String) -> StorageResult<()>;

    /// Delete a key. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// All keys starting with `prefix`, in any order.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
