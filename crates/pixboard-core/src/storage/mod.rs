//! Storage abstraction for persistence.

mod autosave;
mod cache;
mod file;
mod memory;

pub use autosave::{AutoSaveManager, DEFAULT_AUTOSAVE_INTERVAL_SECS};
pub use cache::{CACHE_KEY, CacheEnvelope, CanvasCache, CanvasPayload, DEFAULT_CACHE_TTL, now_millis};
pub use file::FileStorage;
pub use memory::MemoryStorage;

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Key-value backend for cached canvas records.
///
/// Implementations can keep records in memory or on disk.
pub trait Storage: Send + Sync {
    /// Save a record.
    fn save(&self, key: &str, record: &CacheEnvelope) -> BoxFuture<'_, StorageResult<()>>;

    /// Load a record.
    fn load(&self, key: &str) -> BoxFuture<'_, StorageResult<CacheEnvelope>>;

    /// Delete a record. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// List all keys.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    /// Check if a record exists.
    fn exists(&self, key: &str) -> BoxFuture<'_, StorageResult<bool>>;
}
