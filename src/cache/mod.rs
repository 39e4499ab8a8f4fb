//! Persistent key → bytes storage for processed images.
//!
//! The fetcher only needs four operations from a cache; [`DiskCache`] is the
//! file-backed implementation.

pub mod disk;

use async_trait::async_trait;
use thiserror::Error;

pub use disk::DiskCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("no cache entry for key {0}")]
    NotFound(String),

    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image could not be encoded for caching: {0}")]
    Encode(String),
}

/// A key → bytes store. Implementations must be safe for concurrent use.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Reads the bytes stored under `key`. Fails if absent or unreadable.
    async fn read(&self, key: &str) -> Result<Vec<u8>, CacheError>;

    /// Stores `data` under `key`, replacing any previous entry.
    async fn write(&self, data: &[u8], key: &str) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn delete_all(&self) -> Result<(), CacheError>;
}
