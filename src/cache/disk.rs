//! File-per-key cache rooted at a directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use super::{Cache, CacheError};

/// Stores each entry as one file named after its key.
///
/// Keys produced by [`ImageRequest::key`](crate::ImageRequest::key) are hex
/// digests and therefore safe file names. Writes land in a temporary file
/// first and are renamed into place, so readers never see a partial entry.
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    /// Opens (creating if needed) a cache rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file an entry for `key` lives in.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl Cache for DiskCache {
    async fn read(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        match tokio::fs::read(self.path(key)).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(CacheError::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, data: &[u8], key: &str) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let staging = self.root.join(format!(".{key}.{}.tmp", Uuid::new_v4().simple()));
        if let Err(e) = tokio::fs::write(&staging, data).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&staging, self.path(key)).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        match tokio::fs::remove_file(self.path(key)).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    async fn delete_all(&self) -> Result<(), CacheError> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        tokio::fs::create_dir_all(&self.root).await?;
        log::debug!("cleared image cache at {}", self.root.display());
        Ok(())
    }
}
