//! Thumbnail storage backends
//!
//! The orchestrator only needs `get` and `set`. No transactional guarantee is
//! assumed: concurrent writers of the same key simply overwrite each other.

use crate::{CacheError, CacheKey};
use async_trait::async_trait;
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ThumbnailCache: Send + Sync {
    /// Stored payload for `key`, if any.
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `payload` under `key`, replacing any previous entry.
    async fn set(&self, key: &CacheKey, payload: Vec<u8>) -> Result<(), CacheError>;
}

/// Process-local cache backed by a concurrent hash map
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, Vec<u8>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key.as_str())
    }
}

#[async_trait]
impl ThumbnailCache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.get(key.as_str()).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &CacheKey, payload: Vec<u8>) -> Result<(), CacheError> {
        self.entries.insert(key.as_str().to_string(), payload);
        Ok(())
    }
}

/// One file per key inside a directory
///
/// Writes go to a temporary file that is renamed into place, so readers
/// never observe a half-written thumbnail.
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{key}.thumb"))
    }
}

#[async_trait]
impl ThumbnailCache for FileCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &CacheKey, payload: Vec<u8>) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.path_for(key);
        let tmp = self
            .dir
            .join(format!("{key}.{}.tmp", uuid::Uuid::new_v4().simple()));

        fs::write(&tmp, &payload).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!("Wrote {} bytes to {}", payload.len(), path.display());
        Ok(())
    }
}
