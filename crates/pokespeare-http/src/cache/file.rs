//! Cache store persisting one JSON document per entry.
//!
//! Writes land in a uniquely named temporary file that is renamed over the
//! target, so readers never observe a half-written entry.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tracing::debug;

use super::{CacheEntry, CacheKey, CacheStore, CachedResponse};
use crate::error::{CacheError, CacheResult};

const ENTRY_EXTENSION: &str = "json";

/// Directory-backed cache that survives restarts.
#[derive(Debug)]
pub struct FileCacheStore {
    root: PathBuf,
    writes: AtomicU64,
}

impl FileCacheStore {
    /// Open (creating if needed) a cache rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] when the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> CacheResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| CacheError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self {
            root,
            writes: AtomicU64::new(0),
        })
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.root
            .join(format!("{}.{ENTRY_EXTENSION}", key.as_str()))
    }

    async fn read_entry(path: &Path, key: &str) -> CacheResult<Option<CacheEntry>> {
        let raw = match fs::read(path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|source| CacheError::Corrupt {
                key: key.to_string(),
                source,
            })
    }

    async fn remove_path(path: &Path) -> CacheResult<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CacheError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CachedResponse>> {
        let path = self.entry_path(key);
        match Self::read_entry(&path, key.as_str()).await? {
            Some(entry) if entry.is_expired() => {
                Self::remove_path(&path).await?;
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.response)),
            None => Ok(None),
        }
    }

    async fn insert(
        &self,
        key: &CacheKey,
        response: CachedResponse,
        ttl: Duration,
    ) -> CacheResult<()> {
        let encoded = serde_json::to_vec(&CacheEntry::new(response, ttl))
            .map_err(|source| CacheError::Encode { source })?;
        let path = self.entry_path(key);
        let sequence = self.writes.fetch_add(1, Ordering::Relaxed);
        let staging = self.root.join(format!(
            ".{}.{}-{sequence}.tmp",
            key.as_str(),
            std::process::id()
        ));
        fs::write(&staging, encoded)
            .await
            .map_err(|source| CacheError::Io {
                path: staging.clone(),
                source,
            })?;
        if let Err(source) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(CacheError::Io { path, source });
        }
        Ok(())
    }

    async fn purge_expired(&self) -> CacheResult<usize> {
        let now = Utc::now();
        let mut dir = fs::read_dir(&self.root)
            .await
            .map_err(|source| CacheError::Io {
                path: self.root.clone(),
                source,
            })?;
        let mut removed = 0;
        loop {
            let next = dir.next_entry().await.map_err(|source| CacheError::Io {
                path: self.root.clone(),
                source,
            })?;
            let Some(item) = next else { break };
            let path = item.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default()
                .to_string();
            let stale = match Self::read_entry(&path, &name).await {
                Ok(Some(entry)) => entry.is_expired_at(now),
                Ok(None) => false,
                Err(err) => {
                    debug!(error = %err, key = %name, "dropping unreadable cache entry");
                    true
                }
            };
            if stale {
                Self::remove_path(&path).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
