//! Process-local cache store.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{CacheEntry, CacheKey, CacheStore, CachedResponse};
use crate::error::CacheResult;

/// Cache held in a `RwLock<HashMap>`; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, including stale ones not yet evicted.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CachedResponse>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key.as_str()) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.response.clone())),
                Some(_) => {}
            }
        }
        let mut entries = self.entries.write().await;
        if entries
            .get(key.as_str())
            .is_some_and(CacheEntry::is_expired)
        {
            entries.remove(key.as_str());
        }
        Ok(None)
    }

    async fn insert(
        &self,
        key: &CacheKey,
        response: CachedResponse,
        ttl: Duration,
    ) -> CacheResult<()> {
        self.entries
            .write()
            .await
            .insert(key.as_str().to_string(), CacheEntry::new(response, ttl));
        Ok(())
    }

    async fn purge_expired(&self) -> CacheResult<usize> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;
    use url::Url;

    fn key(path: &str) -> CacheKey {
        let url = Url::parse("http://pokeapi.test/")
            .and_then(|base| base.join(path))
            .unwrap_or_else(|err| panic!("invalid test url: {err}"));
        CacheKey::new(&Method::GET, &url, None)
    }

    fn response(body: &str) -> CachedResponse {
        CachedResponse {
            status: 200,
            body: body.as_bytes().to_vec(),
            content_type: Some("application/json".into()),
        }
    }

    #[tokio::test]
    async fn serves_live_entries() -> CacheResult<()> {
        let store = MemoryCacheStore::new();
        assert!(store.get(&key("haunter")).await?.is_none());

        store
            .insert(&key("haunter"), response("{}"), Duration::from_secs(60))
            .await?;
        assert_eq!(store.get(&key("haunter")).await?, Some(response("{}")));
        assert!(store.get(&key("gengar")).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn expired_entries_are_evicted_on_read() -> CacheResult<()> {
        let store = MemoryCacheStore::new();
        store
            .insert(&key("haunter"), response("{}"), Duration::ZERO)
            .await?;
        assert_eq!(store.len().await, 1);
        assert!(store.get(&key("haunter")).await?.is_none());
        assert!(store.is_empty().await);
        Ok(())
    }

    #[tokio::test]
    async fn purge_drops_only_expired_entries() -> CacheResult<()> {
        let store = MemoryCacheStore::new();
        store
            .insert(&key("stale"), response("1"), Duration::ZERO)
            .await?;
        store
            .insert(&key("fresh"), response("2"), Duration::from_secs(60))
            .await?;
        assert_eq!(store.purge_expired().await?, 1);
        assert_eq!(store.len().await, 1);
        assert!(store.get(&key("fresh")).await?.is_some());
        Ok(())
    }
}
