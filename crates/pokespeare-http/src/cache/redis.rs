//! Redis-backed cache store; expiry is delegated to redis via `SET .. EX`.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use redis::AsyncCommands;

use super::{CacheKey, CacheStore, CachedResponse};
use crate::error::{CacheError, CacheResult};

/// Cache shared by every gateway instance pointed at the same redis.
pub struct RedisCacheStore {
    pool: Pool,
    key_prefix: String,
}

impl std::fmt::Debug for RedisCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheStore")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl RedisCacheStore {
    /// Build a pool for `url`; connections are opened lazily.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::RedisPool`] when the URL is rejected.
    pub fn connect(url: &str, namespace: &str) -> CacheResult<Self> {
        let pool = Config::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|source| CacheError::RedisPool { source })?;
        Ok(Self {
            pool,
            key_prefix: format!("{namespace}:"),
        })
    }

    fn make_key(&self, key: &CacheKey) -> String {
        format!("{}{}", self.key_prefix, key.as_str())
    }

    async fn connection(&self) -> CacheResult<Connection> {
        self.pool
            .get()
            .await
            .map_err(|source| CacheError::RedisConnection { source })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CachedResponse>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn
            .get(self.make_key(key))
            .await
            .map_err(|source| CacheError::Redis { source })?;
        raw.map(|raw| {
            serde_json::from_str(&raw).map_err(|source| CacheError::Corrupt {
                key: key.to_string(),
                source,
            })
        })
        .transpose()
    }

    async fn insert(
        &self,
        key: &CacheKey,
        response: CachedResponse,
        ttl: Duration,
    ) -> CacheResult<()> {
        let value =
            serde_json::to_string(&response).map_err(|source| CacheError::Encode { source })?;
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(self.make_key(key), value, ttl.as_secs().max(1))
            .await
            .map_err(|source| CacheError::Redis { source })
    }

    // Redis expires keys itself.
    async fn purge_expired(&self) -> CacheResult<usize> {
        Ok(0)
    }
}
