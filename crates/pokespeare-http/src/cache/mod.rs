//! Response cache: keys, stored values, and the pluggable store trait.
//!
//! # Design
//! - Stores are interchangeable behind [`CacheStore`]; the client never knows
//!   which backend it talks to.
//! - Entries are serializable so file and redis stores persist the same shape.
//! - Keys hash the method, URL, and a canonical body fingerprint so identical
//!   POST bodies with reordered keys share an entry.

mod file;
mod memory;
mod sweep;
#[cfg(feature = "redis")]
mod redis;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::CacheResult;

pub use file::FileCacheStore;
pub use memory::MemoryCacheStore;
pub use sweep::spawn_sweeper;
#[cfg(feature = "redis")]
pub use redis::RedisCacheStore;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3_600);

/// Storage backend for cached responses.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend label used in logs and health output.
    fn backend(&self) -> &'static str;

    /// Fetch a live entry; expired entries read as absent.
    async fn get(&self, key: &CacheKey) -> CacheResult<Option<CachedResponse>>;

    /// Store `response` for `ttl`, replacing any previous entry.
    async fn insert(&self, key: &CacheKey, response: CachedResponse, ttl: Duration)
    -> CacheResult<()>;

    /// Evict every expired entry, returning how many were removed.
    async fn purge_expired(&self) -> CacheResult<usize>;
}

/// Response body and metadata as persisted in a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// HTTP status of the original response.
    pub status: u16,
    /// Raw body bytes.
    #[serde(with = "body_base64")]
    pub body: Vec<u8>,
    /// `Content-Type` of the original response.
    pub content_type: Option<String>,
}

/// A cached response with its absolute expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Stored response.
    pub response: CachedResponse,
    /// Instant after which the entry is stale.
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Wrap `response` so it expires `ttl` from now.
    #[must_use]
    pub fn new(response: CachedResponse, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            response,
            expires_at,
        }
    }

    /// Whether the entry is stale at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the entry is stale right now.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Lowercase hex SHA-256 identifying a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for `method url` with an optional JSON body.
    #[must_use]
    pub fn new(method: &Method, url: &Url, body: Option<&Value>) -> Self {
        let fingerprint = body.map(fingerprint).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(method.as_str().as_bytes());
        hasher.update(b"\n");
        hasher.update(url.as_str().as_bytes());
        hasher.update(b"\n");
        hasher.update(fingerprint.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// SHA-256 of the canonical encoding of `body`.
#[must_use]
pub fn fingerprint(body: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(body, &mut canonical);
    format!("{:x}", Sha256::digest(canonical.as_bytes()))
}

// Object keys sorted at every depth, no whitespace.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (index, key) in keys.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                if let Some(child) = map.get(key) {
                    write_canonical(child, out);
                }
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Which store a client should open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    /// In-process map.
    Memory,
    /// One JSON file per entry under `dir/<name>`.
    File {
        /// Parent directory of the cache.
        dir: PathBuf,
    },
    /// Shared redis instance.
    Redis {
        /// Connection string.
        url: String,
    },
}

/// Cache configuration for a client.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Namespace for entries: file sub-directory or redis key prefix.
    pub name: String,
    /// Store to open.
    pub backend: CacheBackend,
    /// Entry lifetime.
    pub ttl: Duration,
    /// Methods whose responses are cached.
    pub allowable_methods: Vec<Method>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            name: "pokespeare_cache".to_string(),
            backend: CacheBackend::Memory,
            ttl: DEFAULT_TTL,
            allowable_methods: vec![Method::GET],
        }
    }
}

/// Open the store described by `settings`.
///
/// # Errors
///
/// Returns a [`CacheError`](crate::error::CacheError) when the store cannot be opened or the backend was
/// not compiled in.
pub fn build_cache_store(settings: &CacheSettings) -> CacheResult<Arc<dyn CacheStore>> {
    match &settings.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryCacheStore::new())),
        CacheBackend::File { dir } => Ok(Arc::new(FileCacheStore::open(
            dir.join(&settings.name),
        )?)),
        #[cfg(feature = "redis")]
        CacheBackend::Redis { url } => Ok(Arc::new(RedisCacheStore::connect(
            url,
            &settings.name,
        )?)),
        #[cfg(not(feature = "redis"))]
        CacheBackend::Redis { .. } => Err(crate::error::CacheError::BackendUnavailable {
            backend: "redis",
        }),
    }
}

mod body_base64 {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}
