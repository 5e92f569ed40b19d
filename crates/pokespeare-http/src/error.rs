//! Error types for outbound requests and cache stores.

use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;

use reqwest::{Method, StatusCode};
use thiserror::Error;

/// Result alias for outbound requests.
pub type TransportResult<T> = Result<T, TransportError>;
/// Result alias for cache store operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// The two failure kinds an outbound request can produce.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Upstream answered with a non-success status, or redirected too often.
    #[error("upstream responded with status {status}")]
    Status {
        /// Request method.
        method: Method,
        /// Request URL.
        url: String,
        /// Status reported by the upstream.
        status: StatusCode,
    },
    /// Any other failure: DNS, connect, timeout, body read, encoding.
    #[error("unexpected error calling upstream")]
    Unexpected {
        /// Request method.
        method: Method,
        /// Request URL.
        url: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl TransportError {
    /// Status code carried by a [`TransportError::Status`].
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Unexpected { .. } => None,
        }
    }

    /// Whether the upstream throttled the request.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(StatusCode::TOO_MANY_REQUESTS)
    }

    pub(crate) fn unexpected(
        method: Method,
        url: &str,
        source: impl Into<Box<dyn StdError + Send + Sync>>,
    ) -> Self {
        Self::Unexpected {
            method,
            url: url.to_string(),
            source: source.into(),
        }
    }
}

/// Errors raised while constructing a client.
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// The reqwest client could not be built.
    #[error("failed to build http client")]
    Client {
        /// Underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The cache store could not be opened.
    #[error("failed to open response cache")]
    Cache {
        /// Underlying cache error.
        #[source]
        source: CacheError,
    },
}

/// Failures inside a cache store. Callers log these and fall back to the network.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem access failed.
    #[error("cache io failed")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// An entry could not be serialized.
    #[error("cache entry could not be encoded")]
    Encode {
        /// Underlying serializer error.
        #[source]
        source: serde_json::Error,
    },
    /// A stored entry could not be decoded.
    #[error("cache entry is corrupt")]
    Corrupt {
        /// Key of the corrupt entry.
        key: String,
        /// Underlying deserializer error.
        #[source]
        source: serde_json::Error,
    },
    /// The selected backend was not compiled in.
    #[error("cache backend is not available in this build")]
    BackendUnavailable {
        /// Backend that was requested.
        backend: &'static str,
    },
    /// Creating the redis pool failed.
    #[cfg(feature = "redis")]
    #[error("failed to create redis pool")]
    RedisPool {
        /// Underlying pool error.
        #[source]
        source: deadpool_redis::CreatePoolError,
    },
    /// Checking out a redis connection failed.
    #[cfg(feature = "redis")]
    #[error("failed to acquire redis connection")]
    RedisConnection {
        /// Underlying pool error.
        #[source]
        source: deadpool_redis::PoolError,
    },
    /// A redis command failed.
    #[cfg(feature = "redis")]
    #[error("redis command failed")]
    Redis {
        /// Underlying redis error.
        #[source]
        source: redis::RedisError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_expose_code() {
        let err = TransportError::Status {
            method: Method::POST,
            url: "http://translator.test/".into(),
            status: StatusCode::TOO_MANY_REQUESTS,
        };
        assert!(err.is_rate_limited());
        assert_eq!(err.status(), Some(StatusCode::TOO_MANY_REQUESTS));
        assert_eq!(
            err.to_string(),
            "upstream responded with status 429 Too Many Requests"
        );
    }

    #[test]
    fn unexpected_errors_have_no_status() {
        let err = TransportError::unexpected(
            Method::GET,
            "http://pokeapi.test/",
            io::Error::other("connection reset"),
        );
        assert!(err.status().is_none());
        assert!(!err.is_rate_limited());
        assert!(StdError::source(&err).is_some());
    }
}
