//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers produced by `loader.rs`; every value is already validated.
//! - Secrets never serialize, so the effective configuration can be logged.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use url::Url;

/// Complete gateway configuration.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayConfig {
    /// Upstream endpoints and decoding parameters.
    pub upstreams: UpstreamConfig,
    /// Response cache settings.
    pub cache: CacheConfig,
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Log filter and output format.
    pub logging: LoggingSettings,
}

/// Upstream endpoints consumed by the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamConfig {
    /// Base URL the subject name is appended to.
    pub pokemon_api_url: Url,
    /// Translator endpoint receiving `{text}`.
    pub translator_api_url: Url,
    /// Optional translator secret sent as a request header.
    #[serde(skip_serializing)]
    pub translator_api_key: Option<String>,
    /// Language code selected from the description entries.
    pub language: String,
    /// Translation tag the translator must echo back.
    pub translation: String,
    /// Timeout applied to every outbound request.
    pub request_timeout: Duration,
}

/// Storage used by the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// Process-local map.
    Memory,
    /// JSON files under a directory.
    File,
    /// Shared redis instance.
    Redis,
    /// Caching disabled.
    None,
}

impl CacheBackendKind {
    /// Setting value for this backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Redis => "redis",
            Self::None => "none",
        }
    }
}

impl fmt::Display for CacheBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheBackendKind {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" | "filesystem" => Ok(Self::File),
            "redis" => Ok(Self::Redis),
            "none" | "off" | "disabled" => Ok(Self::None),
            _ => Err(()),
        }
    }
}

/// Response cache settings.
#[derive(Debug, Clone, Serialize)]
pub struct CacheConfig {
    /// Namespace for cached entries.
    pub name: String,
    /// Selected storage backend.
    pub backend: CacheBackendKind,
    /// Entry lifetime.
    pub ttl: Duration,
    /// Upper-case HTTP methods eligible for caching.
    pub methods: Vec<String>,
    /// Root directory for the file backend.
    pub dir: PathBuf,
    /// Connection string for the redis backend.
    #[serde(skip_serializing)]
    pub redis_url: String,
}

impl CacheConfig {
    /// Whether any backend is selected.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.backend != CacheBackendKind::None
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: IpAddr,
    /// TCP port to bind.
    pub port: u16,
    /// Tokio worker threads.
    pub workers: usize,
}

impl ServerConfig {
    /// Socket address the listener binds to.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Logging settings passed to the telemetry crate.
#[derive(Debug, Clone, Serialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive.
    pub level: String,
    /// Requested output format (`json` or `pretty`); inferred when absent.
    pub format: Option<String>,
}
