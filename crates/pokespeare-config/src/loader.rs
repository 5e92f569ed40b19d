//! Environment-backed configuration loading.
//!
//! # Design
//! - Reads through the [`EnvSource`] seam so tests never mutate the process environment.
//! - Every setting has a `POKESPEARE_` name; a few also accept their legacy
//!   unprefixed name, consulted only when the prefixed one is absent.

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};
use crate::model::{CacheConfig, GatewayConfig, LoggingSettings, ServerConfig, UpstreamConfig};
use crate::validate::{
    parse_backend, parse_host, parse_log_format, parse_methods, parse_non_empty, parse_port,
    parse_positive_u64, parse_url,
};

/// Source of raw configuration values.
pub trait EnvSource {
    /// Look up a variable; `None` when unset.
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl<S: BuildHasher> EnvSource for HashMap<String, String, S> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Load and validate configuration from the process environment.
///
/// # Errors
///
/// Returns the first setting that fails validation.
pub fn load_from_env() -> ConfigResult<GatewayConfig> {
    load_from(&ProcessEnv)
}

/// Load and validate configuration from an arbitrary source.
///
/// # Errors
///
/// Returns the first setting that fails validation.
pub fn load_from(env: &impl EnvSource) -> ConfigResult<GatewayConfig> {
    let upstreams = UpstreamConfig {
        pokemon_api_url: setting(
            env,
            &["POKESPEARE_POKEMON_API_URL", "POKEMON_API_URL"],
            defaults::POKEMON_API_URL,
            parse_url,
        )?,
        translator_api_url: setting(
            env,
            &["POKESPEARE_TRANSLATOR_API_URL", "TRANSLATOR_API_URL"],
            defaults::TRANSLATOR_API_URL,
            parse_url,
        )?,
        translator_api_key: lookup(env, &["POKESPEARE_TRANSLATOR_API_KEY", "TRANSLATOR_API_KEY"])
            .map(|(_, value)| value),
        language: setting(env, &["POKESPEARE_LANGUAGE"], defaults::LANGUAGE, parse_non_empty)?,
        translation: setting(
            env,
            &["POKESPEARE_TRANSLATION"],
            defaults::TRANSLATION,
            parse_non_empty,
        )?,
        request_timeout: Duration::from_millis(setting(
            env,
            &["POKESPEARE_REQUEST_TIMEOUT_MS"],
            &defaults::REQUEST_TIMEOUT_MS.to_string(),
            parse_positive_u64,
        )?),
    };

    let cache = CacheConfig {
        name: setting(
            env,
            &["POKESPEARE_CACHE_NAME", "CACHE_NAME"],
            defaults::CACHE_NAME,
            parse_non_empty,
        )?,
        backend: setting(
            env,
            &["POKESPEARE_CACHE_BACKEND", "CACHE_BACKEND"],
            defaults::CACHE_BACKEND,
            parse_backend,
        )?,
        ttl: Duration::from_secs(setting(
            env,
            &["POKESPEARE_CACHE_EXPIRATION", "CACHE_EXPIRATION"],
            &defaults::CACHE_EXPIRATION_SECS.to_string(),
            parse_positive_u64,
        )?),
        methods: setting(
            env,
            &["POKESPEARE_CACHE_METHODS"],
            &defaults::CACHE_METHODS.join(","),
            parse_methods,
        )?,
        dir: PathBuf::from(setting(
            env,
            &["POKESPEARE_CACHE_DIR"],
            defaults::CACHE_DIR,
            parse_non_empty,
        )?),
        redis_url: setting(
            env,
            &["POKESPEARE_REDIS_URL"],
            defaults::REDIS_URL,
            parse_non_empty,
        )?,
    };

    let workers = match lookup(env, &["POKESPEARE_WORKERS"]) {
        Some((field, raw)) => usize::try_from(parse_positive_u64(field, &raw)?)
            .map_err(|_| ConfigError::invalid(field, &raw, "is too large"))?,
        None => defaults::workers(),
    };
    let server = ServerConfig {
        host: setting(env, &["POKESPEARE_HOST"], defaults::HOST, parse_host)?,
        port: setting(
            env,
            &["POKESPEARE_PORT"],
            &defaults::PORT.to_string(),
            parse_port,
        )?,
        workers,
    };

    let logging = LoggingSettings {
        level: lookup(env, &["RUST_LOG"])
            .map_or_else(|| defaults::LOG_LEVEL.to_string(), |(_, value)| value),
        format: lookup(env, &["POKESPEARE_LOG_FORMAT"])
            .map(|(field, raw)| parse_log_format(field, &raw))
            .transpose()?,
    };

    let config = GatewayConfig {
        upstreams,
        cache,
        server,
        logging,
    };
    debug!(
        backend = %config.cache.backend,
        bind = %config.server.bind_addr(),
        "configuration loaded"
    );
    Ok(config)
}

/// First non-blank value among `names`, paired with the name that supplied it.
fn lookup(env: &impl EnvSource, names: &[&'static str]) -> Option<(&'static str, String)> {
    names.iter().find_map(|name| {
        env.var(name)
            .filter(|value| !value.trim().is_empty())
            .map(|value| (*name, value))
    })
}

fn setting<T>(
    env: &impl EnvSource,
    names: &[&'static str],
    default: &str,
    parse: impl Fn(&'static str, &str) -> ConfigResult<T>,
) -> ConfigResult<T> {
    match lookup(env, names) {
        Some((field, raw)) => parse(field, &raw),
        None => parse(names[0], default),
    }
}
