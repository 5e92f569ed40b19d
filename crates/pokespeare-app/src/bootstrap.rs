//! Service wiring: configuration in, running gateway out.

use std::sync::Arc;

use pokespeare_api::{ApiServer, ApiState, ServiceConfig, TranslationService};
use pokespeare_config::{CacheBackendKind, CacheConfig, GatewayConfig};
use pokespeare_http::{
    CacheBackend, CacheSettings, ClientSettings, HttpClient, Method, ReqwestHttpClient,
    spawn_sweeper,
};
use pokespeare_telemetry::{GlobalContextGuard, LogFormat, LoggingConfig, Metrics};
use tracing::{error, info};

use crate::error::{AppError, AppResult};

/// Entry point for the gateway boot sequence.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the server fails to start.
pub fn run_app() -> AppResult<()> {
    let config =
        pokespeare_config::load_from_env().map_err(|err| AppError::config("config.load", err))?;
    run_with(&config)
}

/// Install logging, start a runtime sized to `config.server.workers`, and
/// serve until shutdown.
///
/// # Errors
///
/// Returns an error if any dependency cannot be constructed or serving fails.
pub fn run_with(config: &GatewayConfig) -> AppResult<()> {
    let logging = LoggingConfig {
        level: &config.logging.level,
        format: LogFormat::from_setting(config.logging.format.as_deref()),
        ..LoggingConfig::default()
    };
    pokespeare_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new("serve");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers)
        .enable_all()
        .build()
        .map_err(|source| AppError::Runtime { source })?;

    info!(
        addr = %config.server.bind_addr(),
        workers = config.server.workers,
        cache = config.cache.backend.as_str(),
        "pokespeare bootstrap starting"
    );

    let result = runtime.block_on(async {
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
        let client = build_client(config)?;
        let sweeper = client
            .cache_store()
            .map(|store| spawn_sweeper(store, config.cache.ttl));
        let server = build_server(config, client, telemetry)?;
        let served = server
            .serve(config.server.bind_addr())
            .await
            .map_err(|err| AppError::api_server("api_server.serve", err));
        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }
        served
    });
    if let Err(err) = &result {
        error!(error = %err, "pokespeare terminated");
    }
    result
}

/// Build the upstream client, with the cache described by `config.cache`.
///
/// # Errors
///
/// Returns an error if the cache store or the client cannot be built.
pub fn build_client(config: &GatewayConfig) -> AppResult<ReqwestHttpClient> {
    let client_settings = ClientSettings {
        timeout: config.upstreams.request_timeout,
        ..ClientSettings::default()
    };
    match cache_settings(&config.cache)? {
        Some(cache) => ReqwestHttpClient::with_cache(&client_settings, &cache)
            .map_err(|err| AppError::client("http_client.with_cache", err)),
        None => ReqwestHttpClient::new(&client_settings)
            .map_err(|err| AppError::client("http_client.new", err)),
    }
}

/// Assemble the lookup service and router around `client`.
///
/// # Errors
///
/// Returns an error if the service rejects the upstream settings.
pub fn build_server(
    config: &GatewayConfig,
    client: ReqwestHttpClient,
    telemetry: Metrics,
) -> AppResult<ApiServer> {
    let cache_backend = client.cache_backend().unwrap_or("none");
    let client: Arc<dyn HttpClient> = Arc::new(client);

    let upstreams = &config.upstreams;
    let service_config = ServiceConfig {
        pokemon_api_url: upstreams.pokemon_api_url.clone(),
        translator_api_url: upstreams.translator_api_url.clone(),
        translator_api_key: upstreams.translator_api_key.clone(),
        language: upstreams.language.clone(),
        translation: upstreams.translation.clone(),
    };
    let service = TranslationService::new(client, service_config, telemetry.clone())
        .map_err(|err| AppError::service("translation_service.new", err))?;

    Ok(ApiServer::new(ApiState::new(
        service,
        telemetry,
        cache_backend,
    )))
}

/// Translate cache configuration into client cache settings; `None` disables
/// caching.
///
/// # Errors
///
/// Returns [`AppError::CacheMethod`] when a configured method is not a valid
/// HTTP method.
pub fn cache_settings(cache: &CacheConfig) -> AppResult<Option<CacheSettings>> {
    let backend = match cache.backend {
        CacheBackendKind::None => return Ok(None),
        CacheBackendKind::Memory => CacheBackend::Memory,
        CacheBackendKind::File => CacheBackend::File {
            dir: cache.dir.clone(),
        },
        CacheBackendKind::Redis => CacheBackend::Redis {
            url: cache.redis_url.clone(),
        },
    };
    let allowable_methods = cache
        .methods
        .iter()
        .map(|value| {
            Method::from_bytes(value.as_bytes()).map_err(|_| AppError::CacheMethod {
                value: value.clone(),
            })
        })
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Some(CacheSettings {
        name: cache.name.clone(),
        backend,
        ttl: cache.ttl,
        allowable_methods,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> anyhow::Result<GatewayConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        Ok(pokespeare_config::load_from(&env)?)
    }

    #[test]
    fn default_cache_maps_to_memory_with_both_methods() -> anyhow::Result<()> {
        let settings = cache_settings(&config(&[])?.cache)?;
        let settings = settings.ok_or_else(|| anyhow::anyhow!("cache should be enabled"))?;
        assert_eq!(settings.backend, CacheBackend::Memory);
        assert_eq!(settings.allowable_methods, vec![Method::GET, Method::POST]);
        Ok(())
    }

    #[test]
    fn disabled_cache_maps_to_none() -> anyhow::Result<()> {
        let config = config(&[("POKESPEARE_CACHE_BACKEND", "none")])?;
        assert!(cache_settings(&config.cache)?.is_none());
        assert!(build_client(&config)?.cache_store().is_none());
        Ok(())
    }

    #[test]
    fn file_cache_keeps_directory() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().to_string_lossy().into_owned();
        let config = config(&[
            ("POKESPEARE_CACHE_BACKEND", "file"),
            ("POKESPEARE_CACHE_DIR", &path),
        ])?;
        let settings = cache_settings(&config.cache)?;
        assert_eq!(
            settings.map(|s| s.backend),
            Some(CacheBackend::File {
                dir: dir.path().to_path_buf()
            })
        );
        Ok(())
    }

    #[test]
    fn server_reports_the_cache_backend() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().to_string_lossy().into_owned();
        let config = config(&[
            ("POKESPEARE_CACHE_BACKEND", "file"),
            ("POKESPEARE_CACHE_DIR", &path),
            ("POKESPEARE_TRANSLATOR_API_KEY", "s3cret"),
        ])?;
        let client = build_client(&config)?;
        assert_eq!(client.cache_backend(), Some("file"));
        assert!(client.cache_store().is_some());
        build_server(&config, client, Metrics::new()?)?;
        assert!(dir.path().join(&config.cache.name).is_dir());
        Ok(())
    }

    #[test]
    fn unusable_secrets_fail_service_construction() -> anyhow::Result<()> {
        let config = config(&[("POKESPEARE_TRANSLATOR_API_KEY", "bad\u{7f}key")])?;
        let err = build_server(&config, build_client(&config)?, Metrics::new()?).err();
        assert!(matches!(err, Some(AppError::Service { .. })));
        Ok(())
    }
}
