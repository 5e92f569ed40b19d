//! The [`HttpClient`] capability and its `reqwest` implementation.
//!
//! # Design
//! - Callers depend on the trait; tests substitute scripted doubles.
//! - Every failure is reclassified into [`TransportError`]: non-2xx statuses and
//!   redirect loops carry a status code, everything else is `Unexpected`.
//! - Cache faults are logged and degrade to a network call; they never fail the
//!   request.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode, redirect};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::cache::{CacheKey, CacheSettings, CacheStore, build_cache_store};
use crate::error::{ClientBuildError, TransportError, TransportResult};
use crate::response::HttpResponse;

/// Outbound HTTP operations used by the gateway.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a GET request.
    async fn get(&self, url: &Url, options: &RequestOptions) -> TransportResult<HttpResponse>;

    /// Issue a POST request with a JSON body.
    async fn post(
        &self,
        url: &Url,
        body: &Value,
        options: &RequestOptions,
    ) -> TransportResult<HttpResponse>;

    /// Resume serving and storing cached responses.
    fn enable_cache(&self);

    /// Bypass the cache until re-enabled; stored entries are kept.
    fn disable_cache(&self);

    /// Whether responses are currently cached.
    fn cache_enabled(&self) -> bool;
}

/// Per-request overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Extra headers sent with the request.
    pub headers: HeaderMap,
    /// Timeout replacing the client-wide one.
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    /// Options with no overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Override the timeout for this request.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Construction parameters for [`ReqwestHttpClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Timeout applied to every request.
    pub timeout: Duration,
    /// Redirects followed before the request fails.
    pub max_redirects: usize,
    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_redirects: 10,
            user_agent: concat!("pokespeare/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

struct ResponseCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    methods: Vec<Method>,
}

/// [`HttpClient`] backed by `reqwest`, with an optional response cache.
pub struct ReqwestHttpClient {
    client: Client,
    cache: Option<ResponseCache>,
    cache_enabled: AtomicBool,
}

impl std::fmt::Debug for ReqwestHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestHttpClient")
            .field("cache_backend", &self.cache_backend())
            .field("cache_enabled", &self.cache_enabled())
            .finish_non_exhaustive()
    }
}

impl ReqwestHttpClient {
    /// Client without a cache.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError::Client`] when reqwest rejects the settings.
    pub fn new(settings: &ClientSettings) -> Result<Self, ClientBuildError> {
        Ok(Self {
            client: build_client(settings)?,
            cache: None,
            cache_enabled: AtomicBool::new(false),
        })
    }

    /// Client caching through the store described by `cache`; caching starts enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] when the client or the store cannot be built.
    pub fn with_cache(
        settings: &ClientSettings,
        cache: &CacheSettings,
    ) -> Result<Self, ClientBuildError> {
        let store =
            build_cache_store(cache).map_err(|source| ClientBuildError::Cache { source })?;
        Self::with_store(settings, store, cache.ttl, cache.allowable_methods.clone())
    }

    /// Client caching through an already opened store; caching starts enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError::Client`] when reqwest rejects the settings.
    pub fn with_store(
        settings: &ClientSettings,
        store: Arc<dyn CacheStore>,
        ttl: Duration,
        methods: Vec<Method>,
    ) -> Result<Self, ClientBuildError> {
        Ok(Self {
            client: build_client(settings)?,
            cache: Some(ResponseCache {
                store,
                ttl,
                methods,
            }),
            cache_enabled: AtomicBool::new(true),
        })
    }

    /// The configured store, for background maintenance.
    #[must_use]
    pub fn cache_store(&self) -> Option<Arc<dyn CacheStore>> {
        self.cache.as_ref().map(|cache| Arc::clone(&cache.store))
    }

    /// Backend label of the configured store, if any.
    #[must_use]
    pub fn cache_backend(&self) -> Option<&'static str> {
        self.cache.as_ref().map(|cache| cache.store.backend())
    }

    fn cache_for(&self, method: &Method) -> Option<&ResponseCache> {
        if !self.cache_enabled.load(Ordering::Relaxed) {
            return None;
        }
        self.cache
            .as_ref()
            .filter(|cache| cache.methods.contains(method))
    }

    async fn execute(
        &self,
        method: Method,
        url: &Url,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> TransportResult<HttpResponse> {
        let cached = self
            .cache_for(&method)
            .map(|cache| (cache, CacheKey::new(&method, url, body)));

        if let Some((cache, key)) = &cached {
            match cache.store.get(key).await {
                Ok(Some(hit)) => {
                    debug!(method = %method, url = %url, "serving response from cache");
                    return Ok(HttpResponse::from_cached(hit));
                }
                Ok(None) => {}
                Err(err) => warn!(
                    error = %err,
                    backend = cache.store.backend(),
                    "cache lookup failed, falling back to upstream"
                ),
            }
        }

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .headers(options.headers.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|err| classify(&method, url, err))?;
        let status = response.status();
        debug!(method = %method, url = %url, status = status.as_u16(), "upstream responded");
        if !status.is_success() {
            return Err(TransportError::Status {
                method,
                url: url.to_string(),
                status,
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|err| classify(&method, url, err))?
            .to_vec();
        let fetched = HttpResponse {
            status,
            body,
            content_type,
            from_cache: false,
        };

        if let Some((cache, key)) = cached
            && let Err(err) = cache
                .store
                .insert(&key, fetched.to_cached(), cache.ttl)
                .await
        {
            warn!(
                error = %err,
                backend = cache.store.backend(),
                "failed to store response in cache"
            );
        }
        Ok(fetched)
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &Url, options: &RequestOptions) -> TransportResult<HttpResponse> {
        self.execute(Method::GET, url, None, options).await
    }

    async fn post(
        &self,
        url: &Url,
        body: &Value,
        options: &RequestOptions,
    ) -> TransportResult<HttpResponse> {
        self.execute(Method::POST, url, Some(body), options).await
    }

    fn enable_cache(&self) {
        if self.cache.is_none() {
            warn!("cache enable requested but no cache store is configured");
            return;
        }
        self.cache_enabled.store(true, Ordering::Relaxed);
    }

    fn disable_cache(&self) {
        self.cache_enabled.store(false, Ordering::Relaxed);
    }

    fn cache_enabled(&self) -> bool {
        self.cache.is_some() && self.cache_enabled.load(Ordering::Relaxed)
    }
}

fn build_client(settings: &ClientSettings) -> Result<Client, ClientBuildError> {
    Client::builder()
        .timeout(settings.timeout)
        .redirect(redirect::Policy::limited(settings.max_redirects))
        .user_agent(settings.user_agent.clone())
        .build()
        .map_err(|source| ClientBuildError::Client { source })
}

fn classify(method: &Method, url: &Url, err: reqwest::Error) -> TransportError {
    if err.is_redirect() {
        return TransportError::Status {
            method: method.clone(),
            url: url.to_string(),
            status: err.status().unwrap_or(StatusCode::LOOP_DETECTED),
        };
    }
    TransportError::unexpected(method.clone(), url.as_str(), err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheBackend, MemoryCacheStore};
    use httpmock::Method::{GET, POST};
    use httpmock::MockServer;
    use serde_json::json;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn url(server: &MockServer, path: &str) -> Result<Url, url::ParseError> {
        Url::parse(&server.url(path))
    }

    fn cached_client(methods: Vec<Method>, ttl: Duration) -> Result<ReqwestHttpClient, ClientBuildError> {
        ReqwestHttpClient::with_store(
            &ClientSettings::default(),
            Arc::new(MemoryCacheStore::new()),
            ttl,
            methods,
        )
    }

    #[tokio::test]
    async fn identical_gets_hit_the_network_once() -> TestResult {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/pokemon-species/haunter");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"name": "haunter"}));
            })
            .await;
        let client = cached_client(vec![Method::GET], Duration::from_secs(60))?;
        let target = url(&server, "/pokemon-species/haunter")?;

        let first = client.get(&target, &RequestOptions::new()).await?;
        let second = client.get(&target, &RequestOptions::new()).await?;

        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(second.json()?["name"], "haunter");
        assert_eq!(second.content_type.as_deref(), Some("application/json"));
        mock.assert_calls_async(1).await;
        Ok(())
    }

    #[tokio::test]
    async fn expired_entries_trigger_a_new_call() -> TestResult {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/haunter");
                then.status(200).json_body(json!({"name": "haunter"}));
            })
            .await;
        let client = cached_client(vec![Method::GET], Duration::from_millis(50))?;
        let target = url(&server, "/haunter")?;

        client.get(&target, &RequestOptions::new()).await?;
        tokio::time::sleep(Duration::from_millis(120)).await;
        let refreshed = client.get(&target, &RequestOptions::new()).await?;

        assert!(!refreshed.from_cache);
        mock.assert_calls_async(2).await;
        Ok(())
    }

    #[tokio::test]
    async fn post_bodies_share_entries_regardless_of_key_order() -> TestResult {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/translate");
                then.status(200).json_body(json!({"contents": {"translated": "Hark"}}));
            })
            .await;
        let client = cached_client(vec![Method::GET, Method::POST], Duration::from_secs(60))?;
        let target = url(&server, "/translate")?;
        let first: Value = serde_json::from_str(r#"{"text":"Hi","lang":"en"}"#)?;
        let second: Value = serde_json::from_str(r#"{"lang":"en","text":"Hi"}"#)?;

        client.post(&target, &first, &RequestOptions::new()).await?;
        let replay = client.post(&target, &second, &RequestOptions::new()).await?;
        assert!(replay.from_cache);

        let other = client
            .post(&target, &json!({"text": "Bye"}), &RequestOptions::new())
            .await?;
        assert!(!other.from_cache);
        mock.assert_calls_async(2).await;
        Ok(())
    }

    #[tokio::test]
    async fn methods_outside_the_allow_list_are_not_cached() -> TestResult {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/translate");
                then.status(200).json_body(json!({}));
            })
            .await;
        let client = ReqwestHttpClient::with_cache(
            &ClientSettings::default(),
            &CacheSettings::default(),
        )?;
        let target = url(&server, "/translate")?;
        let body = json!({"text": "Hi"});

        client.post(&target, &body, &RequestOptions::new()).await?;
        client.post(&target, &body, &RequestOptions::new()).await?;
        mock.assert_calls_async(2).await;
        Ok(())
    }

    #[tokio::test]
    async fn disabling_the_cache_bypasses_it() -> TestResult {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/haunter");
                then.status(200).json_body(json!({}));
            })
            .await;
        let client = cached_client(vec![Method::GET], Duration::from_secs(60))?;
        let target = url(&server, "/haunter")?;
        assert!(client.cache_enabled());

        client.disable_cache();
        assert!(!client.cache_enabled());
        client.get(&target, &RequestOptions::new()).await?;
        client.get(&target, &RequestOptions::new()).await?;
        mock.assert_calls_async(2).await;

        client.enable_cache();
        client.get(&target, &RequestOptions::new()).await?;
        let cached = client.get(&target, &RequestOptions::new()).await?;
        assert!(cached.from_cache);
        mock.assert_calls_async(3).await;
        Ok(())
    }

    #[tokio::test]
    async fn uncached_clients_cannot_enable_caching() -> TestResult {
        let client = ReqwestHttpClient::new(&ClientSettings::default())?;
        client.enable_cache();
        assert!(!client.cache_enabled());
        assert!(client.cache_backend().is_none());
        Ok(())
    }

    #[tokio::test]
    async fn error_statuses_are_not_cached_and_carry_the_code() -> TestResult {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/translate");
                then.status(429).json_body(json!({"error": {"code": 429}}));
            })
            .await;
        let client = cached_client(vec![Method::POST], Duration::from_secs(60))?;
        let target = url(&server, "/translate")?;
        let body = json!({"text": "Hi"});

        for _ in 0..2 {
            let err = client.post(&target, &body, &RequestOptions::new()).await.err();
            assert!(err.as_ref().is_some_and(TransportError::is_rate_limited));
        }
        mock.assert_calls_async(2).await;
        Ok(())
    }

    #[tokio::test]
    async fn not_found_maps_to_status_error() -> TestResult {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missingno");
                then.status(404).body("Not Found");
            })
            .await;
        let client = ReqwestHttpClient::new(&ClientSettings::default())?;
        let err = client
            .get(&url(&server, "/missingno")?, &RequestOptions::new())
            .await
            .err();
        assert_eq!(err.and_then(|e| e.status()), Some(StatusCode::NOT_FOUND));
        Ok(())
    }

    #[tokio::test]
    async fn redirect_loops_map_to_status_error() -> TestResult {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/loop");
                then.status(302).header("location", "/loop");
            })
            .await;
        let client = ReqwestHttpClient::new(&ClientSettings {
            max_redirects: 3,
            ..ClientSettings::default()
        })?;
        let err = client
            .get(&url(&server, "/loop")?, &RequestOptions::new())
            .await
            .err();
        assert!(matches!(err, Some(TransportError::Status { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn timeouts_map_to_unexpected_error() -> TestResult {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/slow");
                then.status(200).delay(Duration::from_millis(500));
            })
            .await;
        let client = ReqwestHttpClient::new(&ClientSettings::default())?;
        let options = RequestOptions::new().with_timeout(Duration::from_millis(50));
        let err = client.get(&url(&server, "/slow")?, &options).await.err();
        assert!(matches!(err, Some(TransportError::Unexpected { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn connection_failures_map_to_unexpected_error() -> TestResult {
        let client = ReqwestHttpClient::new(&ClientSettings::default())?;
        let err = client
            .get(&Url::parse("http://127.0.0.1:1/")?, &RequestOptions::new())
            .await
            .err();
        assert!(matches!(err, Some(TransportError::Unexpected { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn request_headers_are_forwarded() -> TestResult {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/translate")
                    .header("x-funtranslations-api-secret", "s3cret")
                    .json_body(json!({"text": "Hi"}));
                then.status(200).json_body(json!({}));
            })
            .await;
        let client = ReqwestHttpClient::new(&ClientSettings::default())?;
        let options = RequestOptions::new().with_header(
            HeaderName::from_static("x-funtranslations-api-secret"),
            HeaderValue::from_static("s3cret"),
        );
        client
            .post(&url(&server, "/translate")?, &json!({"text": "Hi"}), &options)
            .await?;
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn file_backed_cache_serves_hits() -> TestResult {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/haunter");
                then.status(200).json_body(json!({"name": "haunter"}));
            })
            .await;
        let dir = tempfile::tempdir()?;
        let settings = CacheSettings {
            backend: CacheBackend::File {
                dir: dir.path().to_path_buf(),
            },
            ..CacheSettings::default()
        };
        let client = ReqwestHttpClient::with_cache(&ClientSettings::default(), &settings)?;
        assert_eq!(client.cache_backend(), Some("file"));
        let target = url(&server, "/haunter")?;

        client.get(&target, &RequestOptions::new()).await?;
        assert!(client.get(&target, &RequestOptions::new()).await?.from_cache);
        assert!(dir.path().join("pokespeare_cache").is_dir());
        mock.assert_calls_async(1).await;
        Ok(())
    }
}
