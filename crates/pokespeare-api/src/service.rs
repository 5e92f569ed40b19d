//! Lookup orchestration: species description in, translated description out.
//!
//! # Design
//! - The two upstream calls run strictly in sequence; the second depends on the
//!   first's decoded output. No retries, no partial results.
//! - Every failure is folded into [`LookupError`] so the HTTP layer maps one
//!   type onto status codes.
//! - Any upstream `429` becomes [`LookupError::RateLimited`] before the generic
//!   status mapping is consulted.

use std::fmt;
use std::sync::Arc;

use pokespeare_http::header::{HeaderName, HeaderValue, InvalidHeaderValue};
use pokespeare_http::{HttpClient, HttpResponse, RequestOptions, StatusCode, TransportError, Url};
use pokespeare_models::{
    DEFAULT_LANGUAGE, DEFAULT_TRANSLATION, PayloadError, Subject, TranslatedText, decode_subject,
    decode_translation, parse_body,
};
use pokespeare_telemetry::{
    CacheLookup, Metrics, RequestContext, UpstreamOutcome, current_request,
};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Header carrying the optional translator secret.
pub const TRANSLATOR_SECRET_HEADER: &str = "x-funtranslations-api-secret";

/// Upstream services the orchestrator calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    /// Species data source.
    Species,
    /// Text translator.
    Translator,
}

impl Upstream {
    /// Label used in logs, metrics, and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Species => "pokeapi",
            Self::Translator => "translator",
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a lookup failed.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Upstream answered with a non-success status.
    #[error("{upstream} responded with status {status}")]
    TransportStatus {
        /// Failing upstream.
        upstream: Upstream,
        /// Reported status.
        status: StatusCode,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
    /// Upstream throttled the request.
    #[error("too many requests to {upstream}, try again later")]
    RateLimited {
        /// Failing upstream.
        upstream: Upstream,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
    /// Upstream could not be reached or the exchange failed mid-way.
    #[error("unexpected error contacting {upstream}")]
    UnexpectedTransport {
        /// Failing upstream.
        upstream: Upstream,
        /// Transport failure.
        #[source]
        source: TransportError,
    },
    /// The name cannot address a single subject, so no upstream was called.
    #[error("'{name}' is not a valid name")]
    InvalidName {
        /// Rejected name.
        name: String,
    },
    /// Upstream payload did not have the expected shape.
    #[error("{source}")]
    MalformedPayload {
        /// Failing upstream.
        upstream: Upstream,
        /// Decode failure.
        #[source]
        source: PayloadError,
    },
}

impl LookupError {
    fn from_transport(upstream: Upstream, source: TransportError) -> Self {
        if source.is_rate_limited() {
            return Self::RateLimited { upstream, source };
        }
        match source.status() {
            Some(status) => Self::TransportStatus {
                upstream,
                status,
                source,
            },
            None => Self::UnexpectedTransport { upstream, source },
        }
    }

    /// Upstream that caused the failure; `None` when no call was made.
    #[must_use]
    pub const fn upstream(&self) -> Option<Upstream> {
        match self {
            Self::TransportStatus { upstream, .. }
            | Self::RateLimited { upstream, .. }
            | Self::UnexpectedTransport { upstream, .. }
            | Self::MalformedPayload { upstream, .. } => Some(*upstream),
            Self::InvalidName { .. } => None,
        }
    }

    /// Metrics label for the failure; `None` when no call was made.
    #[must_use]
    pub const fn outcome(&self) -> Option<UpstreamOutcome> {
        match self {
            Self::TransportStatus { .. } => Some(UpstreamOutcome::Status),
            Self::RateLimited { .. } => Some(UpstreamOutcome::RateLimited),
            Self::UnexpectedTransport { .. } => Some(UpstreamOutcome::Unexpected),
            Self::MalformedPayload { .. } => Some(UpstreamOutcome::Malformed),
            Self::InvalidName { .. } => None,
        }
    }

    /// Whether the failure should surface to clients as `429`.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Invalid orchestrator settings.
#[derive(Debug, Error)]
pub enum ServiceBuildError {
    /// The species URL cannot have path segments appended.
    #[error("species url cannot be used as a base")]
    InvalidBaseUrl {
        /// Offending URL.
        url: String,
    },
    /// The translator secret is not a valid header value.
    #[error("translator api key is not a valid header value")]
    InvalidApiKey {
        /// Underlying header error.
        #[source]
        source: InvalidHeaderValue,
    },
}

/// Upstream endpoints and decoding parameters.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL the subject name is appended to.
    pub pokemon_api_url: Url,
    /// Translator endpoint.
    pub translator_api_url: Url,
    /// Optional translator secret.
    pub translator_api_key: Option<String>,
    /// Language code selected from the description entries.
    pub language: String,
    /// Translation tag the translator must echo back.
    pub translation: String,
}

impl ServiceConfig {
    /// Settings with English descriptions and the `shakespeare` translation.
    #[must_use]
    pub fn new(pokemon_api_url: Url, translator_api_url: Url) -> Self {
        Self {
            pokemon_api_url,
            translator_api_url,
            translator_api_key: None,
            language: DEFAULT_LANGUAGE.to_string(),
            translation: DEFAULT_TRANSLATION.to_string(),
        }
    }

    /// Send `key` with every translator request.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.translator_api_key = Some(key.into());
        self
    }
}

/// Orchestrates the species lookup and the translation.
pub struct TranslationService {
    client: Arc<dyn HttpClient>,
    config: ServiceConfig,
    translator_options: RequestOptions,
    telemetry: Metrics,
}

impl fmt::Debug for TranslationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationService")
            .field("pokemon_api_url", &self.config.pokemon_api_url.as_str())
            .field("translator_api_url", &self.config.translator_api_url.as_str())
            .field("language", &self.config.language)
            .field("translation", &self.config.translation)
            .finish_non_exhaustive()
    }
}

impl TranslationService {
    /// Build the orchestrator around an injected client.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceBuildError`] when the species URL cannot take path
    /// segments or the secret is not a valid header value.
    pub fn new(
        client: Arc<dyn HttpClient>,
        config: ServiceConfig,
        telemetry: Metrics,
    ) -> Result<Self, ServiceBuildError> {
        if config.pokemon_api_url.cannot_be_a_base() {
            return Err(ServiceBuildError::InvalidBaseUrl {
                url: config.pokemon_api_url.to_string(),
            });
        }
        let mut translator_options = RequestOptions::new();
        if let Some(key) = &config.translator_api_key {
            let mut value = HeaderValue::from_str(key)
                .map_err(|source| ServiceBuildError::InvalidApiKey { source })?;
            value.set_sensitive(true);
            translator_options = translator_options
                .with_header(HeaderName::from_static(TRANSLATOR_SECRET_HEADER), value);
        }
        Ok(Self {
            client,
            config,
            translator_options,
            telemetry,
        })
    }

    /// Fetch `name`'s description and return it translated.
    ///
    /// # Errors
    ///
    /// Returns a [`LookupError`] describing the first failing step.
    #[instrument(name = "lookup.describe", skip(self))]
    pub async fn describe(&self, name: &str) -> Result<Subject, LookupError> {
        let species_url = self.subject_url(name)?;
        let response = self
            .call(
                Upstream::Species,
                self.client.get(&species_url, &RequestOptions::new()).await,
            )?;
        let mut subject = self.decode(Upstream::Species, &response, |raw| {
            decode_subject(raw, &self.config.language)
        })?;

        let body = json!({ "text": subject.description });
        let response = self.call(
            Upstream::Translator,
            self.client
                .post(
                    &self.config.translator_api_url,
                    &body,
                    &self.translator_options,
                )
                .await,
        )?;
        let translated: TranslatedText = self.decode(Upstream::Translator, &response, |raw| {
            decode_translation(raw, &self.config.translation)
        })?;

        subject.apply_translation(translated);
        Ok(subject)
    }

    /// Species URL for `name`, appended as a single percent-encoded segment.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::InvalidName`] for empty, `.` or `..` names, which
    /// would otherwise resolve to the collection URL or its parent.
    pub fn subject_url(&self, name: &str) -> Result<Url, LookupError> {
        if matches!(name.trim(), "" | "." | "..") {
            return Err(LookupError::InvalidName {
                name: name.to_string(),
            });
        }
        let mut url = self.config.pokemon_api_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(name);
        }
        Ok(url)
    }

    fn call(
        &self,
        upstream: Upstream,
        result: Result<HttpResponse, TransportError>,
    ) -> Result<HttpResponse, LookupError> {
        match result {
            Ok(response) => {
                let lookup = if response.from_cache {
                    CacheLookup::Hit
                } else {
                    CacheLookup::Miss
                };
                self.telemetry.inc_cache_lookup(upstream.as_str(), lookup);
                debug!(
                    upstream = upstream.as_str(),
                    status = response.status.as_u16(),
                    cache = lookup.as_str(),
                    "upstream call succeeded"
                );
                Ok(response)
            }
            Err(source) => Err(self.fail(LookupError::from_transport(upstream, source))),
        }
    }

    fn decode<T>(
        &self,
        upstream: Upstream,
        response: &HttpResponse,
        decoder: impl FnOnce(&Value) -> Result<T, PayloadError>,
    ) -> Result<T, LookupError> {
        let decoded = parse_body(&response.body).and_then(|raw| decoder(&raw));
        match decoded {
            Ok(value) => {
                self.telemetry
                    .inc_upstream(upstream.as_str(), UpstreamOutcome::Success);
                Ok(value)
            }
            Err(source) => Err(self.fail(LookupError::MalformedPayload { upstream, source })),
        }
    }

    fn fail(&self, err: LookupError) -> LookupError {
        let upstream = err.upstream().map_or("none", Upstream::as_str);
        if let Some(outcome) = err.outcome() {
            self.telemetry.inc_upstream(upstream, outcome);
        }
        let context = current_request();
        warn!(
            upstream,
            request_id = context.as_ref().map_or("", RequestContext::request_id),
            route = context.as_ref().map_or("", RequestContext::route),
            error = %err,
            "lookup step failed"
        );
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pokespeare_http::Method;
    use pokespeare_test_support::fixtures::{
        self, HAUNTER, HAUNTER_DESCRIPTION, HAUNTER_TRANSLATION,
    };
    use pokespeare_test_support::mocks::{Reply, ScriptedHttpClient};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn config() -> Result<ServiceConfig, Box<dyn std::error::Error>> {
        Ok(ServiceConfig::new(
            Url::parse("http://pokeapi.test/api/v2/pokemon-species/")?,
            Url::parse("http://translator.test/translate/shakespeare.json")?,
        ))
    }

    fn build_service(
        client: ScriptedHttpClient,
        config: ServiceConfig,
    ) -> Result<(TranslationService, Arc<ScriptedHttpClient>, Metrics), Box<dyn std::error::Error>>
    {
        let client = Arc::new(client);
        let telemetry = Metrics::new()?;
        let service = TranslationService::new(client.clone(), config, telemetry.clone())?;
        Ok((service, client, telemetry))
    }

    fn haunter_species() -> Reply {
        Reply::Json(fixtures::species(HAUNTER, &[("en", HAUNTER_DESCRIPTION)]))
    }

    #[tokio::test]
    async fn describe_merges_name_and_translation() -> TestResult {
        let client = ScriptedHttpClient::new()
            .with_get(haunter_species())
            .with_post(Reply::Json(fixtures::translation(
                HAUNTER_TRANSLATION,
                "shakespeare",
            )));
        let (service, client, _) = build_service(client, config()?)?;

        let subject = service.describe(HAUNTER).await?;
        assert_eq!(subject, Subject::new(HAUNTER, HAUNTER_TRANSLATION));

        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, Method::GET);
        assert_eq!(
            calls[0].url.as_str(),
            "http://pokeapi.test/api/v2/pokemon-species/haunter"
        );
        assert_eq!(calls[1].method, Method::POST);
        assert_eq!(calls[1].body, Some(json!({"text": HAUNTER_DESCRIPTION})));
        assert!(calls[1].headers.get(TRANSLATOR_SECRET_HEADER).is_none());
        Ok(())
    }

    #[tokio::test]
    async fn api_key_is_sent_only_to_translator() -> TestResult {
        let client = ScriptedHttpClient::new()
            .with_get(haunter_species())
            .with_post(Reply::Json(fixtures::translation("Hark", "shakespeare")));
        let (service, client, _) = build_service(client, config()?.with_api_key("s3cret"))?;

        service.describe(HAUNTER).await?;
        let calls = client.calls();
        assert!(calls[0].headers.get(TRANSLATOR_SECRET_HEADER).is_none());
        assert_eq!(
            calls[1]
                .headers
                .get(TRANSLATOR_SECRET_HEADER)
                .and_then(|value| value.to_str().ok()),
            Some("s3cret")
        );
        Ok(())
    }

    #[tokio::test]
    async fn species_failures_skip_the_translator() -> TestResult {
        let cases = [
            (Reply::Status(404), "status"),
            (Reply::Unexpected("connection reset"), "unexpected"),
            (Reply::Json(fixtures::species_without_entries(HAUNTER)), "malformed"),
            (Reply::Json(fixtures::species(HAUNTER, &[("ja", "x")])), "malformed"),
            (Reply::Body(b"<html></html>".to_vec()), "malformed"),
        ];
        for (reply, outcome) in cases {
            let (service, client, _) = build_service(ScriptedHttpClient::new().with_get(reply), config()?)?;
            let err = service.describe(HAUNTER).await.err();
            assert_eq!(
                err.as_ref()
                    .and_then(LookupError::outcome)
                    .map(UpstreamOutcome::as_str),
                Some(outcome)
            );
            assert_eq!(
                err.as_ref().and_then(LookupError::upstream),
                Some(Upstream::Species)
            );
            assert_eq!(client.calls().len(), 1);
        }
        Ok(())
    }

    #[tokio::test]
    async fn translator_rate_limit_is_distinct() -> TestResult {
        let client = ScriptedHttpClient::new()
            .with_get(haunter_species())
            .with_post(Reply::Status(429));
        let (service, _, telemetry) = build_service(client, config()?)?;

        let err = service.describe(HAUNTER).await.err();
        assert!(err.as_ref().is_some_and(LookupError::is_rate_limited));
        assert_eq!(
            err.as_ref().and_then(LookupError::upstream),
            Some(Upstream::Translator)
        );
        assert_eq!(telemetry.snapshot().upstream_rate_limited_total, 1);
        Ok(())
    }

    #[tokio::test]
    async fn species_rate_limit_is_also_surfaced() -> TestResult {
        let (service, _, _) =
            build_service(ScriptedHttpClient::new().with_get(Reply::Status(429)), config()?)?;
        let err = service.describe(HAUNTER).await.err();
        assert!(matches!(
            err,
            Some(LookupError::RateLimited {
                upstream: Upstream::Species,
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn wrong_translation_tag_is_malformed() -> TestResult {
        let client = ScriptedHttpClient::new()
            .with_get(haunter_species())
            .with_post(Reply::Json(fixtures::translation("Hmm.", "yoda")));
        let (service, _, _) = build_service(client, config()?)?;

        let err = service.describe(HAUNTER).await.err();
        assert_eq!(
            err.as_ref().map(ToString::to_string).as_deref(),
            Some("unable to translate the text")
        );
        Ok(())
    }

    #[tokio::test]
    async fn cache_hits_are_counted() -> TestResult {
        let client = ScriptedHttpClient::new()
            .with_get(Reply::CachedJson(fixtures::species(
                HAUNTER,
                &[("en", HAUNTER_DESCRIPTION)],
            )))
            .with_post(Reply::Json(fixtures::translation("Hark", "shakespeare")));
        let (service, _, telemetry) = build_service(client, config()?)?;

        service.describe(HAUNTER).await?;
        let snapshot = telemetry.snapshot();
        assert_eq!(snapshot.cache_hits_total, 1);
        assert_eq!(snapshot.cache_misses_total, 1);
        Ok(())
    }

    #[test]
    fn subject_url_joins_one_encoded_segment() -> TestResult {
        let (service, _, _) = build_service(ScriptedHttpClient::new(), config()?)?;
        assert_eq!(
            service.subject_url("mr. mime")?.as_str(),
            "http://pokeapi.test/api/v2/pokemon-species/mr.%20mime"
        );
        assert_eq!(
            service.subject_url("a/b")?.as_str(),
            "http://pokeapi.test/api/v2/pokemon-species/a%2Fb"
        );

        let bare = ServiceConfig::new(
            Url::parse("http://pokeapi.test/api/v2/pokemon-species")?,
            Url::parse("http://translator.test/")?,
        );
        let (service, _, _) = build_service(ScriptedHttpClient::new(), bare)?;
        assert_eq!(
            service.subject_url("haunter")?.as_str(),
            "http://pokeapi.test/api/v2/pokemon-species/haunter"
        );
        Ok(())
    }

    #[tokio::test]
    async fn dot_segment_names_never_reach_upstream() -> TestResult {
        let (service, client, telemetry) =
            build_service(ScriptedHttpClient::new().with_get(haunter_species()), config()?)?;
        for name in [".", "..", " "] {
            let err = service.describe(name).await.err();
            assert!(matches!(err, Some(LookupError::InvalidName { .. })));
            assert_eq!(err.as_ref().and_then(LookupError::upstream), None);
        }
        assert!(client.calls().is_empty());
        assert!(!telemetry.render()?.contains("upstream_requests_total{"));
        Ok(())
    }

    #[tokio::test]
    async fn failures_inside_a_request_scope_still_map() -> TestResult {
        let (service, _, telemetry) =
            build_service(ScriptedHttpClient::new().with_get(Reply::Status(404)), config()?)?;
        let err = pokespeare_telemetry::with_request_context(
            "req-9",
            "/pokemon/{name}",
            service.describe(HAUNTER),
        )
        .await
        .err();
        assert_eq!(
            err.as_ref().and_then(LookupError::outcome),
            Some(UpstreamOutcome::Status)
        );
        let rendered = telemetry.render()?;
        assert!(rendered.contains("outcome=\"status\""));
        assert!(rendered.contains("upstream=\"pokeapi\""));
        Ok(())
    }

    #[test]
    fn invalid_settings_are_rejected() -> TestResult {
        let telemetry = Metrics::new()?;
        let client: Arc<dyn HttpClient> = Arc::new(ScriptedHttpClient::new());
        let bad_key = config()?.with_api_key("line\nbreak");
        assert!(matches!(
            TranslationService::new(client.clone(), bad_key, telemetry.clone()),
            Err(ServiceBuildError::InvalidApiKey { .. })
        ));
        let opaque = ServiceConfig::new(
            Url::parse("mailto:trainer@pokeapi.test")?,
            Url::parse("http://translator.test/")?,
        );
        assert!(matches!(
            TranslationService::new(client, opaque, telemetry),
            Err(ServiceBuildError::InvalidBaseUrl { .. })
        ));
        Ok(())
    }
}
