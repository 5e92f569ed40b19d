//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes only the counters the gateway reports: inbound requests,
//!   upstream outcomes, cache effectiveness, and upstream throttling.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Outcome label recorded for each upstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamOutcome {
    /// The call returned a decodable payload.
    Success,
    /// The upstream answered with a non-success status.
    Status,
    /// The upstream answered with `429 Too Many Requests`.
    RateLimited,
    /// The call failed below the HTTP layer.
    Unexpected,
    /// The payload did not match the expected shape.
    Malformed,
}

impl UpstreamOutcome {
    /// Prometheus label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Status => "status",
            Self::RateLimited => "rate_limited",
            Self::Unexpected => "unexpected",
            Self::Malformed => "malformed",
        }
    }
}

/// Cache lookup result label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    /// Served from the response cache.
    Hit,
    /// Fetched from the network.
    Miss,
}

impl CacheLookup {
    /// Prometheus label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
        }
    }
}

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    upstream_requests_total: IntCounterVec,
    upstream_cache_total: IntCounterVec,
    upstream_cache_hits_total: IntCounter,
    upstream_cache_misses_total: IntCounter,
    upstream_rate_limited_total: IntCounter,
}

/// Snapshot of selected counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Upstream calls served from the cache.
    pub cache_hits_total: u64,
    /// Upstream calls that reached the network.
    pub cache_misses_total: u64,
    /// Upstream responses rejected with `429`.
    pub upstream_rate_limited_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = counter_vec(
            "http_requests_total",
            "Total HTTP requests received",
            &["route", "code"],
        )?;
        let upstream_requests_total = counter_vec(
            "upstream_requests_total",
            "Upstream calls by upstream and outcome",
            &["upstream", "outcome"],
        )?;
        let upstream_cache_total = counter_vec(
            "upstream_cache_total",
            "Upstream calls by cache lookup result",
            &["upstream", "result"],
        )?;
        let upstream_cache_hits_total = counter(
            "upstream_cache_hits_total",
            "Upstream calls served from the response cache",
        )?;
        let upstream_cache_misses_total = counter(
            "upstream_cache_misses_total",
            "Upstream calls that reached the network",
        )?;
        let upstream_rate_limited_total = counter(
            "upstream_rate_limited_total",
            "Upstream responses rejected with 429",
        )?;

        register(&registry, "http_requests_total", &http_requests_total)?;
        register(
            &registry,
            "upstream_requests_total",
            &upstream_requests_total,
        )?;
        register(&registry, "upstream_cache_total", &upstream_cache_total)?;
        register(
            &registry,
            "upstream_cache_hits_total",
            &upstream_cache_hits_total,
        )?;
        register(
            &registry,
            "upstream_cache_misses_total",
            &upstream_cache_misses_total,
        )?;
        register(
            &registry,
            "upstream_rate_limited_total",
            &upstream_rate_limited_total,
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                upstream_requests_total,
                upstream_cache_total,
                upstream_cache_hits_total,
                upstream_cache_misses_total,
                upstream_rate_limited_total,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Record the outcome of a call against the named upstream.
    pub fn inc_upstream(&self, upstream: &str, outcome: UpstreamOutcome) {
        self.inner
            .upstream_requests_total
            .with_label_values(&[upstream, outcome.as_str()])
            .inc();
        if outcome == UpstreamOutcome::RateLimited {
            self.inner.upstream_rate_limited_total.inc();
        }
    }

    /// Record whether an upstream call was served from the cache.
    pub fn inc_cache_lookup(&self, upstream: &str, lookup: CacheLookup) {
        self.inner
            .upstream_cache_total
            .with_label_values(&[upstream, lookup.as_str()])
            .inc();
        match lookup {
            CacheLookup::Hit => self.inner.upstream_cache_hits_total.inc(),
            CacheLookup::Miss => self.inner.upstream_cache_misses_total.inc(),
        }
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Take a point-in-time snapshot of the cache and throttling counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits_total: self.inner.upstream_cache_hits_total.get(),
            cache_misses_total: self.inner.upstream_cache_misses_total.get(),
            upstream_rate_limited_total: self.inner.upstream_rate_limited_total.get(),
        }
    }
}

fn counter(name: &'static str, help: &str) -> Result<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_http_request("/pokemon/{name}", 200);
        metrics.inc_upstream("pokeapi", UpstreamOutcome::Success);
        metrics.inc_upstream("translator", UpstreamOutcome::RateLimited);
        metrics.inc_cache_lookup("pokeapi", CacheLookup::Miss);
        metrics.inc_cache_lookup("pokeapi", CacheLookup::Hit);
        metrics.inc_cache_lookup("translator", CacheLookup::Hit);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cache_hits_total, 2);
        assert_eq!(snapshot.cache_misses_total, 1);
        assert_eq!(snapshot.upstream_rate_limited_total, 1);

        let rendered = metrics.render()?;
        assert!(rendered.contains("http_requests_total"));
        assert!(rendered.contains("upstream_requests_total"));
        assert!(rendered.contains("outcome=\"rate_limited\""));
        assert!(rendered.contains("upstream_cache_hits_total 2"));
        assert!(rendered.contains("upstream_cache_misses_total 1"));
        Ok(())
    }

    #[test]
    fn fresh_registry_reports_zeroes() -> Result<()> {
        let snapshot = Metrics::new()?.snapshot();
        assert_eq!(snapshot.cache_hits_total, 0);
        assert_eq!(snapshot.cache_misses_total, 0);
        assert_eq!(snapshot.upstream_rate_limited_total, 0);
        Ok(())
    }

    #[test]
    fn outcome_labels_are_stable() {
        assert_eq!(UpstreamOutcome::Malformed.as_str(), "malformed");
        assert_eq!(CacheLookup::Hit.as_str(), "hit");
    }
}
