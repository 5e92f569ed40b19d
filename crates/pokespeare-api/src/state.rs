//! Shared state handed to every handler.

use std::sync::Arc;

use pokespeare_telemetry::Metrics;

use crate::service::TranslationService;

/// Dependencies the HTTP layer needs.
#[derive(Clone)]
pub struct ApiState {
    /// Lookup orchestrator.
    pub service: Arc<TranslationService>,
    /// Metrics registry shared with the orchestrator.
    pub telemetry: Metrics,
    /// Label of the configured cache backend.
    pub cache_backend: &'static str,
}

impl ApiState {
    /// Bundle the orchestrator with its telemetry handle.
    #[must_use]
    pub fn new(service: TranslationService, telemetry: Metrics, cache_backend: &'static str) -> Self {
        Self {
            service: Arc::new(service),
            telemetry,
            cache_backend,
        }
    }
}
