//! Response bodies produced by the gateway besides [`Subject`](pokespeare_models::Subject).

use pokespeare_telemetry::MetricsSnapshot;
use serde::{Deserialize, Serialize};

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable failure description.
    pub error: String,
}

/// Body returned by `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the process serves requests.
    pub status: &'static str,
    /// Build identifier.
    pub build: String,
    /// Active cache backend, or `"none"`.
    pub cache: &'static str,
    /// Cache and throttling counters.
    pub metrics: MetricsSnapshot,
}
