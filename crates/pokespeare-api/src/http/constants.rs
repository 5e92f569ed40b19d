//! Route paths and header names used by the HTTP surface.

/// Lookup route.
pub const ROUTE_DESCRIBE: &str = "/pokemon/{name}";
/// Liveness route.
pub const ROUTE_HEALTH: &str = "/health";
/// Prometheus scrape route.
pub const ROUTE_METRICS: &str = "/metrics";

pub(crate) const HEADER_REQUEST_ID: &str = pokespeare_telemetry::REQUEST_ID_HEADER;
pub(crate) const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";
