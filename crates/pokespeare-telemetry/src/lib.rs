#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(unused, unreachable_pub, missing_docs)]

//! Telemetry primitives shared across the Pokespeare workspace.
//!
//! This crate centralises logging, metrics, and request-context helpers so the
//! gateway binary and its HTTP surface share one observability story.
//!
//! Layout: `init.rs` (subscriber install), `context.rs` (spans and task-local
//! request context), `layers.rs` (request id layers), `metrics.rs`
//! (Prometheus registry), `error.rs` (typed failures).

pub mod context;
pub mod error;
pub mod init;
pub mod layers;
pub mod metrics;

pub use context::{
    GlobalContextGuard, RequestContext, current_request, set_request_context,
    with_request_context,
};
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
pub use layers::{
    REQUEST_ID_HEADER, propagate_request_id_layer, request_id_or_empty, set_request_id_layer,
};
pub use metrics::{CacheLookup, Metrics, MetricsSnapshot, UpstreamOutcome};
