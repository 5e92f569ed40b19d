#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(unused, unreachable_pub, missing_docs)]

//! HTTP surface and lookup orchestration for the Pokespeare gateway.
//!
//! [`TranslationService`] chains the species lookup and the translation;
//! [`ApiServer`] exposes it over axum with request ids, tracing, and metrics.

pub mod error;
pub mod http;
pub mod models;
pub mod service;
pub mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::{ApiServer, shutdown_signal};
pub use models::{ErrorBody, HealthResponse};
pub use service::{
    LookupError, ServiceBuildError, ServiceConfig, TRANSLATOR_SECRET_HEADER, TranslationService,
    Upstream,
};
pub use state::ApiState;
