#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(unused, unreachable_pub, missing_docs)]

//! Environment-driven configuration for the Pokespeare gateway.
//!
//! Layout: `model.rs` (typed settings), `loader.rs` (environment sources and
//! loading), `validate.rs` (parsing helpers), `defaults.rs` (fallback values),
//! `error.rs` (typed failures).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{EnvSource, ProcessEnv, load_from, load_from_env};
pub use model::{
    CacheBackendKind, CacheConfig, GatewayConfig, LoggingSettings, ServerConfig, UpstreamConfig,
};
