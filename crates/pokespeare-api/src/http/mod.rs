//! Axum routes, middleware, and response mapping.

pub mod constants;
pub(crate) mod errors;
pub(crate) mod handlers;
pub(crate) mod health;
pub mod router;
pub(crate) mod telemetry;
