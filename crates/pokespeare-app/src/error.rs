//! # Design
//!
//! - Centralize application-level errors for bootstrap and serving.
//! - Keep error messages constant while carrying context fields for debugging.
//! - Preserve source errors without re-logging at call sites.

use std::io;

use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: pokespeare_config::ConfigError,
    },
    /// Telemetry operations failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: pokespeare_telemetry::TelemetryError,
    },
    /// The upstream HTTP client could not be built.
    #[error("http client construction failed")]
    Client {
        /// Operation identifier.
        operation: &'static str,
        /// Source client error.
        source: pokespeare_http::ClientBuildError,
    },
    /// A configured cache method is not an HTTP method.
    #[error("invalid cache method")]
    CacheMethod {
        /// Offending value.
        value: String,
    },
    /// The lookup service rejected its settings.
    #[error("lookup service construction failed")]
    Service {
        /// Operation identifier.
        operation: &'static str,
        /// Source service error.
        source: pokespeare_api::ServiceBuildError,
    },
    /// API server operations failed.
    #[error("api server operation failed")]
    ApiServer {
        /// Operation identifier.
        operation: &'static str,
        /// Source API server error.
        source: pokespeare_api::ApiServerError,
    },
    /// The async runtime could not be started.
    #[error("runtime construction failed")]
    Runtime {
        /// Source IO error.
        source: io::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: pokespeare_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: pokespeare_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn client(
        operation: &'static str,
        source: pokespeare_http::ClientBuildError,
    ) -> Self {
        Self::Client { operation, source }
    }

    pub(crate) const fn service(
        operation: &'static str,
        source: pokespeare_api::ServiceBuildError,
    ) -> Self {
        Self::Service { operation, source }
    }

    pub(crate) const fn api_server(
        operation: &'static str,
        source: pokespeare_api::ApiServerError,
    ) -> Self {
        Self::ApiServer { operation, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn messages_are_constant_and_sources_preserved() {
        let err = AppError::config(
            "config.load",
            pokespeare_config::ConfigError::InvalidField {
                field: "POKESPEARE_PORT",
                value: Some("0".to_string()),
                reason: "must be between 1 and 65535",
            },
        );
        assert_eq!(err.to_string(), "configuration operation failed");
        assert!(err.source().is_some());

        let err = AppError::Runtime {
            source: io::Error::other("no threads"),
        };
        assert_eq!(err.to_string(), "runtime construction failed");
        assert!(err.source().is_some());

        let err = AppError::CacheMethod {
            value: "BREW".to_string(),
        };
        assert!(err.source().is_none());
    }
}
