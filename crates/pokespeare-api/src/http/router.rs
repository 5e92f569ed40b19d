//! Router construction and server host for the gateway.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    extract::MatchedPath,
    http::{Request, StatusCode, header},
    response::Response,
    routing::get,
};
use pokespeare_telemetry::{build_sha, request_id_or_empty, set_request_context};
use serde_json::json;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{Span, error, info};

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::constants::{HEADER_REQUEST_ID, ROUTE_DESCRIBE, ROUTE_HEALTH, ROUTE_METRICS};
use crate::http::handlers::{describe_pokemon, method_not_allowed, not_found};
use crate::http::health::{health, metrics};
use crate::http::telemetry::HttpMetricsLayer;
use crate::state::ApiState;

/// Axum router wrapper that hosts the gateway.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Wire routes, fallbacks, and middleware around `state`.
    #[must_use]
    pub fn new(state: ApiState) -> Self {
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request_id_or_empty(
                    request
                        .headers()
                        .get(HEADER_REQUEST_ID)
                        .map(axum::http::HeaderValue::as_bytes),
                );
                let route = request.extensions().get::<MatchedPath>().map_or_else(
                    || request.uri().path().to_string(),
                    |matched| matched.as_str().to_string(),
                );
                let span = tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = tracing::field::Empty,
                    request_id = tracing::field::Empty,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                );
                set_request_context(&span, request_id, route);
                span
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                    let status = response.status().as_u16();
                    span.record("status_code", status);
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                    info!(status, latency_ms, "request completed");
                },
            );

        let layered = ServiceBuilder::new()
            .layer(pokespeare_telemetry::set_request_id_layer())
            .layer(pokespeare_telemetry::propagate_request_id_layer())
            .layer(trace_layer)
            .layer(CatchPanicLayer::custom(panic_response));

        let router = Router::new()
            .route(
                ROUTE_DESCRIBE,
                get(describe_pokemon).fallback(method_not_allowed),
            )
            .route(ROUTE_HEALTH, get(health).fallback(method_not_allowed))
            .route(ROUTE_METRICS, get(metrics).fallback(method_not_allowed))
            .route_layer(HttpMetricsLayer::new(state.telemetry.clone()))
            .fallback(not_found)
            .layer(layered)
            .with_state(state);

        Self { router }
    }

    /// The fully layered router, for embedding or in-process tests.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Bind `addr` and serve until ctrl-c or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if binding the listener or serving the API fails.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        self.serve_on(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the server terminates abnormally.
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> ApiServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(local) = listener.local_addr() {
            info!(addr = %local, "pokespeare listening");
        }
        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| ApiServerError::Serve { source })?;
        info!("pokespeare stopped");
        Ok(())
    }
}

/// Resolves on ctrl-c or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}

#[allow(clippy::needless_pass_by_value)]
fn panic_response(_panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    error!("handler panicked");
    let body = json!({ "error": "internal server error" }).to_string();
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}
