//! Context propagation helpers for request and application spans.
//!
//! # Design
//! - Keeps the request id and route in task-local storage so code far from the
//!   HTTP layer can tag its logs with them.
//! - Provides an application-level span guard so top-level spans carry stage/build info.

use std::future::Future;
use std::sync::Arc;

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Guard that keeps the application-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the application-level tracing span for the lifetime of the guard.
    #[must_use]
    pub fn new(stage: impl Into<String>) -> Self {
        let stage = stage.into();
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "app",
            service = "pokespeare",
            stage = %stage,
            build_sha = %build_sha()
        )));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

/// Capture request context for downstream telemetry.
pub fn set_request_context(span: &Span, request_id: impl Into<String>, route: impl Into<String>) {
    let request_id = request_id.into();
    let route = route.into();
    span.record("request_id", tracing::field::display(&request_id));
    span.record("route", tracing::field::display(&route));
}

/// Identifiers of the request being served on the current task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    request_id: Arc<str>,
    route: Arc<str>,
}

impl RequestContext {
    /// Correlation id taken from `x-request-id`.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Matched route template, or the raw path when no route matched.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }
}

/// Context of the in-flight request, when called inside [`with_request_context`].
#[must_use]
pub fn current_request() -> Option<RequestContext> {
    ACTIVE_REQUEST_CONTEXT.try_with(Clone::clone).ok()
}

/// Run `fut` with `request_id` and `route` visible to [`current_request`].
pub async fn with_request_context<Fut, T>(
    request_id: impl Into<String>,
    route: impl Into<String>,
    fut: Fut,
) -> T
where
    Fut: Future<Output = T>,
{
    let context = RequestContext {
        request_id: Arc::from(request_id.into()),
        route: Arc::from(route.into()),
    };
    ACTIVE_REQUEST_CONTEXT.scope(context, fut).await
}

tokio::task_local! {
    static ACTIVE_REQUEST_CONTEXT: RequestContext;
}
