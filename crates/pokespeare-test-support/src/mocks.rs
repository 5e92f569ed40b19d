//! In-memory [`HttpClient`] double with scripted replies.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use pokespeare_http::header::HeaderMap;
use pokespeare_http::{
    HttpClient, HttpResponse, Method, RequestOptions, StatusCode, TransportError,
    TransportResult, Url,
};
use serde_json::Value;

/// Reply returned for the next matching call.
#[derive(Debug, Clone)]
pub enum Reply {
    /// `200` with a JSON body.
    Json(Value),
    /// `200` with a JSON body, flagged as served from cache.
    CachedJson(Value),
    /// `200` with an arbitrary body.
    Body(Vec<u8>),
    /// Status error with the given code.
    Status(u16),
    /// Failure below the HTTP layer.
    Unexpected(&'static str),
}

/// A request the double received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Request method.
    pub method: Method,
    /// Request URL.
    pub url: Url,
    /// JSON body for POST requests.
    pub body: Option<Value>,
    /// Headers passed through [`RequestOptions`].
    pub headers: HeaderMap,
}

/// [`HttpClient`] that replays queued replies and records every call.
#[derive(Debug)]
pub struct ScriptedHttpClient {
    gets: Mutex<VecDeque<Reply>>,
    posts: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
    cache_enabled: AtomicBool,
}

impl Default for ScriptedHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedHttpClient {
    /// Double with no replies queued.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gets: Mutex::new(VecDeque::new()),
            posts: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            cache_enabled: AtomicBool::new(true),
        }
    }

    /// Queue a reply for the next GET.
    #[must_use]
    pub fn with_get(self, reply: Reply) -> Self {
        lock(&self.gets).push_back(reply);
        self
    }

    /// Queue a reply for the next POST.
    #[must_use]
    pub fn with_post(self, reply: Reply) -> Self {
        lock(&self.posts).push_back(reply);
        self
    }

    /// Calls received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    fn respond(
        &self,
        method: Method,
        url: &Url,
        body: Option<&Value>,
        options: &RequestOptions,
    ) -> TransportResult<HttpResponse> {
        lock(&self.calls).push(RecordedCall {
            method: method.clone(),
            url: url.clone(),
            body: body.cloned(),
            headers: options.headers.clone(),
        });
        let queue = if method == Method::POST {
            &self.posts
        } else {
            &self.gets
        };
        let reply = lock(queue)
            .pop_front()
            .unwrap_or(Reply::Unexpected("no scripted reply"));
        match reply {
            Reply::Json(value) => Ok(ok(value.to_string().into_bytes(), false)),
            Reply::CachedJson(value) => Ok(ok(value.to_string().into_bytes(), true)),
            Reply::Body(body) => Ok(ok(body, false)),
            Reply::Status(code) => Err(TransportError::Status {
                method,
                url: url.to_string(),
                status: StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            }),
            Reply::Unexpected(message) => Err(TransportError::Unexpected {
                method,
                url: url.to_string(),
                source: Box::new(io::Error::other(message)),
            }),
        }
    }
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn get(&self, url: &Url, options: &RequestOptions) -> TransportResult<HttpResponse> {
        self.respond(Method::GET, url, None, options)
    }

    async fn post(
        &self,
        url: &Url,
        body: &Value,
        options: &RequestOptions,
    ) -> TransportResult<HttpResponse> {
        self.respond(Method::POST, url, Some(body), options)
    }

    fn enable_cache(&self) {
        self.cache_enabled.store(true, Ordering::Relaxed);
    }

    fn disable_cache(&self) {
        self.cache_enabled.store(false, Ordering::Relaxed);
    }

    fn cache_enabled(&self) -> bool {
        self.cache_enabled.load(Ordering::Relaxed)
    }
}

fn ok(body: Vec<u8>, from_cache: bool) -> HttpResponse {
    HttpResponse {
        status: StatusCode::OK,
        body,
        content_type: Some("application/json".to_string()),
        from_cache,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
