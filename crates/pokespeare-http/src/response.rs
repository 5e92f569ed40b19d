//! Response returned by [`HttpClient`](crate::HttpClient) implementations.

use reqwest::StatusCode;
use serde_json::Value;

use crate::cache::CachedResponse;

/// A successful upstream response, fetched or replayed from the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Raw body.
    pub body: Vec<u8>,
    /// `Content-Type` header, when sent.
    pub content_type: Option<String>,
    /// Whether the response came from the cache.
    pub from_cache: bool,
}

impl HttpResponse {
    /// Parse the body as untyped JSON.
    ///
    /// # Errors
    ///
    /// Returns the parser error when the body is not JSON.
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Rebuild a response from a cache entry.
    #[must_use]
    pub fn from_cached(cached: CachedResponse) -> Self {
        Self {
            status: StatusCode::from_u16(cached.status).unwrap_or(StatusCode::OK),
            body: cached.body,
            content_type: cached.content_type,
            from_cache: true,
        }
    }

    /// Snapshot suitable for storing in a cache.
    #[must_use]
    pub fn to_cached(&self) -> CachedResponse {
        CachedResponse {
            status: self.status.as_u16(),
            body: self.body.clone(),
            content_type: self.content_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_responses_are_flagged() -> Result<(), serde_json::Error> {
        let fresh = HttpResponse {
            status: StatusCode::OK,
            body: br#"{"name":"haunter"}"#.to_vec(),
            content_type: Some("application/json".into()),
            from_cache: false,
        };
        let replayed = HttpResponse::from_cached(fresh.to_cached());
        assert!(replayed.from_cache);
        assert_eq!(replayed.body, fresh.body);
        assert_eq!(replayed.json()?["name"], "haunter");
        Ok(())
    }
}
