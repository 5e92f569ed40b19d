#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(unused, unreachable_pub, missing_docs)]

//! Outbound HTTP for the Pokespeare gateway.
//!
//! [`HttpClient`] is the capability the orchestrator depends on;
//! [`ReqwestHttpClient`] implements it on top of `reqwest` with an optional
//! response cache. Transport failures are normalised into the two
//! [`TransportError`] kinds so callers never see library-specific errors.
//!
//! Layout: `client.rs` (trait and reqwest client), `response.rs`,
//! `cache/` (keys, entries, the memory/file/redis stores, and the sweeper), `error.rs`.

pub mod cache;
pub mod client;
pub mod error;
pub mod response;

pub use cache::{
    CacheBackend, CacheEntry, CacheKey, CacheSettings, CacheStore, CachedResponse,
    FileCacheStore, MemoryCacheStore, build_cache_store, spawn_sweeper,
};
#[cfg(feature = "redis")]
pub use cache::RedisCacheStore;
pub use client::{ClientSettings, HttpClient, ReqwestHttpClient, RequestOptions};
pub use error::{CacheError, CacheResult, ClientBuildError, TransportError, TransportResult};
pub use response::HttpResponse;
pub use reqwest::{Method, StatusCode, header};
pub use url::Url;
