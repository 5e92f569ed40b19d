#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(unused, unreachable_pub, missing_docs)]

//! Shared test helpers used across unit and integration suites.
//! Layout: fixtures.rs (upstream JSON payloads), mocks.rs (scripted HTTP client).

pub mod fixtures;
pub mod mocks;
