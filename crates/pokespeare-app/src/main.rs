#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Binary entrypoint: loads configuration, then serves the gateway on a
//! runtime sized to the configured worker count.

use pokespeare_app::{AppResult, run_app};

/// Boots the gateway and blocks until shutdown.
fn main() -> AppResult<()> {
    run_app()
}
