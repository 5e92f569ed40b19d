//! Background eviction of expired entries.
//!
//! Stores only drop a stale entry when its key is read again; the sweeper
//! bounds growth from keys that are never requested twice.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, warn};

use super::CacheStore;

/// Purge `store` every `period` until the returned task is aborted.
#[must_use]
pub fn spawn_sweeper(store: Arc<dyn CacheStore>, period: Duration) -> JoinHandle<()> {
    let period = period.max(Duration::from_millis(1));
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => debug!(
                    backend = store.backend(),
                    removed, "evicted expired cache entries"
                ),
                Err(err) => warn!(
                    error = %err,
                    backend = store.backend(),
                    "cache sweep failed"
                ),
            }
        }
    })
}
