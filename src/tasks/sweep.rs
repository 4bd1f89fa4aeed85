//! Expiry Sweep Task
//!
//! Background task that periodically reclaims expired entries from every
//! backend. The cache stays correct without it, since reads never return
//! expired data; the task exists to reclaim space before the lazy removal on
//! read would get to it.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::TieredCache;

/// Spawns a background task that sweeps all backends at a fixed interval.
///
/// The task runs in an infinite loop, sleeping for the given interval between
/// sweeps. Each sweep covers every disk partition plus the local and session
/// stores; removal counts land in each backend's expiration counter.
///
/// # Arguments
/// * `cache` - Handle to the cache to sweep; clones share the same backends
/// * `interval` - Time between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let cache = TieredCache::new(CacheConfig::default());
/// let sweeper = spawn_sweep_task(cache.clone(), Duration::from_secs(300));
/// // Later, during shutdown:
/// sweeper.abort();
/// ```
pub fn spawn_sweep_task(cache: TieredCache, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting expiry sweep task with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            match cache.clean_all_expired().await {
                Ok(removed) if removed > 0 => {
                    info!("Expiry sweep: removed {} expired entries", removed)
                }
                Ok(_) => debug!("Expiry sweep: no expired entries found"),
                Err(err) => warn!("Expiry sweep failed: {}", err),
            }
        }
    })
}
