//! TTL Cleanup Task
//!
//! Background task that periodically sweeps expired entries out of a
//! process-local cache, so idle keys do not hold memory until their next read.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::LocalCache;

/// Spawns a background task that periodically removes expired entries.
///
/// # Arguments
/// * `name` - Cache name used in log fields
/// * `cache` - Shared handle to the cache to sweep
/// * `cleanup_interval_secs` - Interval in seconds between sweeps (at least 1)
/// * `cancel` - Stops the task at the next tick
pub fn spawn_cleanup_task<V>(
    name: &'static str,
    cache: LocalCache<V>,
    cleanup_interval_secs: u64,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            cache = name,
            "Starting TTL cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            let removed = cache.cleanup_expired().await;
            if removed > 0 {
                info!(cache = name, removed, "TTL cleanup removed expired entries");
            } else {
                debug!(cache = name, "TTL cleanup: no expired entries found");
            }
        }

        info!(cache = name, "TTL cleanup task stopped");
    })
}
