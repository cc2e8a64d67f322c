//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.
//!
//! Reads already drop expired entries lazily; the sweep only bounds how long
//! an unread expired entry keeps occupying a slot.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

// == Expiry Sweep ==
/// Anything that can drop its expired entries on demand.
pub trait ExpirySweep: Send + Sync {
    /// Removes expired entries, returning how many were dropped.
    fn purge_expired(&self) -> usize;
}

/// Spawns a task that calls `purge_expired` on `target` every `interval`.
///
/// The task runs until aborted through the returned handle. Must be called
/// from within a tokio runtime.
///
/// # Example
/// ```ignore
/// let cache: Cache<String, String> = Cache::new(1000, PolicyKind::Ttl);
/// let cleanup_handle = spawn_cleanup_task(Arc::new(cache.clone()), Duration::from_secs(1));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<T>(target: Arc<T>, interval: Duration) -> JoinHandle<()>
where
    T: ExpirySweep + ?Sized + 'static,
{
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Starting TTL cleanup task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = target.purge_expired();

            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
