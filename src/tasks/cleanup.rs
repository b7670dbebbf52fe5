//! Expiry Sweep Task
//!
//! Background task that periodically removes expired state from the cache
//! or the rate limiter.

use std::sync::Weak;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

/// State that can drop its expired items in one pass.
///
/// Implementations must take the same lock as their regular operations so a
/// sweep never races with a concurrent write.
pub trait Sweep: Send + Sync + 'static {
    /// Removes expired items, returning how many were removed.
    fn sweep_expired(&self) -> usize;

    /// Name used in log lines.
    fn label(&self) -> &'static str;
}

/// Spawns a background task that sweeps `target` every `interval`.
///
/// The task only holds a weak reference: it ends by itself once the owner
/// is dropped, and can be stopped earlier by aborting the returned handle.
///
/// # Example
/// ```ignore
/// let cache: QueryCache<String> = QueryCache::new(Duration::from_secs(300), 1000);
/// let handle = cache.spawn_cleanup(Duration::from_secs(30));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task<S: Sweep>(target: Weak<S>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let label = match target.upgrade() {
            Some(owner) => owner.label(),
            None => return,
        };
        info!(
            "Starting {} cleanup task with interval of {:?}",
            label, interval
        );

        loop {
            tokio::time::sleep(interval).await;

            let Some(owner) = target.upgrade() else {
                debug!("{} dropped, cleanup task exiting", label);
                break;
            };
            let removed = owner.sweep_expired();
            drop(owner);

            if removed > 0 {
                info!("{} cleanup: removed {} expired entries", label, removed);
            } else {
                debug!("{} cleanup: no expired entries found", label);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingSweep {
        runs: AtomicUsize,
    }

    impl Sweep for CountingSweep {
        fn sweep_expired(&self) -> usize {
            self.runs.fetch_add(1, Ordering::SeqCst);
            0
        }

        fn label(&self) -> &'static str {
            "counting"
        }
    }

    #[tokio::test]
    async fn test_cleanup_task_runs_periodically() {
        let target = Arc::new(CountingSweep::default());
        let handle = spawn_cleanup_task(Arc::downgrade(&target), Duration::from_millis(20));

        tokio::time::sleep(Duration::from_millis(110)).await;
        handle.abort();

        assert!(target.runs.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let target = Arc::new(CountingSweep::default());
        let handle = spawn_cleanup_task(Arc::downgrade(&target), Duration::from_secs(1));

        handle.abort();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }

    #[tokio::test]
    async fn test_cleanup_task_exits_when_owner_dropped() {
        let target = Arc::new(CountingSweep::default());
        let handle = spawn_cleanup_task(Arc::downgrade(&target), Duration::from_millis(10));
        drop(target);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("task should exit once its owner is gone")
            .unwrap();
    }
}
