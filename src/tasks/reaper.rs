//! Background Reaper
//!
//! Periodically removes expired entries from every registered cache, so
//! entries that are never read again do not pile up.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::invalidation::CacheRegistry;

/// Sweeps every cache in `registry` once and returns the total removed.
///
/// A cache whose sweep panics is logged and skipped; the others are still swept.
pub fn sweep_once(registry: &CacheRegistry) -> usize {
    let mut total = 0;

    for cache in registry.iter() {
        match panic::catch_unwind(AssertUnwindSafe(|| cache.purge_expired())) {
            Ok(removed) => {
                if removed > 0 {
                    info!(cache = cache.name(), removed, "reaper removed expired entries");
                } else {
                    debug!(cache = cache.name(), "reaper found no expired entries");
                }
                total += removed;
            }
            Err(_) => {
                error!(cache = cache.name(), "reaper sweep panicked, retrying next tick");
            }
        }
    }

    total
}

/// Spawns a background task that sweeps all caches every `interval`.
///
/// The first sweep happens one full interval after spawning. A zero interval
/// disables the reaper: nothing is spawned and `None` is returned.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let registry = Arc::new(caches.registry());
/// let reaper = spawn_reaper(registry, Duration::from_secs(600));
/// // Later, during shutdown:
/// if let Some(handle) = reaper {
///     handle.abort();
/// }
/// ```
pub fn spawn_reaper(registry: Arc<CacheRegistry>, interval: Duration) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        info!("Cache reaper disabled, expired entries are only removed on read");
        return None;
    }

    Some(tokio::spawn(async move {
        info!(
            "Starting cache reaper with interval of {} ms over {} caches",
            interval.as_millis(),
            registry.len()
        );

        let mut ticker =
            tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            sweep_once(&registry);
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheEngine, CacheOptions, CacheStats, ManualClock};
    use crate::invalidation::{Invalidation, ManagedCache};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A cache whose sweep always panics.
    struct Exploding {
        sweeps: AtomicUsize,
    }

    impl ManagedCache for Exploding {
        fn name(&self) -> &str {
            "exploding"
        }

        fn invalidate(&self, _target: &Invalidation) -> usize {
            0
        }

        fn purge_expired(&self) -> usize {
            self.sweeps.fetch_add(1, Ordering::SeqCst);
            panic!("sweep failed");
        }

        fn stats(&self) -> CacheStats {
            CacheStats::default()
        }

        fn reset_stats(&self) {}

        fn key_strings(&self) -> Vec<String> {
            Vec::new()
        }
    }

    fn cache_with_clock(name: &str) -> (Arc<CacheEngine<String, String>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let cache = Arc::new(CacheEngine::with_clock(
            CacheOptions::new(name, Duration::from_secs(300)),
            clock.clone(),
        ));
        (cache, clock)
    }

    #[test]
    fn test_sweep_once_removes_only_expired() {
        let (cache, clock) = cache_with_clock("operations");
        cache.set("short".to_string(), "v".to_string(), Some(Duration::from_millis(100)));
        cache.set("long".to_string(), "v".to_string(), Some(Duration::from_secs(3600)));
        clock.advance(500);

        let mut registry = CacheRegistry::new();
        registry.register(cache.clone());

        assert_eq!(sweep_once(&registry), 1);
        assert_eq!(cache.keys(), vec!["long".to_string()]);
    }

    #[test]
    fn test_sweep_survives_panicking_cache() {
        let (cache, clock) = cache_with_clock("dashboard");
        cache.set("stale".to_string(), "v".to_string(), Some(Duration::from_millis(1)));
        clock.advance(10);

        let exploding = Arc::new(Exploding {
            sweeps: AtomicUsize::new(0),
        });
        let mut registry = CacheRegistry::new();
        registry.register(exploding.clone());
        registry.register(cache.clone());

        assert_eq!(sweep_once(&registry), 1);
        assert_eq!(sweep_once(&registry), 0);
        assert_eq!(exploding.sweeps.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_reaper_removes_expired_entries() {
        let cache: Arc<CacheEngine<String, String>> = Arc::new(CacheEngine::new(
            CacheOptions::new("positions", Duration::from_secs(300)),
        ));
        cache.set("expire_soon".to_string(), "value".to_string(), Some(Duration::from_millis(50)));
        cache.set("long_lived".to_string(), "value".to_string(), Some(Duration::from_secs(3600)));

        let mut registry = CacheRegistry::new();
        registry.register(cache.clone());
        let handle = spawn_reaper(Arc::new(registry), Duration::from_millis(100)).unwrap();

        tokio::time::sleep(Duration::from_millis(350)).await;

        // Removed without anyone reading it
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"long_lived".to_string()), Some("value".to_string()));

        handle.abort();
    }

    #[tokio::test]
    async fn test_reaper_keeps_running_after_panic() {
        let exploding = Arc::new(Exploding {
            sweeps: AtomicUsize::new(0),
        });
        let mut registry = CacheRegistry::new();
        registry.register(exploding.clone());

        let handle = spawn_reaper(Arc::new(registry), Duration::from_millis(50)).unwrap();
        tokio::time::sleep(Duration::from_millis(280)).await;

        assert!(exploding.sweeps.load(Ordering::SeqCst) >= 2);
        assert!(!handle.is_finished());

        handle.abort();
    }

    #[tokio::test]
    async fn test_reaper_can_be_aborted() {
        let handle = spawn_reaper(Arc::new(CacheRegistry::new()), Duration::from_secs(1)).unwrap();

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }

    #[tokio::test]
    async fn test_zero_interval_disables_reaper() {
        let (cache, clock) = cache_with_clock("dashboard");
        cache.set("stale".to_string(), "v".to_string(), Some(Duration::from_millis(1)));
        clock.advance(10);

        let mut registry = CacheRegistry::new();
        registry.register(cache.clone());

        assert!(spawn_reaper(Arc::new(registry), Duration::ZERO).is_none());
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Nothing swept it
        assert_eq!(cache.len(), 1);
    }
}
