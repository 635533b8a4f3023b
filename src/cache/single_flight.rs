//! Single-Flight Decorator
//!
//! Collapses concurrent misses on the same key into one generator run.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::OnceCell;
use tracing::debug;

use crate::cache::{CacheEngine, CacheKey};

// == Single Flight ==
/// Wraps a [`CacheEngine`] with a per-key registry of in-flight computations.
///
/// Callers that miss while another caller is already computing the same key
/// wait for that result instead of running their own generator. If the
/// running generator fails, nothing is cached and one of the waiters runs
/// its own generator next.
pub struct SingleFlight<K, V> {
    cache: Arc<CacheEngine<K, V>>,
    in_flight: Mutex<InFlight<K, V>>,
}

impl<K: CacheKey, V: Clone> SingleFlight<K, V> {
    pub fn new(cache: Arc<CacheEngine<K, V>>) -> Self {
        Self {
            cache,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// The wrapped cache, for plain reads, writes and invalidation.
    pub fn cache(&self) -> &Arc<CacheEngine<K, V>> {
        &self.cache
    }

    /// Number of keys currently being computed.
    pub fn in_flight(&self) -> usize {
        self.registry().len()
    }

    // == Get Or Compute ==
    /// Same contract as [`CacheEngine::get_or_compute`], minus the duplicate work.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: K,
        ttl: Option<Duration>,
        generator: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.cache.get(&key) {
            return Ok(value);
        }

        let cell = {
            let mut registry = self.registry();
            let pending = registry.entry(key.clone()).or_insert_with(|| Pending {
                cell: Arc::new(OnceCell::new()),
                holders: 0,
            });
            pending.holders += 1;
            pending.cell.clone()
        };
        // Releases the hold on completion and on cancellation alike
        let _hold = InFlightGuard {
            in_flight: &self.in_flight,
            key: key.clone(),
            cell: cell.clone(),
        };

        let compute_key = key;
        let result = cell
            .get_or_try_init(move || async move {
                debug!(cache = %self.cache.name(), key = %compute_key.key_string(), "computing value");
                let value = generator().await?;
                self.cache.set(compute_key, value.clone(), ttl);
                Ok(value)
            })
            .await
            .cloned();
        result
    }

    fn registry(&self) -> MutexGuard<'_, InFlight<K, V>> {
        lock_registry(&self.in_flight)
    }
}

/// A computation and the number of callers waiting on it.
struct Pending<V> {
    cell: Arc<OnceCell<V>>,
    holders: usize,
}

type InFlight<K, V> = HashMap<K, Pending<V>>;

fn lock_registry<K, V>(in_flight: &Mutex<InFlight<K, V>>) -> MutexGuard<'_, InFlight<K, V>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

// == In-Flight Guard ==
/// One caller's hold on a pending computation. The last holder to leave
/// removes the registry entry.
struct InFlightGuard<'a, K: Eq + Hash, V> {
    in_flight: &'a Mutex<InFlight<K, V>>,
    key: K,
    cell: Arc<OnceCell<V>>,
}

impl<K: Eq + Hash, V> Drop for InFlightGuard<'_, K, V> {
    fn drop(&mut self) {
        let mut registry = lock_registry(self.in_flight);

        let released = match registry.get_mut(&self.key) {
            Some(pending) if Arc::ptr_eq(&pending.cell, &self.cell) => {
                pending.holders = pending.holders.saturating_sub(1);
                pending.holders == 0
            }
            _ => false,
        };
        if released {
            registry.remove(&self.key);
        }
    }
}
