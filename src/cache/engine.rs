//! Cache Engine Module
//!
//! Read-through cache facade combining the entry store, expiry policy and
//! optional LRU capacity bound.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::stats::Counters;
use crate::cache::{CacheEntry, CacheKey, CacheStats, Clock, EntryStore, LruTracker, SystemClock};

// == Cache Options ==
/// Construction parameters for one cache instance.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Instance name, used in logs and diagnostics
    pub name: String,
    /// TTL applied when a call site does not pass one
    pub default_ttl: Duration,
    /// Capacity bound; `None` means unbounded
    pub max_entries: Option<usize>,
}

impl CacheOptions {
    pub fn new(name: impl Into<String>, default_ttl: Duration) -> Self {
        Self {
            name: name.into(),
            default_ttl,
            max_entries: None,
        }
    }

    /// Sets the capacity bound. Zero means unbounded.
    pub fn max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = (max_entries > 0).then_some(max_entries);
        self
    }
}

struct Inner<K, V> {
    store: EntryStore<K, V>,
    /// Only maintained when a capacity bound is set
    lru: LruTracker<K>,
}

// == Cache Engine ==
/// A single, independently configured cache.
///
/// All methods take `&self`; share an engine between tasks with `Arc`.
/// Lookups return clones of the stored value, so callers can never mutate
/// cached state. Wrap large payloads in `Arc` to keep those clones cheap.
pub struct CacheEngine<K, V> {
    name: String,
    default_ttl_ms: u64,
    max_entries: Option<usize>,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner<K, V>>,
    counters: Counters,
}

impl<K: CacheKey, V: Clone> CacheEngine<K, V> {
    // == Constructor ==
    /// Creates an engine driven by the system clock.
    pub fn new(options: CacheOptions) -> Self {
        Self::with_clock(options, Arc::new(SystemClock))
    }

    /// Creates an engine driven by an injected clock.
    pub fn with_clock(options: CacheOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: options.name,
            default_ttl_ms: duration_ms(options.default_ttl),
            max_entries: options.max_entries.filter(|&max| max > 0),
            clock,
            inner: Mutex::new(Inner {
                store: EntryStore::new(),
                lru: LruTracker::new(),
            }),
            counters: Counters::default(),
        }
    }

    // == Accessors ==
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }

    pub fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    /// Current time on this engine's clock, in Unix ms.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Zeroes the hit, miss and eviction counters. Entries are untouched.
    pub fn reset_stats(&self) {
        self.counters.reset();
        debug!(cache = %self.name, "cache counters reset");
    }

    // == Get ==
    /// Returns the value for `key` if present and fresh.
    ///
    /// A stale entry found here is removed on the spot.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now_ms();
        let mut inner = self.lock();

        // None: absent, Some(None): stale, Some(Some(v)): fresh
        let lookup = inner
            .store
            .get_raw(key)
            .map(|entry| entry.is_valid(now).then(|| entry.value.clone()));

        let fresh = match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                inner.store.remove(key);
                if self.max_entries.is_some() {
                    inner.lru.remove(key);
                }
                debug!(cache = %self.name, key = %key.key_string(), "cache entry expired");
                None
            }
            None => None,
        };

        match fresh {
            Some(value) => {
                if self.max_entries.is_some() {
                    inner.lru.touch(key);
                }
                self.counters.record_hit();
                debug!(cache = %self.name, key = %key.key_string(), "cache hit");
                Some(value)
            }
            None => {
                self.counters.record_miss();
                debug!(cache = %self.name, key = %key.key_string(), "cache miss");
                None
            }
        }
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any existing entry.
    ///
    /// # Arguments
    /// * `ttl` - Freshness window for this entry (uses the default if None)
    pub fn set(&self, key: K, value: V, ttl: Option<Duration>) {
        let ttl_ms = ttl.map(duration_ms).unwrap_or(self.default_ttl_ms);
        let now = self.clock.now_ms();
        let mut inner = self.lock();

        if let Some(max) = self.max_entries {
            if !inner.store.contains(&key) && inner.store.len() >= max {
                self.make_room(&mut inner, now, max);
            }
            inner.lru.touch(&key);
        }

        inner.store.put(key, CacheEntry::new(value, now, ttl_ms));
    }

    /// Frees at least one slot: expired entries go first, then the least
    /// recently used ones.
    fn make_room(&self, inner: &mut Inner<K, V>, now: u64, max: usize) {
        let Inner { store, lru } = inner;
        for key in store.remove_where(|_, entry| !entry.is_valid(now)) {
            lru.remove(&key);
        }

        while store.len() >= max {
            match lru.evict_oldest() {
                Some(oldest) => {
                    store.remove(&oldest);
                    self.counters.record_eviction();
                    debug!(cache = %self.name, key = %oldest.key_string(), "evicted least recently used entry");
                }
                None => break,
            }
        }
    }

    // == Get Or Compute ==
    /// Returns the cached value, or runs `generator` and caches its result.
    ///
    /// Concurrent misses on the same key may each run their generator; the
    /// last one to finish wins. Use [`SingleFlight`](crate::cache::SingleFlight)
    /// when that matters. A failing generator caches nothing and its error is
    /// returned untouched.
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
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = generator().await?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }

    /// Synchronous flavour of [`get_or_compute`](Self::get_or_compute).
    pub fn get_or_compute_sync<F, E>(
        &self,
        key: K,
        ttl: Option<Duration>,
        generator: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = generator()?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }

    // == Delete ==
    /// Removes `key`. Returns whether anything was removed; absent keys are fine.
    pub fn delete(&self, key: &K) -> bool {
        let mut inner = self.lock();
        let removed = inner.store.remove(key).is_some();
        if removed && self.max_entries.is_some() {
            inner.lru.remove(key);
        }
        removed
    }

    // == Delete By Prefix ==
    /// Removes every entry whose key string starts with `prefix`.
    ///
    /// Returns the number of entries removed.
    pub fn delete_by_prefix(&self, prefix: &str) -> usize {
        let count = self.remove_matching(|key, _| key.has_prefix(prefix));
        debug!(cache = %self.name, prefix, count, "invalidated keys by prefix");
        count
    }

    /// Removes the entry whose key renders as `key`.
    ///
    /// Lets code that only knows the string form of a key (HTTP handlers,
    /// invalidation rules) target typed keys such as numeric basket ids.
    pub fn delete_by_key_string(&self, key: &str) -> usize {
        match K::from_key_string(key) {
            Some(typed) => usize::from(self.delete(&typed)),
            None => self.remove_matching(|candidate, _| candidate.key_string() == key),
        }
    }

    // == Clear ==
    /// Removes all entries. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut inner = self.lock();
        inner.lru.clear();
        let count = inner.store.clear();
        debug!(cache = %self.name, count, "cache cleared");
        count
    }

    // == Purge Expired ==
    /// Removes all entries past their TTL. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_ms();
        self.remove_matching(|_, entry| !entry.is_valid(now))
    }

    fn remove_matching<F>(&self, predicate: F) -> usize
    where
        F: FnMut(&K, &CacheEntry<V>) -> bool,
    {
        let mut inner = self.lock();
        let removed = inner.store.remove_where(predicate);
        if self.max_entries.is_some() {
            for key in &removed {
                inner.lru.remove(key);
            }
        }
        removed.len()
    }

    // == Keys ==
    /// Snapshot of the stored keys, stale ones included.
    pub fn keys(&self) -> Vec<K> {
        self.lock().store.keys()
    }

    // == Length ==
    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().store.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Inner<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K: CacheKey, V: Clone + Serialize> CacheEngine<K, V> {
    // == Stats ==
    /// Diagnostic snapshot. Does not remove expired entries.
    ///
    /// Values are cloned under the lock and serialized after it is released.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now_ms();
        let (total_entries, valid_entries, snapshot) = {
            let inner = self.lock();
            let valid_entries = inner
                .store
                .iter()
                .filter(|(_, entry)| entry.is_valid(now))
                .count();
            let snapshot: Vec<(K, V)> = inner
                .store
                .iter()
                .map(|(key, entry)| (key.clone(), entry.value.clone()))
                .collect();
            (inner.store.len(), valid_entries, snapshot)
        };

        let approx_size_bytes = snapshot.iter().try_fold(0usize, |acc, (key, value)| {
            serde_json::to_vec(value).map(|bytes| acc + key.key_string().len() + bytes.len())
        });
        let approx_size_bytes = match approx_size_bytes {
            Ok(size) => Some(size),
            Err(err) => {
                warn!(cache = %self.name, error = %err, "could not estimate cache size");
                None
            }
        };

        CacheStats {
            name: self.name.clone(),
            total_entries,
            valid_entries,
            expired_entries: total_entries - valid_entries,
            approx_size_bytes,
            hits: self.counters.hits(),
            misses: self.counters.misses(),
            evictions: self.counters.evictions(),
        }
    }
}

impl<K, V> std::fmt::Debug for CacheEngine<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEngine")
            .field("name", &self.name)
            .field("default_ttl_ms", &self.default_ttl_ms)
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
