//! Cache Statistics Module
//!
//! Diagnostic snapshot of one cache instance plus running hit/miss counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

// == Cache Stats ==
/// Point-in-time view of a cache.
///
/// `expired_entries` counts entries that are past their TTL at snapshot time
/// but not yet removed; taking a snapshot never removes anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Cache instance name
    pub name: String,
    /// Entries physically stored
    pub total_entries: usize,
    /// Stored entries still within their TTL
    pub valid_entries: usize,
    /// Stored entries past their TTL
    pub expired_entries: usize,
    /// Serialized size of keys and values, `None` when it could not be computed
    pub approx_size_bytes: Option<usize>,
    /// Number of lookups served from the cache
    pub hits: u64,
    /// Number of lookups that found nothing fresh
    pub misses: u64,
    /// Entries evicted to respect the capacity bound
    pub evictions: u64,
}

impl CacheStats {
    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Counters ==
/// Lock-free hit/miss/eviction counters shared by all readers of a cache.
#[derive(Debug, Default)]
pub struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl Counters {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
    }
}
