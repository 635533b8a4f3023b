//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use super::expiry;

// == Cache Entry ==
/// A cached value together with the time it was stored and its freshness window.
///
/// Each entry carries its own TTL so call sites sharing one cache can pick
/// different freshness windows.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Insertion (or last refresh) timestamp in Unix milliseconds
    pub created_at: u64,
    /// Time-to-live in milliseconds
    pub ttl_ms: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry stamped at `now`.
    pub fn new(value: V, now: u64, ttl_ms: u64) -> Self {
        Self {
            value,
            created_at: now,
            ttl_ms,
        }
    }

    // == Is Valid ==
    /// Shorthand for [`expiry::is_valid`].
    pub fn is_valid(&self, now: u64) -> bool {
        expiry::is_valid(self, now)
    }

    // == Expires At ==
    /// Timestamp from which the entry is no longer valid.
    pub fn expires_at(&self) -> u64 {
        self.created_at.saturating_add(self.ttl_ms)
    }

    // == Time To Live ==
    /// Returns the remaining TTL in milliseconds, `0` once expired.
    pub fn ttl_remaining_ms(&self, now: u64) -> u64 {
        self.expires_at().saturating_sub(now)
    }
}
