//! Expiry Policy
//!
//! Decides whether an entry is still fresh. Stateless.

use super::CacheEntry;

/// Returns `true` while `now - created_at < ttl_ms`.
///
/// Boundary condition: at exactly `created_at + ttl_ms` the entry is expired.
/// An entry stamped in the future (clock moved backwards) counts as fresh.
pub fn is_valid<V>(entry: &CacheEntry<V>, now: u64) -> bool {
    now.saturating_sub(entry.created_at) < entry.ttl_ms
}
