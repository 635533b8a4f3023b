//! Cache Module
//!
//! Read-through in-memory caching with per-entry TTL, lazy and periodic
//! expiry, prefix invalidation and an optional LRU capacity bound.

mod clock;
mod engine;
mod entry;
pub mod expiry;
mod key;
mod lru;
mod single_flight;
mod stats;
mod store;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use engine::{CacheEngine, CacheOptions};
pub use entry::CacheEntry;
pub use key::{filter_key, normalize_query, CacheKey};
pub use lru::LruTracker;
pub use single_flight::SingleFlight;
pub use stats::CacheStats;
pub use store::EntryStore;
