//! Invalidation Module
//!
//! Ties data mutations to the cache entries they make stale.
//!
//! # Pieces
//! - `CacheRegistry`: every cache instance, reachable by name
//! - `InvalidationRules`: mutation kind to affected caches and key families
//! - `Invalidator`: applies the rules, then notifies subscribers

mod invalidator;
mod registry;
mod rules;

pub use invalidator::{InvalidationOutcome, Invalidator, NOTIFICATION_CAPACITY};
pub use registry::{CacheRegistry, Invalidation, ManagedCache};
pub use rules::{Action, Entity, InvalidationRules, MutationEvent, Scope, Target};
