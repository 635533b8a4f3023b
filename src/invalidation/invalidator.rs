//! Invalidator
//!
//! Applies the declared rules for a mutation, then fans the event out to
//! notification subscribers (e.g. a client push channel).

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{CacheRegistry, Invalidation, InvalidationRules, MutationEvent};

/// Default buffer of the notification channel.
pub const NOTIFICATION_CAPACITY: usize = 256;

// == Invalidation Outcome ==
/// What one rule did to one cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvalidationOutcome {
    pub cache: String,
    pub target: Invalidation,
    pub removed: usize,
}

// == Invalidator ==
/// Entry point for write paths: publish a mutation, stale entries disappear.
#[derive(Debug, Clone)]
pub struct Invalidator {
    registry: Arc<CacheRegistry>,
    rules: Arc<InvalidationRules>,
    notifications: broadcast::Sender<MutationEvent>,
}

impl Invalidator {
    pub fn new(registry: Arc<CacheRegistry>, rules: InvalidationRules) -> Self {
        Self::with_capacity(registry, rules, NOTIFICATION_CAPACITY)
    }

    pub fn with_capacity(
        registry: Arc<CacheRegistry>,
        rules: InvalidationRules,
        capacity: usize,
    ) -> Self {
        for cache in rules.caches() {
            if registry.get(cache).is_none() {
                warn!(cache, "invalidation rule refers to an unregistered cache");
            }
        }

        let (notifications, _) = broadcast::channel(capacity.max(1));
        Self {
            registry,
            rules: Arc::new(rules),
            notifications,
        }
    }

    pub fn registry(&self) -> &Arc<CacheRegistry> {
        &self.registry
    }

    /// Receives every published mutation after its caches were invalidated.
    ///
    /// Slow receivers may observe `RecvError::Lagged`; the caches are already
    /// consistent by then, only notifications were dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<MutationEvent> {
        self.notifications.subscribe()
    }

    // == Publish ==
    /// Invalidates every cache the rules tie to `event`, then notifies subscribers.
    ///
    /// Invalidation is synchronous: a read issued after this returns misses.
    pub fn publish(&self, event: MutationEvent) -> Vec<InvalidationOutcome> {
        let outcomes = self.apply(&event);

        let removed: usize = outcomes.iter().map(|o| o.removed).sum();
        info!(
            entity = ?event.entity,
            action = ?event.action,
            caches = outcomes.len(),
            removed,
            "mutation published"
        );

        if self.notifications.send(event).is_err() {
            debug!("no notification subscribers");
        }

        outcomes
    }

    fn apply(&self, event: &MutationEvent) -> Vec<InvalidationOutcome> {
        self.rules
            .targets(event.entity)
            .iter()
            .filter_map(|rule| {
                let cache = self.registry.get(&rule.cache)?;
                let target = rule.resolve(event);
                let removed = cache.invalidate(&target);
                debug!(cache = %rule.cache, ?target, removed, "cache invalidated");
                Some(InvalidationOutcome {
                    cache: rule.cache.clone(),
                    target,
                    removed,
                })
            })
            .collect()
    }
}
