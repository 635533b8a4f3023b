//! Cache Registry
//!
//! Type-erased handles to every cache instance of the application, so the
//! reaper, the invalidator and the admin API can reach them by name.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{CacheEngine, CacheKey, CacheStats};

// == Invalidation ==
/// What to drop from a cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "value", rename_all = "snake_case")]
pub enum Invalidation {
    /// One key, given in its string form
    Key(String),
    /// Every key starting with the prefix
    Prefix(String),
    /// Everything
    All,
}

// == Managed Cache ==
/// Operations every registered cache supports regardless of its key and value types.
pub trait ManagedCache: Send + Sync {
    fn name(&self) -> &str;

    /// Applies an invalidation and returns the number of entries removed.
    fn invalidate(&self, target: &Invalidation) -> usize;

    /// Removes expired entries and returns the number removed.
    fn purge_expired(&self) -> usize;

    fn stats(&self) -> CacheStats;

    /// Zeroes the hit, miss and eviction counters.
    fn reset_stats(&self);

    /// Snapshot of the stored keys in string form.
    fn key_strings(&self) -> Vec<String>;
}

impl<K, V> ManagedCache for CacheEngine<K, V>
where
    K: CacheKey,
    V: Clone + Serialize + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        CacheEngine::name(self)
    }

    fn invalidate(&self, target: &Invalidation) -> usize {
        match target {
            Invalidation::Key(key) => self.delete_by_key_string(key),
            Invalidation::Prefix(prefix) => self.delete_by_prefix(prefix),
            Invalidation::All => self.clear(),
        }
    }

    fn purge_expired(&self) -> usize {
        CacheEngine::purge_expired(self)
    }

    fn stats(&self) -> CacheStats {
        CacheEngine::stats(self)
    }

    fn reset_stats(&self) {
        CacheEngine::reset_stats(self)
    }

    fn key_strings(&self) -> Vec<String> {
        self.keys().iter().map(CacheKey::key_string).collect()
    }
}

// == Cache Registry ==
/// Named caches in registration order.
#[derive(Default, Clone)]
pub struct CacheRegistry {
    caches: Vec<Arc<dyn ManagedCache>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a cache. A cache registered under an existing name replaces it.
    pub fn register(&mut self, cache: Arc<dyn ManagedCache>) {
        self.caches.retain(|existing| existing.name() != cache.name());
        self.caches.push(cache);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ManagedCache>> {
        self.caches.iter().find(|c| c.name() == name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.caches.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ManagedCache>> {
        self.caches.iter()
    }

    /// Stats of every cache, in registration order.
    pub fn stats(&self) -> Vec<CacheStats> {
        self.caches.iter().map(|c| c.stats()).collect()
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheRegistry")
            .field("caches", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheOptions;
    use std::time::Duration;

    fn engine<K: CacheKey>(name: &str) -> Arc<CacheEngine<K, String>> {
        Arc::new(CacheEngine::new(CacheOptions::new(name, Duration::from_secs(60))))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = CacheRegistry::new();
        registry.register(engine::<String>("operations"));
        registry.register(engine::<u64>("positions"));

        assert_eq!(registry.names(), vec!["operations", "positions"]);
        assert!(registry.get("positions").is_some());
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn test_register_same_name_replaces() {
        let mut registry = CacheRegistry::new();
        registry.register(engine::<String>("operations"));
        registry.register(engine::<String>("operations"));

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalidate_through_trait_object() {
        let positions = engine::<u64>("positions");
        positions.set(12, "a".to_string(), None);
        positions.set(13, "b".to_string(), None);
        positions.set(7, "c".to_string(), None);

        let managed: Arc<dyn ManagedCache> = positions.clone();

        assert_eq!(managed.invalidate(&Invalidation::Key("12".to_string())), 1);
        assert_eq!(managed.invalidate(&Invalidation::Prefix("1".to_string())), 1);
        assert_eq!(managed.key_strings(), vec!["7".to_string()]);
        assert_eq!(managed.invalidate(&Invalidation::All), 1);
        assert_eq!(managed.stats().total_entries, 0);
    }

    #[test]
    fn test_registry_stats_order() {
        let mut registry = CacheRegistry::new();
        let ops = engine::<String>("operations");
        ops.set("operations__".to_string(), "[]".to_string(), None);
        registry.register(ops);
        registry.register(engine::<String>("dashboard"));

        let stats = registry.stats();
        assert_eq!(stats[0].name, "operations");
        assert_eq!(stats[0].total_entries, 1);
        assert_eq!(stats[1].name, "dashboard");
    }

    #[test]
    fn test_invalidation_serialize() {
        let json = serde_json::to_value(Invalidation::Prefix("basket:".to_string())).unwrap();
        assert_eq!(json["scope"], "prefix");
        assert_eq!(json["value"], "basket:");

        let json = serde_json::to_value(Invalidation::All).unwrap();
        assert_eq!(json["scope"], "all");
    }
}
