//! LRU Tracker Module
//!
//! Recency order used when a cache instance has a capacity bound.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

// == LRU Tracker ==
/// Tracks access order for LRU eviction.
///
/// Every touch stamps the key with a fresh tick; the smallest tick is the
/// least recently used key. Touch, remove and evict are `O(log n)`.
#[derive(Debug)]
pub struct LruTracker<K> {
    next_tick: u64,
    ticks: HashMap<K, u64>,
    by_tick: BTreeMap<u64, K>,
}

impl<K: Eq + Hash + Clone> LruTracker<K> {
    pub fn new() -> Self {
        Self {
            next_tick: 0,
            ticks: HashMap::new(),
            by_tick: BTreeMap::new(),
        }
    }

    // == Touch ==
    /// Marks a key as most recently used, adding it if untracked.
    pub fn touch(&mut self, key: &K) {
        let tick = self.next_tick;
        self.next_tick += 1;

        if let Some(previous) = self.ticks.insert(key.clone(), tick) {
            self.by_tick.remove(&previous);
        }
        self.by_tick.insert(tick, key.clone());
    }

    // == Remove ==
    /// Stops tracking a key. Untracked keys are ignored.
    pub fn remove(&mut self, key: &K) {
        if let Some(tick) = self.ticks.remove(key) {
            self.by_tick.remove(&tick);
        }
    }

    // == Evict Oldest ==
    /// Removes and returns the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<K> {
        let (_, key) = self.by_tick.pop_first()?;
        self.ticks.remove(&key);
        Some(key)
    }

    pub fn peek_oldest(&self) -> Option<&K> {
        self.by_tick.values().next()
    }

    pub fn clear(&mut self) {
        self.ticks.clear();
        self.by_tick.clear();
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.ticks.contains_key(key)
    }
}

impl<K: Eq + Hash + Clone> Default for LruTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn k(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn test_new_tracker_is_empty() {
        let lru: LruTracker<String> = LruTracker::new();
        assert!(lru.is_empty());
        assert_eq!(lru.peek_oldest(), None);
    }

    #[test]
    fn test_touch_existing_key_moves_it_to_newest() {
        let mut lru = LruTracker::new();

        lru.touch(&k("key1"));
        lru.touch(&k("key2"));
        lru.touch(&k("key3"));
        lru.touch(&k("key1"));

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.peek_oldest(), Some(&k("key2")));
    }

    #[test]
    fn test_evict_in_recency_order() {
        let mut lru = LruTracker::new();
        lru.touch(&1u64);
        lru.touch(&2u64);
        lru.touch(&3u64);
        lru.touch(&1u64);

        assert_eq!(lru.evict_oldest(), Some(2));
        assert_eq!(lru.evict_oldest(), Some(3));
        assert_eq!(lru.evict_oldest(), Some(1));
        assert_eq!(lru.evict_oldest(), None);
        assert!(lru.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut lru = LruTracker::new();
        lru.touch(&k("key1"));
        lru.touch(&k("key2"));

        lru.remove(&k("key1"));
        lru.remove(&k("nonexistent"));

        assert_eq!(lru.len(), 1);
        assert!(!lru.contains(&k("key1")));
        assert_eq!(lru.evict_oldest(), Some(k("key2")));
    }

    #[test]
    fn test_clear() {
        let mut lru = LruTracker::new();
        lru.touch(&k("a"));
        lru.touch(&k("b"));

        lru.clear();

        assert!(lru.is_empty());
        assert_eq!(lru.evict_oldest(), None);
    }
}
