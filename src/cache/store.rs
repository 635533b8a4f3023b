//! Entry Store Module
//!
//! Plain key to entry map. Holds no policy: TTL checks live in the engine.

use std::collections::HashMap;

use crate::cache::{CacheEntry, CacheKey};

// == Entry Store ==
/// Owns every [`CacheEntry`] of one cache instance.
#[derive(Debug)]
pub struct EntryStore<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
}

impl<K: CacheKey, V> EntryStore<K, V> {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    // == Put ==
    /// Inserts or replaces the entry for `key`, returning the previous one.
    pub fn put(&mut self, key: K, entry: CacheEntry<V>) -> Option<CacheEntry<V>> {
        self.entries.insert(key, entry)
    }

    // == Get Raw ==
    /// Returns the stored entry without evaluating its TTL.
    pub fn get_raw(&self, key: &K) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    // == Remove ==
    /// Removes the entry for `key`. Absent keys are a no-op.
    pub fn remove(&mut self, key: &K) -> Option<CacheEntry<V>> {
        self.entries.remove(key)
    }

    // == Remove Where ==
    /// Removes every entry matching `predicate` and returns the removed keys.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> Vec<K>
    where
        F: FnMut(&K, &CacheEntry<V>) -> bool,
    {
        let doomed: Vec<K> = self
            .entries
            .iter()
            .filter(|(key, entry)| predicate(key, entry))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            self.entries.remove(key);
        }

        doomed
    }

    // == Keys ==
    /// Snapshot of all current keys.
    pub fn keys(&self) -> Vec<K> {
        self.entries.keys().cloned().collect()
    }

    // == Iter ==
    pub fn iter(&self) -> impl Iterator<Item = (&K, &CacheEntry<V>)> {
        self.entries.iter()
    }

    // == Clear ==
    /// Drops every entry and returns how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    // == Contains ==
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    // == Length ==
    /// Returns the number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: CacheKey, V> Default for EntryStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
