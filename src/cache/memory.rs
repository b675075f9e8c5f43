use std::hash::Hash;

use dashmap::DashMap;

use crate::cache::Cache;
use crate::config::CacheConfig;

/// Concurrent in-process cache.
///
/// Computation runs outside any shard lock, so `compute` may itself use the
/// cache. When two callers race on an absent key the first insert wins and both
/// get the stored value. A bounded cache evicts an arbitrary entry to make room,
/// so a computed value is always stored; under concurrent inserts the size may
/// briefly overshoot the bound.
pub struct MemoryCache<K, V> {
    entries: DashMap<K, V>,
    max_entries: Option<usize>,
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: None,
        }
    }

    /// Holds at most `max_entries`, evicting an existing entry to store a new one
    pub fn bounded(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: Some(max_entries),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        match config.max_entries {
            Some(max) => Self::bounded(max),
            None => Self::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    fn is_full(&self) -> bool {
        self.max_entries.is_some_and(|max| self.entries.len() >= max)
    }
}

impl<K, V> Default for MemoryCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash + Clone,
{
    fn evict_one(&self) {
        // Clone the key first; the iterator holds a shard read lock
        let victim = self.entries.iter().next().map(|entry| entry.key().clone());
        if let Some(victim) = victim {
            self.entries.remove(&victim);
        }
    }
}

impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn get_or_put<E, F>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
    {
        // Fast path: no lock held past the lookup
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = compute(&key)?;

        if self.is_full() && !self.entries.contains_key(&key) {
            tracing::trace!("Cache full ({} entries), evicting one", self.entries.len());
            self.evict_one();
        }

        Ok(self.entries.entry(key).or_insert(value).value().clone())
    }

    fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    fn clear(&self) {
        self.entries.clear();
    }
}
