//! LFU Policy Module
//!
//! Least Frequently Used eviction with O(1) frequency-bucket migration.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use lru::LruCache;
use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, EvictionPolicy, PolicyKind, PolicyOptions};

/// Keys sharing one frequency, oldest insertion at the back.
type Bucket<K> = LruCache<K, ()>;

// == LFU Policy ==
/// Evicts the key with the lowest read count, oldest first within a count.
///
/// Three maps are kept in step:
/// - `entries`: key -> entry
/// - `frequencies`: key -> current frequency
/// - `buckets`: frequency -> keys at that frequency
pub struct LfuPolicy<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    frequencies: HashMap<K, u64>,
    buckets: HashMap<u64, Bucket<K>>,
    min_frequency: u64,
    capacity: usize,
    options: PolicyOptions,
    stats: CacheStats,
    tick: u64,
}

impl<K: Hash + Eq + Clone, V> LfuPolicy<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self::with_options(capacity, PolicyOptions::default())
    }

    pub fn with_options(capacity: usize, options: PolicyOptions) -> Self {
        Self {
            entries: HashMap::new(),
            frequencies: HashMap::new(),
            buckets: HashMap::new(),
            min_frequency: 0,
            capacity,
            options,
            stats: CacheStats::new(),
            tick: 0,
        }
    }

    /// Current frequency of `key`, starting at 1 on insertion.
    pub fn frequency(&self, key: &K) -> Option<u64> {
        self.frequencies.get(key).copied()
    }

    pub fn min_frequency(&self) -> u64 {
        self.min_frequency
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    // == Bucket Migration ==
    /// Moves `key` from its bucket to the next frequency up.
    fn bump(&mut self, key: &K) {
        let Some(freq) = self.frequencies.get_mut(key) else {
            return;
        };
        let old = *freq;
        *freq += 1;
        let new = *freq;

        if let Some(bucket) = self.buckets.get_mut(&old) {
            bucket.pop(key);
            if bucket.is_empty() {
                self.buckets.remove(&old);
                if self.min_frequency == old {
                    self.min_frequency = new;
                }
            }
        }
        self.buckets
            .entry(new)
            .or_insert_with(LruCache::unbounded)
            .push(key.clone(), ());
    }

    /// Unlinks `key` from all three maps.
    fn detach(&mut self, key: &K) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        if let Some(freq) = self.frequencies.remove(key) {
            if let Some(bucket) = self.buckets.get_mut(&freq) {
                bucket.pop(key);
                if bucket.is_empty() {
                    self.buckets.remove(&freq);
                }
            }
        }
        debug_assert_eq!(self.entries.len(), self.frequencies.len());
        Some(entry)
    }

    // == Evict ==
    /// Removes the oldest key from the lowest-frequency bucket.
    fn evict_one(&mut self) -> Option<K> {
        // Explicit removals can empty the minimum bucket without a bump.
        if !self.buckets.contains_key(&self.min_frequency) {
            self.min_frequency = self.buckets.keys().copied().min()?;
        }
        let bucket = self.buckets.get_mut(&self.min_frequency)?;
        let (key, ()) = bucket.pop_lru()?;
        if bucket.is_empty() {
            self.buckets.remove(&self.min_frequency);
        }
        self.frequencies.remove(&key);
        self.entries.remove(&key);
        Some(key)
    }
}

impl<K, V> EvictionPolicy<K, V> for LfuPolicy<K, V>
where
    K: Hash + Eq + Clone + Send,
    V: Clone + Send,
{
    fn get(&mut self, key: &K) -> Option<V> {
        let now = self.options.clock.now();
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now, self.options.expiry),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.detach(key);
            self.stats.record_expiration();
            self.stats.record_miss();
            self.stats.set_total_entries(self.entries.len());
            debug!(policy = "lfu", "expired entry removed on read");
            return None;
        }

        self.bump(key);
        let tick = self.next_tick();
        let entry = self.entries.get_mut(key)?;
        entry.touch(now, tick);
        self.stats.record_hit();
        Some(entry.value.clone())
    }

    fn put(&mut self, key: K, value: V, ttl: Option<Duration>) {
        if self.capacity == 0 {
            self.stats.record_eviction();
            debug!(policy = "lfu", "zero capacity, entry dropped");
            return;
        }

        let now = self.options.clock.now();
        let tick = self.next_tick();

        // Overwrites count as a use of the key.
        if let Some(entry) = self.entries.get_mut(&key) {
            let access_count = entry.access_count;
            *entry = CacheEntry::new(value, ttl, now, tick);
            entry.access_count = access_count;
            self.bump(&key);
            return;
        }

        if self.entries.len() >= self.capacity && self.evict_one().is_some() {
            self.stats.record_eviction();
            debug!(
                policy = "lfu",
                min_frequency = self.min_frequency,
                "evicted least frequently used entry"
            );
        }

        self.entries
            .insert(key.clone(), CacheEntry::new(value, ttl, now, tick));
        self.frequencies.insert(key.clone(), 1);
        self.buckets
            .entry(1)
            .or_insert_with(LruCache::unbounded)
            .push(key, ());
        self.min_frequency = 1;
        self.stats.set_total_entries(self.entries.len());
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.detach(key).map(|entry| entry.value);
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.frequencies.clear();
        self.buckets.clear();
        self.min_frequency = 0;
        self.stats.set_total_entries(0);
    }

    fn size(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, key: &K) -> bool {
        let now = self.options.clock.now();
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now, self.options.expiry))
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn purge_expired(&mut self) -> usize {
        let now = self.options.clock.now();
        let mode = self.options.expiry;
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now, mode))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.detach(key);
            self.stats.record_expiration();
        }
        self.stats.set_total_entries(self.entries.len());
        expired.len()
    }

    fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Lfu
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lfu_evicts_lowest_frequency() {
        let mut lfu = LfuPolicy::new(2);
        lfu.put("a", 1, None);
        lfu.put("b", 2, None);

        lfu.get(&"a");
        lfu.get(&"a");
        lfu.get(&"a");
        lfu.get(&"b");

        lfu.put("c", 3, None);

        assert!(lfu.contains(&"a"));
        assert!(!lfu.contains(&"b"));
        assert!(lfu.contains(&"c"));
        assert_eq!(lfu.frequency(&"c"), Some(1));
        assert_eq!(lfu.min_frequency(), 1);
    }

    #[test]
    fn test_lfu_tie_breaks_on_oldest_insertion() {
        let mut lfu = LfuPolicy::new(3);
        lfu.put("a", 1, None);
        lfu.put("b", 2, None);
        lfu.put("c", 3, None);

        lfu.put("d", 4, None);

        assert!(!lfu.contains(&"a"));
        assert!(lfu.contains(&"b"));
    }

    #[test]
    fn test_lfu_min_frequency_tracks_migration() {
        let mut lfu = LfuPolicy::new(2);
        lfu.put("a", 1, None);
        lfu.put("b", 2, None);

        lfu.get(&"a");
        assert_eq!(lfu.min_frequency(), 1);

        lfu.get(&"b");
        assert_eq!(lfu.min_frequency(), 2);
        assert_eq!(lfu.frequency(&"a"), Some(2));
        assert_eq!(lfu.frequency(&"b"), Some(2));
    }

    #[test]
    fn test_lfu_remove_then_evict() {
        let mut lfu = LfuPolicy::new(2);
        lfu.put("a", 1, None);
        lfu.put("b", 2, None);
        lfu.get(&"b");
        lfu.get(&"b");

        lfu.remove(&"a");
        lfu.put("c", 3, None);
        lfu.get(&"c");
        lfu.get(&"c");
        lfu.get(&"c");
        lfu.put("d", 4, None);

        assert!(!lfu.contains(&"b"));
        assert!(lfu.contains(&"c"));
        assert!(lfu.contains(&"d"));
    }

    #[test]
    fn test_lfu_overwrite_counts_as_use() {
        let mut lfu = LfuPolicy::new(2);
        lfu.put("a", 1, None);
        lfu.put("b", 2, None);
        lfu.put("a", 10, None);

        lfu.put("c", 3, None);

        assert_eq!(lfu.get(&"a"), Some(10));
        assert!(!lfu.contains(&"b"));
    }

    #[test]
    fn test_lfu_clear_resets_buckets() {
        let mut lfu = LfuPolicy::new(2);
        lfu.put("a", 1, None);
        lfu.get(&"a");

        lfu.clear();
        lfu.clear();

        assert_eq!(lfu.size(), 0);
        assert_eq!(lfu.frequency(&"a"), None);
        lfu.put("b", 2, None);
        assert_eq!(lfu.min_frequency(), 1);
    }
}
