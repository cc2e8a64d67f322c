//! LRU Policy Module
//!
//! Implements Least Recently Used eviction on top of an ordered map with
//! O(1) move-to-front.

use std::hash::Hash;
use std::time::{Duration, Instant};

use lru::LruCache;
use tracing::debug;

use crate::cache::{
    CacheEntry, CacheStats, EvictionPolicy, ExpiryMode, PolicyKind, PolicyOptions,
};

// == LRU Policy ==
/// Evicts the entry that was read or written least recently.
///
/// The underlying map keeps keys ordered by recency:
/// - Front = Most recently used
/// - Back = Least recently used
pub struct LruPolicy<K, V> {
    entries: LruCache<K, CacheEntry<V>>,
    capacity: usize,
    options: PolicyOptions,
    stats: CacheStats,
    tick: u64,
}

impl<K: Hash + Eq, V> LruPolicy<K, V> {
    // == Constructor ==
    /// Creates an empty LRU policy holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self::with_options(capacity, PolicyOptions::default())
    }

    pub fn with_options(capacity: usize, options: PolicyOptions) -> Self {
        Self {
            entries: LruCache::unbounded(),
            capacity,
            options,
            stats: CacheStats::new(),
            tick: 0,
        }
    }

    // == Peek Oldest ==
    /// Returns the key that would be evicted next.
    pub fn peek_lru(&self) -> Option<&K> {
        self.entries.peek_lru().map(|(key, _)| key)
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn sync_size(&mut self) {
        self.stats.set_total_entries(self.entries.len());
    }
}

impl<K, V> EvictionPolicy<K, V> for LruPolicy<K, V>
where
    K: Hash + Eq + Send,
    V: Clone + Send,
{
    fn get(&mut self, key: &K) -> Option<V> {
        let now = self.options.clock.now();
        let expired = match self.entries.peek(key) {
            Some(entry) => entry.is_expired(now, self.options.expiry),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.entries.pop(key);
            self.stats.record_expiration();
            self.stats.record_miss();
            self.sync_size();
            debug!(policy = "lru", "expired entry removed on read");
            return None;
        }

        let tick = self.next_tick();
        // get_mut promotes the key to the front
        let entry = self.entries.get_mut(key)?;
        entry.touch(now, tick);
        self.stats.record_hit();
        Some(entry.value.clone())
    }

    fn put(&mut self, key: K, value: V, ttl: Option<Duration>) {
        if self.capacity == 0 {
            self.stats.record_eviction();
            debug!(policy = "lru", "zero capacity, entry dropped");
            return;
        }

        let now = self.options.clock.now();
        let tick = self.next_tick();

        if let Some(entry) = self.entries.get_mut(&key) {
            *entry = CacheEntry::new(value, ttl, now, tick);
            return;
        }

        if self.entries.len() >= self.capacity && self.entries.pop_lru().is_some() {
            self.stats.record_eviction();
            debug!(policy = "lru", size = self.entries.len(), "evicted least recently used entry");
        }

        self.entries.push(key, CacheEntry::new(value, ttl, now, tick));
        self.sync_size();
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.entries.pop(key).map(|entry| entry.value);
        self.sync_size();
        removed
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.sync_size();
    }

    fn size(&self) -> usize {
        self.entries.len()
    }

    fn contains(&self, key: &K) -> bool {
        let now = self.options.clock.now();
        self.entries
            .peek(key)
            .is_some_and(|entry| !entry.is_expired(now, self.options.expiry))
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn purge_expired(&mut self) -> usize {
        let now = self.options.clock.now();
        let removed = purge_ordered(&mut self.entries, now, self.options.expiry);
        for _ in 0..removed {
            self.stats.record_expiration();
        }
        self.sync_size();
        removed
    }

    fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Lru
    }
}

// == Purge Helper ==
/// Drops expired entries from an ordered map while keeping survivor order.
///
/// Shared with the FIFO policy, which uses the same map type.
pub(crate) fn purge_ordered<K: Hash + Eq, V>(
    entries: &mut LruCache<K, CacheEntry<V>>,
    now: Instant,
    mode: ExpiryMode,
) -> usize {
    if !entries.iter().any(|(_, entry)| entry.is_expired(now, mode)) {
        return 0;
    }

    // Drain from the back so pushing survivors reproduces their order.
    let mut survivors = LruCache::unbounded();
    let mut removed = 0;
    while let Some((key, entry)) = entries.pop_lru() {
        if entry.is_expired(now, mode) {
            removed += 1;
        } else {
            survivors.push(key, entry);
        }
    }
    *entries = survivors;
    removed
}
