//! FIFO Policy Module
//!
//! Evicts in insertion order; reads never reorder.

use std::hash::Hash;
use std::time::Duration;

use lru::LruCache;
use tracing::debug;

use crate::cache::lru::purge_ordered;
use crate::cache::{CacheEntry, CacheStats, EvictionPolicy, PolicyKind, PolicyOptions};

// == FIFO Policy ==
/// Evicts the earliest inserted entry regardless of how often it is read.
///
/// Only `peek` style accessors are used on the map, so the order it keeps is
/// the insertion order.
pub struct FifoPolicy<K, V> {
    entries: LruCache<K, CacheEntry<V>>,
    capacity: usize,
    options: PolicyOptions,
    stats: CacheStats,
    tick: u64,
}

impl<K: Hash + Eq, V> FifoPolicy<K, V> {
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

    /// Returns the key that was inserted first.
    pub fn peek_oldest(&self) -> Option<&K> {
        self.entries.peek_lru().map(|(key, _)| key)
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }
}

impl<K, V> EvictionPolicy<K, V> for FifoPolicy<K, V>
where
    K: Hash + Eq + Send,
    V: Clone + Send,
{
    fn get(&mut self, key: &K) -> Option<V> {
        let now = self.options.clock.now();
        let tick = self.next_tick();
        let mode = self.options.expiry;

        let expired = match self.entries.peek_mut(key) {
            Some(entry) if !entry.is_expired(now, mode) => {
                entry.touch(now, tick);
                self.stats.record_hit();
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.pop(key);
            self.stats.record_expiration();
            self.stats.set_total_entries(self.entries.len());
            debug!(policy = "fifo", "expired entry removed on read");
        }
        self.stats.record_miss();
        None
    }

    fn put(&mut self, key: K, value: V, ttl: Option<Duration>) {
        if self.capacity == 0 {
            self.stats.record_eviction();
            debug!(policy = "fifo", "zero capacity, entry dropped");
            return;
        }

        let now = self.options.clock.now();
        self.next_tick();

        // Re-inserting keeps the original queue position.
        if let Some(entry) = self.entries.peek_mut(&key) {
            *entry = CacheEntry::new(value, ttl, now, entry.sequence);
            return;
        }

        if self.entries.len() >= self.capacity && self.entries.pop_lru().is_some() {
            self.stats.record_eviction();
            debug!(policy = "fifo", size = self.entries.len(), "evicted oldest inserted entry");
        }

        self.entries.push(key, CacheEntry::new(value, ttl, now, self.tick));
        self.stats.set_total_entries(self.entries.len());
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.entries.pop(key).map(|entry| entry.value);
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.stats.set_total_entries(0);
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
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Fifo
    }
}
