//! TTL Policy Module
//!
//! Expiry-ordered eviction backed by a min-heap of deadlines with lazy cleanup.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::cache::{
    CacheEntry, CacheStats, EvictionPolicy, ExpiryMode, PolicyKind, PolicyOptions,
};

/// Heap rebuild threshold: stale items beyond this multiple of live entries.
const COMPACTION_FACTOR: usize = 2;

// == Deadline ==
/// A heap item recording when an entry version expires.
///
/// Items may outlive the entry they were pushed for (overwrite, removal,
/// sliding refresh); `TtlPolicy::is_live` filters those out. `at` is None
/// for a TTL too long to represent; such items sort after every deadline.
#[derive(Debug)]
struct Deadline<K> {
    at: Option<Instant>,
    sequence: u64,
    key: K,
}

impl<K> PartialEq for Deadline<K> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.sequence == other.sequence
    }
}

impl<K> Eq for Deadline<K> {}

impl<K> PartialOrd for Deadline<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Deadline<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        let order = match (self.at, other.at) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        order.then_with(|| self.sequence.cmp(&other.sequence))
    }
}

// == TTL Policy ==
/// Evicts expired entries first and otherwise the entry closest to expiring.
///
/// Every entry gets a TTL; callers that pass none get `default_ttl`.
pub struct TtlPolicy<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    heap: BinaryHeap<Reverse<Deadline<K>>>,
    capacity: usize,
    options: PolicyOptions,
    stats: CacheStats,
    tick: u64,
}

impl<K: Hash + Eq + Clone, V> TtlPolicy<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self::with_options(capacity, PolicyOptions::default())
    }

    pub fn with_options(capacity: usize, options: PolicyOptions) -> Self {
        Self {
            entries: HashMap::new(),
            heap: BinaryHeap::new(),
            capacity,
            options,
            stats: CacheStats::new(),
            tick: 0,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.options.default_ttl
    }

    /// Number of heap items, live and stale.
    pub fn heap_len(&self) -> usize {
        self.heap.len()
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn push_deadline(&mut self, key: K) {
        let Some(entry) = self.entries.get(&key) else {
            return;
        };
        // Every live entry needs an item, or capacity eviction loses track of it.
        let at = entry.expires_at(self.options.expiry);
        let sequence = entry.sequence;
        self.heap.push(Reverse(Deadline { at, sequence, key }));
    }

    // == Tombstone Check ==
    /// True if `item` still describes the current state of its entry.
    fn is_live(&self, item: &Deadline<K>) -> bool {
        self.entries.get(&item.key).is_some_and(|entry| {
            entry.sequence == item.sequence
                && entry.expires_at(self.options.expiry) == item.at
        })
    }

    // == Lazy Cleanup ==
    /// Pops every heap item whose deadline has passed, removing live ones.
    fn cleanup(&mut self, now: Instant) -> usize {
        let mut removed = 0;
        while let Some(Reverse(top)) = self.heap.peek() {
            match top.at {
                Some(at) if now > at => {}
                _ => break,
            }
            let Some(Reverse(item)) = self.heap.pop() else {
                break;
            };
            if self.is_live(&item) {
                self.entries.remove(&item.key);
                self.stats.record_expiration();
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(policy = "ttl", removed, "expired entries removed");
            self.stats.set_total_entries(self.entries.len());
        }
        self.maybe_compact();
        removed
    }

    /// Rebuilds the heap from live entries once stale items dominate it.
    fn maybe_compact(&mut self) {
        if self.heap.len() <= COMPACTION_FACTOR * self.entries.len() + 16 {
            return;
        }
        let mode = self.options.expiry;
        self.heap = self
            .entries
            .iter()
            .map(|(key, entry)| {
                Reverse(Deadline {
                    at: entry.expires_at(mode),
                    sequence: entry.sequence,
                    key: key.clone(),
                })
            })
            .collect();
    }

    // == Capacity Eviction ==
    /// Removes the live entry with the nearest deadline.
    fn evict_nearest(&mut self) -> bool {
        while let Some(Reverse(item)) = self.heap.pop() {
            if self.is_live(&item) {
                self.entries.remove(&item.key);
                return true;
            }
        }
        assert!(
            self.entries.is_empty(),
            "ttl heap lost track of {} live entries",
            self.entries.len()
        );
        false
    }
}

impl<K, V> EvictionPolicy<K, V> for TtlPolicy<K, V>
where
    K: Hash + Eq + Clone + Send,
    V: Clone + Send,
{
    fn get(&mut self, key: &K) -> Option<V> {
        let now = self.options.clock.now();
        self.cleanup(now);

        let mode = self.options.expiry;
        let tick = self.next_tick();
        let Some(entry) = self.entries.get_mut(key) else {
            self.stats.record_miss();
            return None;
        };

        // Cleanup already dropped anything past its deadline.
        debug_assert!(!entry.is_expired(now, mode));
        let before = entry.expires_at(mode);
        entry.touch(now, tick);
        let value = entry.value.clone();
        let refreshed = entry.expires_at(mode) != before;

        self.stats.record_hit();
        if refreshed {
            self.push_deadline(key.clone());
        }
        Some(value)
    }

    fn put(&mut self, key: K, value: V, ttl: Option<Duration>) {
        let now = self.options.clock.now();
        self.cleanup(now);

        if self.capacity == 0 {
            self.stats.record_eviction();
            debug!(policy = "ttl", "zero capacity, entry dropped");
            return;
        }

        let ttl = ttl.unwrap_or(self.options.default_ttl);
        let tick = self.next_tick();

        // An overwrite gets a new sequence, orphaning its old heap item.
        if !self.entries.contains_key(&key)
            && self.entries.len() >= self.capacity
            && self.evict_nearest()
        {
            self.stats.record_eviction();
            debug!(policy = "ttl", size = self.entries.len(), "evicted entry nearest to expiry");
        }

        self.entries
            .insert(key.clone(), CacheEntry::new(value, Some(ttl), now, tick));
        self.push_deadline(key);
        self.stats.set_total_entries(self.entries.len());
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let removed = self.entries.remove(key).map(|entry| entry.value);
        self.stats.set_total_entries(self.entries.len());
        self.maybe_compact();
        removed
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.heap.clear();
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
        self.cleanup(now)
    }

    fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Ttl
    }
}

impl<K: Hash + Eq + Clone, V> TtlPolicy<K, V> {
    /// Remaining lifetime of `key`, or None if absent.
    pub fn ttl_remaining(&self, key: &K) -> Option<Duration> {
        let now = self.options.clock.now();
        self.entries
            .get(key)
            .and_then(|entry| entry.ttl_remaining(now, self.options.expiry))
    }

    pub fn expiry_mode(&self) -> ExpiryMode {
        self.options.expiry
    }
}
