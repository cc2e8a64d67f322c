//! Invalidation Policy Module
//!
//! Eviction selection rules that operate on the manager's shared entry map
//! instead of policy-private structures.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::{Duration, Instant};

use crate::cache::{CacheEntry, ExpiryMode, PolicyKind, DEFAULT_TTL};
use crate::error::Result;

// == Invalidation Policy Trait ==
/// Strategy object consulted by `InvalidationManager`.
pub trait InvalidationPolicy<K, V>: Debug + Send {
    /// True if `entry` must be dropped instead of served.
    fn should_evict(&self, entry: &CacheEntry<V>, now: Instant) -> bool;

    /// Picks the key to drop when the manager is full.
    ///
    /// Returns None only for an empty map.
    fn select_for_eviction(&self, entries: &HashMap<K, CacheEntry<V>>, now: Instant) -> Option<K>;

    /// Short lowercase strategy name, as reported by the manager's stats.
    fn name(&self) -> &'static str;

    /// TTL the manager applies when a caller passes none.
    fn default_ttl(&self) -> Option<Duration> {
        None
    }
}

/// Oldest-inserted expired entry, if any.
fn first_expired<K, V>(
    entries: &HashMap<K, CacheEntry<V>>,
    now: Instant,
    mode: ExpiryMode,
) -> Option<K>
where
    K: Clone,
{
    entries
        .iter()
        .filter(|(_, entry)| entry.is_expired(now, mode))
        .min_by_key(|(_, entry)| entry.sequence)
        .map(|(key, _)| key.clone())
}

fn select_min_by<K, V, O>(
    entries: &HashMap<K, CacheEntry<V>>,
    now: Instant,
    mode: ExpiryMode,
    order: impl Fn(&CacheEntry<V>) -> O,
) -> Option<K>
where
    K: Clone,
    O: Ord,
{
    first_expired(entries, now, mode).or_else(|| {
        entries
            .iter()
            .min_by_key(|(_, entry)| order(entry))
            .map(|(key, _)| key.clone())
    })
}

// == TTL ==
/// Expired entries first, then the nearest expiry. Entries without a
/// deadline go last, oldest insertion first.
///
/// Writes without a TTL get `default_ttl`, one hour unless configured.
#[derive(Debug, Clone, Copy)]
pub struct TtlInvalidation {
    pub expiry: ExpiryMode,
    pub default_ttl: Duration,
}

impl Default for TtlInvalidation {
    fn default() -> Self {
        Self {
            expiry: ExpiryMode::default(),
            default_ttl: DEFAULT_TTL,
        }
    }
}

impl<K, V> InvalidationPolicy<K, V> for TtlInvalidation
where
    K: Hash + Eq + Clone + Send,
{
    fn should_evict(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        entry.is_expired(now, self.expiry)
    }

    fn select_for_eviction(&self, entries: &HashMap<K, CacheEntry<V>>, _now: Instant) -> Option<K> {
        entries
            .iter()
            .min_by_key(|(_, entry)| {
                let deadline = entry.expires_at(self.expiry);
                (deadline.is_none(), deadline, entry.sequence)
            })
            .map(|(key, _)| key.clone())
    }

    fn name(&self) -> &'static str {
        "ttl"
    }

    fn default_ttl(&self) -> Option<Duration> {
        Some(self.default_ttl)
    }
}

// == LRU ==
/// Expired entries first, then the least recently read or written.
#[derive(Debug, Clone, Copy, Default)]
pub struct LruInvalidation {
    pub expiry: ExpiryMode,
}

impl<K, V> InvalidationPolicy<K, V> for LruInvalidation
where
    K: Hash + Eq + Clone + Send,
{
    fn should_evict(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        entry.is_expired(now, self.expiry)
    }

    fn select_for_eviction(&self, entries: &HashMap<K, CacheEntry<V>>, now: Instant) -> Option<K> {
        select_min_by(entries, now, self.expiry, |entry| {
            (entry.last_accessed, entry.touched)
        })
    }

    fn name(&self) -> &'static str {
        "lru"
    }
}

// == LFU ==
/// Lowest access count; ties go to the oldest insertion.
#[derive(Debug, Clone, Copy, Default)]
pub struct LfuInvalidation {
    pub expiry: ExpiryMode,
}

impl<K, V> InvalidationPolicy<K, V> for LfuInvalidation
where
    K: Hash + Eq + Clone + Send,
{
    fn should_evict(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        entry.is_expired(now, self.expiry)
    }

    fn select_for_eviction(&self, entries: &HashMap<K, CacheEntry<V>>, now: Instant) -> Option<K> {
        select_min_by(entries, now, self.expiry, |entry| {
            (entry.access_count, entry.sequence)
        })
    }

    fn name(&self) -> &'static str {
        "lfu"
    }
}

// == FIFO ==
/// Expired entries first, then the oldest insertion. Reads and overwrites
/// never change an entry's position.
#[derive(Debug, Clone, Copy, Default)]
pub struct FifoInvalidation {
    pub expiry: ExpiryMode,
}

impl<K, V> InvalidationPolicy<K, V> for FifoInvalidation
where
    K: Hash + Eq + Clone + Send,
{
    fn should_evict(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        entry.is_expired(now, self.expiry)
    }

    fn select_for_eviction(&self, entries: &HashMap<K, CacheEntry<V>>, now: Instant) -> Option<K> {
        select_min_by(entries, now, self.expiry, |entry| entry.sequence)
    }

    fn name(&self) -> &'static str {
        "fifo"
    }
}

// == Factory ==
impl PolicyKind {
    /// The invalidation counterpart of this eviction strategy.
    ///
    /// `default_ttl` only matters to the TTL strategy.
    pub fn invalidation_policy<K, V>(
        self,
        expiry: ExpiryMode,
        default_ttl: Duration,
    ) -> Box<dyn InvalidationPolicy<K, V>>
    where
        K: Hash + Eq + Clone + Send + 'static,
        V: 'static,
    {
        match self {
            PolicyKind::Ttl => Box::new(TtlInvalidation {
                expiry,
                default_ttl,
            }),
            PolicyKind::Lru => Box::new(LruInvalidation { expiry }),
            PolicyKind::Lfu => Box::new(LfuInvalidation { expiry }),
            PolicyKind::Fifo => Box::new(FifoInvalidation { expiry }),
        }
    }
}

/// Builds an invalidation policy by name (`ttl`, `lru`, `lfu`, `fifo`).
pub fn create_invalidation_policy<K, V>(name: &str) -> Result<Box<dyn InvalidationPolicy<K, V>>>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: 'static,
{
    let kind: PolicyKind = name.parse()?;
    Ok(kind.invalidation_policy(ExpiryMode::default(), DEFAULT_TTL))
}
