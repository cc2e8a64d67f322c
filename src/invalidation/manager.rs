//! Invalidation Manager Module
//!
//! A bounded cache with tag-indexed bulk invalidation and namespace version
//! counters, evicting through a pluggable `InvalidationPolicy`.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::ReentrantMutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, ExpiryMode, PolicyKind, DEFAULT_TTL};
use crate::clock::{system_clock, Clock};
use crate::config::Config;
use crate::error::Result;
use crate::invalidation::InvalidationPolicy;
use crate::tasks::ExpirySweep;

// == Stats ==
/// Point-in-time snapshot of a manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidationStats {
    pub size: usize,
    pub max_size: usize,
    /// Number of non-empty tag buckets
    pub tag_count: usize,
    /// Namespaces with a version counter, including bumped-but-unused ones
    pub namespace_count: usize,
    pub policy: String,
}

// == State ==
struct Inner<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    tag_index: HashMap<String, HashSet<K>>,
    versions: HashMap<String, u64>,
    policy: Box<dyn InvalidationPolicy<K, V>>,
    max_size: usize,
    tick: u64,
}

impl<K, V> Inner<K, V>
where
    K: Hash + Eq + Clone,
{
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Removes `key` from the primary map and every tag bucket it is in.
    fn remove_entry(&mut self, key: &K) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        for tag in &entry.tags {
            if let Some(bucket) = self.tag_index.get_mut(tag) {
                bucket.remove(key);
                if bucket.is_empty() {
                    self.tag_index.remove(tag);
                }
            }
        }
        Some(entry)
    }

    fn insert_entry(&mut self, key: K, entry: CacheEntry<V>) {
        for tag in &entry.tags {
            self.tag_index
                .entry(tag.clone())
                .or_default()
                .insert(key.clone());
        }
        self.entries.insert(key, entry);
    }

    fn current_version(&self, namespace: &str) -> u64 {
        self.versions.get(namespace).copied().unwrap_or(0)
    }

    /// Tag-index integrity: every bucket is non-empty, every indexed key is
    /// stored and carries that tag, and every stored tag is indexed.
    fn is_consistent(&self) -> bool {
        let indexed = self.tag_index.iter().all(|(tag, keys)| {
            !keys.is_empty()
                && keys.iter().all(|key| {
                    self.entries
                        .get(key)
                        .is_some_and(|entry| entry.tags.contains(tag))
                })
        });
        let covered = self.entries.iter().all(|(key, entry)| {
            entry.tags.iter().all(|tag| {
                self.tag_index
                    .get(tag)
                    .is_some_and(|keys| keys.contains(key))
            })
        });
        indexed && covered
    }
}

// == Invalidation Manager ==
/// Shared, clonable cache with tag and version invalidation.
///
/// Like `Cache`, every call takes the instance's reentrant lock.
pub struct InvalidationManager<K, V> {
    inner: Arc<ReentrantMutex<RefCell<Inner<K, V>>>>,
    clock: Arc<dyn Clock>,
}

impl<K, V> InvalidationManager<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    // == Constructors ==
    /// Creates a manager holding at most `max_size` entries, evicting by `kind`.
    pub fn new(max_size: usize, kind: PolicyKind) -> Self {
        Self::with_policy(
            max_size,
            kind.invalidation_policy(ExpiryMode::default(), DEFAULT_TTL),
        )
    }

    /// Creates a manager around a caller-supplied policy object.
    pub fn with_policy(max_size: usize, policy: Box<dyn InvalidationPolicy<K, V>>) -> Self {
        Self::with_policy_and_clock(max_size, policy, system_clock())
    }

    /// Like `new`, reading time from `clock`.
    pub fn with_clock(max_size: usize, kind: PolicyKind, clock: Arc<dyn Clock>) -> Self {
        Self::with_policy_and_clock(
            max_size,
            kind.invalidation_policy(ExpiryMode::default(), DEFAULT_TTL),
            clock,
        )
    }

    /// Builds from a policy name, failing on unknown names.
    pub fn with_policy_name(name: &str, max_size: usize) -> Result<Self> {
        let kind: PolicyKind = name.parse()?;
        Ok(Self::new(max_size, kind))
    }

    /// Uses the config's capacity, policy, expiry mode and default TTL.
    pub fn from_config(config: &Config) -> Self {
        Self::with_policy(
            config.max_entries,
            config
                .policy
                .invalidation_policy(config.expiry, config.default_ttl),
        )
    }

    pub fn with_policy_and_clock(
        max_size: usize,
        policy: Box<dyn InvalidationPolicy<K, V>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let inner = Inner {
            entries: HashMap::new(),
            tag_index: HashMap::new(),
            versions: HashMap::new(),
            policy,
            max_size,
            tick: 0,
        };
        Self {
            inner: Arc::new(ReentrantMutex::new(RefCell::new(inner))),
            clock,
        }
    }

    fn with_inner<R>(&self, f: impl FnOnce(&mut Inner<K, V>) -> R) -> R {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        let result = f(&mut inner);
        debug_assert!(inner.is_consistent(), "tag index out of sync with entries");
        result
    }

    // == Set ==
    /// Stores `value` under `key` with optional TTL and tags.
    ///
    /// An existing entry for `key` is replaced along with its tags, keeping
    /// its insertion slot and counting the write as one more access. When
    /// full, the policy picks victims until a slot is free. Without a TTL
    /// the policy's default applies, if it has one.
    pub fn set(&self, key: K, value: V, ttl: Option<Duration>, tags: &[&str]) {
        self.store(key, value, ttl, tags, None)
    }

    /// Like `set`, stamping the entry with the current version of `namespace`.
    pub fn set_versioned(
        &self,
        key: K,
        value: V,
        ttl: Option<Duration>,
        tags: &[&str],
        namespace: &str,
    ) {
        self.store(key, value, ttl, tags, Some(namespace))
    }

    fn store(&self, key: K, value: V, ttl: Option<Duration>, tags: &[&str], namespace: Option<&str>) {
        let now = self.clock.now();
        self.with_inner(|inner| {
            if inner.max_size == 0 {
                debug!("zero-capacity manager, entry dropped");
                return;
            }

            let previous = inner.remove_entry(&key);
            if previous.is_none() {
                while inner.entries.len() >= inner.max_size {
                    let Some(victim) = inner.policy.select_for_eviction(&inner.entries, now) else {
                        warn!(
                            policy = inner.policy.name(),
                            "no eviction candidate while full"
                        );
                        break;
                    };
                    inner.remove_entry(&victim);
                    debug!(policy = inner.policy.name(), "evicted entry");
                }
            }

            let tick = inner.next_tick();
            let (sequence, access_count) = previous
                .map(|old| (old.sequence, old.access_count.saturating_add(1)))
                .unwrap_or((tick, 0));
            let ttl = ttl.or_else(|| inner.policy.default_ttl());

            let mut entry = CacheEntry::new(value, ttl, now, sequence).with_tags(tags.iter().copied());
            entry.access_count = access_count;
            entry.touched = tick;
            if let Some(namespace) = namespace {
                entry = entry.with_version(inner.current_version(namespace));
            }
            inner.insert_entry(key, entry);
        })
    }

    // == Get ==
    /// Returns the value if present and not evictable, touching the entry.
    pub fn get(&self, key: &K) -> Option<V> {
        self.lookup(key, None)
    }

    /// Like `get`, but an entry stamped with an older version of `namespace`
    /// is a miss. The stale entry is left in place.
    pub fn get_versioned(&self, key: &K, namespace: &str) -> Option<V> {
        self.lookup(key, Some(namespace))
    }

    fn lookup(&self, key: &K, namespace: Option<&str>) -> Option<V> {
        let now = self.clock.now();
        self.with_inner(|inner| {
            let entry = inner.entries.get(key)?;
            if inner.policy.should_evict(entry, now) {
                inner.remove_entry(key);
                debug!("expired entry evicted on read");
                return None;
            }
            if let Some(namespace) = namespace {
                if entry.version != Some(inner.current_version(namespace)) {
                    return None;
                }
            }

            let tick = inner.next_tick();
            let entry = inner.entries.get_mut(key)?;
            entry.touch(now, tick);
            Some(entry.value.clone())
        })
    }

    /// True if `key` is stored and would be served. Does not touch the entry.
    pub fn contains(&self, key: &K) -> bool {
        let now = self.clock.now();
        self.with_inner(|inner| {
            inner
                .entries
                .get(key)
                .is_some_and(|entry| !inner.policy.should_evict(entry, now))
        })
    }

    // == Invalidation ==
    /// Removes one entry; returns whether it existed.
    pub fn invalidate(&self, key: &K) -> bool {
        self.with_inner(|inner| inner.remove_entry(key).is_some())
    }

    /// Removes every entry tagged `tag`, returning how many were removed.
    pub fn invalidate_by_tag(&self, tag: &str) -> usize {
        let removed = self.with_inner(|inner| {
            let Some(keys) = inner.tag_index.remove(tag) else {
                return 0;
            };
            keys.iter()
                .filter(|key| inner.remove_entry(key).is_some())
                .count()
        });
        info!(tag, removed, "invalidated by tag");
        removed
    }

    /// Removes every entry carrying any of `tags`. Entries with several
    /// matching tags count once.
    pub fn invalidate_by_tags<'a>(&self, tags: impl IntoIterator<Item = &'a str>) -> usize {
        self.atomically(|manager| {
            tags.into_iter()
                .map(|tag| manager.invalidate_by_tag(tag))
                .sum()
        })
    }

    /// Clears every entry and tag, returning the prior size. Namespace
    /// versions are kept.
    pub fn invalidate_all(&self) -> usize {
        let removed = self.with_inner(|inner| {
            let size = inner.entries.len();
            inner.entries.clear();
            inner.tag_index.clear();
            size
        });
        info!(removed, "invalidated all entries");
        removed
    }

    /// Drops every entry the policy reports as evictable.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        self.with_inner(|inner| {
            let expired: Vec<K> = inner
                .entries
                .iter()
                .filter(|(_, entry)| inner.policy.should_evict(entry, now))
                .map(|(key, _)| key.clone())
                .collect();
            for key in &expired {
                inner.remove_entry(key);
            }
            if !expired.is_empty() {
                debug!(removed = expired.len(), "purged expired entries");
            }
            expired.len()
        })
    }

    // == Versions ==
    /// Overwrites `namespace`'s version counter.
    pub fn set_version(&self, namespace: &str, version: u64) {
        self.with_inner(|inner| {
            inner.versions.insert(namespace.to_string(), version);
        });
        info!(namespace, version, "namespace version set");
    }

    /// Bumps `namespace`'s version, returning the new value. Unknown
    /// namespaces start at 0.
    pub fn increment_version(&self, namespace: &str) -> u64 {
        let version = self.with_inner(|inner| {
            let version = inner.versions.entry(namespace.to_string()).or_insert(0);
            *version += 1;
            *version
        });
        info!(namespace, version, "namespace version incremented");
        version
    }

    /// Current version of `namespace`; 0 if never set.
    pub fn version(&self, namespace: &str) -> u64 {
        self.with_inner(|inner| inner.current_version(namespace))
    }

    // == Introspection ==
    /// Number of stored entries, expired or not.
    pub fn size(&self) -> usize {
        self.with_inner(|inner| inner.entries.len())
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Capacity given at construction.
    pub fn max_size(&self) -> usize {
        self.with_inner(|inner| inner.max_size)
    }

    /// Tags with at least one live key, sorted.
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.with_inner(|inner| inner.tag_index.keys().cloned().collect());
        tags.sort();
        tags
    }

    /// Keys currently indexed under `tag`, in no particular order.
    pub fn keys_for_tag(&self, tag: &str) -> Vec<K> {
        self.with_inner(|inner| {
            inner
                .tag_index
                .get(tag)
                .map(|keys| keys.iter().cloned().collect())
                .unwrap_or_default()
        })
    }

    /// Snapshot of size, capacity, tag and namespace counts.
    pub fn stats(&self) -> InvalidationStats {
        self.with_inner(|inner| InvalidationStats {
            size: inner.entries.len(),
            max_size: inner.max_size,
            tag_count: inner.tag_index.len(),
            namespace_count: inner.versions.len(),
            policy: inner.policy.name().to_string(),
        })
    }

    /// Panics if the tag index and the entry map disagree.
    pub fn assert_consistent(&self) {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        assert!(inner.is_consistent(), "tag index out of sync with entries");
    }

    /// Runs `f` while holding this manager's lock.
    pub fn atomically<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let _guard = self.inner.lock();
        f(self)
    }
}

impl<K, V> Clone for InvalidationManager<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<K, V> fmt::Debug for InvalidationManager<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.inner.lock();
        let state = guard.try_borrow();
        let mut debug = f.debug_struct("InvalidationManager");
        match state {
            Ok(inner) => debug
                .field("policy", &inner.policy.name())
                .field("size", &inner.entries.len())
                .field("max_size", &inner.max_size)
                .finish(),
            Err(_) => debug.finish_non_exhaustive(),
        }
    }
}

impl<K, V> ExpirySweep for InvalidationManager<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    fn purge_expired(&self) -> usize {
        InvalidationManager::purge_expired(self)
    }
}
