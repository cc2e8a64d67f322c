//! Cache Store Module
//!
//! Thread-safe handle around a single eviction policy.

use std::cell::RefCell;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::ReentrantMutex;

use crate::cache::{create_policy, CacheStats, EvictionPolicy, PolicyKind, PolicyOptions};
use crate::clock::Clock;
use crate::config::Config;
use crate::error::Result;
use crate::tasks::ExpirySweep;

type Shared<K, V> = Arc<ReentrantMutex<RefCell<Box<dyn EvictionPolicy<K, V>>>>>;

// == Cache ==
/// Shared, clonable cache backed by one eviction policy.
///
/// Every call takes the instance's reentrant lock, reads included, since a
/// hit updates recency or frequency bookkeeping. Clones share state; two
/// caches built separately share nothing.
pub struct Cache<K, V> {
    inner: Shared<K, V>,
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    // == Constructors ==
    /// Creates a cache holding at most `capacity` entries under `kind`.
    ///
    /// A capacity of zero is legal: every `put` is evicted immediately.
    pub fn new(capacity: usize, kind: PolicyKind) -> Self {
        Self::with_options(capacity, kind, PolicyOptions::default())
    }

    pub fn with_options(capacity: usize, kind: PolicyKind, options: PolicyOptions) -> Self {
        Self::from_policy(kind.build(capacity, options))
    }

    /// Like `new`, but with a clock other than the system one.
    pub fn with_clock(capacity: usize, kind: PolicyKind, clock: Arc<dyn Clock>) -> Self {
        Self::with_options(capacity, kind, PolicyOptions::default().with_clock(clock))
    }

    /// Builds from a policy name such as `"lfu"`, failing on unknown names.
    pub fn with_policy_name(name: &str, capacity: usize) -> Result<Self> {
        Ok(Self::from_policy(create_policy(name, capacity)?))
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_options(config.max_entries, config.policy, config.policy_options())
    }

    pub fn from_policy(policy: Box<dyn EvictionPolicy<K, V>>) -> Self {
        Self {
            inner: Arc::new(ReentrantMutex::new(RefCell::new(policy))),
        }
    }

    // == Lock Helpers ==
    fn with_policy<R>(&self, f: impl FnOnce(&mut Box<dyn EvictionPolicy<K, V>>) -> R) -> R {
        let guard = self.inner.lock();
        let mut policy = guard.borrow_mut();
        f(&mut policy)
    }

    /// Runs `f` while holding this cache's lock.
    ///
    /// Calls made on the cache from inside `f` re-enter the lock, so a
    /// read-then-write sequence is not interleaved with other threads.
    pub fn atomically<R>(&self, f: impl FnOnce(&Self) -> R) -> R {
        let _guard = self.inner.lock();
        f(self)
    }

    // == Operations ==
    pub fn get(&self, key: &K) -> Option<V> {
        self.with_policy(|policy| policy.get(key))
    }

    /// Inserts or replaces `key`. `ttl` of None means the policy default.
    pub fn put(&self, key: K, value: V, ttl: Option<Duration>) {
        self.with_policy(|policy| policy.put(key, value, ttl))
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.with_policy(|policy| policy.remove(key))
    }

    pub fn clear(&self) {
        self.with_policy(|policy| policy.clear())
    }

    pub fn size(&self) -> usize {
        self.with_policy(|policy| policy.size())
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn contains(&self, key: &K) -> bool {
        self.with_policy(|policy| policy.contains(key))
    }

    pub fn capacity(&self) -> usize {
        self.with_policy(|policy| policy.capacity())
    }

    pub fn kind(&self) -> PolicyKind {
        self.with_policy(|policy| policy.kind())
    }

    pub fn stats(&self) -> CacheStats {
        self.with_policy(|policy| policy.stats())
    }

    pub fn purge_expired(&self) -> usize {
        self.with_policy(|policy| policy.purge_expired())
    }

    // == Get Or Insert ==
    /// Returns the cached value for `key`, computing and storing it on a miss.
    ///
    /// `init` runs under the lock; keep it short.
    pub fn get_or_insert_with(&self, key: K, ttl: Option<Duration>, init: impl FnOnce() -> V) -> V {
        self.atomically(|cache| {
            if let Some(value) = cache.get(&key) {
                return value;
            }
            let value = init();
            cache.put(key, value.clone(), ttl);
            value
        })
    }
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.inner.lock();
        // A Debug call from inside a borrow on this thread must not panic.
        let policy = guard.try_borrow();
        match policy {
            Ok(policy) => f
                .debug_struct("Cache")
                .field("kind", &policy.kind())
                .field("size", &policy.size())
                .field("capacity", &policy.capacity())
                .finish(),
            Err(_) => f.debug_struct("Cache").finish_non_exhaustive(),
        }
    }
}

impl<K, V> ExpirySweep for Cache<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    fn purge_expired(&self) -> usize {
        Cache::purge_expired(self)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::CacheError;
    use std::thread;

    #[test]
    fn test_cache_basic_operations() {
        let cache: Cache<String, String> = Cache::new(10, PolicyKind::Lru);

        cache.put("key1".to_string(), "value1".to_string(), None);

        assert_eq!(cache.get(&"key1".to_string()), Some("value1".to_string()));
        assert!(cache.contains(&"key1".to_string()));
        assert_eq!(cache.size(), 1);
        assert_eq!(cache.remove(&"key1".to_string()), Some("value1".to_string()));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_unknown_policy_name() {
        let result = Cache::<String, u32>::with_policy_name("random", 10);
        assert!(matches!(result, Err(CacheError::UnknownPolicy(_))));
    }

    #[test]
    fn test_cache_clones_share_state() {
        let cache: Cache<u32, u32> = Cache::new(4, PolicyKind::Fifo);
        let other = cache.clone();

        other.put(1, 10, None);

        assert_eq!(cache.get(&1), Some(10));
    }

    #[test]
    fn test_cache_instances_are_isolated() {
        let a: Cache<u32, u32> = Cache::new(4, PolicyKind::Lru);
        let b: Cache<u32, u32> = Cache::new(4, PolicyKind::Lru);

        a.put(1, 10, None);

        assert!(!b.contains(&1));
    }

    #[test]
    fn test_atomically_reenters_lock() {
        let cache: Cache<&'static str, u32> = Cache::new(4, PolicyKind::Lfu);

        let total = cache.atomically(|c| {
            c.put("a", 1, None);
            c.put("b", 2, None);
            c.atomically(|inner| inner.get(&"a").unwrap_or(0) + inner.get(&"b").unwrap_or(0))
        });

        assert_eq!(total, 3);
    }

    #[test]
    fn test_get_or_insert_with() {
        let cache: Cache<&'static str, u32> = Cache::new(4, PolicyKind::Lru);
        let mut calls = 0;

        let first = cache.get_or_insert_with("a", None, || {
            calls += 1;
            7
        });
        let second = cache.get_or_insert_with("a", None, || {
            calls += 1;
            8
        });

        assert_eq!((first, second), (7, 7));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_cache_with_manual_clock() {
        let clock = ManualClock::new();
        let cache: Cache<&'static str, u32> =
            Cache::with_clock(4, PolicyKind::Ttl, Arc::new(clock.clone()));
        cache.put("a", 1, Some(Duration::from_millis(10)));

        clock.advance(Duration::from_millis(20));

        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.size(), 0);
    }

    #[test]
    fn test_cache_concurrent_puts_respect_capacity() {
        let cache: Cache<u64, u64> = Cache::new(16, PolicyKind::Lru);

        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let cache = cache.clone();
                thread::spawn(move || {
                    for i in 0..500u64 {
                        cache.put(t * 1000 + i, i, None);
                        let _ = cache.get(&(t * 1000 + i / 2));
                        assert!(cache.size() <= 16);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.size(), 16);
    }

    #[test]
    fn test_debug_output() {
        let cache: Cache<u32, u32> = Cache::new(3, PolicyKind::Ttl);
        let rendered = format!("{:?}", cache);
        assert!(rendered.contains("Ttl"));
        assert!(rendered.contains("capacity: 3"));
    }
}
