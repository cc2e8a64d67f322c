//! Eviction Policy Module
//!
//! Common contract for the four eviction strategies and the factory that
//! builds them by name.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{
    CacheStats, ExpiryMode, FifoPolicy, LfuPolicy, LruPolicy, TtlPolicy, DEFAULT_TTL,
};
use crate::clock::{system_clock, Clock};
use crate::error::{CacheError, Result};

// == Eviction Policy Trait ==
/// A bounded key/value container that decides on its own what to drop.
///
/// Reads take `&mut self` because every policy updates bookkeeping on a hit.
pub trait EvictionPolicy<K, V>: Send {
    /// Returns a clone of the live value for `key`, updating access metadata.
    fn get(&mut self, key: &K) -> Option<V>;

    /// Inserts or replaces `key`, evicting first if the policy is full.
    fn put(&mut self, key: K, value: V, ttl: Option<Duration>);

    /// Removes `key`, returning its value if it was present.
    fn remove(&mut self, key: &K) -> Option<V>;

    /// Drops every entry. Counters are kept.
    fn clear(&mut self);

    /// Number of stored entries.
    fn size(&self) -> usize;

    /// True if `key` is stored and not expired. Does not touch metadata.
    fn contains(&self, key: &K) -> bool;

    /// Maximum number of entries held at once.
    fn capacity(&self) -> usize;

    /// Removes every expired entry, returning how many were dropped.
    fn purge_expired(&mut self) -> usize;

    /// Snapshot of hit, miss, eviction and expiration counters.
    fn stats(&self) -> CacheStats;

    /// Which strategy this is.
    fn kind(&self) -> PolicyKind;
}

// == Policy Kind ==
/// Names of the available eviction strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    #[default]
    Lru,
    Lfu,
    Ttl,
    Fifo,
}

impl PolicyKind {
    /// Every strategy, in a stable order.
    pub const ALL: [PolicyKind; 4] = [
        PolicyKind::Lru,
        PolicyKind::Lfu,
        PolicyKind::Ttl,
        PolicyKind::Fifo,
    ];

    /// Lowercase name, as accepted by `FromStr`.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Lru => "lru",
            PolicyKind::Lfu => "lfu",
            PolicyKind::Ttl => "ttl",
            PolicyKind::Fifo => "fifo",
        }
    }

    // == Build ==
    /// Constructs the strategy this kind names.
    pub fn build<K, V>(self, capacity: usize, options: PolicyOptions) -> Box<dyn EvictionPolicy<K, V>>
    where
        K: Hash + Eq + Clone + Send + 'static,
        V: Clone + Send + 'static,
    {
        match self {
            PolicyKind::Lru => Box::new(LruPolicy::with_options(capacity, options)),
            PolicyKind::Lfu => Box::new(LfuPolicy::with_options(capacity, options)),
            PolicyKind::Ttl => Box::new(TtlPolicy::with_options(capacity, options)),
            PolicyKind::Fifo => Box::new(FifoPolicy::with_options(capacity, options)),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(PolicyKind::Lru),
            "lfu" => Ok(PolicyKind::Lfu),
            "ttl" => Ok(PolicyKind::Ttl),
            "fifo" => Ok(PolicyKind::Fifo),
            _ => Err(CacheError::UnknownPolicy(s.to_string())),
        }
    }
}

// == Policy Options ==
/// Settings shared by every strategy.
#[derive(Debug, Clone)]
pub struct PolicyOptions {
    /// Time source for expiry checks
    pub clock: Arc<dyn Clock>,
    /// How TTLs are anchored
    pub expiry: ExpiryMode,
    /// TTL applied by the TTL policy when the caller gives none
    pub default_ttl: Duration,
}

impl PolicyOptions {
    /// Replaces the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets how TTLs are anchored.
    pub fn with_expiry(mut self, expiry: ExpiryMode) -> Self {
        self.expiry = expiry;
        self
    }

    /// Sets the TTL policy's fallback TTL.
    pub fn with_default_ttl(mut self, default_ttl: Duration) -> Self {
        self.default_ttl = default_ttl;
        self
    }
}

impl Default for PolicyOptions {
    fn default() -> Self {
        Self {
            clock: system_clock(),
            expiry: ExpiryMode::default(),
            default_ttl: DEFAULT_TTL,
        }
    }
}

// == Factory ==
/// Builds a policy from its name with default options.
///
/// Unknown names fail instead of falling back to a default strategy.
pub fn create_policy<K, V>(name: &str, capacity: usize) -> Result<Box<dyn EvictionPolicy<K, V>>>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    let kind: PolicyKind = name.parse()?;
    Ok(kind.build(capacity, PolicyOptions::default()))
}
