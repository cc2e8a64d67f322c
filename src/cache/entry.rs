//! Cache Entry Module
//!
//! Defines the value holder and bookkeeping metadata shared by every policy.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

// == Expiry Mode ==
/// Anchor point from which an entry's TTL is measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpiryMode {
    /// TTL counts from creation and is never refreshed.
    #[default]
    Absolute,
    /// TTL counts from the most recent successful read.
    Sliding,
}

// == Cache Entry ==
/// A single cached value together with its access metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// When the entry was inserted
    pub created_at: Instant,
    /// Last successful read, never earlier than `created_at`
    pub last_accessed: Instant,
    /// Number of successful reads
    pub access_count: u64,
    /// Time-to-live, None = never expires
    pub ttl: Option<Duration>,
    /// Labels used for bulk invalidation
    pub tags: HashSet<String>,
    /// Namespace version at insertion time
    pub version: Option<u64>,
    /// Insertion order stamp
    pub sequence: u64,
    /// Logical stamp of the last touch; equals `sequence` until first read
    pub touched: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates an entry stamped at `now` with insertion order `sequence`.
    pub fn new(value: V, ttl: Option<Duration>, now: Instant, sequence: u64) -> Self {
        Self {
            value,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            ttl,
            tags: HashSet::new(),
            version: None,
            sequence,
            touched: sequence,
        }
    }

    /// Attaches tags to the entry.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Stamps the entry with a namespace version.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    // == Touch ==
    /// Records a successful read at `now`.
    pub fn touch(&mut self, now: Instant, tick: u64) {
        if now > self.last_accessed {
            self.last_accessed = now;
        }
        self.access_count += 1;
        self.touched = tick;
    }

    // == Expiry ==
    /// Returns the instant after which the entry is expired, if it has a TTL.
    ///
    /// A TTL reaching past the furthest representable instant has no
    /// deadline and never expires.
    pub fn expires_at(&self, mode: ExpiryMode) -> Option<Instant> {
        let anchor = match mode {
            ExpiryMode::Absolute => self.created_at,
            ExpiryMode::Sliding => self.last_accessed,
        };
        self.ttl.and_then(|ttl| anchor.checked_add(ttl))
    }

    /// Checks if the entry has expired.
    ///
    /// An entry is expired once strictly more than `ttl` has elapsed since its
    /// anchor; at exactly `ttl` it is still live.
    pub fn is_expired(&self, now: Instant, mode: ExpiryMode) -> bool {
        match self.expires_at(mode) {
            Some(deadline) => now > deadline,
            None => false,
        }
    }

    /// Returns the remaining TTL, or None if no expiration is set.
    ///
    /// Returns `Some(Duration::ZERO)` once the entry has expired.
    pub fn ttl_remaining(&self, now: Instant, mode: ExpiryMode) -> Option<Duration> {
        self.expires_at(mode)
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Time since the entry was inserted.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }
}
