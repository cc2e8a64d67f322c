//! Cache Module
//!
//! Four interchangeable eviction policies (LRU, LFU, TTL, FIFO) behind one
//! trait, plus the thread-safe `Cache` handle that wraps them.

use std::time::Duration;

mod entry;
mod fifo;
mod lfu;
mod lru;
mod policy;
mod stats;
mod store;
mod ttl;


// Re-export public types
pub use entry::{CacheEntry, ExpiryMode};
pub use fifo::FifoPolicy;
pub use lfu::LfuPolicy;
pub use self::lru::LruPolicy;
pub use policy::{create_policy, EvictionPolicy, PolicyKind, PolicyOptions};
pub use stats::CacheStats;
pub use store::Cache;
pub use ttl::TtlPolicy;

// == Public Constants ==
/// TTL applied by the TTL policy when a caller supplies none
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);
