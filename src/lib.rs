//! Mini Cache - An in-process cache eviction and invalidation engine
//!
//! Provides four interchangeable eviction policies (LRU, LFU, TTL, FIFO),
//! an invalidation manager with tag and namespace-version invalidation, and
//! a family of composable value serializers.
//!
//! # Example
//! ```
//! use mini_cache::{Cache, PolicyKind};
//!
//! let cache: Cache<String, u32> = Cache::new(2, PolicyKind::Lru);
//! cache.put("a".to_string(), 1, None);
//! assert_eq!(cache.get(&"a".to_string()), Some(1));
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod serializer;
pub mod tasks;

pub use cache::{Cache, CacheEntry, CacheStats, EvictionPolicy, ExpiryMode, PolicyKind};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{CacheError, SerializationError};
pub use invalidation::{InvalidationManager, InvalidationStats};
pub use serializer::{create_serializer, CacheValue, Serializer, SerializerConfig};
pub use tasks::spawn_cleanup_task;
