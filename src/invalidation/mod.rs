//! Invalidation Module
//!
//! Tag and namespace-version invalidation layered over a single eviction
//! strategy.

mod manager;
mod policy;

pub use manager::{InvalidationManager, InvalidationStats};
pub use policy::{
    create_invalidation_policy, FifoInvalidation, InvalidationPolicy, LfuInvalidation,
    LruInvalidation, TtlInvalidation,
};
