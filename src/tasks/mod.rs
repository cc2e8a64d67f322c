//! Background Tasks Module
//!
//! Optional periodic work a host may run next to a cache.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired entries at a fixed interval

mod cleanup;

pub use cleanup::{spawn_cleanup_task, ExpirySweep};
