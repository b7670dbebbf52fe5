//! Cache Module
//!
//! In-process memoizing cache with TTL expiration, in-flight coalescing and
//! exact/pattern invalidation.

mod entry;
mod pending;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use stats::CacheStats;
pub use store::QueryCache;

pub(crate) use entry::duration_ms;
