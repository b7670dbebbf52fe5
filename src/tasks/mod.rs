//! Background Tasks Module
//!
//! Contains background tasks that run periodically for the life of their owner.
//!
//! # Tasks
//! - Expiry sweep: removes expired cache entries and rate-limit windows

mod cleanup;

pub use cleanup::{spawn_cleanup_task, Sweep};
