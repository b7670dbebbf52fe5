//! Mutex acquisition shared by the cache and the limiter.
//!
//! A panic while holding one of these locks must not turn the never-fail
//! operations into failing ones, so poisoning is logged and recovered.

use std::sync::{Mutex, MutexGuard};

use tracing::warn;

pub(crate) fn lock<'a, T>(
    mutex: &'a Mutex<T>,
    target: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = target,
                result = "poisoned_recovered",
                "Recovered from poisoned shield lock"
            );
            poisoned.into_inner()
        }
    }
}
