//! Rate Limiter Module
//!
//! Fixed-window request counter per key.
//!
//! Each key has a single counter that resets wholesale when its window ends.
//! This keeps one small entry per key, at the cost of admitting up to twice
//! the ceiling around a window boundary (a full window's worth just before
//! the reset and another just after). `retry_after` is computed from these
//! fixed windows.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::current_timestamp_ms;
use crate::config::Config;
use crate::lock::lock;
use crate::rate_limit::{RateLimitConfig, RateLimitDecision, RateLimitEntry};
use crate::tasks::{spawn_cleanup_task, Sweep};

const SOURCE: &str = "rate_limit::limiter";

// == Limiter State ==
pub(crate) struct LimiterState {
    entries: HashMap<String, RateLimitEntry>,
}

impl LimiterState {
    fn purge_expired(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before - self.entries.len()
    }
}

impl Sweep for Mutex<LimiterState> {
    fn sweep_expired(&self) -> usize {
        lock(self, SOURCE, "sweep_expired").purge_expired(current_timestamp_ms())
    }

    fn label(&self) -> &'static str {
        "rate limiter"
    }
}

// == Rate Limiter ==
/// Admission control keyed by client identity and endpoint class.
///
/// All operations take the same lock, including the background sweep.
pub struct RateLimiter {
    state: Arc<Mutex<LimiterState>>,
    cleanup: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    // == Constructor ==
    /// Creates a limiter without a background sweep.
    ///
    /// Expired windows are still replaced on the next check of their key;
    /// call [`RateLimiter::cleanup_expired`] to reclaim idle keys.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(LimiterState {
                entries: HashMap::new(),
            })),
            cleanup: Mutex::new(None),
        }
    }

    /// Creates a limiter that sweeps expired windows every `interval`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_cleanup(interval: Duration) -> Self {
        let limiter = Self::new();
        let handle = spawn_cleanup_task(Arc::downgrade(&limiter.state), interval);
        *lock(&limiter.cleanup, SOURCE, "with_cleanup") = Some(handle);
        limiter
    }

    /// Creates a sweeping limiter using the configured interval.
    pub fn from_config(config: &Config) -> Self {
        Self::with_cleanup(config.rate_limit_cleanup_interval())
    }

    // == Check ==
    /// Counts one request for `key` and decides whether to admit it.
    ///
    /// A refused request is not counted, so the count never exceeds the
    /// ceiling of the config it is checked against. Keys should include an
    /// endpoint tag (see [`crate::rate_limit::rate_limit_key`]) so one key is
    /// always checked against one config.
    pub fn check(&self, key: &str, config: &RateLimitConfig) -> RateLimitDecision {
        self.check_at(key, config, current_timestamp_ms())
    }

    pub(crate) fn check_at(&self, key: &str, config: &RateLimitConfig, now: u64) -> RateLimitDecision {
        let max = config.max_requests();
        let mut state = lock(&self.state, SOURCE, "check");

        match state.entries.get_mut(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                if entry.count < max {
                    entry.count += 1;
                    RateLimitDecision::allowed(max - entry.count, entry.reset_at)
                } else {
                    let decision = RateLimitDecision::refused(entry.reset_at, now);
                    debug!(key, retry_after = ?decision.retry_after, "Rate limit exceeded");
                    decision
                }
            }
            _ => {
                let entry = RateLimitEntry::start(now, config);
                state.entries.insert(key.to_string(), entry);
                RateLimitDecision::allowed(max - 1, entry.reset_at)
            }
        }
    }

    // == Peek ==
    /// Reports the standing of `key` without counting a request.
    ///
    /// `remaining` is what is left in the current window (the full ceiling
    /// when there is no live window), and `allowed` tells whether the next
    /// check would be admitted.
    pub fn peek(&self, key: &str, config: &RateLimitConfig) -> RateLimitDecision {
        self.peek_at(key, config, current_timestamp_ms())
    }

    pub(crate) fn peek_at(&self, key: &str, config: &RateLimitConfig, now: u64) -> RateLimitDecision {
        let max = config.max_requests();
        let state = lock(&self.state, SOURCE, "peek");

        match state.entries.get(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                if entry.count < max {
                    RateLimitDecision::allowed(max - entry.count, entry.reset_at)
                } else {
                    RateLimitDecision::refused(entry.reset_at, now)
                }
            }
            _ => RateLimitDecision::allowed(
                max,
                now.saturating_add(config.window_ms()),
            ),
        }
    }

    // == Reset ==
    /// Forgets the window for `key`. Returns whether one existed.
    pub fn reset(&self, key: &str) -> bool {
        let removed = lock(&self.state, SOURCE, "reset")
            .entries
            .remove(key)
            .is_some();
        if removed {
            debug!(key, "Rate limit window reset");
        }
        removed
    }

    // == Cleanup Expired ==
    /// Removes every expired window. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        self.state.sweep_expired()
    }

    pub(crate) fn cleanup_expired_at(&self, now: u64) -> usize {
        lock(&self.state, SOURCE, "cleanup_expired").purge_expired(now)
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        lock(&self.state, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a background sweep is currently running.
    pub fn is_sweeping(&self) -> bool {
        lock(&self.cleanup, SOURCE, "is_sweeping")
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    // == Destroy ==
    /// Stops the background sweep and drops all windows.
    pub fn destroy(&self) {
        if let Some(handle) = lock(&self.cleanup, SOURCE, "destroy").take() {
            handle.abort();
        }
        lock(&self.state, SOURCE, "destroy").entries.clear();
        debug!("Rate limiter destroyed");
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.cleanup, SOURCE, "drop").take() {
            handle.abort();
        }
    }
}
