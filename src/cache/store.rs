//! Query Cache Module
//!
//! Memoizing TTL cache placed in front of expensive asynchronous reads.
//! Concurrent misses on the same key are coalesced onto one producer call.

use std::collections::HashMap;
use std::error::Error as StdError;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use futures::FutureExt;
use regex::Regex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::entry::{current_timestamp_ms, CacheEntry};
use crate::cache::pending::{FetchFuture, PendingTable};
use crate::cache::CacheStats;
use crate::config::Config;
use crate::error::{Result, ShieldError};
use crate::lock::lock;
use crate::tasks::{spawn_cleanup_task, Sweep};

const SOURCE: &str = "cache::store";

// == Cache State ==
/// Everything guarded by the cache mutex: entries, in-flight fetches, counters.
pub(crate) struct CacheState<V> {
    entries: HashMap<String, CacheEntry<V>>,
    pending: PendingTable<V>,
    stats: CacheStats,
    max_entries: usize,
    tick: u64,
}

impl<V: Clone> CacheState<V> {
    fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            pending: PendingTable::new(),
            stats: CacheStats::new(),
            max_entries: max_entries.max(1),
            tick: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Live value for `key`; an expired entry is removed on the way.
    fn lookup(&mut self, key: &str, now: u64) -> Option<V> {
        let expired = self.entries.get(key)?.is_expired_at(now);
        if expired {
            self.entries.remove(key);
            debug!(key, "Evicted expired entry on read");
            return None;
        }

        let tick = self.next_tick();
        let entry = self.entries.get_mut(key)?;
        entry.last_access = tick;
        Some(entry.value.clone())
    }

    fn store(&mut self, key: String, value: V, ttl: Duration, now: u64) {
        if ttl.is_zero() {
            // Already expired: nothing to keep, and the old value is stale.
            self.entries.remove(&key);
            return;
        }

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.purge_expired(now);
            if self.entries.len() >= self.max_entries {
                self.evict_least_recent();
            }
        }

        let mut entry = CacheEntry::new(value, ttl, now);
        entry.last_access = self.next_tick();
        self.entries.insert(key, entry);
    }

    fn purge_expired(&mut self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before - self.entries.len()
    }

    fn evict_least_recent(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone());

        if let Some(key) = victim {
            self.entries.remove(&key);
            self.stats.record_eviction();
            debug!(key = %key, "Evicted least recently used entry");
        }
    }

    fn remove_matching(&mut self, matches: impl Fn(&str) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !matches(key));
        before - self.entries.len()
    }
}

impl<V> Sweep for Mutex<CacheState<V>>
where
    V: Clone + Send + Sync + 'static,
{
    fn sweep_expired(&self) -> usize {
        lock(self, SOURCE, "sweep_expired").purge_expired(current_timestamp_ms())
    }

    fn label(&self) -> &'static str {
        "query cache"
    }
}

// == Query Cache ==
/// TTL-keyed memoization store over values of type `V`.
///
/// Cloning is cheap and yields a handle on the same store. One instance
/// holds one value type; keeping keys consistent with that type is up to the
/// caller.
///
/// This is a single-process performance optimization, not a consistency
/// mechanism: for one key the last write to *complete* wins, whichever call
/// started first.
pub struct QueryCache<V> {
    state: Arc<Mutex<CacheState<V>>>,
    default_ttl: Duration,
}

impl<V> Clone for QueryCache<V> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            default_ttl: self.default_ttl,
        }
    }
}

impl<V> QueryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructor ==
    /// Creates an empty cache.
    ///
    /// # Arguments
    /// * `default_ttl` - TTL applied by [`QueryCache::set_default`]
    /// * `max_entries` - Capacity bound; least recently used entries are evicted beyond it
    pub fn new(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::new(max_entries))),
            default_ttl,
        }
    }

    /// Creates a cache sized and timed from the process configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cache_default_ttl(), config.cache_max_entries)
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Get ==
    /// Returns the live value for `key`, or `None`.
    ///
    /// An entry found expired is deleted. Counts as a hit or a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, current_timestamp_ms())
    }

    pub(crate) fn get_at(&self, key: &str, now: u64) -> Option<V> {
        let mut state = lock(&self.state, SOURCE, "get");
        let value = state.lookup(key, now);
        match value {
            Some(_) => state.stats.record_hit(),
            None => state.stats.record_miss(),
        }
        value
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl`, replacing any existing entry.
    ///
    /// A zero `ttl` means "already expired": nothing is stored and any
    /// existing entry for `key` is removed.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        self.set_at(key.into(), value, ttl, current_timestamp_ms());
    }

    /// Stores `value` under `key` for the default TTL.
    pub fn set_default(&self, key: impl Into<String>, value: V) {
        self.set(key, value, self.default_ttl);
    }

    pub(crate) fn set_at(&self, key: String, value: V, ttl: Duration, now: u64) {
        lock(&self.state, SOURCE, "set").store(key, value, ttl, now);
    }

    // == Get Or Set ==
    /// Returns the cached value for `key`, computing it with `producer` on a miss.
    ///
    /// While a producer call for `key` is in flight, every other miss on
    /// `key` awaits that same call instead of starting its own, and receives
    /// the same value or the same error. A failure is never cached: the next
    /// miss after it invokes a producer again.
    ///
    /// The producer runs on its own tokio task, so it completes and its
    /// record is removed even if every caller is dropped first; a timeout
    /// belongs in the producer itself. Must be called within a tokio runtime.
    pub async fn get_or_set<F, Fut, E>(&self, key: &str, producer: F, ttl: Duration) -> Result<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync + 'static>> + 'static,
    {
        let fetch = {
            let mut state = lock(&self.state, SOURCE, "get_or_set");
            if let Some(value) = state.lookup(key, current_timestamp_ms()) {
                state.stats.record_hit();
                debug!(key, "Cache hit");
                return Ok(value);
            }
            state.stats.record_miss();

            match state.pending.join(key) {
                Some(in_flight) => {
                    debug!(key, "Cache miss, joining in-flight fetch");
                    in_flight
                }
                None => {
                    let id = state.pending.next_id();
                    let fetch = self.fetch(key.to_string(), id, producer, ttl);
                    state.pending.register(key.to_string(), id, fetch.clone());
                    debug!(key, fetch_id = id, "Cache miss, fetching");
                    fetch
                }
            }
        };

        fetch.await
    }

    /// Starts one producer call on its own task and returns the handle every
    /// caller for `key` awaits.
    ///
    /// The task settles the pending record itself, so the fetch completes and
    /// unregisters even when every caller has been cancelled.
    fn fetch<F, Fut, E>(&self, key: String, id: u64, producer: F, ttl: Duration) -> FetchFuture<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync + 'static>> + 'static,
    {
        let state = Arc::downgrade(&self.state);
        let task = tokio::spawn(Self::drive(state.clone(), key.clone(), id, producer, ttl));

        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    // Task aborted before settling, e.g. runtime shutdown
                    if let Some(state) = state.upgrade() {
                        lock(&state, SOURCE, "settle").pending.settle(&key, id);
                    }
                    Err(ShieldError::producer(&key, err))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Runs the producer to completion, then settles fetch `id`.
    async fn drive<F, Fut, E>(
        state: Weak<Mutex<CacheState<V>>>,
        key: String,
        id: u64,
        producer: F,
        ttl: Duration,
    ) -> Result<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync + 'static>> + 'static,
    {
        let outcome = match AssertUnwindSafe(async move { producer().await })
            .catch_unwind()
            .await
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(ShieldError::producer(&key, err)),
            Err(_) => Err(ShieldError::producer(&key, "producer panicked")),
        };

        if let Some(state) = state.upgrade() {
            let mut state = lock(&state, SOURCE, "settle");
            if state.pending.settle(&key, id) {
                match &outcome {
                    Ok(value) => state.store(key.clone(), value.clone(), ttl, current_timestamp_ms()),
                    Err(err) => debug!(key = %key, error = %err, "Fetch failed, not cached"),
                }
            } else {
                debug!(key = %key, fetch_id = id, "Fetch settled after clear, result dropped");
            }
        }

        outcome
    }

    // == Invalidate ==
    /// Removes the entry for `key`. Returns whether one was present.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = lock(&self.state, SOURCE, "invalidate")
            .entries
            .remove(key)
            .is_some();
        if removed {
            debug!(key, "Invalidated entry");
        }
        removed
    }

    /// Removes every entry whose key matches `pattern`.
    ///
    /// Matching is `Regex::is_match` against the whole key string, so anchor
    /// the pattern (`^story:`) to restrict it to a prefix. Returns the number
    /// of entries removed.
    pub fn invalidate_pattern(&self, pattern: &Regex) -> usize {
        let removed = lock(&self.state, SOURCE, "invalidate_pattern")
            .remove_matching(|key| pattern.is_match(key));
        debug!(pattern = pattern.as_str(), removed, "Invalidated by pattern");
        removed
    }

    /// Removes every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let removed = lock(&self.state, SOURCE, "invalidate_prefix")
            .remove_matching(|key| key.starts_with(prefix));
        debug!(prefix, removed, "Invalidated by prefix");
        removed
    }

    // == Clear ==
    /// Drops all entries and forgets in-flight fetches.
    ///
    /// Callers already awaiting a forgotten fetch still receive its result,
    /// but that result is not stored. Hit/miss counters are kept.
    pub fn clear(&self) {
        let mut state = lock(&self.state, SOURCE, "clear");
        state.entries.clear();
        state.pending.clear();
    }

    // == Stats ==
    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        let state = lock(&self.state, SOURCE, "stats");
        CacheStats {
            size: state.entries.len(),
            ..state.stats.clone()
        }
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        self.state.sweep_expired()
    }

    /// Starts a background sweep of expired entries every `interval`.
    ///
    /// The task stops on its own once every handle on this cache is dropped;
    /// abort the returned handle to stop it earlier.
    pub fn spawn_cleanup(&self, interval: Duration) -> JoinHandle<()> {
        spawn_cleanup_task(Arc::downgrade(&self.state), interval)
    }

    /// Number of stored entries, expired ones included until evicted.
    pub fn len(&self) -> usize {
        lock(&self.state, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of producer calls currently in flight.
    pub fn in_flight(&self) -> usize {
        lock(&self.state, SOURCE, "in_flight").pending.len()
    }
}
