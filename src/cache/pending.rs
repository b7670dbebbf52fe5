//! Pending Fetch Module
//!
//! Table of in-flight producer calls, one per key, used to coalesce
//! concurrent misses onto a single fetch.

use std::collections::HashMap;

use futures::future::{BoxFuture, Shared};

use crate::error::Result;

/// A producer call that every concurrent caller for the key can await.
pub(crate) type FetchFuture<V> = Shared<BoxFuture<'static, Result<V>>>;

// == Pending Fetch ==
/// In-flight record for one key.
///
/// `id` distinguishes successive fetches for the same key, so a fetch that
/// settles after `clear()` cannot unregister a newer fetch.
pub(crate) struct PendingFetch<V> {
    pub(crate) id: u64,
    pub(crate) future: FetchFuture<V>,
}

// == Pending Table ==
pub(crate) struct PendingTable<V> {
    fetches: HashMap<String, PendingFetch<V>>,
    next_id: u64,
}

impl<V> PendingTable<V> {
    pub(crate) fn new() -> Self {
        Self {
            fetches: HashMap::new(),
            next_id: 0,
        }
    }

    /// Returns a handle on the fetch already running for `key`, if any.
    pub(crate) fn join(&self, key: &str) -> Option<FetchFuture<V>> {
        self.fetches.get(key).map(|pending| pending.future.clone())
    }

    pub(crate) fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub(crate) fn register(&mut self, key: String, id: u64, future: FetchFuture<V>) {
        self.fetches.insert(key, PendingFetch { id, future });
    }

    /// Unregisters fetch `id` for `key`.
    ///
    /// Returns `false` when that fetch is no longer the registered one
    /// (the table was cleared while it ran).
    pub(crate) fn settle(&mut self, key: &str, id: u64) -> bool {
        match self.fetches.get(key) {
            Some(pending) if pending.id == id => {
                self.fetches.remove(key);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.fetches.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.fetches.len()
    }
}
