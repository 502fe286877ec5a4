//! In-Memory Store Adapter
//!
//! Implements the `KeyValueStore` port without a network. Used by tests and
//! local development to simulate the remote store, including outages.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::ports::{CacheKey, KeyValueStore};

/// In-memory key-value store with an availability switch.
///
/// While offline, `fetch` returns `None` and `ping` returns `false`,
/// exactly like an unreachable remote store.
#[derive(Debug)]
pub struct InMemoryStore {
    values: DashMap<CacheKey, String>,
    online: AtomicBool,
    fetches: AtomicU64,
}

impl InMemoryStore {
    /// Create an empty, online store.
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
            online: AtomicBool::new(true),
            fetches: AtomicU64::new(0),
        }
    }

    /// Create an empty store that starts offline.
    pub fn offline() -> Self {
        let store = Self::new();
        store.set_online(false);
        store
    }

    /// Store a value.
    pub fn insert(&self, key: impl Into<CacheKey>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Remove a value.
    pub fn remove(&self, key: &CacheKey) -> Option<String> {
        self.values.remove(key).map(|(_, v)| v)
    }

    /// Bring the store up or take it down.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Whether the store is currently reachable.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Number of `fetch` calls served so far, online or not.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn fetch(&self, key: &CacheKey) -> Option<String> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        if !self.is_online() {
            return None;
        }
        self.values.get(key).map(|v| v.value().clone())
    }

    async fn ping(&self) -> bool {
        self.is_online()
    }
}
