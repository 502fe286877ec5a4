//! Local Cache - in-process copy of the last good values
//!
//! A dumb timestamped map. It never expires anything by itself: staleness
//! is judged by the fallback resolver from the ages reported here.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::domain::ports::{CacheKey, Clock};

// =============================================================================
// Cache Entry
// =============================================================================

/// Last value successfully fetched for a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheEntry {
    /// Key the value was fetched under
    pub key: CacheKey,

    /// Value as returned by the store
    pub value: String,

    /// When the value was stored
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Elapsed time between `stored_at` and `now`, zero if `now` is earlier.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.stored_at).to_std().unwrap_or(Duration::ZERO)
    }
}

// =============================================================================
// Local Cache
// =============================================================================

/// In-memory key → entry map shared by all in-flight resolutions.
///
/// A single `RwLock` guards the map: the workload is read-heavy with an
/// occasional overwrite on refresh, and no lock is ever held across an
/// await point.
pub struct LocalCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl LocalCache {
    /// Create an empty cache reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Record `value` for `key`, stamped with the current time.
    ///
    /// Replaces any previous entry. `stored_at` never moves backwards for a
    /// key, even if the wall clock does.
    pub fn put(&self, key: CacheKey, value: impl Into<String>) {
        let now = self.clock.now();
        let mut entries = self.entries.write();

        let stored_at = match entries.get(&key) {
            Some(previous) if previous.stored_at > now => previous.stored_at,
            _ => now,
        };

        entries.insert(
            key.clone(),
            CacheEntry {
                key,
                value: value.into(),
                stored_at,
            },
        );
    }

    /// Stored entry for `key`, if one was ever recorded.
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.read().get(key).cloned()
    }

    /// Time since `key` was last stored, if it ever was.
    pub fn age(&self, key: &CacheKey) -> Option<Duration> {
        let now = self.clock.now();
        self.entries.read().get(key).map(|entry| entry.age_at(now))
    }

    /// Whether an entry exists for `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// The clock used to stamp entries.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache")
            .field("entries", &self.len())
            .finish()
    }
}
