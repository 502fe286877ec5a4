//! Local Fallback Cache
//!
//! In-process store of the last value each key was successfully fetched
//! with, stamped with the time it was stored.
//!
//! ```text
//!  resolve(key) ──▶ store.fetch ──ok──▶ LocalCache::put ──▶ value
//!                        │
//!                      none
//!                        ▼
//!                 LocalCache::get ──▶ age ≤ TTL ? value : Unavailable
//! ```
//!
//! Entries live as long as the process. Nothing is evicted and no TTL is
//! enforced here; the resolver owns the staleness policy.

mod local;

pub use local::{CacheEntry, LocalCache};
