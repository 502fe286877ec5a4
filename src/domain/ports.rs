//! Domain Ports (Port/Adapter Pattern)
//!
//! This module defines the abstractions the read path and the HTTP layer
//! depend on. Infrastructure adapters implement these traits to provide
//! concrete implementations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Domain Layer                            │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                    Ports (Traits)                    │    │
//! │  │   KeyValueStore  │  Clock  │  TradingCalendar        │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Infrastructure Layer                       │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                  Adapters (Impls)                    │    │
//! │  │  RedisStore │ InMemoryStore │ SystemClock │ B3Calendar│    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

// =============================================================================
// Value Objects
// =============================================================================

/// Opaque identifier of a lookup target in the remote store.
///
/// The read path is key-agnostic: callers decide what a key means
/// (e.g. the opening-time key or the closing-time key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheKey(pub String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// =============================================================================
// Store Port
// =============================================================================

/// Port for the remote key-value store.
///
/// Implementations must never surface an error: every failure (network
/// error, timeout, missing key, disconnected state) collapses into `None`
/// for [`fetch`](KeyValueStore::fetch) and `false` for
/// [`ping`](KeyValueStore::ping). Each call is a single attempt bounded by
/// the implementation's own timeout.
///
/// # Example
///
/// ```ignore
/// let store: Arc<dyn KeyValueStore> = Arc::new(RedisStore::connect(config).await);
/// if let Some(open) = store.fetch(&CacheKey::from("b3:trading:hours:open")).await {
///     println!("opens at {open}");
/// }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value stored under `key`, or `None` on any failure.
    async fn fetch(&self, key: &CacheKey) -> Option<String>;

    /// Lightweight liveness probe; true iff the store answered in time.
    async fn ping(&self) -> bool;
}

// =============================================================================
// Clock Port
// =============================================================================

/// Source of wall-clock time for cache timestamps and health reports.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

// =============================================================================
// Calendar Port
// =============================================================================

/// Port for the exchange trading calendar.
///
/// Only [`is_session`](TradingCalendar::is_session) is required; range
/// queries are derived from it.
pub trait TradingCalendar: Send + Sync {
    /// Exchange identifier (e.g. "BVMF").
    fn name(&self) -> &str;

    /// Whether the exchange holds a trading session on `date`.
    fn is_session(&self, date: NaiveDate) -> bool;

    /// Session days in `[start, end]`, ascending. Empty when `end < start`.
    fn sessions_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        days_in_range(start, end)
            .filter(|d| self.is_session(*d))
            .collect()
    }

    /// Non-session days in `[start, end]`, ascending. Empty when `end < start`.
    fn non_sessions_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        days_in_range(start, end)
            .filter(|d| !self.is_session(*d))
            .collect()
    }
}

fn days_in_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Weekday};

    struct WeekdaysOnly;

    impl TradingCalendar for WeekdaysOnly {
        fn name(&self) -> &str {
            "WEEKDAYS"
        }

        fn is_session(&self, date: NaiveDate) -> bool {
            !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_cache_key_conversions() {
        let a = CacheKey::from("b3:trading:hours:open");
        let b = CacheKey::new(String::from("b3:trading:hours:open"));
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "b3:trading:hours:open");
        assert_eq!(a.to_string(), "b3:trading:hours:open");
    }

    #[test]
    fn test_sessions_in_range_partitions_days() {
        let cal = WeekdaysOnly;
        // 2024-01-01 is a Monday
        let start = date(2024, 1, 1);
        let end = date(2024, 1, 14);

        let sessions = cal.sessions_in_range(start, end);
        let closed = cal.non_sessions_in_range(start, end);

        assert_eq!(sessions.len(), 10);
        assert_eq!(
            closed,
            vec![
                date(2024, 1, 6),
                date(2024, 1, 7),
                date(2024, 1, 13),
                date(2024, 1, 14)
            ]
        );
    }

    #[test]
    fn test_range_single_day_and_reversed() {
        let cal = WeekdaysOnly;
        let monday = date(2024, 1, 1);

        assert_eq!(cal.sessions_in_range(monday, monday), vec![monday]);
        assert!(cal.sessions_in_range(date(2024, 1, 5), monday).is_empty());
        assert!(cal.non_sessions_in_range(date(2024, 1, 5), monday).is_empty());
    }
}
