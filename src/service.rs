//! Hours Service
//!
//! The explicitly constructed service object handed to request handlers.
//! It owns the read path (store, local cache, fallback resolver), the health
//! aggregator, the trading calendar, the clock and the metrics registry.
//! There is no module-level state: build one in `main`, share it as
//! `Arc<HoursService>`.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::info;

use crate::adapters::{B3Calendar, RedisStore, SystemClock};
use crate::cache::LocalCache;
use crate::config::ServiceConfig;
use crate::domain::ports::{Clock, KeyValueStore, TradingCalendar};
use crate::error::{Error, Result};
use crate::health::{HealthAggregator, HealthReport};
use crate::metrics::ServiceMetrics;
use crate::resolver::{FallbackResolver, Unavailable};

/// Opening and closing times of the trading session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradingHours {
    /// Opening time, "HH:MM"
    pub open: String,
    /// Closing time, "HH:MM"
    pub close: String,
}

/// Trading hours and trading days for one exchange.
pub struct HoursService {
    config: ServiceConfig,
    resolver: FallbackResolver,
    health: HealthAggregator,
    calendar: Arc<dyn TradingCalendar>,
    clock: Arc<dyn Clock>,
    metrics: ServiceMetrics,
}

impl HoursService {
    /// Wire the service from explicit collaborators.
    pub fn new(
        config: ServiceConfig,
        store: Arc<dyn KeyValueStore>,
        calendar: Arc<dyn TradingCalendar>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let metrics = ServiceMetrics::new()?;
        let cache = Arc::new(LocalCache::new(clock.clone()));

        let resolver = FallbackResolver::new(store.clone(), cache.clone(), config.resolver.clone())
            .with_metrics(metrics.clone());
        let health = HealthAggregator::new(
            store,
            cache,
            vec![config.open_key.clone(), config.close_key.clone()],
        )
        .with_metrics(metrics.clone());

        Ok(Self {
            config,
            resolver,
            health,
            calendar,
            clock,
            metrics,
        })
    }

    /// Production wiring: Redis store, B3 calendar, system clock.
    ///
    /// Succeeds even when Redis is unreachable.
    pub async fn connect(config: ServiceConfig) -> Result<Self> {
        let store = Arc::new(RedisStore::connect(config.store.clone()).await);
        let calendar = Arc::new(B3Calendar::with_name(config.exchange_name.clone()));

        info!(
            exchange = %config.exchange_name,
            timezone = %config.timezone,
            ttl_seconds = config.resolver.ttl.as_secs(),
            store_connected = store.is_connected(),
            "Hours service initialised"
        );

        Self::new(config, store, calendar, Arc::new(SystemClock))
    }

    // =========================================================================
    // Trading hours
    // =========================================================================

    /// Opening time.
    pub async fn open_time(&self) -> std::result::Result<String, Unavailable> {
        self.resolver.resolve(&self.config.open_key).await
    }

    /// Closing time.
    pub async fn close_time(&self) -> std::result::Result<String, Unavailable> {
        self.resolver.resolve(&self.config.close_key).await
    }

    /// Opening and closing times, resolved concurrently and independently.
    ///
    /// When both fail, the opening-time failure is reported.
    pub async fn trading_hours(&self) -> std::result::Result<TradingHours, Unavailable> {
        let (open, close) = futures::join!(self.open_time(), self.close_time());
        Ok(TradingHours {
            open: open?,
            close: close?,
        })
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// Fresh health classification.
    pub async fn health(&self) -> HealthReport {
        self.health.status().await
    }

    // =========================================================================
    // Trading days
    // =========================================================================

    /// Current time in the exchange timezone.
    pub fn now_local(&self) -> DateTime<Tz> {
        self.clock.now().with_timezone(&self.config.timezone)
    }

    /// Today's date in the exchange timezone.
    pub fn today(&self) -> NaiveDate {
        self.now_local().date_naive()
    }

    /// Today's date and whether it is a trading session.
    pub fn is_trading_day_today(&self) -> (NaiveDate, bool) {
        let today = self.today();
        (today, self.calendar.is_session(today))
    }

    /// Session days in `[start, end]`, or the non-session days if `exclude`.
    pub fn trading_days(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        exclude: bool,
    ) -> Result<Vec<NaiveDate>> {
        if start < self.config.min_date {
            return Err(Error::InvalidRange(format!(
                "Start date must be >= {}",
                self.config.min_date
            )));
        }
        if end < start {
            return Err(Error::InvalidRange(
                "End date must be >= start date".to_string(),
            ));
        }

        Ok(if exclude {
            self.calendar.non_sessions_in_range(start, end)
        } else {
            self.calendar.sessions_in_range(start, end)
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn metrics(&self) -> &ServiceMetrics {
        &self.metrics
    }

    pub fn resolver(&self) -> &FallbackResolver {
        &self.resolver
    }

    pub fn calendar(&self) -> &Arc<dyn TradingCalendar> {
        &self.calendar
    }
}

impl std::fmt::Debug for HoursService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HoursService")
            .field("exchange", &self.config.exchange_name)
            .field("resolver", &self.resolver)
            .finish()
    }
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let well_formed = raw.len() == 10
        && raw
            .char_indices()
            .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });
    if !well_formed {
        return Err(Error::InvalidDate(format!(
            "Invalid date format '{}'. Use YYYY-MM-DD",
            raw
        )));
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| Error::InvalidDate(format!("Invalid date '{}': {}. Use YYYY-MM-DD", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryStore, ManualClock};
    use crate::health::HealthStatus;
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service_at(now: DateTime<Utc>) -> (Arc<InMemoryStore>, Arc<ManualClock>, HoursService) {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(now));
        let service = HoursService::new(
            ServiceConfig::default(),
            store.clone(),
            Arc::new(B3Calendar::new()),
            clock.clone(),
        )
        .unwrap();
        (store, clock, service)
    }

    fn service() -> (Arc<InMemoryStore>, Arc<ManualClock>, HoursService) {
        service_at(Utc.with_ymd_and_hms(2024, 1, 15, 13, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn test_trading_hours_both_live() {
        let (store, _, service) = service();
        store.insert("b3:trading:hours:open", "10:00");
        store.insert("b3:trading:hours:close", "18:00");

        let hours = service.trading_hours().await.unwrap();
        assert_eq!(
            hours,
            TradingHours {
                open: "10:00".into(),
                close: "18:00".into()
            }
        );
    }

    #[tokio::test]
    async fn test_trading_hours_fails_if_either_fails() {
        let (store, _, service) = service();
        store.insert("b3:trading:hours:open", "10:00");

        let err = service.trading_hours().await.unwrap_err();
        assert_eq!(err.key().as_str(), "b3:trading:hours:close");

        // The open key was still resolved and cached independently
        assert_eq!(service.open_time().await.unwrap(), "10:00");
    }

    #[tokio::test]
    async fn test_open_failure_reported_first() {
        let (store, _, service) = service();
        store.set_online(false);

        let err = service.trading_hours().await.unwrap_err();
        assert_eq!(err.key().as_str(), "b3:trading:hours:open");
    }

    #[tokio::test]
    async fn test_health_follows_cache_and_store() {
        let (store, clock, service) = service();
        store.insert("b3:trading:hours:close", "18:00");
        service.close_time().await.unwrap();

        store.set_online(false);
        clock.advance(Duration::from_secs(30));

        let report = service.health().await;
        assert_eq!(report.overall, HealthStatus::Degraded);
        assert_eq!(
            report.cache_age(&"b3:trading:hours:close".into()),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_today_uses_exchange_timezone() {
        // 01:30 UTC on the 16th is still the 15th in São Paulo (UTC-3)
        let (_, _, service) = service_at(Utc.with_ymd_and_hms(2024, 1, 16, 1, 30, 0).unwrap());
        assert_eq!(service.today(), date(2024, 1, 15));
        assert_eq!(
            service.now_local().naive_local(),
            date(2024, 1, 15).and_hms_opt(22, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_is_trading_day_today() {
        let (_, clock, service) = service();
        assert_eq!(service.is_trading_day_today(), (date(2024, 1, 15), true));

        // Saturday
        clock.set(Utc.with_ymd_and_hms(2024, 1, 20, 15, 0, 0).unwrap());
        assert_eq!(service.is_trading_day_today(), (date(2024, 1, 20), false));
    }

    #[test]
    fn test_trading_days_and_exclusions() {
        let (_, _, service) = service();

        let sessions = service
            .trading_days(date(2024, 1, 1), date(2024, 1, 5), false)
            .unwrap();
        assert_eq!(sessions.len(), 4);

        let closed = service
            .trading_days(date(2024, 1, 1), date(2024, 1, 7), true)
            .unwrap();
        assert_eq!(closed, vec![date(2024, 1, 1), date(2024, 1, 6), date(2024, 1, 7)]);
    }

    #[test]
    fn test_trading_days_validation() {
        let (_, _, service) = service();

        assert_matches!(
            service.trading_days(date(2005, 12, 31), date(2006, 1, 10), false),
            Err(Error::InvalidRange(msg)) if msg.contains("2006-01-01")
        );
        assert_matches!(
            service.trading_days(date(2024, 1, 10), date(2024, 1, 9), false),
            Err(Error::InvalidRange(_))
        );
        assert!(service
            .trading_days(date(2006, 1, 1), date(2006, 1, 1), false)
            .is_ok());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-01-15").unwrap(), date(2024, 1, 15));
        assert_matches!(parse_date("2024-1-15"), Err(Error::InvalidDate(_)));
        assert_matches!(parse_date("2024-02-30"), Err(Error::InvalidDate(_)));
        assert_matches!(parse_date("15/01/2024"), Err(Error::InvalidDate(_)));
        assert_matches!(parse_date(""), Err(Error::InvalidDate(_)));
    }
}
