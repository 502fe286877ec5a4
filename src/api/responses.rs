//! JSON bodies returned by the HTTP API.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Serialize;

use crate::domain::ports::CacheKey;
use crate::health::{HealthReport, HealthStatus};
use crate::resolver::Unavailable;

/// `{time}` body of the single-field hour endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct TimeBody {
    pub time: String,
}

/// 503 body for a failed resolution.
#[derive(Debug, Clone, Serialize)]
pub struct UnavailableBody {
    pub error: &'static str,
    pub message: String,
    pub key: CacheKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_age_seconds: Option<u64>,
}

impl From<&Unavailable> for UnavailableBody {
    fn from(err: &Unavailable) -> Self {
        Self {
            error: "Service Unavailable",
            message: err.to_string(),
            key: err.key().clone(),
            cache_age_seconds: err.cache_age().map(|age| age.as_secs()),
        }
    }
}

/// Cache section of the health body.
#[derive(Debug, Clone, Serialize)]
pub struct CacheHealth {
    pub store_connected: bool,
    pub open_cache_age_seconds: Option<u64>,
    pub close_cache_age_seconds: Option<u64>,
    pub ttl_seconds: u64,
}

/// Health endpoint body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthBody {
    pub status: HealthStatus,
    pub timestamp: String,
    pub store_status: &'static str,
    pub cache: CacheHealth,
}

impl HealthBody {
    /// Render a report, with the timestamp in the exchange timezone.
    pub fn from_report(
        report: &HealthReport,
        open_key: &CacheKey,
        close_key: &CacheKey,
        ttl: Duration,
        timezone: Tz,
    ) -> Self {
        Self {
            status: report.overall,
            timestamp: report.checked_at.with_timezone(&timezone).to_rfc3339(),
            store_status: if report.store_connected {
                "connected"
            } else {
                "disconnected"
            },
            cache: CacheHealth {
                store_connected: report.store_connected,
                open_cache_age_seconds: report.cache_age(open_key).map(|age| age.as_secs()),
                close_cache_age_seconds: report.cache_age(close_key).map(|age| age.as_secs()),
                ttl_seconds: ttl.as_secs(),
            },
        }
    }
}

/// `{date, is_trading_day}` body.
#[derive(Debug, Clone, Serialize)]
pub struct TradingDayBody {
    pub date: NaiveDate,
    pub is_trading_day: bool,
}

/// `{detail}` body for client errors and unknown routes.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Root endpoint body.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub exchange: String,
    pub endpoints: BTreeMap<&'static str, &'static str>,
}

impl ServiceInfo {
    pub fn new(exchange: impl Into<String>) -> Self {
        let endpoints = BTreeMap::from([
            ("hours", "/v1/hours"),
            ("open", "/v1/hours/open"),
            ("close", "/v1/hours/close"),
            ("health", "/v1/health"),
            ("is_trading_day", "/v1/is-trading-day"),
            ("trading_days", "/v1/trading-days"),
        ]);

        Self {
            name: "B3 Trading Hours API",
            version: env!("CARGO_PKG_VERSION"),
            description: "Trading hours and trading days for B3, served with a bounded-staleness fallback cache",
            exchange: exchange.into(),
            endpoints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_unavailable_body_omits_missing_age() {
        let err = Unavailable::NoCachedValue {
            key: "b3:trading:hours:open".into(),
        };
        let value = serde_json::to_value(UnavailableBody::from(&err)).unwrap();

        assert_eq!(value["error"], "Service Unavailable");
        assert_eq!(value["key"], "b3:trading:hours:open");
        assert!(value.get("cache_age_seconds").is_none());
    }

    #[test]
    fn test_unavailable_body_reports_whole_seconds() {
        let err = Unavailable::CacheExpired {
            key: "b3:trading:hours:close".into(),
            age: Duration::from_millis(3_601_900),
            ttl: Duration::from_secs(3600),
        };
        let value = serde_json::to_value(UnavailableBody::from(&err)).unwrap();

        assert_eq!(value["cache_age_seconds"], 3601);
        assert!(value["message"].as_str().unwrap().contains("3600"));
    }

    #[test]
    fn test_health_body_shape() {
        let open: CacheKey = "b3:trading:hours:open".into();
        let close: CacheKey = "b3:trading:hours:close".into();
        let report = HealthReport {
            overall: HealthStatus::Degraded,
            store_connected: false,
            cache_ages: BTreeMap::from([
                (open.clone(), Some(Duration::from_secs(42))),
                (close.clone(), None),
            ]),
            checked_at: Utc.with_ymd_and_hms(2024, 1, 15, 13, 0, 0).unwrap(),
        };

        let body = HealthBody::from_report(
            &report,
            &open,
            &close,
            Duration::from_secs(3600),
            chrono_tz::America::Sao_Paulo,
        );

        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({
                "status": "degraded",
                "timestamp": "2024-01-15T10:00:00-03:00",
                "store_status": "disconnected",
                "cache": {
                    "store_connected": false,
                    "open_cache_age_seconds": 42,
                    "close_cache_age_seconds": null,
                    "ttl_seconds": 3600
                }
            })
        );
    }

    #[test]
    fn test_trading_day_body_uses_iso_date() {
        let body = TradingDayBody {
            date: NaiveDate::from_ymd_opt(2024, 2, 12).unwrap(),
            is_trading_day: false,
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({"date": "2024-02-12", "is_trading_day": false})
        );
    }
}
