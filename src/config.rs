//! Service configuration
//!
//! Raw [`Settings`] come from command-line flags or environment variables;
//! [`Settings::into_config`] validates them into a typed [`ServiceConfig`].
//! An invalid configuration aborts startup. An unreachable store never does.

use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use clap::Args;

use crate::adapters::{B3Calendar, StoreConfig};
use crate::domain::ports::CacheKey;
use crate::error::{Error, Result};
use crate::resolver::ResolverConfig;

/// Externally supplied settings, before validation.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Redis connection URL
    #[arg(long, env = "REDIS_URL", default_value = "redis://localhost:6379")]
    pub redis_url: String,

    /// Redis key holding the opening time (HH:MM)
    #[arg(long, env = "REDIS_KEY_OPEN", default_value = "b3:trading:hours:open")]
    pub redis_key_open: String,

    /// Redis key holding the closing time (HH:MM)
    #[arg(long, env = "REDIS_KEY_CLOSE", default_value = "b3:trading:hours:close")]
    pub redis_key_close: String,

    /// Maximum age in seconds of a cached value served while Redis is down
    #[arg(long, env = "CACHE_TTL_SECONDS", default_value = "3600")]
    pub cache_ttl_seconds: u64,

    /// Redis connect timeout in seconds
    #[arg(long, env = "STORE_CONNECT_TIMEOUT_SECONDS", default_value = "5")]
    pub store_connect_timeout_seconds: u64,

    /// Redis per-command timeout in seconds
    #[arg(long, env = "STORE_OPERATION_TIMEOUT_SECONDS", default_value = "5")]
    pub store_operation_timeout_seconds: u64,

    /// Minimum seconds between reconnection attempts while Redis is down
    #[arg(long, env = "STORE_RECONNECT_INTERVAL_SECONDS", default_value = "5")]
    pub store_reconnect_interval_seconds: u64,

    /// IANA timezone used for "today" and health timestamps
    #[arg(long, env = "TIMEZONE", default_value = "America/Sao_Paulo")]
    pub timezone: String,

    /// Exchange calendar name
    #[arg(long, env = "EXCHANGE_NAME", default_value = "BVMF")]
    pub exchange_name: String,

    /// Earliest year accepted by trading-day range queries
    #[arg(long, env = "MIN_DATE_YEAR", default_value = "2006")]
    pub min_date_year: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            redis_key_open: "b3:trading:hours:open".to_string(),
            redis_key_close: "b3:trading:hours:close".to_string(),
            cache_ttl_seconds: 3600,
            store_connect_timeout_seconds: 5,
            store_operation_timeout_seconds: 5,
            store_reconnect_interval_seconds: 5,
            timezone: "America/Sao_Paulo".to_string(),
            exchange_name: "BVMF".to_string(),
            min_date_year: 2006,
        }
    }
}

impl Settings {
    /// Validate and convert into a [`ServiceConfig`].
    pub fn into_config(self) -> Result<ServiceConfig> {
        let timezone: Tz = self.timezone.parse().map_err(|_| {
            Error::Config(format!(
                "timezone '{}' is not a valid IANA name",
                self.timezone
            ))
        })?;

        if self.redis_key_open.trim().is_empty() || self.redis_key_close.trim().is_empty() {
            return Err(Error::Config("Redis keys must not be empty".into()));
        }
        if self.redis_key_open == self.redis_key_close {
            return Err(Error::Config(format!(
                "open and close keys must differ (both '{}')",
                self.redis_key_open
            )));
        }

        if self.store_connect_timeout_seconds == 0 || self.store_operation_timeout_seconds == 0 {
            return Err(Error::Config("store timeouts must be at least 1 second".into()));
        }

        if !B3Calendar::supports(&self.exchange_name) {
            return Err(Error::Config(format!(
                "unsupported exchange calendar '{}'",
                self.exchange_name
            )));
        }

        let min_date = NaiveDate::from_ymd_opt(self.min_date_year, 1, 1).ok_or_else(|| {
            Error::Config(format!("min date year {} is out of range", self.min_date_year))
        })?;

        Ok(ServiceConfig {
            store: StoreConfig {
                url: self.redis_url,
                connect_timeout: Duration::from_secs(self.store_connect_timeout_seconds),
                operation_timeout: Duration::from_secs(self.store_operation_timeout_seconds),
                reconnect_interval: Duration::from_secs(self.store_reconnect_interval_seconds),
            },
            open_key: CacheKey::new(self.redis_key_open),
            close_key: CacheKey::new(self.redis_key_close),
            resolver: ResolverConfig {
                ttl: Duration::from_secs(self.cache_ttl_seconds),
            },
            timezone,
            exchange_name: self.exchange_name.to_uppercase(),
            min_date,
        })
    }
}

/// Validated configuration consumed by the service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Remote store connection settings
    pub store: StoreConfig,
    /// Key holding the opening time
    pub open_key: CacheKey,
    /// Key holding the closing time
    pub close_key: CacheKey,
    /// Staleness policy
    pub resolver: ResolverConfig,
    /// Exchange timezone
    pub timezone: Tz,
    /// Exchange calendar name
    pub exchange_name: String,
    /// Earliest date accepted by range queries
    pub min_date: NaiveDate,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            open_key: CacheKey::from("b3:trading:hours:open"),
            close_key: CacheKey::from("b3:trading:hours:close"),
            resolver: ResolverConfig::default(),
            timezone: chrono_tz::America::Sao_Paulo,
            exchange_name: "BVMF".to_string(),
            min_date: NaiveDate::from_ymd_opt(2006, 1, 1).unwrap_or(NaiveDate::MIN),
        }
    }
}
