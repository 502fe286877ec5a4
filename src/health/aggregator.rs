//! Health Aggregator
//!
//! Classifies service health from store connectivity and local cache state.
//! Nothing is remembered between calls: every report is recomputed from a
//! fresh store probe and the current cache ages.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::cache::LocalCache;
use crate::domain::ports::{CacheKey, KeyValueStore};
use crate::metrics::ServiceMetrics;

/// Health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Store reachable
    Healthy,
    /// Store unreachable, cached values present
    Degraded,
    /// Store unreachable, nothing cached
    Unhealthy,
}

impl HealthStatus {
    /// Classify from the two inputs that define health.
    pub fn classify(store_connected: bool, any_cached: bool) -> Self {
        if store_connected {
            HealthStatus::Healthy
        } else if any_cached {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        }
    }

    /// Check if status is healthy or degraded (operational)
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }

    /// Check if status is healthy
    pub fn is_healthy(&self) -> bool {
        *self == HealthStatus::Healthy
    }

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Point-in-time health classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    /// Overall status
    pub overall: HealthStatus,
    /// Result of the store probe
    pub store_connected: bool,
    /// Cache age per tracked key; `None` when the key was never cached
    pub cache_ages: BTreeMap<CacheKey, Option<Duration>>,
    /// When the report was computed
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    /// Cache age for `key`, if tracked and cached.
    pub fn cache_age(&self, key: &CacheKey) -> Option<Duration> {
        self.cache_ages.get(key).copied().flatten()
    }
}

/// Derives [`HealthReport`]s from the store and the local cache.
pub struct HealthAggregator {
    store: Arc<dyn KeyValueStore>,
    cache: Arc<LocalCache>,
    tracked: Vec<CacheKey>,
    metrics: Option<ServiceMetrics>,
}

impl HealthAggregator {
    /// Create an aggregator watching the cache ages of `tracked` keys.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        cache: Arc<LocalCache>,
        tracked: Vec<CacheKey>,
    ) -> Self {
        Self {
            store,
            cache,
            tracked,
            metrics: None,
        }
    }

    /// Publish each probe result to `metrics`.
    pub fn with_metrics(mut self, metrics: ServiceMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Keys whose cache ages are reported.
    pub fn tracked(&self) -> &[CacheKey] {
        &self.tracked
    }

    /// Probe the store and classify.
    #[instrument(skip(self))]
    pub async fn status(&self) -> HealthReport {
        let store_connected = self.store.ping().await;
        if let Some(metrics) = &self.metrics {
            metrics.set_store_up(store_connected);
        }

        let cache_ages: BTreeMap<CacheKey, Option<Duration>> = self
            .tracked
            .iter()
            .map(|key| (key.clone(), self.cache.age(key)))
            .collect();
        let any_cached = cache_ages.values().any(Option::is_some);

        let overall = HealthStatus::classify(store_connected, any_cached);
        debug!(status = %overall, store_connected, "Health computed");

        HealthReport {
            overall,
            store_connected,
            cache_ages,
            checked_at: self.cache.clock().now(),
        }
    }
}

impl std::fmt::Debug for HealthAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthAggregator")
            .field("tracked", &self.tracked)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
