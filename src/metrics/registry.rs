//! Service Metrics
//!
//! Counters and gauges owned by the service object and exposed on the
//! metrics listener in Prometheus text format.

use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::domain::ports::CacheKey;
use crate::error::{Error, Result};
use crate::resolver::Outcome;

/// Prometheus registry plus the handles the service updates.
#[derive(Clone)]
pub struct ServiceMetrics {
    registry: Registry,
    resolutions: IntCounterVec,
    store_up: IntGauge,
}

impl ServiceMetrics {
    /// Create a fresh registry with all service metrics registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let resolutions = IntCounterVec::new(
            Opts::new(
                "b3hours_resolutions_total",
                "Total key resolutions by outcome (live, cached, no_cached_value, cache_expired)",
            ),
            &["key", "outcome"],
        )
        .map_err(metrics_error)?;

        let store_up = IntGauge::new(
            "b3hours_store_up",
            "1 if the last store health probe succeeded, 0 otherwise",
        )
        .map_err(metrics_error)?;

        registry
            .register(Box::new(resolutions.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(store_up.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            registry,
            resolutions,
            store_up,
        })
    }

    /// Count one resolution of `key`.
    pub fn record_resolution(&self, key: &CacheKey, outcome: Outcome) {
        self.resolutions
            .with_label_values(&[key.as_str(), outcome.as_str()])
            .inc();
    }

    /// Resolutions of `key` so far with the given outcome.
    pub fn resolution_count(&self, key: &CacheKey, outcome: Outcome) -> u64 {
        self.resolutions
            .with_label_values(&[key.as_str(), outcome.as_str()])
            .get()
    }

    /// Record the result of a store probe.
    pub fn set_store_up(&self, up: bool) {
        self.store_up.set(i64::from(up));
    }

    /// Render every registered metric in the text exposition format.
    ///
    /// Returns the content type alongside the body.
    pub fn encode(&self) -> Result<(String, Vec<u8>)> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        Ok((encoder.format_type().to_string(), buffer))
    }
}

impl std::fmt::Debug for ServiceMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceMetrics").finish_non_exhaustive()
    }
}

fn metrics_error(e: prometheus::Error) -> Error {
    Error::Internal(format!("Metrics error: {}", e))
}
