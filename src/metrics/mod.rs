//! Metrics module
//!
//! Prometheus instrumentation for the read path and the store probe.

mod registry;

pub use registry::ServiceMetrics;
