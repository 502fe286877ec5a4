//! Service Health
//!
//! Three-level health derived on demand:
//!
//! ```text
//!   store ping ok ───────────────────────────▶ Healthy
//!   store down, some tracked key cached ─────▶ Degraded
//!   store down, nothing cached ──────────────▶ Unhealthy
//! ```

mod aggregator;

pub use aggregator::{HealthAggregator, HealthReport, HealthStatus};
