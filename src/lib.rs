//! B3 Trading Hours Service
//!
//! Serves the exchange's opening and closing times from Redis over HTTP and
//! keeps answering through short Redis outages from a local cache whose
//! staleness is bounded by a TTL.
//!
//! # Architecture
//!
//! ```text
//!              ┌──────────────────────── HoursService ───────────────────────┐
//!  HTTP ──────▶│  FallbackResolver ──▶ KeyValueStore (Redis)                  │
//!              │        │                                                    │
//!              │        └──────────▶ LocalCache ◀── HealthAggregator          │
//!              │                                                             │
//!              │  TradingCalendar (B3)     Clock     ServiceMetrics          │
//!              └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Store, clock and calendar implementations of the domain ports
//! - [`api`] - HTTP routing, bodies and listeners
//! - [`cache`] - Local fallback cache
//! - [`config`] - Settings and validated configuration
//! - [`domain`] - Ports
//! - [`error`] - Error types
//! - [`health`] - Health aggregation
//! - [`metrics`] - Prometheus metrics
//! - [`resolver`] - Fallback read path
//! - [`service`] - Service object shared by request handlers

pub mod adapters;
pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod health;
pub mod metrics;
pub mod resolver;
pub mod service;

// Re-export commonly used types
pub use cache::LocalCache;
pub use config::{ServiceConfig, Settings};
pub use domain::{CacheKey, Clock, KeyValueStore, TradingCalendar};
pub use error::{Error, Result};
pub use health::{HealthAggregator, HealthReport, HealthStatus};
pub use resolver::{FallbackResolver, Unavailable};
pub use service::{HoursService, TradingHours};
