//! Domain Layer
//!
//! Core abstractions shared by the read path, the health aggregator and the
//! HTTP layer.
//!
//! - **Ports** (`ports.rs`) - Trait abstractions for external dependencies
//!
//! # Usage
//!
//! ```ignore
//! use b3hours::domain::{CacheKey, KeyValueStore};
//!
//! async fn warm<S: KeyValueStore + ?Sized>(store: &S, key: &CacheKey) -> bool {
//!     store.fetch(key).await.is_some()
//! }
//! ```

pub mod ports;

pub use ports::{CacheKey, Clock, KeyValueStore, TradingCalendar};
