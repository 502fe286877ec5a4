//! Infrastructure Adapters
//!
//! This module contains adapter implementations for the domain ports,
//! following the Port/Adapter (Hexagonal) architecture pattern.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                              │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │                    Ports (Traits)                           │ │
//! │  │      KeyValueStore   │   Clock   │   TradingCalendar        │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │ RedisStore │ InMemoryStore │ SystemClock │ ManualClock     │ │
//! │  │ B3Calendar                                                 │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use b3hours::adapters::{RedisStore, StoreConfig};
//! use b3hours::domain::KeyValueStore;
//!
//! let store = RedisStore::connect(StoreConfig::default()).await;
//! let alive = store.ping().await;
//! ```

mod b3_calendar;
mod clock;
mod memory;
mod redis_store;

pub use b3_calendar::{easter_sunday, B3Calendar, B3_EXCHANGE_NAMES};
pub use clock::{ManualClock, SystemClock};
pub use memory::InMemoryStore;
pub use redis_store::{RedisStore, StoreConfig};
