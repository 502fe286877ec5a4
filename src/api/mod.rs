//! HTTP API
//!
//! ```text
//!   GET /                     service info
//!   GET /v1/hours             {open, close}        503 when either fails
//!   GET /v1/hours/open        {time}               503 when unavailable
//!   GET /v1/hours/close       {time}               503 when unavailable
//!   GET /v1/health            three-level health   always 200
//!   GET /v1/is-trading-day    {date, is_trading_day}
//!   GET /v1/trading-days      [date, ...]          400 on bad input
//! ```
//!
//! Prometheus metrics are served by a separate listener.

pub mod responses;
mod routes;
mod server;

pub use routes::{handle, parse_query};
pub use server::{bind, serve_api, serve_metrics};
