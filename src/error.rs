//! Error types for the B3 hours service

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur outside the fallback read path.
///
/// Remote-store failures never show up here: the store adapter turns them
/// into absence signals, and the resolver reports its own outcome through
/// [`crate::resolver::Unavailable`].
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP server error
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// Malformed or out-of-bounds date supplied by a caller
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Date range whose bounds are out of order or below the minimum
    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors caused by the caller's input (mapped to HTTP 400).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidDate(_) | Error::InvalidRange(_))
    }
}
