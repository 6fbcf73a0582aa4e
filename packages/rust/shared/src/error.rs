//! Error types for Canonic.
//!
//! Library crates use [`CanonicError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! "Not found" is deliberately absent: lookups that can miss return
//! `Result<Option<T>>`, so an `Err` always means "could not determine".

use std::path::PathBuf;

/// Top-level error type for all Canonic operations.
#[derive(Debug, thiserror::Error)]
pub enum CanonicError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The directory store could not be reached.
    #[error("transport error: {0}")]
    Transport(String),

    /// The directory store answered with a non-success status.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The store rejected the requested page size.
    #[error("page limit exceeded (limit {limit})")]
    PageLimitExceeded { limit: usize },

    /// The store rejects even a page of one item.
    #[error("pagination is broken: the store rejects a page size of 1")]
    PaginationBroken,

    /// Malformed response body or data file.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad identifier, unknown entity kind, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// LLM bridge or decision-function failure.
    #[error("bridge error: {0}")]
    Bridge(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CanonicError>;

impl CanonicError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a bridge error from any displayable message.
    pub fn bridge(msg: impl Into<String>) -> Self {
        Self::Bridge(msg.into())
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the store refused the page size.
    pub fn is_page_limit(&self) -> bool {
        matches!(self, Self::PageLimitExceeded { .. })
    }
}
