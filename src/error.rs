//! Error types for the salat core.

use salat_sources::SourceError;

/// Top-level error type for cache, resolution and scheduling.
#[derive(Debug, thiserror::Error)]
pub enum SalatError {
    /// Upstream transport failure (timeout, non-2xx, TLS).
    #[error("network error: {0}")]
    Network(SourceError),

    /// Upstream response did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// A persisted entry could not be decoded.
    #[error("cache corruption: {0}")]
    CacheCorruption(String),

    /// The notification sink rejected an alert registration.
    #[error("scheduling error: {0}")]
    Scheduling(String),

    /// Persistent store read/write failure.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Background job runner error.
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// Every resolver tier failed or returned an invalid snapshot.
    #[error("no valid prayer-time source: {0}")]
    NoValidSource(String),

    /// Nothing to show: first load with no cache and no working source.
    #[error("first load failed: {0}")]
    FirstLoadFailed(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SourceError> for SalatError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Parse(msg) => Self::Parse(msg),
            SourceError::Config(msg) => Self::Config(msg),
            other => Self::Network(other),
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, SalatError>;
