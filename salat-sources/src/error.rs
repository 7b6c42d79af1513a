//! Error types for the salat-sources crate.
//!
//! Every upstream failure funnels into [`SourceError`]. Callers treat all
//! variants the same way for fallback purposes: the tier failed, try the
//! next one.

/// Errors that can occur while fetching or parsing prayer times upstream.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The request did not complete within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The HTTP request failed (connect, TLS, non-2xx status, body read).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The upstream response did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid source configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The source cannot produce a result for the given input
    /// (e.g. no row for the requested day).
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    /// Map a reqwest error, keeping timeouts distinguishable.
    pub(crate) fn from_reqwest(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(format!("{context}: {err}"))
        } else {
            Self::Http(format!("{context}: {err}"))
        }
    }
}

/// Convenience type alias for salat-sources results.
pub type Result<T> = std::result::Result<T, SourceError>;
