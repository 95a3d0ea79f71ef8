//! Error types for the client.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before a response was produced
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem failure while persisting or loading session state
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The API returned a non-2xx status
    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        retry_after: Option<u64>,
    },

    /// Rate limited (HTTP 429)
    #[error("rate limited{}", retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    RateLimited { retry_after: Option<u64> },

    /// The account is suspended (platform error codes 37/64)
    #[error("account suspended: {0}")]
    AccountSuspended(String),

    /// The account is locked behind a verification challenge (code 326)
    #[error("account locked: {0}")]
    AccountLocked(String),

    /// An entity payload is missing the field its identity depends on.
    ///
    /// Raised only for unrecoverable identity fields; every other missing
    /// field degrades to a documented default instead.
    #[error("malformed {kind} entity: {reason}")]
    MalformedEntity {
        kind: &'static str,
        reason: String,
    },

    /// Challenge-solver subprocess failed or produced malformed output
    #[error("challenge solver error: {0}")]
    ChallengeSolver(String),

    /// Login flow protocol violation
    #[error("auth error: {0}")]
    Auth(String),

    /// Streaming session protocol violation
    #[error("stream error: {0}")]
    Stream(String),
}

impl Error {
    /// Whether retrying the same request could plausibly succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status >= 500,
            Self::RateLimited { .. } => true,
            _ => false,
        }
    }

    /// Suggested delay before retrying, where the API provided one.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => retry_after.map(Duration::from_secs),
            Self::Api { retry_after, .. } => retry_after.map(Duration::from_secs),
            _ => None,
        }
    }

    pub(crate) fn malformed(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedEntity {
            kind,
            reason: reason.into(),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
