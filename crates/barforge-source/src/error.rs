//! Source error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The event source could not deliver events.
///
/// Every variant leaves the watermarks untouched; the next poll cycle retries.
#[derive(Error, Debug)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server kept returning an error status.
    #[error("Server returned {status} for {url}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Response body was not the expected JSON.
    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        /// Requested URL.
        url: String,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Retries were exhausted.
    #[error("Request timed out after {0} attempts")]
    Timeout(u32),

    /// A full page did not advance the cursor.
    #[error("Pagination stalled at {cursor}: a full page brought no new trades")]
    Stalled {
        /// Cursor that could not be advanced.
        cursor: DateTime<Utc>,
    },

    /// The configured endpoint is unusable.
    #[error("Invalid source configuration: {0}")]
    Config(String),

    /// The source is switched off (used by test doubles).
    #[error("Source offline")]
    Offline,
}

impl SourceError {
    /// Returns true if retrying on a later cycle can succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Timeout(_) | Self::Offline | Self::Stalled { .. } => true,
            Self::Decode { .. } | Self::Config(_) => false,
        }
    }
}
