//! Store error types.

use barforge_types::Timeframe;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised by a [`BarStore`](crate::BarStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// Duplicate-bucket insert or an update that matched no row.
    ///
    /// Reconciliation treats this as already applied.
    #[error("Write conflict on {ticker}/{timeframe} at {bucket_start}: {reason}")]
    WriteConflict {
        /// Series ticker.
        ticker: String,
        /// Series timeframe.
        timeframe: Timeframe,
        /// Conflicting bucket.
        bucket_start: DateTime<Utc>,
        /// What collided.
        reason: &'static str,
    },

    /// A single bar was refused (bad OHLC ordering, misaligned bucket).
    #[error("Rejected bar {ticker}/{timeframe} at {bucket_start}: {reason}")]
    Rejected {
        /// Series ticker.
        ticker: String,
        /// Series timeframe.
        timeframe: Timeframe,
        /// Offending bucket.
        bucket_start: DateTime<Utc>,
        /// Why it was refused.
        reason: String,
    },

    /// A rescale ratio that is zero, negative or non-finite.
    #[error("Invalid rescale ratio {0}")]
    InvalidRatio(f64),

    /// The store cannot be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// SQLite failure.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The blocking worker running a query was cancelled or panicked.
    #[error("Store worker failed: {0}")]
    Join(String),

    /// A persisted row could not be decoded.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Returns true for duplicate or stale writes.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::WriteConflict { .. })
    }

    /// Returns true if the store as a whole is unusable and the pass must abort.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Sqlite(_) | Self::Join(_))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
