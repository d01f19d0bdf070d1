//! Error types for raw event validation.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// A raw trade or sample that cannot be turned into a usable event.
///
/// Malformed events are dropped individually; they never abort a pass.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedEvent {
    /// The symbol or code was empty after normalisation.
    #[error("Empty symbol at {timestamp}")]
    EmptySymbol {
        /// Event time.
        timestamp: DateTime<Utc>,
    },

    /// The price (or index value) was absent.
    #[error("Missing price for {symbol} at {timestamp}")]
    MissingPrice {
        /// Normalised symbol.
        symbol: String,
        /// Event time.
        timestamp: DateTime<Utc>,
    },

    /// The price was non-finite or not strictly positive.
    #[error("Invalid price {price} for {symbol} at {timestamp}")]
    InvalidPrice {
        /// Normalised symbol.
        symbol: String,
        /// Event time.
        timestamp: DateTime<Utc>,
        /// The rejected price.
        price: f64,
    },

    /// The traded volume was absent.
    #[error("Missing volume for {symbol} at {timestamp}")]
    MissingVolume {
        /// Normalised symbol.
        symbol: String,
        /// Event time.
        timestamp: DateTime<Utc>,
    },

    /// The traded volume was negative, fractional or non-finite.
    #[error("Invalid volume {volume} for {symbol} at {timestamp}")]
    InvalidVolume {
        /// Normalised symbol.
        symbol: String,
        /// Event time.
        timestamp: DateTime<Utc>,
        /// The rejected volume.
        volume: f64,
    },
}
