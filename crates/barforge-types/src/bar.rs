//! OHLCV bar records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Timeframe;

/// Asset-class flag stored alongside every bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    /// Official, sector or synthetic composite index.
    Index,
    /// Individually traded security.
    Equity,
}

impl AssetClass {
    /// Returns the persisted integer flag (`0` for indices, `1` for equities).
    #[must_use]
    pub const fn flag(&self) -> i64 {
        match self {
            Self::Index => 0,
            Self::Equity => 1,
        }
    }

    /// Parses a persisted integer flag.
    #[must_use]
    pub const fn from_flag(flag: i64) -> Option<Self> {
        match flag {
            0 => Some(Self::Index),
            1 => Some(Self::Equity),
            _ => None,
        }
    }
}

/// OHLCV record for one ticker, timeframe and bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Ticker (raw security, sector code or composite index name).
    pub ticker: String,
    /// Bucket width.
    pub timeframe: Timeframe,
    /// Bucket open time, aligned to the timeframe.
    pub bucket_start: DateTime<Utc>,
    /// First price in the bucket.
    pub open: f64,
    /// Highest price in the bucket.
    pub high: f64,
    /// Lowest price in the bucket.
    pub low: f64,
    /// Last price in the bucket.
    pub close: f64,
    /// Traded quantity in the bucket.
    pub volume: u64,
    /// Volume-weighted average price, when the series has one.
    pub vwap: Option<f64>,
    /// Asset-class flag.
    pub asset_class: AssetClass,
}

impl Bar {
    /// Returns true if `low ≤ {open, close} ≤ high` and the bucket start is aligned.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.low <= self.open
            && self.low <= self.close
            && self.open <= self.high
            && self.close <= self.high
            && self.timeframe.is_aligned(self.bucket_start)
    }

    /// Returns true if the price fields equal those of `other`.
    #[must_use]
    pub fn same_prices(&self, other: &Self) -> bool {
        self.open == other.open
            && self.high == other.high
            && self.low == other.low
            && self.close == other.close
    }

    /// Applies an in-place revision.
    pub fn apply(&mut self, update: &BarUpdate) {
        match *update {
            BarUpdate::Full {
                open,
                high,
                low,
                close,
                vwap,
                volume,
            } => {
                self.open = open;
                self.high = high;
                self.low = low;
                self.close = close;
                self.vwap = vwap;
                self.volume = volume;
            }
            BarUpdate::Volume(volume) => self.volume = volume,
            BarUpdate::Prices {
                open,
                high,
                low,
                close,
            } => {
                self.open = open;
                self.high = high;
                self.low = low;
                self.close = close;
            }
        }
    }
}

/// Field set written by an in-place update of a live bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BarUpdate {
    /// Revise prices, VWAP and volume (raw tickers).
    Full {
        /// New open.
        open: f64,
        /// New high.
        high: f64,
        /// New low.
        low: f64,
        /// New close.
        close: f64,
        /// New VWAP.
        vwap: Option<f64>,
        /// New volume.
        volume: u64,
    },
    /// Revise volume only (composite indices).
    Volume(u64),
    /// Revise OHLC only (sector indices, which carry no volume).
    Prices {
        /// New open.
        open: f64,
        /// New high.
        high: f64,
        /// New low.
        low: f64,
        /// New close.
        close: f64,
    },
}

impl BarUpdate {
    /// Builds a full revision from a freshly computed bar.
    #[must_use]
    pub const fn full_from(bar: &Bar) -> Self {
        Self::Full {
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            vwap: bar.vwap,
            volume: bar.volume,
        }
    }

    /// Builds a price-only revision from a freshly computed bar.
    #[must_use]
    pub const fn prices_from(bar: &Bar) -> Self {
        Self::Prices {
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
        }
    }
}
