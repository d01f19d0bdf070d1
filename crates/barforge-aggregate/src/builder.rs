//! Per-bucket OHLC accumulator shared by the tick and sample paths.

use barforge_types::{AssetClass, Bar, Timeframe};
use chrono::{DateTime, Utc};

/// Accumulates prices falling into one bucket.
#[derive(Debug, Clone)]
pub(crate) struct BarBuilder {
    pub(crate) bucket_start: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

impl BarBuilder {
    /// Starts a bucket from its first observation.
    pub(crate) const fn new(bucket_start: DateTime<Utc>, price: f64, volume: u64) -> Self {
        Self {
            bucket_start,
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
        }
    }

    /// Folds a later observation into the bucket.
    pub(crate) fn update(&mut self, price: f64, volume: u64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume = self.volume.saturating_add(volume);
    }

    /// Finishes the bucket.
    pub(crate) fn finish(
        self,
        ticker: &str,
        timeframe: Timeframe,
        vwap: Option<f64>,
        asset_class: AssetClass,
    ) -> Bar {
        Bar {
            ticker: ticker.to_string(),
            timeframe,
            bucket_start: self.bucket_start,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            vwap,
            asset_class,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_builder_tracks_extremes() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let mut builder = BarBuilder::new(start, 5.0, 1);
        builder.update(7.0, 2);
        builder.update(3.0, 0);
        builder.update(6.0, 4);
        let bar = builder.finish("X", Timeframe::Minute5, None, AssetClass::Equity);
        assert!((bar.open - 5.0).abs() < 1e-10);
        assert!((bar.high - 7.0).abs() < 1e-10);
        assert!((bar.low - 3.0).abs() < 1e-10);
        assert!((bar.close - 6.0).abs() < 1e-10);
        assert_eq!(bar.volume, 7);
    }
}
