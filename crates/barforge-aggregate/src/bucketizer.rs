//! Streaming tick-to-bar aggregation with running VWAP.

use std::collections::BTreeMap;

use barforge_types::{AssetClass, Bar, Tick, Timeframe};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::builder::BarBuilder;

/// Streaming bucketizer for a single symbol.
///
/// Ticks must be pushed in non-decreasing time order. Each completed bar
/// carries the cumulative VWAP over every tick pushed so far, sampled at the
/// bucket's last trade.
#[derive(Debug)]
pub struct Bucketizer {
    symbol: String,
    timeframe: Timeframe,
    current: Option<BarBuilder>,
    last_seen: Option<DateTime<Utc>>,
    cum_notional: f64,
    cum_volume: u64,
    out_of_order: usize,
}

impl Bucketizer {
    /// Creates a bucketizer for `symbol` at the given timeframe.
    #[must_use]
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            current: None,
            last_seen: None,
            cum_notional: 0.0,
            cum_volume: 0,
            out_of_order: 0,
        }
    }

    /// Returns the symbol being aggregated.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Returns the timeframe being aggregated to.
    #[must_use]
    pub const fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Returns the number of ticks rejected for arriving out of order.
    #[must_use]
    pub const fn out_of_order(&self) -> usize {
        self.out_of_order
    }

    /// Returns the running VWAP, or `None` before any volume has traded.
    #[must_use]
    pub fn running_vwap(&self) -> Option<f64> {
        (self.cum_volume > 0).then(|| self.cum_notional / self.cum_volume as f64)
    }

    /// Processes a tick, returning the previous bar if this tick opens a new bucket.
    pub fn push(&mut self, tick: &Tick) -> Option<Bar> {
        if self.last_seen.is_some_and(|last| tick.timestamp < last) {
            self.out_of_order += 1;
            debug!(symbol = %self.symbol, timestamp = %tick.timestamp, "Out-of-order tick ignored");
            return None;
        }
        self.last_seen = Some(tick.timestamp);

        let bucket_start = self.timeframe.bucket_start(tick.timestamp);
        let completed = match self.current.take() {
            Some(mut builder) if builder.bucket_start == bucket_start => {
                builder.update(tick.price, tick.volume);
                self.current = Some(builder);
                None
            }
            Some(builder) => {
                let bar = self.close_bucket(builder);
                self.current = Some(BarBuilder::new(bucket_start, tick.price, tick.volume));
                bar
            }
            None => {
                self.current = Some(BarBuilder::new(bucket_start, tick.price, tick.volume));
                None
            }
        };

        self.cum_notional += tick.notional();
        self.cum_volume = self.cum_volume.saturating_add(tick.volume);
        completed
    }

    /// Finishes aggregation, returning the last (possibly still live) bar.
    #[must_use]
    pub fn finish(mut self) -> Option<Bar> {
        let builder = self.current.take()?;
        self.close_bucket(builder)
    }

    /// Emits a bar, or drops it when no volume has traded yet and VWAP is undefined.
    fn close_bucket(&self, builder: BarBuilder) -> Option<Bar> {
        let Some(vwap) = self.running_vwap() else {
            debug!(
                symbol = %self.symbol,
                bucket = %builder.bucket_start,
                "Dropping bucket with undefined VWAP"
            );
            return None;
        };
        Some(builder.finish(&self.symbol, self.timeframe, Some(vwap), AssetClass::Equity))
    }
}

/// Bucketizes one symbol's ticks into bars in ascending bucket order.
///
/// The ticks are sorted by time first (stable, so equal timestamps keep their
/// delivery order). Buckets with no ticks produce no bar.
#[must_use]
pub fn bucketize(symbol: &str, timeframe: Timeframe, ticks: &[Tick]) -> Vec<Bar> {
    let mut ordered: Vec<&Tick> = ticks.iter().collect();
    ordered.sort_by_key(|t| t.timestamp);

    let mut bucketizer = Bucketizer::new(symbol, timeframe);
    let mut bars: Vec<Bar> = ordered
        .into_iter()
        .filter_map(|tick| bucketizer.push(tick))
        .collect();
    bars.extend(bucketizer.finish());
    bars
}

/// Groups a mixed tick window by symbol and bucketizes each group.
#[must_use]
pub fn bucketize_by_symbol(timeframe: Timeframe, ticks: &[Tick]) -> BTreeMap<String, Vec<Bar>> {
    let mut groups: BTreeMap<&str, Vec<Tick>> = BTreeMap::new();
    for tick in ticks {
        groups
            .entry(tick.symbol.as_str())
            .or_default()
            .push(tick.clone());
    }

    groups
        .into_iter()
        .map(|(symbol, ticks)| (symbol.to_string(), bucketize(symbol, timeframe, &ticks)))
        .filter(|(_, bars)| !bars.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeDelta, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    fn tick(offset_secs: i64, price: f64, volume: u64) -> Tick {
        Tick::new("COMI", base() + TimeDelta::seconds(offset_secs), price, volume)
    }

    #[test]
    fn test_single_bucket_ohlcv() {
        let ticks = vec![tick(0, 5.0, 1), tick(30, 6.0, 2), tick(299, 5.5, 0)];
        let bars = bucketize("COMI", Timeframe::Minute5, &ticks);

        assert_eq!(bars.len(), 1);
        let bar = &bars[0];
        assert_eq!(bar.bucket_start, base());
        assert_relative_eq!(bar.open, 5.0);
        assert_relative_eq!(bar.high, 6.0);
        assert_relative_eq!(bar.low, 5.0);
        assert_relative_eq!(bar.close, 5.5);
        assert_eq!(bar.volume, 3);
        assert_eq!(bar.asset_class, AssetClass::Equity);
    }

    #[test]
    fn test_single_tick_is_degenerate() {
        let bars = bucketize("COMI", Timeframe::Minute1, &[tick(12, 9.25, 10)]);
        assert_eq!(bars.len(), 1);
        let bar = &bars[0];
        assert_relative_eq!(bar.open, 9.25);
        assert_relative_eq!(bar.high, 9.25);
        assert_relative_eq!(bar.low, 9.25);
        assert_relative_eq!(bar.close, 9.25);
        assert_relative_eq!(bar.vwap.unwrap(), 9.25);
    }

    #[test]
    fn test_vwap_is_cumulative_across_buckets() {
        // Bucket 1: 10 x 100, bucket 2: 20 x 300.
        let ticks = vec![tick(0, 10.0, 100), tick(60, 20.0, 300)];
        let bars = bucketize("COMI", Timeframe::Minute1, &ticks);

        assert_eq!(bars.len(), 2);
        assert_relative_eq!(bars[0].vwap.unwrap(), 10.0);
        // Not the per-bucket 20.0.
        assert_relative_eq!(bars[1].vwap.unwrap(), (1000.0 + 6000.0) / 400.0);
    }

    #[test]
    fn test_empty_buckets_are_skipped() {
        let ticks = vec![tick(0, 1.0, 1), tick(3600, 2.0, 1)];
        let bars = bucketize("COMI", Timeframe::Minute5, &ticks);
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].bucket_start - bars[0].bucket_start, TimeDelta::hours(1));
    }

    #[test]
    fn test_unsorted_input_is_ordered() {
        let ticks = vec![tick(70, 3.0, 1), tick(10, 1.0, 1), tick(20, 2.0, 1)];
        let bars = bucketize("COMI", Timeframe::Minute1, &ticks);
        assert_eq!(bars.len(), 2);
        assert_relative_eq!(bars[0].open, 1.0);
        assert_relative_eq!(bars[0].close, 2.0);
        assert!(bars[0].bucket_start < bars[1].bucket_start);
    }

    #[test]
    fn test_streaming_rejects_out_of_order() {
        let mut bucketizer = Bucketizer::new("COMI", Timeframe::Minute1);
        assert!(bucketizer.push(&tick(65, 2.0, 1)).is_none());
        assert!(bucketizer.push(&tick(5, 1.0, 1)).is_none());
        assert_eq!(bucketizer.out_of_order(), 1);
        let bar = bucketizer.finish().unwrap();
        assert_relative_eq!(bar.open, 2.0);
    }

    #[test]
    fn test_zero_volume_prefix_is_dropped() {
        let ticks = vec![tick(0, 4.0, 0), tick(60, 5.0, 10)];
        let bars = bucketize("COMI", Timeframe::Minute1, &ticks);
        assert_eq!(bars.len(), 1);
        assert_relative_eq!(bars[0].open, 5.0);
    }

    #[test]
    fn test_by_symbol_groups() {
        let mut ticks = vec![tick(0, 5.0, 1), tick(10, 6.0, 1)];
        ticks.push(Tick::new("ETEL", base(), 20.0, 5));
        let grouped = bucketize_by_symbol(Timeframe::Minute5, &ticks);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["COMI"][0].volume, 2);
        assert_eq!(grouped["ETEL"][0].ticker, "ETEL");
    }

    #[test]
    fn test_bar_invariants_and_vwap_bounds() {
        let prices = [10.0, 12.5, 9.5, 11.0, 13.0, 8.75, 10.25, 12.0];
        let ticks: Vec<Tick> = prices
            .iter()
            .enumerate()
            .map(|(i, p)| tick(i as i64 * 45, *p, (i as u64 % 3) + 1))
            .collect();
        let bars = bucketize("COMI", Timeframe::Minute1, &ticks);

        let mut seen_min = f64::MAX;
        let mut seen_max = f64::MIN;
        let mut idx = 0;
        for bar in &bars {
            assert!(bar.is_consistent());
            while idx < ticks.len()
                && Timeframe::Minute1.bucket_start(ticks[idx].timestamp) <= bar.bucket_start
            {
                seen_min = seen_min.min(ticks[idx].price);
                seen_max = seen_max.max(ticks[idx].price);
                idx += 1;
            }
            let vwap = bar.vwap.unwrap();
            assert!(vwap >= seen_min && vwap <= seen_max);
        }
    }
}
