//! Index-value sample resampling.

use std::collections::BTreeMap;

use barforge_types::{AssetClass, Bar, IndexSample, Timeframe};

use crate::builder::BarBuilder;

/// Resamples one index series into OHLC bars.
///
/// The sample values feed the same open/high/low/close rules as trades;
/// there is no volume and no VWAP. Samples are ordered by time before
/// bucketing.
#[must_use]
pub fn resample_samples(ticker: &str, timeframe: Timeframe, samples: &[IndexSample]) -> Vec<Bar> {
    let mut ordered: Vec<&IndexSample> = samples.iter().collect();
    ordered.sort_by_key(|s| s.timestamp);

    let mut bars = Vec::new();
    let mut current: Option<BarBuilder> = None;
    for sample in ordered {
        let bucket_start = timeframe.bucket_start(sample.timestamp);
        current = match current.take() {
            Some(mut builder) if builder.bucket_start == bucket_start => {
                builder.update(sample.value, 0);
                Some(builder)
            }
            Some(builder) => {
                bars.push(builder.finish(ticker, timeframe, None, AssetClass::Index));
                Some(BarBuilder::new(bucket_start, sample.value, 0))
            }
            None => Some(BarBuilder::new(bucket_start, sample.value, 0)),
        };
    }
    bars.extend(current.map(|b| b.finish(ticker, timeframe, None, AssetClass::Index)));
    bars
}

/// Groups samples with `ticker_of` and resamples each group.
///
/// Samples for which `ticker_of` returns `None` are skipped.
pub fn resample_by_ticker<F>(
    timeframe: Timeframe,
    samples: &[IndexSample],
    mut ticker_of: F,
) -> BTreeMap<String, Vec<Bar>>
where
    F: FnMut(&IndexSample) -> Option<String>,
{
    let mut groups: BTreeMap<String, Vec<IndexSample>> = BTreeMap::new();
    for sample in samples {
        if let Some(ticker) = ticker_of(sample) {
            groups.entry(ticker).or_default().push(sample.clone());
        }
    }

    groups
        .into_iter()
        .map(|(ticker, samples)| {
            let bars = resample_samples(&ticker, timeframe, &samples);
            (ticker, bars)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap()
    }

    fn sample(code: &str, offset_secs: i64, value: f64) -> IndexSample {
        IndexSample::new(code, base() + TimeDelta::seconds(offset_secs), value)
    }

    #[test]
    fn test_resample_ohlc() {
        let samples = vec![
            sample("EGX30", 0, 100.0),
            sample("EGX30", 60, 104.0),
            sample("EGX30", 120, 98.0),
            sample("EGX30", 240, 101.0),
            sample("EGX30", 300, 102.0),
        ];
        let bars = resample_samples("EGX30", Timeframe::Minute5, &samples);

        assert_eq!(bars.len(), 2);
        let first = &bars[0];
        assert!((first.open - 100.0).abs() < 1e-10);
        assert!((first.high - 104.0).abs() < 1e-10);
        assert!((first.low - 98.0).abs() < 1e-10);
        assert!((first.close - 101.0).abs() < 1e-10);
        assert_eq!(first.volume, 0);
        assert_eq!(first.vwap, None);
        assert_eq!(first.asset_class, AssetClass::Index);
        assert_eq!(bars[1].bucket_start, base() + TimeDelta::minutes(5));
    }

    #[test]
    fn test_resample_by_ticker_skips_unmapped() {
        let samples = vec![
            sample("Real Estate", 0, 10.0),
            sample("Unknown", 0, 11.0),
            sample("Real Estate", 30, 12.0),
        ];
        let grouped = resample_by_ticker(Timeframe::Minute1, &samples, |s| {
            (s.code == "Real Estate").then(|| "REALESTATE".to_string())
        });
        assert_eq!(grouped.len(), 1);
        let bars = &grouped["REALESTATE"];
        assert_eq!(bars.len(), 1);
        assert!((bars[0].close - 12.0).abs() < 1e-10);
    }
}
