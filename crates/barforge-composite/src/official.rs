//! Official index series joined with basket turnover.

use std::collections::BTreeMap;

use barforge_aggregate::resample_samples;
use barforge_store::{BarStore, StoreError};
use barforge_types::{Bar, IndexSample, Timeframe};
use chrono::{DateTime, Utc};

/// Sums the stored volume of `members` per bucket, from `since` onwards.
///
/// # Errors
///
/// Propagates store read failures.
pub async fn basket_volume<S>(
    store: &S,
    members: &[String],
    timeframe: Timeframe,
    since: DateTime<Utc>,
) -> Result<BTreeMap<DateTime<Utc>, u64>, StoreError>
where
    S: BarStore + ?Sized,
{
    let mut totals: BTreeMap<DateTime<Utc>, u64> = BTreeMap::new();
    for member in members {
        for bar in store.bars_since(member, timeframe, Some(since)).await? {
            let total = totals.entry(bar.bucket_start).or_default();
            *total = total.saturating_add(bar.volume);
        }
    }
    Ok(totals)
}

/// Resamples official index samples into bars stored under `ticker`.
///
/// `vwap` is the close. With `volume` given, only buckets present on both
/// sides are kept and carry the basket's summed volume; without it every
/// bucket is kept with zero volume.
#[must_use]
pub fn official_index_bars(
    ticker: &str,
    timeframe: Timeframe,
    samples: &[IndexSample],
    volume: Option<&BTreeMap<DateTime<Utc>, u64>>,
) -> Vec<Bar> {
    resample_samples(ticker, timeframe, samples)
        .into_iter()
        .filter_map(|mut bar| {
            if let Some(volume) = volume {
                bar.volume = *volume.get(&bar.bucket_start)?;
            }
            bar.vwap = Some(bar.close);
            Some(bar)
        })
        .collect()
}
