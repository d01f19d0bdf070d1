//! The bar store gateway trait.

use async_trait::async_trait;
use barforge_types::{Bar, BarUpdate, Timeframe};
use chrono::{DateTime, Utc};

use crate::{Result, StoreError};

/// Persistence gateway for bars.
///
/// Implementations own the persisted rows. Callers mutate them only through
/// [`insert`](Self::insert) and [`update_in_place`](Self::update_in_place),
/// normally via the [`Reconciler`](crate::Reconciler).
#[async_trait]
pub trait BarStore: Send + Sync {
    /// Returns the most recent bar for a series.
    async fn last_bar(&self, ticker: &str, timeframe: Timeframe) -> Result<Option<Bar>>;

    /// Returns the latest bar whose bucket starts at or before `at`.
    async fn last_bar_at_or_before(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        at: DateTime<Utc>,
    ) -> Result<Option<Bar>>;

    /// Returns bars with `bucket_start >= since` (all bars if `since` is `None`),
    /// in ascending bucket order.
    async fn bars_since(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bar>>;

    /// Inserts a new bar.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WriteConflict`] if the bucket already exists.
    async fn insert(&self, bar: &Bar) -> Result<()>;

    /// Revises the fields named by `update` on an existing bar.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WriteConflict`] if no such bar exists.
    async fn update_in_place(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        bucket_start: DateTime<Utc>,
        update: BarUpdate,
    ) -> Result<()>;

    /// Divides every price field of `ticker`'s bars strictly before `before`
    /// by `ratio`, across all timeframes. Volume is untouched.
    ///
    /// Returns the number of bars changed.
    async fn rescale(&self, ticker: &str, ratio: f64, before: DateTime<Utc>) -> Result<u64>;
}

/// Checks a bar before it is written.
pub(crate) fn check_bar(bar: &Bar) -> Result<()> {
    let finite = [bar.open, bar.high, bar.low, bar.close]
        .into_iter()
        .chain(bar.vwap)
        .all(f64::is_finite);
    if !finite {
        return Err(rejected(bar, "non-finite price"));
    }
    if !bar.is_consistent() {
        return Err(rejected(bar, "OHLC out of order or bucket misaligned"));
    }
    Ok(())
}

pub(crate) fn check_ratio(ratio: f64) -> Result<()> {
    if ratio.is_finite() && ratio > 0.0 {
        Ok(())
    } else {
        Err(StoreError::InvalidRatio(ratio))
    }
}

fn rejected(bar: &Bar, reason: &str) -> StoreError {
    StoreError::Rejected {
        ticker: bar.ticker.clone(),
        timeframe: bar.timeframe,
        bucket_start: bar.bucket_start,
        reason: reason.to_string(),
    }
}
