//! In-memory bar store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use barforge_types::{Bar, BarUpdate, Timeframe};
use chrono::{DateTime, Utc};

use crate::gateway::{check_bar, check_ratio};
use crate::{BarStore, Result, StoreError};

type Series = BTreeMap<DateTime<Utc>, Bar>;

/// Bar store held in process memory.
///
/// Counts every successful write so callers can check that a pass issued no
/// spurious updates, and can be switched offline to exercise the
/// unavailable-store path.
#[derive(Debug, Default)]
pub struct MemoryBarStore {
    series: Mutex<BTreeMap<(String, Timeframe), Series>>,
    inserts: AtomicUsize,
    updates: AtomicUsize,
    offline: AtomicBool,
}

impl MemoryBarStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of successful inserts.
    #[must_use]
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Returns the number of successful in-place updates.
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Makes every subsequent call fail with [`StoreError::Unavailable`] until reset.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Returns every stored bar of a series in bucket order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is offline.
    pub fn snapshot(&self, ticker: &str, timeframe: Timeframe) -> Result<Vec<Bar>> {
        let series = self.lock()?;
        Ok(series
            .get(&(ticker.to_string(), timeframe))
            .map(|s| s.values().cloned().collect())
            .unwrap_or_default())
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<(String, Timeframe), Series>>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        self.series
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl BarStore for MemoryBarStore {
    async fn last_bar(&self, ticker: &str, timeframe: Timeframe) -> Result<Option<Bar>> {
        let series = self.lock()?;
        Ok(series
            .get(&(ticker.to_string(), timeframe))
            .and_then(|s| s.values().next_back().cloned()))
    }

    async fn last_bar_at_or_before(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        at: DateTime<Utc>,
    ) -> Result<Option<Bar>> {
        let series = self.lock()?;
        Ok(series
            .get(&(ticker.to_string(), timeframe))
            .and_then(|s| s.range(..=at).next_back().map(|(_, bar)| bar.clone())))
    }

    async fn bars_since(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bar>> {
        let series = self.lock()?;
        let Some(s) = series.get(&(ticker.to_string(), timeframe)) else {
            return Ok(Vec::new());
        };
        Ok(match since {
            Some(since) => s.range(since..).map(|(_, bar)| bar.clone()).collect(),
            None => s.values().cloned().collect(),
        })
    }

    async fn insert(&self, bar: &Bar) -> Result<()> {
        check_bar(bar)?;
        let mut series = self.lock()?;
        let entry = series
            .entry((bar.ticker.clone(), bar.timeframe))
            .or_default();
        if entry.contains_key(&bar.bucket_start) {
            return Err(StoreError::WriteConflict {
                ticker: bar.ticker.clone(),
                timeframe: bar.timeframe,
                bucket_start: bar.bucket_start,
                reason: "bucket already stored",
            });
        }
        entry.insert(bar.bucket_start, bar.clone());
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_in_place(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        bucket_start: DateTime<Utc>,
        update: BarUpdate,
    ) -> Result<()> {
        let mut series = self.lock()?;
        let Some(bar) = series
            .get_mut(&(ticker.to_string(), timeframe))
            .and_then(|s| s.get_mut(&bucket_start))
        else {
            return Err(StoreError::WriteConflict {
                ticker: ticker.to_string(),
                timeframe,
                bucket_start,
                reason: "no stored bar to update",
            });
        };
        bar.apply(&update);
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rescale(&self, ticker: &str, ratio: f64, before: DateTime<Utc>) -> Result<u64> {
        check_ratio(ratio)?;
        let mut series = self.lock()?;
        let mut changed = 0;
        for ((name, _), bars) in series.iter_mut() {
            if name != ticker {
                continue;
            }
            for bar in bars.range_mut(..before).map(|(_, bar)| bar) {
                bar.open /= ratio;
                bar.high /= ratio;
                bar.low /= ratio;
                bar.close /= ratio;
                bar.vwap = bar.vwap.map(|v| v / ratio);
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barforge_types::AssetClass;
    use chrono::TimeZone;

    fn bar(minute: u32, close: f64, volume: u64) -> Bar {
        Bar {
            ticker: "COMI".to_string(),
            timeframe: Timeframe::Minute1,
            bucket_start: Utc.with_ymd_and_hms(2024, 1, 15, 10, minute, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume,
            vwap: Some(close),
            asset_class: AssetClass::Equity,
        }
    }

    #[tokio::test]
    async fn test_write_accounting() {
        let store = MemoryBarStore::new();
        store.insert(&bar(0, 1.0, 1)).await.unwrap();
        assert!(store.insert(&bar(0, 1.0, 1)).await.unwrap_err().is_conflict());
        store
            .update_in_place("COMI", Timeframe::Minute1, bar(0, 1.0, 1).bucket_start, BarUpdate::Volume(2))
            .await
            .unwrap();

        assert_eq!(store.insert_count(), 1);
        assert_eq!(store.update_count(), 1);
        assert_eq!(store.snapshot("COMI", Timeframe::Minute1).unwrap()[0].volume, 2);
    }

    #[tokio::test]
    async fn test_offline() {
        let store = MemoryBarStore::new();
        store.set_offline(true);
        let err = store.last_bar("COMI", Timeframe::Minute1).await.unwrap_err();
        assert!(err.is_unavailable());
        store.set_offline(false);
        assert!(store.last_bar("COMI", Timeframe::Minute1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rescale_range() {
        let store = MemoryBarStore::new();
        store.insert(&bar(0, 8.0, 1)).await.unwrap();
        store.insert(&bar(1, 8.0, 1)).await.unwrap();
        let cutoff = bar(1, 0.0, 0).bucket_start;
        assert_eq!(store.rescale("COMI", 4.0, cutoff).await.unwrap(), 1);
        let bars = store.snapshot("COMI", Timeframe::Minute1).unwrap();
        assert!((bars[0].close - 2.0).abs() < 1e-10);
        assert!((bars[1].close - 8.0).abs() < 1e-10);
    }
}
