//! In-process event source.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use barforge_types::{RawSample, RawTrade};
use chrono::{DateTime, Utc};

use crate::{EventSource, SourceError, SymbolFilter};

/// Event source serving events held in memory.
///
/// Events are returned in time order (stable for equal timestamps), the
/// same contract a remote feed honours. The source can be taken offline to
/// exercise the unavailable-source path.
#[derive(Debug, Default)]
pub struct MemorySource {
    trades: Mutex<Vec<RawTrade>>,
    index_samples: Mutex<Vec<RawSample>>,
    sector_samples: Mutex<Vec<RawSample>>,
    offline: AtomicBool,
    trade_calls: AtomicUsize,
}

impl MemorySource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends trades.
    pub fn push_trades(&self, trades: impl IntoIterator<Item = RawTrade>) {
        if let Ok(mut held) = self.trades.lock() {
            held.extend(trades);
            held.sort_by_key(|t| t.time);
        }
    }

    /// Appends official index samples.
    pub fn push_index_samples(&self, samples: impl IntoIterator<Item = RawSample>) {
        if let Ok(mut held) = self.index_samples.lock() {
            held.extend(samples);
            held.sort_by_key(|s| s.time);
        }
    }

    /// Appends sector samples.
    pub fn push_sector_samples(&self, samples: impl IntoIterator<Item = RawSample>) {
        if let Ok(mut held) = self.sector_samples.lock() {
            held.extend(samples);
            held.sort_by_key(|s| s.time);
        }
    }

    /// Makes every fetch fail with [`SourceError::Offline`] until reset.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Returns how many `fetch_trades` calls were served.
    #[must_use]
    pub fn trade_calls(&self) -> usize {
        self.trade_calls.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), SourceError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(SourceError::Offline)
        } else {
            Ok(())
        }
    }
}

fn samples_since(
    held: &Mutex<Vec<RawSample>>,
    since: DateTime<Utc>,
) -> Result<Vec<RawSample>, SourceError> {
    let held = held
        .lock()
        .map_err(|_| SourceError::Config("sample buffer poisoned".to_string()))?;
    Ok(held.iter().filter(|s| s.time >= since).cloned().collect())
}

#[async_trait]
impl EventSource for MemorySource {
    async fn fetch_trades(
        &self,
        filter: &SymbolFilter,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<RawTrade>, SourceError> {
        self.check_online()?;
        self.trade_calls.fetch_add(1, Ordering::SeqCst);
        let held = self
            .trades
            .lock()
            .map_err(|_| SourceError::Config("trade buffer poisoned".to_string()))?;
        Ok(held
            .iter()
            .filter(|t| t.time >= since && filter.matches(&t.symbol))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn fetch_index_samples(&self, since: DateTime<Utc>) -> Result<Vec<RawSample>, SourceError> {
        self.check_online()?;
        samples_since(&self.index_samples, since)
    }

    async fn fetch_sector_samples(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<RawSample>, SourceError> {
        self.check_online()?;
        samples_since(&self.sector_samples, since)
    }
}
