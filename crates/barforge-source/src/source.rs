//! The event source trait.

use std::collections::BTreeSet;

use async_trait::async_trait;
use barforge_types::{RawSample, RawTrade};
use chrono::{DateTime, Utc};

use crate::SourceError;

/// Which source symbols to fetch trades for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SymbolFilter {
    /// Every symbol.
    #[default]
    All,
    /// Only these source symbols (as the source spells them, e.g. `"COMI.CA"`).
    Only(BTreeSet<String>),
}

impl SymbolFilter {
    /// Builds a filter from ticker names, appending the source's exchange suffix.
    ///
    /// An empty list means every symbol.
    #[must_use]
    pub fn from_tickers<I, S>(tickers: I, suffix: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symbols: BTreeSet<String> = tickers
            .into_iter()
            .map(|t| format!("{}{suffix}", t.as_ref().trim()))
            .collect();
        if symbols.is_empty() {
            Self::All
        } else {
            Self::Only(symbols)
        }
    }

    /// Returns true if the raw source symbol passes the filter.
    #[must_use]
    pub fn matches(&self, symbol: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(symbols) => symbols.contains(symbol.trim()),
        }
    }
}

/// Source of raw trades and index-value samples.
///
/// Every call returns events with `time >= since` in non-decreasing time
/// order. Trades are bounded by `limit`; callers page with
/// [`fetch_trade_window`](crate::fetch_trade_window).
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetches up to `limit` trades at or after `since`.
    async fn fetch_trades(
        &self,
        filter: &SymbolFilter,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<RawTrade>, SourceError>;

    /// Fetches official index samples at or after `since`.
    async fn fetch_index_samples(&self, since: DateTime<Utc>) -> Result<Vec<RawSample>, SourceError>;

    /// Fetches sector index samples at or after `since`.
    async fn fetch_sector_samples(&self, since: DateTime<Utc>)
    -> Result<Vec<RawSample>, SourceError>;
}
