//! One pass over one timeframe.

use std::collections::BTreeMap;
use std::sync::Arc;

use barforge_aggregate::{bucketize_by_symbol, resample_by_ticker};
use barforge_composite::{
    ConstituentDirectory, PanelError, basket_volume, build_composite, official_index_bars,
};
use barforge_source::{EventSource, SymbolFilter, fetch_trade_window};
use barforge_store::{BarStore, ReconcileOutcome, Reconciler, RevisionPolicy, StoreError, Watermark};
use barforge_types::normalize::normalize_sector;
use barforge_types::{IndexSample, RawSample, RawTrade, Tick, Timeframe};
use chrono::{DateTime, Utc};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::{
    Clock, PassError, PassReport, RowCounts, Settings, SettingsError, SystemClock, session_anchor,
};

/// Runs passes against a store and an event source.
///
/// A pass ingests raw trades, official index samples and sector samples,
/// then rebuilds every basket configured for the timeframe. Passes never
/// return errors; failures are recorded in the [`PassReport`]. Only an
/// unavailable store aborts a pass; any other store error skips the series
/// or basket it occurred on.
pub struct Pipeline<S: ?Sized, E: ?Sized> {
    store: Arc<S>,
    source: Arc<E>,
    settings: Arc<Settings>,
    directory: ConstituentDirectory,
    filter: SymbolFilter,
    index_codes: Vec<String>,
    clock: Arc<dyn Clock>,
}

impl<S: ?Sized, E: ?Sized> std::fmt::Debug for Pipeline<S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("timeframes", &self.settings.schedule.timeframes)
            .field("baskets", &self.directory.len())
            .field("indices", &self.index_codes)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl<S, E> Pipeline<S, E>
where
    S: BarStore + ?Sized,
    E: EventSource + ?Sized,
{
    /// Validates `settings` and creates a pipeline on the system clock.
    ///
    /// # Errors
    ///
    /// Returns a [`SettingsError`] if the settings are inconsistent.
    pub fn new(store: Arc<S>, source: Arc<E>, settings: Settings) -> Result<Self, SettingsError> {
        let directory = settings.validate()?;
        let filter = settings.source.symbol_filter();
        let index_codes = settings
            .indices
            .iter()
            .map(|i| settings.index_code(&i.code))
            .collect();
        Ok(Self {
            store,
            source,
            settings: Arc::new(settings),
            directory,
            filter,
            index_codes,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the basket directory.
    #[must_use]
    pub const fn directory(&self) -> &ConstituentDirectory {
        &self.directory
    }

    /// Returns the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one pass over `timeframe`.
    pub async fn run_pass(&self, timeframe: Timeframe) -> PassReport {
        let mut report = PassReport::new(timeframe, self.clock.now());
        let span = info_span!("pass", %timeframe, pass_id = %report.id);

        async {
            match self.execute(timeframe, &mut report).await {
                Ok(()) => {
                    report.mark_completed(self.clock.now());
                    let total = report.total();
                    info!(
                        status = %report.status,
                        inserted = total.inserted,
                        updated = total.updated,
                        unchanged = total.unchanged,
                        failed = total.failed,
                        "Pass finished"
                    );
                }
                Err(e) => {
                    warn!(error = %e, "Store unavailable, pass aborted");
                    report.mark_aborted(self.clock.now(), e.to_string());
                }
            }
        }
        .instrument(span)
        .await;

        report
    }

    /// Runs one pass per configured timeframe, in order.
    pub async fn run_cycle(&self) -> Vec<PassReport> {
        let mut reports = Vec::with_capacity(self.settings.schedule.timeframes.len());
        for &timeframe in &self.settings.schedule.timeframes {
            reports.push(self.run_pass(timeframe).await);
        }
        reports
    }

    async fn execute(&self, timeframe: Timeframe, report: &mut PassReport) -> Result<(), StoreError> {
        match self.ingest(timeframe, report).await {
            Ok(()) => {}
            Err(PassError::Source(e)) => {
                warn!(error = %e, transient = e.is_transient(), "Source unavailable, skipping ingestion");
                report.mark_degraded(e.to_string());
            }
            Err(PassError::Store(e)) => return Err(e),
        }
        self.composites(timeframe, report).await
    }

    async fn ingest(&self, timeframe: Timeframe, report: &mut PassReport) -> Result<(), PassError> {
        let since = session_anchor(self.clock.now(), self.settings.session.vwap_anchor_hour_utc);
        report.since = Some(since);

        self.ingest_trades(timeframe, since, report).await?;
        if !self.settings.indices.is_empty() {
            self.ingest_indices(timeframe, since, report).await?;
        }
        if self.settings.sectors.enabled {
            self.ingest_sectors(timeframe, since, report).await?;
        }
        Ok(())
    }

    async fn ingest_trades(
        &self,
        timeframe: Timeframe,
        since: DateTime<Utc>,
        report: &mut PassReport,
    ) -> Result<(), PassError> {
        let source = &self.settings.source;
        let window = fetch_trade_window(
            self.source.as_ref(),
            &self.filter,
            since,
            source.page_size,
            source.max_pages,
        )
        .await?;
        report.trades_fetched = window.trades.len();
        report.pages = window.pages;
        report.truncated = window.truncated;

        let ticks = valid_trades(window.trades, &source.symbol_suffix, report);
        let reconciler = Reconciler::new(self.store.as_ref());
        for (ticker, bars) in bucketize_by_symbol(timeframe, &ticks) {
            let result = reconciler
                .reconcile(&ticker, timeframe, bars, RevisionPolicy::AllFields)
                .await;
            tally(&mut report.raw, &ticker, result)?;
        }
        debug!(ticks = ticks.len(), written = report.raw.writes(), "Raw tickers reconciled");
        Ok(())
    }

    async fn ingest_indices(
        &self,
        timeframe: Timeframe,
        since: DateTime<Utc>,
        report: &mut PassReport,
    ) -> Result<(), PassError> {
        let samples = self.source.fetch_index_samples(since).await?;

        let mut by_index: BTreeMap<usize, Vec<IndexSample>> = BTreeMap::new();
        for sample in valid_samples(samples, report) {
            let code = self.settings.index_code(&sample.code);
            match self.index_codes.iter().position(|c| *c == code) {
                Some(pos) => by_index.entry(pos).or_default().push(sample),
                None => debug!(%code, "Skipping unconfigured index"),
            }
        }

        let reconciler = Reconciler::new(self.store.as_ref());
        for (pos, samples) in by_index {
            let index = &self.settings.indices[pos];
            let volume = match &index.basket {
                Some(basket) => {
                    let members = self.directory.members(basket).unwrap_or_default();
                    let first = samples.iter().map(|s| s.timestamp).min().unwrap_or(since);
                    let since = timeframe.bucket_start(first);
                    match basket_volume(self.store.as_ref(), members, timeframe, since).await {
                        Ok(volume) => Some(volume),
                        Err(e) if e.is_unavailable() => return Err(e.into()),
                        Err(e) => {
                            error!(index = %index.ticker, error = %e, "Failed to read basket volume, skipping index");
                            report.indices.failed += 1;
                            continue;
                        }
                    }
                }
                None => None,
            };
            let bars = official_index_bars(&index.ticker, timeframe, &samples, volume.as_ref());
            let result = reconciler
                .reconcile(&index.ticker, timeframe, bars, RevisionPolicy::InsertOnly)
                .await;
            tally(&mut report.indices, &index.ticker, result)?;
        }
        Ok(())
    }

    async fn ingest_sectors(
        &self,
        timeframe: Timeframe,
        since: DateTime<Utc>,
        report: &mut PassReport,
    ) -> Result<(), PassError> {
        let samples = self.source.fetch_sector_samples(since).await?;
        let samples = valid_samples(samples, report);

        let aliases = &self.settings.sectors.aliases;
        let series = resample_by_ticker(timeframe, &samples, |s| {
            let ticker = normalize_sector(&s.code, aliases);
            (!ticker.is_empty()).then_some(ticker)
        });

        let reconciler = Reconciler::new(self.store.as_ref());
        for (ticker, bars) in series {
            let result = reconciler
                .reconcile(&ticker, timeframe, bars, RevisionPolicy::Prices)
                .await;
            tally(&mut report.sectors, &ticker, result)?;
        }
        Ok(())
    }

    async fn composites(&self, timeframe: Timeframe, report: &mut PassReport) -> Result<(), StoreError> {
        let store = self.store.as_ref();
        let reconciler = Reconciler::new(store);

        for basket in self.directory.for_timeframe(timeframe) {
            let watermark = match Watermark::read(store, &basket.ticker, timeframe).await {
                Ok(watermark) => watermark,
                Err(e) if e.is_unavailable() => return Err(e),
                Err(e) => {
                    error!(basket = %basket.id, error = %e, "Failed to read composite watermark, skipping");
                    report.skipped_baskets.push(basket.id.clone());
                    continue;
                }
            };
            match build_composite(store, basket, timeframe, &watermark).await {
                Ok(bars) => {
                    let result = reconciler
                        .reconcile_with(watermark, &basket.ticker, timeframe, bars, RevisionPolicy::VolumeOnly)
                        .await;
                    tally(&mut report.composites, &basket.ticker, result)?;
                }
                Err(e @ PanelError::IncompleteBasket { .. }) => {
                    warn!(basket = %basket.id, error = %e, "Skipping basket");
                    report.skipped_baskets.push(basket.id.clone());
                }
                Err(PanelError::Store(e)) if e.is_unavailable() => return Err(e),
                Err(PanelError::Store(e)) => {
                    error!(basket = %basket.id, error = %e, "Failed to read basket members, skipping");
                    report.skipped_baskets.push(basket.id.clone());
                }
            }
        }
        Ok(())
    }
}

/// Adds a reconciliation result to `counts`.
///
/// Only an unavailable store is returned; other errors count the series as
/// failed.
fn tally(
    counts: &mut RowCounts,
    ticker: &str,
    result: Result<ReconcileOutcome, StoreError>,
) -> Result<(), StoreError> {
    match result {
        Ok(outcome) => counts.add(outcome),
        Err(e) if e.is_unavailable() => return Err(e),
        Err(e) => {
            error!(%ticker, error = %e, "Failed to reconcile series, skipping");
            counts.failed += 1;
        }
    }
    Ok(())
}

fn valid_trades(trades: Vec<RawTrade>, suffix: &str, report: &mut PassReport) -> Vec<Tick> {
    let mut ticks = Vec::with_capacity(trades.len());
    let mut dropped = 0usize;
    for trade in trades {
        match trade.validate(suffix) {
            Ok(tick) => ticks.push(tick),
            Err(e) => {
                debug!(error = %e, "Dropping malformed trade");
                dropped += 1;
            }
        }
    }
    if dropped > 0 {
        warn!(dropped, "Dropped malformed trades");
    }
    report.dropped_events += dropped;
    ticks
}

fn valid_samples(samples: Vec<RawSample>, report: &mut PassReport) -> Vec<IndexSample> {
    let mut valid = Vec::with_capacity(samples.len());
    let mut dropped = 0usize;
    for sample in samples {
        match sample.validate() {
            Ok(sample) => valid.push(sample),
            Err(e) => {
                debug!(error = %e, "Dropping malformed sample");
                dropped += 1;
            }
        }
    }
    if dropped > 0 {
        warn!(dropped, "Dropped malformed samples");
    }
    report.dropped_events += dropped;
    valid
}
