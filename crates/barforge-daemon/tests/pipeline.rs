//! End-to-end passes over in-memory sources and stores.

use std::sync::Arc;

use async_trait::async_trait;
use barforge_daemon::{FixedClock, PassStatus, Pipeline, Settings};
use barforge_source::MemorySource;
use barforge_store::{BarStore, MemoryBarStore, StoreError};
use barforge_types::{AssetClass, Bar, BarUpdate, RawSample, RawTrade, Timeframe};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};

const CONFIG: &str = r#"
index_code_strip = ["EWI"]

[source]
symbol_suffix = ".CA"

[schedule]
jitter_ms = 0
timeframes = ["m5"]

[session]
vwap_anchor_hour_utc = 8

[[baskets]]
id = "egx"
ticker = "EGXEWI"
members = ["COMI", "ETEL"]
normalized = true

[[indices]]
code = "EGX30"
ticker = "EGX30"
basket = "egx"

[sectors]
enabled = true
"#;

/// 08:00 UTC on the test day, the session anchor.
fn session() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap()
}

fn at(minutes: i64, seconds: i64) -> DateTime<Utc> {
    session() + TimeDelta::minutes(minutes) + TimeDelta::seconds(seconds)
}

fn trade(symbol: &str, time: DateTime<Utc>, price: f64, volume: f64) -> RawTrade {
    RawTrade::new(symbol, time, Some(price), Some(volume))
}

fn equity_bar(ticker: &str, bucket_start: DateTime<Utc>, price: f64, volume: u64) -> Bar {
    Bar {
        ticker: ticker.to_string(),
        timeframe: Timeframe::Minute5,
        bucket_start,
        open: price,
        high: price,
        low: price,
        close: price,
        volume,
        vwap: Some(price),
        asset_class: AssetClass::Equity,
    }
}

struct Harness {
    store: Arc<MemoryBarStore>,
    source: Arc<MemorySource>,
    pipeline: Pipeline<MemoryBarStore, MemorySource>,
}

fn harness(config: &str) -> Harness {
    let store = Arc::new(MemoryBarStore::new());
    let source = Arc::new(MemorySource::new());
    let settings = Settings::from_toml_str(config).unwrap();
    let pipeline = Pipeline::new(Arc::clone(&store), Arc::clone(&source), settings)
        .unwrap()
        .with_clock(Arc::new(FixedClock::new(at(60, 0))));
    Harness {
        store,
        source,
        pipeline,
    }
}

fn plain_config() -> String {
    CONFIG.replace("[sectors]\nenabled = true", "[sectors]\nenabled = false")
}

#[tokio::test]
async fn test_live_bucket_revised_in_place() {
    let h = harness(&plain_config());
    let t0 = at(1, 0);

    // Closed history before the session is never touched.
    let history = equity_bar("COMI", at(-5, 0), 9.0, 10);
    h.store.insert(&history).await.unwrap();

    h.source.push_trades([trade("COMI.CA", t0, 5.0, 1.0), trade("COMI.CA", t0, 6.0, 2.0)]);
    let report = h.pipeline.run_pass(Timeframe::Minute5).await;
    assert_eq!(report.status, PassStatus::Completed);

    let bars = h.store.snapshot("COMI", Timeframe::Minute5).unwrap();
    assert_eq!(bars.len(), 2);
    let live = &bars[1];
    assert_eq!(live.bucket_start, session());
    assert_eq!((live.open, live.high, live.low, live.close), (5.0, 6.0, 5.0, 6.0));
    assert_eq!(live.volume, 3);
    assert_eq!(live.asset_class, AssetClass::Equity);

    h.source.push_trades([trade("COMI.CA", t0, 4.0, 1.0)]);
    let report = h.pipeline.run_pass(Timeframe::Minute5).await;
    assert_eq!(report.raw.updated, 1);

    let bars = h.store.snapshot("COMI", Timeframe::Minute5).unwrap();
    assert_eq!(bars[0], history);
    let live = &bars[1];
    assert_eq!((live.open, live.high, live.low, live.close), (5.0, 6.0, 4.0, 4.0));
    assert_eq!(live.volume, 4);
    assert!((live.vwap.unwrap() - 5.25).abs() < 1e-10);
}

#[tokio::test]
async fn test_newer_bucket_closes_previous() {
    let h = harness(&plain_config());
    let t0 = at(1, 0);
    let t1 = at(6, 0);

    h.source.push_trades([
        trade("COMI.CA", t0, 5.0, 1.0),
        trade("COMI.CA", t0, 6.0, 2.0),
        trade("COMI.CA", t1, 7.0, 1.0),
    ]);
    h.pipeline.run_pass(Timeframe::Minute5).await;
    let first = h.store.snapshot("COMI", Timeframe::Minute5).unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].volume, 3);

    // A late trade for the closed bucket changes nothing.
    h.source.push_trades([trade("COMI.CA", t0, 4.0, 1.0)]);
    let report = h.pipeline.run_pass(Timeframe::Minute5).await;
    assert_eq!(report.raw.writes(), 0);
    assert_eq!(h.store.snapshot("COMI", Timeframe::Minute5).unwrap(), first);
}

#[tokio::test]
async fn test_repeated_pass_is_idempotent() {
    let h = harness(&plain_config());
    h.source.push_trades([
        trade("COMI.CA", at(1, 0), 10.0, 100.0),
        trade("COMI.CA", at(7, 0), 11.0, 50.0),
        trade("ETEL.CA", at(2, 0), 20.0, 300.0),
    ]);

    h.pipeline.run_pass(Timeframe::Minute5).await;
    let inserts = h.store.insert_count();
    let updates = h.store.update_count();
    let comi = h.store.snapshot("COMI", Timeframe::Minute5).unwrap();
    let composite = h.store.snapshot("EGXEWI", Timeframe::Minute5).unwrap();

    let report = h.pipeline.run_pass(Timeframe::Minute5).await;
    assert_eq!(report.total().writes(), 0);
    assert_eq!(h.store.insert_count(), inserts);
    assert_eq!(h.store.update_count(), updates);
    assert_eq!(h.store.snapshot("COMI", Timeframe::Minute5).unwrap(), comi);
    assert_eq!(h.store.snapshot("EGXEWI", Timeframe::Minute5).unwrap(), composite);
}

#[tokio::test]
async fn test_composite_volume_revised_prices_settled() {
    let h = harness(&plain_config());
    h.source.push_trades([
        trade("COMI.CA", at(1, 0), 10.0, 100.0),
        trade("ETEL.CA", at(2, 0), 20.0, 300.0),
    ]);
    let report = h.pipeline.run_pass(Timeframe::Minute5).await;
    assert_eq!(report.composites.inserted, 1);

    let composite = h.store.snapshot("EGXEWI", Timeframe::Minute5).unwrap();
    assert_eq!(composite.len(), 1);
    assert!((composite[0].close - 15.0).abs() < 1e-10);
    assert_eq!(composite[0].volume, 400);
    assert_eq!(composite[0].asset_class, AssetClass::Index);

    h.source.push_trades([trade("COMI.CA", at(3, 0), 12.0, 50.0)]);
    let report = h.pipeline.run_pass(Timeframe::Minute5).await;
    assert_eq!(report.composites.updated, 1);

    let composite = h.store.snapshot("EGXEWI", Timeframe::Minute5).unwrap();
    assert!((composite[0].close - 15.0).abs() < 1e-10);
    assert_eq!(composite[0].volume, 450);
}

#[tokio::test]
async fn test_incomplete_basket_skipped() {
    let h = harness(&plain_config());
    h.source.push_trades([trade("COMI.CA", at(1, 0), 10.0, 100.0)]);

    let report = h.pipeline.run_pass(Timeframe::Minute5).await;
    assert_eq!(report.status, PassStatus::Completed);
    assert_eq!(report.skipped_baskets, vec!["egx".to_string()]);
    assert!(h.store.snapshot("EGXEWI", Timeframe::Minute5).unwrap().is_empty());
}

#[tokio::test]
async fn test_source_outage_still_builds_composites() {
    let h = harness(&plain_config());
    h.store.insert(&equity_bar("COMI", session(), 10.0, 100)).await.unwrap();
    h.store.insert(&equity_bar("ETEL", session(), 20.0, 300)).await.unwrap();
    h.source.set_offline(true);

    let report = h.pipeline.run_pass(Timeframe::Minute5).await;
    assert_eq!(report.status, PassStatus::Degraded);
    assert!(report.error.is_some());
    assert_eq!(report.raw.writes(), 0);
    assert_eq!(report.composites.inserted, 1);
}

#[tokio::test]
async fn test_store_outage_aborts_pass() {
    let h = harness(&plain_config());
    h.source.push_trades([trade("COMI.CA", at(1, 0), 10.0, 100.0)]);
    h.store.set_offline(true);

    let report = h.pipeline.run_pass(Timeframe::Minute5).await;
    assert_eq!(report.status, PassStatus::Aborted);
    assert!(report.finished_at.is_some());

    h.store.set_offline(false);
    let report = h.pipeline.run_pass(Timeframe::Minute5).await;
    assert_eq!(report.status, PassStatus::Completed);
    assert_eq!(report.raw.inserted, 1);
}

#[tokio::test]
async fn test_malformed_trades_dropped() {
    let h = harness(&plain_config());
    h.source.push_trades([
        trade("COMI.CA", at(1, 0), 10.0, 100.0),
        RawTrade::new("COMI.CA", at(1, 10), None, Some(5.0)),
        RawTrade::new("   ", at(1, 20), Some(10.0), Some(5.0)),
        trade("COMI.CA", at(1, 30), -1.0, 5.0),
    ]);

    let report = h.pipeline.run_pass(Timeframe::Minute5).await;
    assert_eq!(report.trades_fetched, 4);
    assert_eq!(report.dropped_events, 3);
    let bars = h.store.snapshot("COMI", Timeframe::Minute5).unwrap();
    assert_eq!(bars[0].volume, 100);
}

#[tokio::test]
async fn test_official_index_joined_with_basket_volume() {
    let h = harness(&plain_config());
    h.source.push_trades([
        trade("COMI.CA", at(1, 0), 10.0, 100.0),
        trade("ETEL.CA", at(2, 0), 20.0, 300.0),
    ]);
    h.source.push_index_samples([
        RawSample::new(at(0, 30), "EGX30 EWI", Some(100.0)),
        RawSample::new(at(2, 0), "EGX30 EWI", Some(110.0)),
        RawSample::new(at(4, 0), "EGX30 EWI", Some(105.0)),
        // No basket volume in this bucket: dropped by the join.
        RawSample::new(at(11, 0), "EGX30 EWI", Some(107.0)),
        RawSample::new(at(1, 0), "EGX100", Some(1.0)),
    ]);

    let report = h.pipeline.run_pass(Timeframe::Minute5).await;
    assert_eq!(report.indices.inserted, 1);

    let bars = h.store.snapshot("EGX30", Timeframe::Minute5).unwrap();
    assert_eq!(bars.len(), 1);
    let bar = &bars[0];
    assert_eq!((bar.open, bar.high, bar.low, bar.close), (100.0, 110.0, 100.0, 105.0));
    assert_eq!(bar.volume, 400);
    assert_eq!(bar.vwap, Some(105.0));
    assert_eq!(bar.asset_class, AssetClass::Index);
    assert!(h.store.snapshot("EGX100", Timeframe::Minute5).unwrap().is_empty());
}

#[tokio::test]
async fn test_sector_prices_revised() {
    let h = harness(CONFIG);
    h.source.push_sector_samples([
        RawSample::new(at(0, 30), "Basic Resources", Some(50.0)),
        RawSample::new(at(2, 0), "Basic Resources", Some(52.0)),
    ]);

    h.pipeline.run_pass(Timeframe::Minute5).await;
    let bars = h.store.snapshot("BASICRESOURCES", Timeframe::Minute5).unwrap();
    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0].close, 52.0);
    assert_eq!(bars[0].volume, 0);
    assert_eq!(bars[0].vwap, None);

    h.source.push_sector_samples([RawSample::new(at(3, 0), "Basic Resources", Some(49.0))]);
    let report = h.pipeline.run_pass(Timeframe::Minute5).await;
    assert_eq!(report.sectors.updated, 1);
    let bars = h.store.snapshot("BASICRESOURCES", Timeframe::Minute5).unwrap();
    assert_eq!((bars[0].low, bars[0].close), (49.0, 49.0));

    // Same prices again: nothing written.
    let report = h.pipeline.run_pass(Timeframe::Minute5).await;
    assert_eq!(report.sectors.writes(), 0);
}

#[tokio::test]
async fn test_trades_before_session_ignored() {
    let h = harness(&plain_config());
    h.source.push_trades([
        trade("COMI.CA", at(-30, 0), 9.0, 1_000.0),
        trade("COMI.CA", at(1, 0), 10.0, 100.0),
    ]);

    let report = h.pipeline.run_pass(Timeframe::Minute5).await;
    assert_eq!(report.since, Some(session()));
    assert_eq!(report.trades_fetched, 1);
    let bars = h.store.snapshot("COMI", Timeframe::Minute5).unwrap();
    assert_eq!(bars.len(), 1);
    assert_eq!(bars[0].vwap, Some(10.0));
}

/// Memory store whose rows for one ticker cannot be decoded.
struct CorruptSeries {
    inner: MemoryBarStore,
    ticker: &'static str,
}

impl CorruptSeries {
    fn check(&self, ticker: &str) -> Result<(), StoreError> {
        if ticker == self.ticker {
            Err(StoreError::Corrupt("asset_class 7".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BarStore for CorruptSeries {
    async fn last_bar(&self, ticker: &str, timeframe: Timeframe) -> Result<Option<Bar>, StoreError> {
        self.check(ticker)?;
        self.inner.last_bar(ticker, timeframe).await
    }

    async fn last_bar_at_or_before(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        at: DateTime<Utc>,
    ) -> Result<Option<Bar>, StoreError> {
        self.check(ticker)?;
        self.inner.last_bar_at_or_before(ticker, timeframe, at).await
    }

    async fn bars_since(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Bar>, StoreError> {
        self.check(ticker)?;
        self.inner.bars_since(ticker, timeframe, since).await
    }

    async fn insert(&self, bar: &Bar) -> Result<(), StoreError> {
        self.inner.insert(bar).await
    }

    async fn update_in_place(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        bucket_start: DateTime<Utc>,
        update: BarUpdate,
    ) -> Result<(), StoreError> {
        self.inner.update_in_place(ticker, timeframe, bucket_start, update).await
    }

    async fn rescale(&self, ticker: &str, ratio: f64, before: DateTime<Utc>) -> Result<u64, StoreError> {
        self.inner.rescale(ticker, ratio, before).await
    }
}

fn corrupt_harness(ticker: &'static str) -> (Arc<CorruptSeries>, Arc<MemorySource>, Pipeline<CorruptSeries, MemorySource>) {
    let store = Arc::new(CorruptSeries {
        inner: MemoryBarStore::new(),
        ticker,
    });
    let source = Arc::new(MemorySource::new());
    let settings = Settings::from_toml_str(&plain_config()).unwrap();
    let pipeline = Pipeline::new(Arc::clone(&store), Arc::clone(&source), settings)
        .unwrap()
        .with_clock(Arc::new(FixedClock::new(at(60, 0))));
    (store, source, pipeline)
}

#[tokio::test]
async fn test_corrupt_series_skipped_others_written() {
    let (store, source, pipeline) = corrupt_harness("BAD");
    source.push_trades([
        trade("BAD.CA", at(1, 0), 1.0, 10.0),
        trade("COMI.CA", at(1, 0), 10.0, 100.0),
        trade("ETEL.CA", at(2, 0), 20.0, 300.0),
        trade("ZZZ.CA", at(3, 0), 30.0, 5.0),
    ]);

    let report = pipeline.run_pass(Timeframe::Minute5).await;
    assert_eq!(report.status, PassStatus::Completed);
    assert_eq!(report.raw.failed, 1);
    assert_eq!(report.raw.inserted, 3);
    assert_eq!(report.composites.inserted, 1);
    assert!(report.error.is_none());

    assert_eq!(store.inner.snapshot("ZZZ", Timeframe::Minute5).unwrap().len(), 1);
    assert!(store.inner.snapshot("BAD", Timeframe::Minute5).unwrap().is_empty());

    // The next pass still writes around the bad series.
    source.push_trades([trade("ZZZ.CA", at(4, 0), 31.0, 5.0)]);
    let report = pipeline.run_pass(Timeframe::Minute5).await;
    assert_eq!(report.status, PassStatus::Completed);
    assert_eq!(report.raw.updated, 1);
    assert_eq!(store.inner.snapshot("ZZZ", Timeframe::Minute5).unwrap()[0].volume, 10);
}

#[tokio::test]
async fn test_corrupt_composite_skips_basket() {
    let (store, source, pipeline) = corrupt_harness("EGXEWI");
    source.push_trades([
        trade("COMI.CA", at(1, 0), 10.0, 100.0),
        trade("ETEL.CA", at(2, 0), 20.0, 300.0),
    ]);

    let report = pipeline.run_pass(Timeframe::Minute5).await;
    assert_eq!(report.status, PassStatus::Completed);
    assert_eq!(report.raw.inserted, 2);
    assert_eq!(report.skipped_baskets, vec!["egx".to_string()]);
    assert!(store.inner.snapshot("EGXEWI", Timeframe::Minute5).unwrap().is_empty());
}
