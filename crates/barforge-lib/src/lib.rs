//! OHLCV bars, running VWAP and equal-weight composite indices from raw trades.
//!
//! This is a facade crate that re-exports functionality from the barforge
//! workspace crates.
//!
//! # Quick Start
//!
//! ```ignore
//! use barforge_lib::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load("barforge.toml")?;
//!     let store = Arc::new(SqliteBarStore::open(&settings.store.path)?);
//!     let source = Arc::new(HttpEventSource::new(settings.source.client_config())?);
//!
//!     let pipeline = Pipeline::new(store, source, settings)?;
//!     for report in pipeline.run_cycle().await {
//!         println!("{}: {}", report.timeframe, report.status);
//!     }
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/barforge/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use barforge_types::*;

pub use barforge_aggregate::{
    Bucketizer, bucketize, bucketize_by_symbol, resample_by_ticker, resample_samples,
};

pub use barforge_store::{
    Action, BarStore, BucketState, MemoryBarStore, ReconcileOutcome, Reconciler, RevisionPolicy,
    SqliteBarStore, StoreError, Watermark, plan,
};

pub use barforge_composite::{
    Basket, Cell, ConstituentDirectory, DirectoryError, PanelBuilder, PanelError, PricePanel,
    basket_volume, build_composite, equal_weight, load_panel, official_index_bars,
};

#[cfg(feature = "source")]
pub use barforge_source::{
    ClientConfig, EventSource, HttpEventSource, MemorySource, SourceError, SymbolFilter,
    TradeWindow, fetch_trade_window,
};

#[cfg(feature = "daemon")]
pub use barforge_daemon::{
    Clock, DEFAULT_CONFIG_FILE, Daemon, FixedClock, IndexSettings, PassError, PassReport,
    PassStatus, Pipeline, PollScheduler, RowCounts, Settings, SettingsError, StateError,
    StateManager, SystemClock, session_anchor,
};

/// Prelude module for convenient imports.
///
/// ```
/// use barforge_lib::prelude::*;
/// ```
pub mod prelude {
    pub use barforge_types::{
        AssetClass, Bar, BarUpdate, IndexSample, MalformedEvent, RawSample, RawTrade, Tick,
        Timeframe,
    };

    pub use barforge_aggregate::{Bucketizer, bucketize, bucketize_by_symbol};

    pub use barforge_store::{
        BarStore, MemoryBarStore, Reconciler, RevisionPolicy, SqliteBarStore, StoreError,
        Watermark,
    };

    pub use barforge_composite::{Basket, ConstituentDirectory, build_composite, equal_weight};

    #[cfg(feature = "source")]
    pub use barforge_source::{EventSource, HttpEventSource, MemorySource, SymbolFilter};

    #[cfg(feature = "daemon")]
    pub use barforge_daemon::{Daemon, PassReport, Pipeline, PollScheduler, Settings, StateManager};
}
