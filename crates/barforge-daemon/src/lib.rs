//! Poll loop and pass pipeline for barforge.
//!
//! - [`Settings`] - TOML configuration and its validation
//! - [`Pipeline`] - One pass over one timeframe: raw tickers, official
//!   indices, sectors, then composites
//! - [`PollScheduler`] - Interval plus jitter, stopped by a cancellation token
//! - [`Daemon`] - Scheduler, pipeline and report persistence together
//! - [`PassReport`] - What a pass did
//! - [`StateManager`] - Latest report per timeframe, stored as JSON
//! - [`Clock`] - Injectable time source for the session anchor

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/barforge/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod clock;
mod daemon;
mod error;
mod pipeline;
mod report;
mod scheduler;
mod settings;
mod state;

pub use clock::{Clock, FixedClock, SystemClock, session_anchor};
pub use daemon::Daemon;
pub use error::PassError;
pub use pipeline::Pipeline;
pub use report::{PassId, PassReport, PassStatus, RowCounts};
pub use scheduler::PollScheduler;
pub use settings::{
    DEFAULT_CONFIG_FILE, IndexSettings, ScheduleSettings, SectorSettings, SessionSettings,
    Settings, SettingsError, SourceKind, SourceSettings, StoreSettings,
};
pub use state::{Result, StateError, StateManager};
