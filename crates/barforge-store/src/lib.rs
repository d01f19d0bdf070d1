//! Bar persistence for barforge.
//!
//! - [`BarStore`] - Gateway trait (read last bar, insert, update in place, rescale)
//! - [`SqliteBarStore`] - Durable SQLite implementation
//! - [`MemoryBarStore`] - In-process implementation with write accounting
//! - [`Reconciler`] - Watermark-based insert / update / ignore classification

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/barforge/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod gateway;
mod memory;
mod reconcile;
mod sqlite;

pub use error::{Result, StoreError};
pub use gateway::BarStore;
pub use memory::MemoryBarStore;
pub use reconcile::{
    Action, BucketState, ReconcileOutcome, Reconciler, RevisionPolicy, Watermark, plan,
};
pub use sqlite::SqliteBarStore;
