//! Event sources for barforge.
//!
//! - [`EventSource`] - Fetch trades and index samples since a watermark
//! - [`HttpEventSource`] - JSON-over-HTTP source with retry/backoff
//! - [`MemorySource`] - In-process source for tests
//! - [`fetch_trade_window`] - Cursor pagination over [`EventSource::fetch_trades`]

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/barforge/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod memory;
mod paginate;
mod source;

pub use client::{ClientConfig, HttpEventSource};
pub use error::SourceError;
pub use memory::MemorySource;
pub use paginate::{TradeWindow, fetch_trade_window};
pub use source::{EventSource, SymbolFilter};
