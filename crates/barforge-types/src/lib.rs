//! Core types for the barforge bar aggregation engine.
//!
//! This crate provides the fundamental data structures used throughout barforge:
//!
//! - [`Tick`] - A single validated trade (symbol, time, price, volume)
//! - [`RawTrade`] - A trade as delivered by the event source, before validation
//! - [`IndexSample`] - A single index-value observation
//! - [`Bar`] - An OHLCV record for one ticker, timeframe and bucket
//! - [`Timeframe`] - Fixed bucket width used for aggregation
//! - [`normalize`] - Symbol, sector and index-code normalisation

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/barforge/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bar;
mod error;
pub mod normalize;
mod sample;
mod tick;
mod timeframe;

pub use bar::{AssetClass, Bar, BarUpdate};
pub use error::MalformedEvent;
pub use sample::{IndexSample, RawSample};
pub use tick::{RawTrade, Tick};
pub use timeframe::{Timeframe, TimeframeParseError};
