//! Bucket aggregation for barforge.
//!
//! This crate turns raw events into [`Bar`](barforge_types::Bar)s:
//!
//! - [`Bucketizer`] - Streaming tick-to-bar aggregation with running VWAP
//! - [`bucketize`] / [`bucketize_by_symbol`] - Batch helpers over a tick window
//! - [`resample_samples`] - Index-value samples to OHLC bars

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/barforge/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod builder;
mod bucketizer;
mod resample;

pub use bucketizer::{Bucketizer, bucketize, bucketize_by_symbol};
pub use resample::{resample_by_ticker, resample_samples};
