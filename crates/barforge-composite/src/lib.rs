//! Composite index construction for barforge.
//!
//! - [`Basket`] / [`ConstituentDirectory`] - Basket definitions
//! - [`PanelBuilder`] / [`PricePanel`] - Dense, gap-filled member price grid
//! - [`equal_weight`] - Reduction of a panel to composite bars
//! - [`build_composite`] - Store → panel → composite for one basket
//! - [`official_index_bars`] - Official index samples joined with basket volume

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/barforge/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod basket;
mod directory;
mod equal_weight;
mod error;
mod official;
mod panel;

pub use basket::Basket;
pub use directory::ConstituentDirectory;
pub use equal_weight::{build_composite, equal_weight};
pub use error::{DirectoryError, PanelError};
pub use official::{basket_volume, official_index_bars};
pub use panel::{Cell, PanelBuilder, PricePanel, load_panel};
