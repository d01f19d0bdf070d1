//! Corporate-action rescale command.

use super::{load_settings, open_store};
use crate::display::parse_before;
use anyhow::{Result, bail};
use barforge_lib::BarStore;
use std::path::Path;

/// Divides the stored prices of `ticker` before `before` by `ratio`.
pub(crate) async fn rescale(
    config: Option<&Path>,
    ticker: &str,
    ratio: f64,
    before: &str,
) -> Result<()> {
    if !ratio.is_finite() || ratio <= 0.0 {
        bail!("Ratio must be a positive number, got {ratio}");
    }
    let before = parse_before(before)?;
    let store = open_store(&load_settings(config)?)?;

    let changed = store.rescale(ticker, ratio, before).await?;
    println!("Rescaled {changed} bars of {ticker} before {before} by 1/{ratio}");
    Ok(())
}
