//! Single pass command.

use super::{load_settings, open_pipeline};
use crate::display::print_reports;
use anyhow::{Context, Result};
use barforge_lib::{StateManager, Timeframe};
use std::path::Path;

/// Runs one pass for `timeframe`, or for every configured timeframe.
pub(crate) async fn pass(config: Option<&Path>, timeframe: Option<Timeframe>) -> Result<()> {
    let pipeline = open_pipeline(load_settings(config)?)?;
    let state = StateManager::with_default_path().context("Failed to initialize state manager")?;

    let reports = match timeframe {
        Some(timeframe) => vec![pipeline.run_pass(timeframe).await],
        None => pipeline.run_cycle().await,
    };
    for report in &reports {
        state.save_report(report)?;
    }

    print_reports(&reports);
    Ok(())
}
