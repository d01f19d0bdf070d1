//! Pass status command.

use crate::display::print_reports;
use anyhow::{Context, Result};
use barforge_lib::StateManager;

/// Shows the latest report of every timeframe.
pub(crate) fn status() -> Result<()> {
    let state = StateManager::with_default_path().context("Failed to initialize state manager")?;
    let reports = state.list_reports()?;

    if reports.is_empty() {
        println!("No passes recorded yet.");
        println!("Reports are stored in {}", state.base_path().display());
        return Ok(());
    }

    print_reports(&reports);
    Ok(())
}
