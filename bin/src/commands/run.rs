//! Poll loop command.

use super::{load_settings, open_pipeline};
use crate::display::print_reports;
use anyhow::{Context, Result};
use barforge_lib::{Daemon, PollScheduler, StateManager};
use std::path::Path;
use tracing::{info, warn};

/// Runs the poll loop until Ctrl-C, or a single cycle with `once`.
pub(crate) async fn run(config: Option<&Path>, once: bool) -> Result<()> {
    let settings = load_settings(config)?;
    let scheduler = PollScheduler::new(settings.schedule.interval(), settings.schedule.jitter());
    let state = StateManager::with_default_path().context("Failed to initialize state manager")?;
    let daemon = Daemon::new(open_pipeline(settings)?, scheduler).with_state(state);

    if once {
        let reports = daemon.run_cycle().await;
        print_reports(&reports);
        return Ok(());
    }

    let token = daemon.scheduler().token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping after the current pass");
                token.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    let cycles = daemon.run().await;
    println!("Stopped after {cycles} cycles.");
    Ok(())
}
