//! Basket listing command.

use super::load_settings;
use anyhow::{Context, Result};
use std::path::Path;

/// Lists configured baskets and their members.
pub(crate) fn list_baskets(config: Option<&Path>) -> Result<()> {
    let settings = load_settings(config)?;
    let directory = settings.validate().context("Invalid settings")?;

    if directory.is_empty() {
        println!("No baskets configured.");
        return Ok(());
    }

    println!("{:<12} {:<16} {:>8} {:<12} {:>7}", "ID", "TICKER", "SCALE", "TIMEFRAMES", "MEMBERS");
    println!("{}", "-".repeat(60));

    for basket in directory.iter() {
        let timeframes = if basket.timeframes.is_empty() {
            "all".to_string()
        } else {
            basket
                .timeframes
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        println!(
            "{:<12} {:<16} {:>8} {:<12} {:>7}",
            basket.id,
            basket.ticker,
            basket.effective_scale(),
            timeframes,
            basket.len()
        );
        println!("    {}", basket.members.join(" "));
    }

    for index in &settings.indices {
        let basket = index.basket.as_deref().unwrap_or("-");
        println!("index {} -> {} (volume from {basket})", index.code, index.ticker);
    }

    println!("\nTotal: {} baskets", directory.len());
    Ok(())
}
