//! Display utilities and argument parsing for the barforge CLI.

use anyhow::{Result, bail};
use barforge_lib::PassReport;
use chrono::{DateTime, NaiveDate, Utc};

/// Parses a `--before` value: a date (midnight UTC) or an RFC 3339 instant.
pub(crate) fn parse_before(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => Ok(date.and_time(chrono::NaiveTime::MIN).and_utc()),
        Err(_) => bail!("Invalid date '{value}', expected YYYY-MM-DD or RFC 3339"),
    }
}

fn format_duration(report: &PassReport) -> String {
    report.duration().map_or_else(
        || "-".to_string(),
        |d| format!("{:.1}s", d.num_milliseconds() as f64 / 1000.0),
    )
}

/// Prints one line per report.
pub(crate) fn print_reports(reports: &[PassReport]) {
    println!(
        "{:<6} {:<10} {:<20} {:>8} {:>8} {:>8} {:>9} {:>7} {:>8}",
        "TF", "STATUS", "STARTED", "TIME", "INSERTED", "UPDATED", "UNCHANGED", "FAILED", "DROPPED"
    );
    println!("{}", "-".repeat(92));

    for report in reports {
        let total = report.total();
        println!(
            "{:<6} {:<10} {:<20} {:>8} {:>8} {:>8} {:>9} {:>7} {:>8}",
            report.timeframe,
            report.status,
            report.started_at.format("%Y-%m-%d %H:%M:%S"),
            format_duration(report),
            total.inserted,
            total.updated,
            total.unchanged,
            total.failed,
            report.dropped_events,
        );
        if report.truncated {
            println!("       trade window truncated after {} pages", report.pages);
        }
        if !report.skipped_baskets.is_empty() {
            println!("       skipped baskets: {}", report.skipped_baskets.join(", "));
        }
        if let Some(ref err) = report.error {
            println!("       error: {err}");
        }
    }
}
