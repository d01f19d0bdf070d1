//! barforge CLI - OHLCV bars and equal-weight indices from a live trade feed.

use anyhow::Result;
use barforge_lib::Timeframe;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

#[derive(Parser)]
#[command(name = "barforge")]
#[command(about = "OHLCV bars and equal-weight indices from a live trade feed", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file (defaults to ./barforge.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the feed until interrupted
    Run {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Run exactly one pass
    Pass {
        /// Timeframe to process (defaults to every configured timeframe)
        #[arg(short, long)]
        timeframe: Option<Timeframe>,
    },

    /// Show the latest pass report per timeframe
    Status,

    /// List configured baskets and their members
    Baskets,

    /// Divide a ticker's stored prices before a date by a ratio
    Rescale {
        /// Ticker to adjust
        #[arg(long)]
        ticker: String,

        /// Adjustment ratio (prices are divided by it)
        #[arg(long)]
        ratio: f64,

        /// Only bars strictly before this date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        before: String,
    },
}

/// Installs the log subscriber. `RUST_LOG` wins over the flags.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    init_logging(cli.verbose, cli.quiet);
    let config = cli.config.as_deref();

    match command {
        Commands::Run { once } => commands::run::run(config, once).await,
        Commands::Pass { timeframe } => commands::pass::pass(config, timeframe).await,
        Commands::Status => commands::status::status(),
        Commands::Baskets => commands::baskets::list_baskets(config),
        Commands::Rescale {
            ticker,
            ratio,
            before,
        } => commands::rescale::rescale(config, &ticker, ratio, &before).await,
    }
}
