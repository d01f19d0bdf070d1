//! CLI command implementations.

use anyhow::{Context, Result};
use barforge_lib::{DEFAULT_CONFIG_FILE, HttpEventSource, Pipeline, Settings, SqliteBarStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) mod baskets;
pub(crate) mod pass;
pub(crate) mod rescale;
pub(crate) mod run;
pub(crate) mod status;

/// Pipeline over the SQLite store and the HTTP feed.
pub(crate) type LivePipeline = Pipeline<SqliteBarStore, HttpEventSource>;

/// Loads settings from `config`, or from `./barforge.toml` when present.
pub(crate) fn load_settings(config: Option<&Path>) -> Result<Settings> {
    let path = match config {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => Path::new(DEFAULT_CONFIG_FILE),
        None => {
            warn!("No {DEFAULT_CONFIG_FILE} found, using built-in defaults");
            return Ok(Settings::default());
        }
    };
    info!(path = %path.display(), "Loading settings");
    Settings::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Opens the configured store.
pub(crate) fn open_store(settings: &Settings) -> Result<SqliteBarStore> {
    SqliteBarStore::open(&settings.store.path)
        .with_context(|| format!("Failed to open store {}", settings.store.path.display()))
}

/// Builds the pipeline described by `settings`.
pub(crate) fn open_pipeline(settings: Settings) -> Result<LivePipeline> {
    let store = open_store(&settings)?;
    let source = HttpEventSource::new(settings.source.client_config())
        .context("Failed to create event source")?;
    Pipeline::new(Arc::new(store), Arc::new(source), settings).context("Invalid settings")
}
