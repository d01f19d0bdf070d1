//! TOML configuration.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use barforge_composite::{Basket, ConstituentDirectory, DirectoryError};
use barforge_source::{ClientConfig, SymbolFilter};
use barforge_types::Timeframe;
use barforge_types::normalize::default_sector_aliases;
use serde::Deserialize;
use thiserror::Error;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "barforge.toml";

/// Errors raised while loading or validating settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The configuration file could not be read.
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        /// File that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or has wrongly typed fields.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Basket definitions are inconsistent.
    #[error("Invalid basket definitions: {0}")]
    Directory(#[from] DirectoryError),

    /// An index links to a basket that is not defined.
    #[error("Index '{code}' references unknown basket '{basket}'")]
    UnknownBasket {
        /// Index code.
        code: String,
        /// Missing basket id.
        basket: String,
    },

    /// Two index entries normalise to the same code.
    #[error("Index code '{0}' is configured more than once")]
    DuplicateIndex(String),

    /// A field holds an unusable value.
    #[error("Invalid value for '{field}': {reason}")]
    Invalid {
        /// Dotted field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Tokens removed from raw index codes before lookup (e.g. `"EWI"`).
    pub index_code_strip: Vec<String>,
    /// Bar store location.
    pub store: StoreSettings,
    /// Event source.
    pub source: SourceSettings,
    /// Poll cadence and timeframes.
    pub schedule: ScheduleSettings,
    /// Trading session.
    pub session: SessionSettings,
    /// Equal-weight baskets.
    pub baskets: Vec<Basket>,
    /// Official index series.
    pub indices: Vec<IndexSettings>,
    /// Sector index series.
    pub sectors: SectorSettings,
}

/// `[store]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// SQLite database file.
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("barforge.db"),
        }
    }
}

/// Kind of event source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// JSON over HTTP.
    #[default]
    Http,
}

/// `[source]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Source kind.
    pub kind: SourceKind,
    /// Feed base URL.
    pub base_url: String,
    /// Trades requested per call.
    pub page_size: usize,
    /// Pages fetched per pass at most.
    pub max_pages: usize,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Retries per request.
    pub max_retries: u32,
    /// Backoff base delay in milliseconds.
    pub base_delay_ms: u64,
    /// Backoff ceiling in milliseconds.
    pub max_delay_ms: u64,
    /// Exchange suffix stripped from trade symbols.
    pub symbol_suffix: String,
    /// Tickers to fetch; empty means all.
    pub symbols: Vec<String>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        let client = ClientConfig::default();
        Self {
            kind: SourceKind::Http,
            base_url: client.base_url,
            page_size: 5_000,
            max_pages: 20,
            timeout_secs: client.timeout.as_secs(),
            max_retries: client.max_retries,
            base_delay_ms: client.base_delay_ms,
            max_delay_ms: client.max_delay_ms,
            symbol_suffix: ".CA".to_string(),
            symbols: Vec::new(),
        }
    }
}

impl SourceSettings {
    /// Builds the HTTP client configuration.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
            ..ClientConfig::default()
        }
    }

    /// Builds the trade symbol filter.
    #[must_use]
    pub fn symbol_filter(&self) -> SymbolFilter {
        SymbolFilter::from_tickers(&self.symbols, &self.symbol_suffix)
    }
}

/// `[schedule]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// Seconds between the end of one cycle and the start of the next.
    pub interval_secs: u64,
    /// Random extra delay, up to this many milliseconds.
    pub jitter_ms: u64,
    /// Timeframes processed each cycle, in order.
    pub timeframes: Vec<Timeframe>,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            jitter_ms: 1_000,
            timeframes: vec![Timeframe::Minute1, Timeframe::Minute5],
        }
    }
}

impl ScheduleSettings {
    /// Poll interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Maximum jitter.
    #[must_use]
    pub const fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }
}

/// `[session]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// UTC hour the trading day starts; trades are fetched from there.
    pub vwap_anchor_hour_utc: u32,
}

/// One `[[indices]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexSettings {
    /// Index code as reported by the source, after stripping.
    pub code: String,
    /// Ticker the series is stored under.
    pub ticker: String,
    /// Basket whose turnover is used as the index volume.
    #[serde(default)]
    pub basket: Option<String>,
}

/// `[sectors]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SectorSettings {
    /// Resample sector samples.
    pub enabled: bool,
    /// Sector description aliases, applied after whitespace removal.
    pub aliases: HashMap<String, String>,
}

impl Default for SectorSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            aliases: default_sector_aliases(),
        }
    }
}

impl Settings {
    /// Parses settings from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration.
    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads settings from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| SettingsError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&text)
    }

    /// Validates the settings and builds the constituent directory.
    ///
    /// # Errors
    ///
    /// Returns an error for inconsistent baskets, indices linked to unknown
    /// baskets, duplicated index codes, or unusable numeric fields.
    pub fn validate(&self) -> Result<ConstituentDirectory, SettingsError> {
        if self.source.page_size == 0 {
            return Err(SettingsError::Invalid {
                field: "source.page_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.source.max_pages == 0 {
            return Err(SettingsError::Invalid {
                field: "source.max_pages",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.session.vwap_anchor_hour_utc > 23 {
            return Err(SettingsError::Invalid {
                field: "session.vwap_anchor_hour_utc",
                reason: format!("{} is not an hour of the day", self.session.vwap_anchor_hour_utc),
            });
        }
        if self.schedule.timeframes.is_empty() {
            return Err(SettingsError::Invalid {
                field: "schedule.timeframes",
                reason: "no timeframe configured".to_string(),
            });
        }

        let directory = ConstituentDirectory::new(self.baskets.clone())?;

        let mut codes = Vec::with_capacity(self.indices.len());
        for index in &self.indices {
            let code = self.index_code(&index.code);
            if codes.contains(&code) {
                return Err(SettingsError::DuplicateIndex(code));
            }
            codes.push(code);
            if let Some(basket) = &index.basket {
                if directory.get(basket).is_none() {
                    return Err(SettingsError::UnknownBasket {
                        code: index.code.clone(),
                        basket: basket.clone(),
                    });
                }
            }
        }

        Ok(directory)
    }

    /// Normalises a raw index code with the configured strip tokens.
    #[must_use]
    pub fn index_code(&self, raw: &str) -> String {
        barforge_types::normalize::normalize_index_code(raw, &self.index_code_strip)
    }

    /// Finds the index entry a raw source code refers to.
    #[must_use]
    pub fn index_for(&self, raw: &str) -> Option<&IndexSettings> {
        let code = self.index_code(raw);
        self.indices.iter().find(|i| self.index_code(&i.code) == code)
    }
}
