//! Persisted pass reports.

use std::fs;
use std::path::{Path, PathBuf};

use barforge_types::Timeframe;
use directories::ProjectDirs;
use thiserror::Error;
use tracing::warn;

use crate::PassReport;

/// Errors that can occur while persisting reports.
#[derive(Error, Debug)]
pub enum StateError {
    /// Failed to create a directory.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        /// The path that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to read a file.
    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to write a file.
    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        /// The path that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse JSON.
    #[error("Failed to parse report file '{path}': {source}")]
    ParseJson {
        /// The path that could not be parsed.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },

    /// Failed to serialize JSON.
    #[error("Failed to serialize report: {0}")]
    SerializeJson(#[from] serde_json::Error),

    /// No report has been written for the timeframe.
    #[error("No report for timeframe {0}")]
    ReportNotFound(Timeframe),

    /// Failed to read directory.
    #[error("Failed to read directory '{path}': {source}")]
    ReadDir {
        /// The path that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Result type for state operations.
pub type Result<T> = std::result::Result<T, StateError>;

/// Stores the latest pass report per timeframe as JSON.
///
/// Reports live in `<base>/reports/<timeframe>.json`; each pass overwrites
/// the previous report of its timeframe.
#[derive(Debug, Clone)]
pub struct StateManager {
    base_path: PathBuf,
    reports_path: PathBuf,
}

impl StateManager {
    /// Creates a state manager rooted at `base_path`, creating directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn new(base_path: PathBuf) -> Result<Self> {
        let reports_path = base_path.join("reports");
        for path in [&base_path, &reports_path] {
            if !path.exists() {
                fs::create_dir_all(path).map_err(|e| StateError::CreateDir {
                    path: path.clone(),
                    source: e,
                })?;
            }
        }
        Ok(Self {
            base_path,
            reports_path,
        })
    }

    /// Returns the platform data directory for barforge.
    ///
    /// - Linux: `~/.local/share/barforge/`
    /// - macOS: `~/Library/Application Support/barforge/`
    /// - Windows: `C:\Users\<User>\AppData\Roaming\barforge\`
    ///
    /// Falls back to `~/.barforge/`.
    #[must_use]
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "barforge").map_or_else(dirs_fallback, |proj_dirs| {
            proj_dirs.data_dir().to_path_buf()
        })
    }

    /// Creates a state manager at the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn with_default_path() -> Result<Self> {
        Self::new(Self::default_path())
    }

    /// Returns the base path.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Returns the report file of a timeframe.
    #[must_use]
    pub fn report_path(&self, timeframe: Timeframe) -> PathBuf {
        self.reports_path.join(format!("{timeframe}.json"))
    }

    /// Saves a report, replacing the previous one for its timeframe.
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be serialized or written.
    pub fn save_report(&self, report: &PassReport) -> Result<()> {
        let path = self.report_path(report.timeframe);
        let json = serde_json::to_string_pretty(report)?;
        fs::write(&path, json).map_err(|e| StateError::WriteFile { path, source: e })
    }

    /// Loads the latest report of a timeframe.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::ReportNotFound`] if none was written, or an
    /// error if the file cannot be read or parsed.
    pub fn load_report(&self, timeframe: Timeframe) -> Result<PassReport> {
        let path = self.report_path(timeframe);
        if !path.exists() {
            return Err(StateError::ReportNotFound(timeframe));
        }
        let content = fs::read_to_string(&path).map_err(|e| StateError::ReadFile {
            path: path.clone(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| StateError::ParseJson { path, source: e })
    }

    /// Lists the latest report of every timeframe, ordered by timeframe.
    ///
    /// Unparseable files are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the reports directory cannot be read.
    pub fn list_reports(&self) -> Result<Vec<PassReport>> {
        let entries = fs::read_dir(&self.reports_path).map_err(|e| StateError::ReadDir {
            path: self.reports_path.clone(),
            source: e,
        })?;

        let mut reports = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StateError::ReadDir {
                path: self.reports_path.clone(),
                source: e,
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                let content = fs::read_to_string(&path).map_err(|e| StateError::ReadFile {
                    path: path.clone(),
                    source: e,
                })?;
                match serde_json::from_str::<PassReport>(&content) {
                    Ok(report) => reports.push(report),
                    Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable report"),
                }
            }
        }

        reports.sort_by_key(|r| r.timeframe);
        Ok(reports)
    }
}

fn dirs_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".barforge")
}
