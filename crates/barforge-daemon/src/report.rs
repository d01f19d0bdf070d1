//! Pass reports.

use barforge_store::ReconcileOutcome;
use barforge_types::Timeframe;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a pass.
pub type PassId = Uuid;

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PassStatus {
    /// The pass is still executing.
    #[default]
    Running,
    /// Every step ran.
    Completed,
    /// The source was unavailable; only composites ran.
    Degraded,
    /// The store became unavailable and the rest of the pass was abandoned.
    Aborted,
}

impl PassStatus {
    /// Returns true if the pass has ended.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Returns the status as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Degraded => "degraded",
            Self::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for PassStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Row counts for one step of a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCounts {
    /// Rows inserted.
    pub inserted: usize,
    /// Rows revised in place.
    pub updated: usize,
    /// Bars that needed no write.
    pub unchanged: usize,
    /// Writes treated as already applied.
    pub conflicts: usize,
    /// Rows whose write failed.
    pub failed: usize,
}

impl RowCounts {
    /// Adds a reconciliation outcome.
    pub const fn add(&mut self, outcome: ReconcileOutcome) {
        self.inserted += outcome.inserted;
        self.updated += outcome.updated;
        self.unchanged += outcome.unchanged;
        self.conflicts += outcome.conflicts;
        self.failed += outcome.failed;
    }

    /// Adds another set of counts.
    pub const fn merge(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.conflicts += other.conflicts;
        self.failed += other.failed;
    }

    /// Successful writes.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.inserted + self.updated
    }
}

impl From<ReconcileOutcome> for RowCounts {
    fn from(outcome: ReconcileOutcome) -> Self {
        let mut counts = Self::default();
        counts.add(outcome);
        counts
    }
}

/// What one pass over one timeframe did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassReport {
    /// Unique identifier for this pass.
    pub id: PassId,
    /// Timeframe processed.
    pub timeframe: Timeframe,
    /// When the pass started.
    pub started_at: DateTime<Utc>,
    /// When the pass ended.
    pub finished_at: Option<DateTime<Utc>>,
    /// Current status.
    pub status: PassStatus,
    /// Session anchor trades were fetched from.
    pub since: Option<DateTime<Utc>>,
    /// Trades received from the source.
    pub trades_fetched: usize,
    /// Trade pages requested.
    pub pages: usize,
    /// The page cap cut the trade window short.
    pub truncated: bool,
    /// Malformed trades and samples dropped.
    pub dropped_events: usize,
    /// Raw ticker bars.
    pub raw: RowCounts,
    /// Official index bars.
    pub indices: RowCounts,
    /// Sector bars.
    pub sectors: RowCounts,
    /// Composite bars.
    pub composites: RowCounts,
    /// Baskets skipped this pass.
    pub skipped_baskets: Vec<String>,
    /// Error that degraded or aborted the pass.
    pub error: Option<String>,
}

impl PassReport {
    /// Starts a report for a pass over `timeframe`.
    #[must_use]
    pub fn new(timeframe: Timeframe, started_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timeframe,
            started_at,
            finished_at: None,
            status: PassStatus::Running,
            since: None,
            trades_fetched: 0,
            pages: 0,
            truncated: false,
            dropped_events: 0,
            raw: RowCounts::default(),
            indices: RowCounts::default(),
            sectors: RowCounts::default(),
            composites: RowCounts::default(),
            skipped_baskets: Vec::new(),
            error: None,
        }
    }

    /// Returns true if the pass has ended.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    /// Sum of all steps' row counts.
    #[must_use]
    pub fn total(&self) -> RowCounts {
        let mut total = self.raw;
        total.merge(self.indices);
        total.merge(self.sectors);
        total.merge(self.composites);
        total
    }

    /// Pass duration, once finished.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::TimeDelta> {
        self.finished_at.map(|end| end - self.started_at)
    }

    /// Records that the source failed; composites may still run.
    pub fn mark_degraded(&mut self, error: String) {
        self.status = PassStatus::Degraded;
        self.error = Some(error);
    }

    /// Ends the pass. A degraded pass stays degraded.
    pub fn mark_completed(&mut self, at: DateTime<Utc>) {
        if self.status == PassStatus::Running {
            self.status = PassStatus::Completed;
        }
        self.finished_at = Some(at);
    }

    /// Ends the pass as aborted.
    pub fn mark_aborted(&mut self, at: DateTime<Utc>, error: String) {
        self.status = PassStatus::Aborted;
        self.finished_at = Some(at);
        self.error = Some(error);
    }
}
