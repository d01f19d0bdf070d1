//! The long-running poll loop.

use barforge_source::EventSource;
use barforge_store::BarStore;
use tracing::{info, warn};

use crate::{PassReport, Pipeline, PollScheduler, StateManager};

/// Runs the pipeline on a schedule and persists each pass report.
#[derive(Debug)]
pub struct Daemon<S: ?Sized, E: ?Sized> {
    pipeline: Pipeline<S, E>,
    scheduler: PollScheduler,
    state: Option<StateManager>,
}

impl<S, E> Daemon<S, E>
where
    S: BarStore + ?Sized,
    E: EventSource + ?Sized,
{
    /// Creates a daemon without report persistence.
    #[must_use]
    pub const fn new(pipeline: Pipeline<S, E>, scheduler: PollScheduler) -> Self {
        Self {
            pipeline,
            scheduler,
            state: None,
        }
    }

    /// Persists reports through `state`.
    #[must_use]
    pub fn with_state(mut self, state: StateManager) -> Self {
        self.state = Some(state);
        self
    }

    /// Returns the pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline<S, E> {
        &self.pipeline
    }

    /// Returns the scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &PollScheduler {
        &self.scheduler
    }

    /// Runs one pass per configured timeframe and saves the reports.
    pub async fn run_cycle(&self) -> Vec<PassReport> {
        let reports = self.pipeline.run_cycle().await;
        for report in &reports {
            self.persist(report);
        }
        reports
    }

    /// Polls until the scheduler's token is cancelled; returns the cycle count.
    pub async fn run(&self) -> usize {
        info!(
            interval = ?self.scheduler.interval(),
            timeframes = ?self.pipeline.settings().schedule.timeframes,
            "Starting poll loop"
        );
        let this = self;
        self.scheduler
            .run(move || async move {
                this.run_cycle().await;
            })
            .await
    }

    fn persist(&self, report: &PassReport) {
        if let Some(state) = &self.state {
            if let Err(e) = state.save_report(report) {
                warn!(timeframe = %report.timeframe, error = %e, "Failed to save pass report");
            }
        }
    }
}
