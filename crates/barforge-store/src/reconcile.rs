//! Watermark-based reconciliation of fresh bars against the store.
//!
//! The watermark of a series is its most recent stored bar. That bucket is
//! the only [`BucketState::Open`] one: it may still be revised in place.
//! Older buckets are [`BucketState::Closed`] and never touched; newer ones
//! are inserted, and each insert closes the previous live bucket.

use barforge_types::{Bar, BarUpdate, Timeframe};
use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use crate::{BarStore, Result};

/// Which fields of the live bucket a series revises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionPolicy {
    /// Raw tickers: revise OHLC, VWAP and volume when volume changed and is non-zero.
    AllFields,
    /// Composite indices: revise only volume when it changed.
    VolumeOnly,
    /// Sector indices (no volume): revise OHLC when any price changed.
    Prices,
    /// Official indices: never revise, only insert newer buckets.
    InsertOnly,
}

/// Lifecycle state of a bucket relative to the watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketState {
    /// Newer than the watermark (or the series is empty): not yet stored.
    Unwritten,
    /// The watermark bucket itself: stored and still mutable.
    Open,
    /// Older than the watermark: frozen.
    Closed,
}

/// The last persisted bar of a series, read once per pass and passed by value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Watermark {
    live: Option<Bar>,
}

impl Watermark {
    /// A watermark for a series with no stored bars.
    #[must_use]
    pub const fn empty() -> Self {
        Self { live: None }
    }

    /// Wraps the last stored bar.
    #[must_use]
    pub const fn from_last(live: Option<Bar>) -> Self {
        Self { live }
    }

    /// Reads the watermark of a series from the store.
    ///
    /// # Errors
    ///
    /// Propagates store read failures.
    pub async fn read<S>(store: &S, ticker: &str, timeframe: Timeframe) -> Result<Self>
    where
        S: BarStore + ?Sized,
    {
        Ok(Self::from_last(store.last_bar(ticker, timeframe).await?))
    }

    /// Returns the live bar, if any.
    #[must_use]
    pub const fn live(&self) -> Option<&Bar> {
        self.live.as_ref()
    }

    /// Returns the watermark instant.
    #[must_use]
    pub fn bucket_start(&self) -> Option<DateTime<Utc>> {
        self.live.as_ref().map(|b| b.bucket_start)
    }

    /// Classifies a bucket against the watermark.
    #[must_use]
    pub fn state_of(&self, bucket_start: DateTime<Utc>) -> BucketState {
        match self.bucket_start() {
            None => BucketState::Unwritten,
            Some(last) if bucket_start > last => BucketState::Unwritten,
            Some(last) if bucket_start == last => BucketState::Open,
            Some(_) => BucketState::Closed,
        }
    }

    /// Advances the watermark to a newly inserted bar, closing the previous bucket.
    fn advance(&mut self, bar: &Bar) {
        self.live = Some(bar.clone());
    }
}

/// Write decided for one fresh bar.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Insert as a new row.
    Insert(Bar),
    /// Revise the live row in place.
    Update {
        /// Live bucket being revised.
        bucket_start: DateTime<Utc>,
        /// Fields to write.
        update: BarUpdate,
    },
    /// No write.
    Ignore {
        /// Bucket that was skipped.
        bucket_start: DateTime<Utc>,
        /// State that caused the skip.
        state: BucketState,
    },
}

/// Classifies fresh bars against a watermark.
///
/// Bars are processed in ascending bucket order; each insert advances the
/// watermark, so at most one bucket per call is ever updated.
#[must_use]
pub fn plan(mut watermark: Watermark, mut bars: Vec<Bar>, policy: RevisionPolicy) -> Vec<Action> {
    bars.sort_by_key(|b| b.bucket_start);
    let mut actions = Vec::with_capacity(bars.len());

    for bar in bars {
        let state = watermark.state_of(bar.bucket_start);
        let action = match state {
            BucketState::Unwritten => {
                watermark.advance(&bar);
                Action::Insert(bar)
            }
            BucketState::Open => {
                let revision = watermark
                    .live()
                    .and_then(|stored| revision_for(stored, &bar, policy));
                match revision {
                    Some(update) => {
                        if let Some(live) = watermark.live.as_mut() {
                            live.apply(&update);
                        }
                        Action::Update {
                            bucket_start: bar.bucket_start,
                            update,
                        }
                    }
                    None => Action::Ignore {
                        bucket_start: bar.bucket_start,
                        state,
                    },
                }
            }
            BucketState::Closed => Action::Ignore {
                bucket_start: bar.bucket_start,
                state,
            },
        };
        actions.push(action);
    }
    actions
}

fn revision_for(stored: &Bar, fresh: &Bar, policy: RevisionPolicy) -> Option<BarUpdate> {
    match policy {
        RevisionPolicy::AllFields => (fresh.volume != stored.volume && fresh.volume != 0)
            .then(|| BarUpdate::full_from(fresh)),
        RevisionPolicy::VolumeOnly => {
            (fresh.volume != stored.volume).then_some(BarUpdate::Volume(fresh.volume))
        }
        RevisionPolicy::Prices => {
            (!fresh.same_prices(stored)).then(|| BarUpdate::prices_from(fresh))
        }
        RevisionPolicy::InsertOnly => None,
    }
}

/// Write counts for one reconciled series or a whole pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Rows inserted.
    pub inserted: usize,
    /// Rows revised in place.
    pub updated: usize,
    /// Bars that needed no write.
    pub unchanged: usize,
    /// Writes that collided with existing state and were treated as applied.
    pub conflicts: usize,
    /// Rows whose write failed and was skipped.
    pub failed: usize,
}

impl ReconcileOutcome {
    /// Adds another outcome's counts to this one.
    pub const fn merge(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.conflicts += other.conflicts;
        self.failed += other.failed;
    }

    /// Returns the number of successful writes.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.inserted + self.updated
    }
}

/// Applies planned writes to a store.
#[derive(Debug)]
pub struct Reconciler<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> Reconciler<'a, S>
where
    S: BarStore + ?Sized,
{
    /// Creates a reconciler writing to `store`.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Reads the watermark of `ticker` and reconciles `bars` against it.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store is unavailable; per-row failures and
    /// conflicts are counted in the outcome.
    pub async fn reconcile(
        &self,
        ticker: &str,
        timeframe: Timeframe,
        bars: Vec<Bar>,
        policy: RevisionPolicy,
    ) -> Result<ReconcileOutcome> {
        if bars.is_empty() {
            return Ok(ReconcileOutcome::default());
        }
        let watermark = Watermark::read(self.store, ticker, timeframe).await?;
        self.reconcile_with(watermark, ticker, timeframe, bars, policy)
            .await
    }

    /// Reconciles `bars` against an already-read watermark.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store is unavailable.
    pub async fn reconcile_with(
        &self,
        watermark: Watermark,
        ticker: &str,
        timeframe: Timeframe,
        bars: Vec<Bar>,
        policy: RevisionPolicy,
    ) -> Result<ReconcileOutcome> {
        let mut outcome = ReconcileOutcome::default();

        for action in plan(watermark, bars, policy) {
            let (written, bucket_start, is_insert) = match action {
                Action::Insert(bar) => (self.store.insert(&bar).await, bar.bucket_start, true),
                Action::Update {
                    bucket_start,
                    update,
                } => (
                    self.store
                        .update_in_place(ticker, timeframe, bucket_start, update)
                        .await,
                    bucket_start,
                    false,
                ),
                Action::Ignore { .. } => {
                    outcome.unchanged += 1;
                    continue;
                }
            };

            match written {
                Ok(()) if is_insert => outcome.inserted += 1,
                Ok(()) => outcome.updated += 1,
                Err(e) if e.is_conflict() => {
                    warn!(%ticker, %timeframe, bucket = %bucket_start, error = %e, "Write conflict, treating as applied");
                    outcome.conflicts += 1;
                }
                Err(e) if e.is_unavailable() => return Err(e),
                Err(e) => {
                    error!(%ticker, %timeframe, bucket = %bucket_start, error = %e, "Bar write failed, skipping");
                    outcome.failed += 1;
                }
            }
        }

        debug!(
            %ticker,
            %timeframe,
            inserted = outcome.inserted,
            updated = outcome.updated,
            unchanged = outcome.unchanged,
            "Reconciled series"
        );
        Ok(outcome)
    }
}
