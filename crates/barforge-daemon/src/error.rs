//! Pass failures.

use barforge_source::SourceError;
use barforge_store::StoreError;
use thiserror::Error;

/// Why a step of a pass stopped early.
#[derive(Error, Debug)]
pub enum PassError {
    /// The event source failed; ingestion is skipped until the next cycle.
    #[error("Source unavailable: {0}")]
    Source(#[from] SourceError),

    /// The store failed; the rest of the pass is abandoned.
    #[error("Store unavailable: {0}")]
    Store(#[from] StoreError),
}

impl PassError {
    /// Returns true if the failure ends the whole pass.
    #[must_use]
    pub const fn aborts_pass(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
