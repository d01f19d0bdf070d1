//! Poll scheduling.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Runs a cycle repeatedly, sleeping `interval` plus random jitter between
/// cycles, until its token is cancelled.
///
/// Cancellation is observed between cycles only: a cycle that has started
/// always runs to completion.
#[derive(Debug, Clone)]
pub struct PollScheduler {
    interval: Duration,
    jitter: Duration,
    token: CancellationToken,
}

impl PollScheduler {
    /// Creates a scheduler with a fresh cancellation token.
    #[must_use]
    pub fn new(interval: Duration, jitter: Duration) -> Self {
        Self {
            interval,
            jitter,
            token: CancellationToken::new(),
        }
    }

    /// Uses an existing cancellation token.
    #[must_use]
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Returns a handle that stops the loop when cancelled.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Requests shutdown after the current cycle.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns the configured interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Delay before the next cycle: the interval plus up to `jitter`.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        let max = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if max == 0 {
            return self.interval;
        }
        let extra = rand::thread_rng().gen_range(0..=max);
        self.interval + Duration::from_millis(extra)
    }

    /// Runs `cycle` until cancelled and returns how many cycles ran.
    pub async fn run<F, Fut>(&self, mut cycle: F) -> usize
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut cycles = 0usize;
        while !self.token.is_cancelled() {
            cycle().await;
            cycles += 1;

            let delay = self.next_delay();
            debug!(cycle = cycles, ?delay, "Sleeping until next cycle");
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.token.cancelled() => break,
            }
        }
        info!(cycles, "Poll loop stopped");
        cycles
    }
}
