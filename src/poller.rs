//! Bounded waiting for eventually visible side effects.
//!
//! [`ConfirmationPoller::wait`] runs a check on a fixed tick until it reports
//! success or the timeout elapses. Timing out is not an error: the poller only
//! returns `false`, and callers that need a hard failure must inspect the state
//! their check observed.

use std::future::Future;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
pub struct ConfirmationPoller {
    interval: Duration,
    timeout: Duration,
}

impl ConfirmationPoller {
    pub fn new(timeout: Duration) -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Calls `check` once per interval, first one interval after the call,
    /// until it returns `true` or the timeout elapses.
    ///
    /// A check still in flight at the deadline is dropped. `check` must be
    /// safe to call repeatedly.
    pub async fn wait<F, Fut>(&self, mut check: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let period = self.interval.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut attempts = 0u32;
        let converged = tokio::time::timeout(self.timeout, async {
            loop {
                ticker.tick().await;
                attempts += 1;
                if check().await {
                    return;
                }
                debug!("Confirmation check {} not yet satisfied", attempts);
            }
        })
        .await
        .is_ok();

        if converged {
            debug!("Confirmed after {} checks", attempts);
        } else {
            info!(
                "Gave up waiting for confirmation after {:?} ({} checks)",
                self.timeout, attempts
            );
        }
        converged
    }
}
