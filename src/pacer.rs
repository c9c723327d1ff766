use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Keeps outbound requests apart by a jittered, human-looking interval.
///
/// After every request the earliest time of the next one is pushed forward
/// by a delay drawn uniformly from a small set, so the cadence is irregular.
pub struct Pacer {
    next_allowed: Instant,
    delays: Vec<Duration>,
    rng: Box<dyn RngCore + Send>,
}

impl Pacer {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self::with_rng(delays, StdRng::from_entropy())
    }

    pub fn with_rng(delays: Vec<Duration>, rng: impl RngCore + Send + 'static) -> Self {
        Pacer {
            next_allowed: Instant::now(),
            delays,
            rng: Box::new(rng),
        }
    }

    /// Earliest instant at which the next request may start.
    pub fn next_allowed(&self) -> Instant {
        self.next_allowed
    }

    /// Suspend the calling task until the next request is allowed.
    pub async fn wait_if_needed(&mut self) {
        let now = Instant::now();
        if now < self.next_allowed {
            debug!("Pacing: waiting {:?} before the next request", self.next_allowed - now);
            sleep_until(self.next_allowed).await;
        }
    }

    /// Record a request made at `now` and return the delay imposed on the next one.
    pub fn record_request(&mut self, now: Instant) -> Duration {
        let delay = self
            .delays
            .choose(&mut *self.rng)
            .copied()
            .unwrap_or_default();
        self.next_allowed = now + delay;
        delay
    }
}
