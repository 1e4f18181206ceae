//! Minimum spacing between remote calls, shared by every client in the process.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::time::Duration;

type SpacingLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// No two calls closer than `interval`: a direct limiter with one cell
/// replenished per period.
pub struct CallSpacing {
    interval: Duration,
    limiter: Option<SpacingLimiter>,
}

impl CallSpacing {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            limiter: Quota::with_period(interval).map(RateLimiter::direct),
        }
    }

    /// Waits for this caller's slot.
    pub async fn wait(&self) {
        let Some(limiter) = &self.limiter else {
            return;
        };
        if limiter.check().is_err() {
            tracing::debug!("Rate limiting: waiting for the next {:?} slot", self.interval);
            limiter.until_ready().await;
        }
    }
}

impl std::fmt::Debug for CallSpacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSpacing")
            .field("interval", &self.interval)
            .finish()
    }
}
