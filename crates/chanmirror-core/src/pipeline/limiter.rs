use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{pipeline::retry::sleep_or_cancel, Error, Result};

/// Token bucket with a burst of one: a single permit is refilled every
/// `interval`. Only outbound sends go through it.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next: Instant,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// `per_minute` sends per minute, evenly spaced (20/min -> one every 3s).
    pub fn per_minute(per_minute: u32) -> Self {
        Self::new(Duration::from_secs(60) / per_minute.max(1))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reserve the next slot and return the wait required before using it.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }

    /// Wait until a permit is available. Fails with `Error::Cancelled` instead
    /// of granting once the run is cancelled.
    pub async fn acquire(&mut self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let wait = self.reserve();
        if !wait.is_zero() {
            sleep_or_cancel(cancel, wait).await?;
        }
        Ok(())
    }
}
