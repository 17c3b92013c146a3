//! Politeness pacing.
//!
//! Every delay between requests goes through a [`Throttle`]: a gate that
//! guarantees a minimum interval between consecutive passes. The first pass
//! is immediate, so a throttle placed before each request behaves like a
//! fixed sleep between requests without a trailing sleep after the last one.
//! A zero interval turns the gate into a no-op.

use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::trace;

#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// A throttle that never waits.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Wait until at least `interval` has passed since the previous call.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                let remaining = self.interval - elapsed;
                trace!(?remaining, "Throttling");
                sleep(remaining).await;
            }
        }
        self.last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_pass_is_immediate() {
        let mut throttle = Throttle::new(Duration::from_secs(2));
        let start = Instant::now();
        throttle.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_passes_are_spaced() {
        let mut throttle = Throttle::new(Duration::from_secs(2));
        let start = Instant::now();
        throttle.wait().await;
        throttle.wait().await;
        throttle.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_work_counts_toward_interval() {
        let mut throttle = Throttle::new(Duration::from_secs(2));
        throttle.wait().await;
        sleep(Duration::from_secs(3)).await;
        let before = Instant::now();
        throttle.wait().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_never_waits() {
        let mut throttle = Throttle::disabled();
        let start = Instant::now();
        for _ in 0..10 {
            throttle.wait().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
