//! Pacing for outbound API calls.

use std::time::Duration;

use tokio::time::Instant;

// ---

/// Enforces a minimum spacing between consecutive outbound calls.
///
/// [`RateLimiter::wait`] guarantees a lower bound on the gap between calls,
/// not exact timing. State is a single timestamp behind `&mut self`: the
/// limiter assumes one caller and is created fresh for every ingestion run.
pub struct RateLimiter {
    // ---
    min_interval: Duration,
    last_call: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: None,
        }
    }

    /// Sleep until at least `min_interval` has elapsed since the previous
    /// call to `wait` returned. The first call never blocks.
    pub async fn wait(&mut self) {
        // ---
        if let Some(last) = self.last_call {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        self.last_call = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_call_does_not_block() {
        // ---
        let mut limiter = RateLimiter::new(Duration::from_millis(500));
        let start = Instant::now();
        limiter.wait().await;
        assert_eq!(Instant::now() - start, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_calls_are_spaced() {
        // ---
        let mut limiter = RateLimiter::new(Duration::from_millis(500));
        let start = Instant::now();
        limiter.wait().await;
        limiter.wait().await;
        limiter.wait().await;

        // Three calls: the first is free, the next two each wait 500ms
        assert!(Instant::now() - start >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_time_counts_toward_the_interval() {
        // ---
        let mut limiter = RateLimiter::new(Duration::from_millis(500));
        limiter.wait().await;
        tokio::time::sleep(Duration::from_millis(400)).await;

        let before = Instant::now();
        limiter.wait().await;

        // Only the remaining 100ms should be slept
        assert_eq!(Instant::now() - before, Duration::from_millis(100));
    }
}
