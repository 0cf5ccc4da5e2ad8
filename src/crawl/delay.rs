//! Randomized delay between crawl requests.

use std::time::Duration;

use rand::Rng;
use tracing::debug;

/// Fixed base delay plus uniform random jitter.
#[derive(Debug, Clone, Copy)]
pub struct CrawlDelay {
    base: Duration,
    jitter: Duration,
}

impl CrawlDelay {
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self { base, jitter }
    }

    pub fn from_millis(base_ms: u64, jitter_ms: u64) -> Self {
        Self::new(
            Duration::from_millis(base_ms),
            Duration::from_millis(jitter_ms),
        )
    }

    /// No waiting at all.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Sample the next delay in `[base, base + jitter]`.
    pub fn sample(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.base;
        }
        self.base + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }

    /// Sleep for one sampled delay.
    pub async fn wait(&self) {
        let delay = self.sample();
        if delay.is_zero() {
            return;
        }
        debug!("Waiting {:?} before next request", delay);
        tokio::time::sleep(delay).await;
    }
}

impl Default for CrawlDelay {
    fn default() -> Self {
        Self::from_millis(8000, 3000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_stays_in_range() {
        let delay = CrawlDelay::from_millis(100, 50);
        for _ in 0..200 {
            let d = delay.sample();
            assert!(d >= Duration::from_millis(100));
            assert!(d <= Duration::from_millis(150));
        }
    }

    #[test]
    fn test_no_jitter_is_exact() {
        assert_eq!(
            CrawlDelay::from_millis(250, 0).sample(),
            Duration::from_millis(250)
        );
        assert_eq!(CrawlDelay::none().sample(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_zero_delay_returns_immediately() {
        let start = std::time::Instant::now();
        CrawlDelay::none().wait().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
