//! Randomized exponential backoff between tier attempts

use rand::Rng;
use std::time::Duration;

/// Computes how long to wait before the next attempt
///
/// Implementations must never return a zero delay.
pub trait BackoffPolicy: Send + Sync {
    /// Delay to sleep after the 0-based `attempt` failed
    fn delay(&self, attempt: u32) -> Duration;
}

/// `base * 2^attempt + uniform(0, jitter_ceiling)`
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    base: Duration,
    jitter_ceiling: Duration,
}

impl ExponentialBackoff {
    pub const DEFAULT_BASE: Duration = Duration::from_millis(300);
    pub const DEFAULT_JITTER: Duration = Duration::from_millis(500);

    /// A zero `base` is raised to one millisecond.
    pub fn new(base: Duration, jitter_ceiling: Duration) -> Self {
        Self {
            base: base.max(Duration::from_millis(1)),
            jitter_ceiling,
        }
    }

    /// The deterministic part of the delay for `attempt`
    pub fn floor(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE, Self::DEFAULT_JITTER)
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let ceiling = self.jitter_ceiling.as_millis() as u64;
        let jitter = if ceiling == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=ceiling)
        };
        self.floor(attempt).saturating_add(Duration::from_millis(jitter))
    }
}

/// Constant delay, for callers that want predictable pacing
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff(pub Duration);

impl BackoffPolicy for FixedBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        self.0.max(Duration::from_millis(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_within_bounds() {
        let backoff = ExponentialBackoff::default();
        for attempt in 0..6 {
            let low = Duration::from_millis(300 * 2u64.pow(attempt));
            let high = low + Duration::from_millis(500);
            for _ in 0..50 {
                let delay = backoff.delay(attempt);
                assert!(delay >= low, "attempt {attempt}: {delay:?} < {low:?}");
                assert!(delay <= high, "attempt {attempt}: {delay:?} > {high:?}");
            }
        }
    }

    #[test]
    fn test_floor_doubles() {
        let backoff = ExponentialBackoff::default();
        assert_eq!(backoff.floor(0), Duration::from_millis(300));
        assert_eq!(backoff.floor(1), Duration::from_millis(600));
        assert_eq!(backoff.floor(2), Duration::from_millis(1200));
    }

    #[test]
    fn test_never_zero() {
        let backoff = ExponentialBackoff::new(Duration::ZERO, Duration::ZERO);
        assert!(backoff.delay(0) > Duration::ZERO);
        assert!(FixedBackoff(Duration::ZERO).delay(3) > Duration::ZERO);
    }

    #[test]
    fn test_large_attempt_saturates() {
        let backoff = ExponentialBackoff::default();
        // Must not panic on overflow
        let delay = backoff.delay(200);
        assert!(delay >= backoff.floor(31));
    }
}
