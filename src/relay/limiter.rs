//! Process-wide admission control for upstream calls
//!
//! Every upstream call, whatever its tier, runs inside [`RateLimiter::schedule`].
//! The limiter enforces three rules at once:
//!
//! - at most one call in flight
//! - call starts spaced at least `min_spacing` apart
//! - at most `capacity` admissions per `refill_interval`, with the reservoir
//!   reset to full at each interval boundary
//!
//! Callers that find the reservoir empty wait for the next boundary instead of
//! failing. Waiters are admitted in arrival order (the gate is a fair
//! `tokio::sync::Mutex`).

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterSettings {
    pub capacity: u32,
    pub refill_interval: Duration,
    pub min_spacing: Duration,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            capacity: 30,
            refill_interval: Duration::from_secs(60),
            min_spacing: Duration::from_millis(500),
        }
    }
}

/// Point-in-time view of the limiter counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterSnapshot {
    pub available_tokens: u32,
    pub in_flight: u32,
    pub admitted: u64,
}

#[derive(Debug)]
struct LimiterState {
    available_tokens: u32,
    last_refill: Instant,
    last_call_at: Option<Instant>,
    admitted: u64,
}

impl LimiterState {
    /// Reset the reservoir if one or more interval boundaries have passed.
    fn refill(&mut self, now: Instant, settings: &LimiterSettings) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed < settings.refill_interval {
            return;
        }
        let boundaries = (elapsed.as_nanos() / settings.refill_interval.as_nanos()) as u32;
        self.last_refill += settings.refill_interval * boundaries;
        self.available_tokens = settings.capacity;
    }

    fn next_refill(&self, settings: &LimiterSettings) -> Instant {
        self.last_refill + settings.refill_interval
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    settings: LimiterSettings,
    gate: Mutex<()>,
    state: Mutex<LimiterState>,
    in_flight: AtomicU32,
}

/// Decrements the in-flight counter even when the admitted call is dropped
/// mid-way.
struct InFlight<'a>(&'a AtomicU32);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicU32) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RateLimiter {
    /// A zero capacity or zero interval is raised to one.
    pub fn new(settings: LimiterSettings) -> Self {
        let settings = LimiterSettings {
            capacity: settings.capacity.max(1),
            refill_interval: settings.refill_interval.max(Duration::from_millis(1)),
            min_spacing: settings.min_spacing,
        };
        Self {
            gate: Mutex::new(()),
            state: Mutex::new(LimiterState {
                available_tokens: settings.capacity,
                last_refill: Instant::now(),
                last_call_at: None,
                admitted: 0,
            }),
            in_flight: AtomicU32::new(0),
            settings,
        }
    }

    pub fn settings(&self) -> &LimiterSettings {
        &self.settings
    }

    /// Run `call` once admitted. The gate stays held for the whole call, which
    /// is what keeps `in_flight` at one or zero. The counters sit behind their
    /// own lock, taken only briefly, so [`Self::snapshot`] never waits on a call.
    pub async fn schedule<F, Fut, T>(&self, call: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _gate = self.gate.lock().await;

        loop {
            let wait_until = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                state.refill(now, &self.settings);
                if state.available_tokens == 0 {
                    let wake = state.next_refill(&self.settings);
                    debug!(
                        "Reservoir empty, waiting {:?} for refill",
                        wake.saturating_duration_since(now)
                    );
                    Some(wake)
                } else if let Some(earliest) = state
                    .last_call_at
                    .map(|last| last + self.settings.min_spacing)
                    .filter(|earliest| now < *earliest)
                {
                    Some(earliest)
                } else {
                    state.available_tokens -= 1;
                    state.last_call_at = Some(now);
                    state.admitted += 1;
                    None
                }
            };
            match wait_until {
                Some(deadline) => sleep_until(deadline).await,
                None => break,
            }
        }

        let _in_flight = InFlight::enter(&self.in_flight);
        call().await
    }

    /// Current counters, including a call that is running right now.
    pub async fn snapshot(&self) -> LimiterSnapshot {
        let mut state = self.state.lock().await;
        state.refill(Instant::now(), &self.settings);
        LimiterSnapshot {
            available_tokens: state.available_tokens,
            in_flight: self.in_flight.load(Ordering::SeqCst),
            admitted: state.admitted,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(LimiterSettings::default())
    }
}
