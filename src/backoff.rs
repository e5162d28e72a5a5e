//! Reconnect backoff.
//!
//! [`Backoff`] tracks consecutive failed connection attempts and turns that
//! count into a delay: `base × 2^failures`, capped at `max`. A successful
//! connection resets the failure count, so the next outage starts again at
//! `base`. Only the failure count drives the delay; wall-clock time spent
//! connected has no effect.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use parking_signal::Backoff;
//!
//! let mut backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(60));
//!
//! assert_eq!(backoff.on_failure(), Duration::from_secs(5));
//! assert_eq!(backoff.on_failure(), Duration::from_secs(10));
//! assert_eq!(backoff.on_failure(), Duration::from_secs(20));
//!
//! backoff.on_success();
//! assert_eq!(backoff.on_failure(), Duration::from_secs(5));
//! ```

use std::time::Duration;

/// Exponential backoff with a doubling factor and an upper cap.
#[derive(Clone, Debug)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    failures: u32,
}

impl Backoff {
    /// Create a backoff starting at `base` and never exceeding `max`.
    ///
    /// If `base > max`, every delay is `max`.
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: 0,
        }
    }

    /// Delay that applies after `failures` consecutive failures have already
    /// been recorded: `min(base × 2^failures, max)`.
    pub fn delay_for(&self, failures: u32) -> Duration {
        // 2^32 overflows u32; anything past 31 doublings is capped anyway.
        let factor = 1u32.checked_shl(failures).unwrap_or(u32::MAX);
        self.base
            .checked_mul(factor)
            .map_or(self.max, |d| d.min(self.max))
    }

    /// Delay to wait before the next attempt, given the failures so far.
    pub fn current_delay(&self) -> Duration {
        self.delay_for(self.failures)
    }

    /// Record a failed attempt and return how long to wait before the next one.
    ///
    /// The first failure after a success yields `base`.
    pub fn on_failure(&mut self) -> Duration {
        let delay = self.current_delay();
        self.failures = self.failures.saturating_add(1);
        delay
    }

    /// Record a successful connection; the next failure starts over at `base`.
    pub fn on_success(&mut self) {
        self.failures = 0;
    }

    /// Consecutive failures since the last success.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Configured initial delay.
    pub fn base(&self) -> Duration {
        self.base
    }

    /// Configured delay cap.
    pub fn max(&self) -> Duration {
        self.max
    }
}
