//! Adaptive poll interval.

use std::time::Duration;

use crate::remote::BACKOFF_MULTIPLIER;

/// Poll interval that grows on rate limiting and shrinks on clean fetches.
///
/// `current()` always lies within `[min, max]`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BackoffState {
    current: Duration,
    min: Duration,
    max: Duration,
}

impl BackoffState {
    /// Starts at `min`. A `min` above `max` is clamped down to `max`.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        let floor = min.min(max);
        Self {
            current: floor,
            min: floor,
            max,
        }
    }

    /// Interval to sleep before the next fetch.
    #[must_use]
    pub const fn current(&self) -> Duration {
        self.current
    }

    /// Lower bound.
    #[must_use]
    pub const fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound.
    #[must_use]
    pub const fn max(&self) -> Duration {
        self.max
    }

    /// Returns `true` while the interval sits above its floor.
    #[must_use]
    pub fn is_backed_off(&self) -> bool {
        self.current > self.min
    }

    /// Multiplies the interval, capped at `max`. Returns the new interval.
    pub fn on_rate_limited(&mut self) -> Duration {
        self.current = self
            .current
            .saturating_mul(BACKOFF_MULTIPLIER)
            .min(self.max);
        self.current
    }

    /// Divides the interval back down, floored at `min`. Returns `Some`
    /// with the new interval when it changed.
    pub fn on_success(&mut self) -> Option<Duration> {
        if !self.is_backed_off() {
            return None;
        }
        self.current = self
            .current
            .checked_div(BACKOFF_MULTIPLIER)
            .unwrap_or(self.min)
            .max(self.min);
        Some(self.current)
    }
}
