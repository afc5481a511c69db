//! Polled cooldown timers
//!
//! Time is a caller-supplied millisecond clock, so the same inputs always
//! produce the same timer outcomes.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// A timer that reports finished once its duration has elapsed since the last reset.
///
/// A cooldown that was never reset counts as finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldown {
    /// Nominal duration
    base_ms: u64,
    /// Maximum deviation (+/-) rolled on each random reset
    variance_ms: u64,
    /// Duration of the current cycle
    duration_ms: u64,
    /// Clock value at the last reset
    started_at: Option<u64>,
}

impl Cooldown {
    /// Fixed-duration cooldown
    pub fn new(duration_ms: u64) -> Self {
        Self::variable(duration_ms, 0)
    }

    /// Cooldown whose duration is re-rolled within `base ± variance` on each reset
    pub fn variable(base_ms: u64, variance_ms: u64) -> Self {
        Self {
            base_ms,
            variance_ms,
            duration_ms: base_ms,
            started_at: None,
        }
    }

    /// Restart with the nominal duration
    pub fn reset(&mut self, now_ms: u64) {
        self.duration_ms = self.base_ms;
        self.started_at = Some(now_ms);
    }

    /// Restart with a freshly rolled duration
    pub fn reset_random<R: Rng + ?Sized>(&mut self, now_ms: u64, rng: &mut R) {
        self.duration_ms = if self.variance_ms == 0 {
            self.base_ms
        } else {
            let low = self.base_ms.saturating_sub(self.variance_ms);
            let high = self.base_ms + self.variance_ms;
            rng.random_range(low..=high)
        };
        self.started_at = Some(now_ms);
    }

    /// Reset at least once
    pub fn is_armed(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_finished(&self, now_ms: u64) -> bool {
        match self.started_at {
            None => true,
            Some(start) => now_ms.saturating_sub(start) > self.duration_ms,
        }
    }

    /// Milliseconds until finished (0 when finished)
    pub fn remaining(&self, now_ms: u64) -> u64 {
        match self.started_at {
            None => 0,
            Some(start) => (start + self.duration_ms).saturating_sub(now_ms),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}
