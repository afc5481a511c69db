//! Consecutive-hit streaks
//!
//! The streak resets when the player is hit, when a shot misses, or when no
//! hit lands for `COMBO_IDLE_MS`. The idle window is polled against the tick
//! clock each frame instead of running on a timer thread.

use serde::{Deserialize, Serialize};

use crate::consts::{COMBO_IDLE_MS, COMBO_STEP};

/// Score for a hit worth `value` while the streak is `streak`.
///
/// Every `COMBO_STEP` consecutive hits multiply the payout by one more.
pub fn combo_score(value: u64, streak: u32) -> u64 {
    if streak < COMBO_STEP {
        value
    } else {
        value * (streak / COMBO_STEP + 1) as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboTracker {
    streak: u32,
    max_streak: u32,
    /// Clock value of the last hit while a reset is pending
    last_hit_ms: Option<u64>,
    idle_ms: u64,
}

impl Default for ComboTracker {
    fn default() -> Self {
        Self::new(COMBO_IDLE_MS)
    }
}

impl ComboTracker {
    pub fn new(idle_ms: u64) -> Self {
        Self {
            streak: 0,
            max_streak: 0,
            last_hit_ms: None,
            idle_ms,
        }
    }

    pub fn streak(&self) -> u32 {
        self.streak
    }

    /// Longest streak this session
    pub fn max_streak(&self) -> u32 {
        self.max_streak
    }

    /// Count a hit and re-arm the idle reset. Returns the new streak.
    pub fn register_hit(&mut self, now_ms: u64) -> u32 {
        self.streak += 1;
        self.max_streak = self.max_streak.max(self.streak);
        self.last_hit_ms = Some(now_ms);
        self.streak
    }

    /// Drop the streak and cancel any pending idle reset
    pub fn reset(&mut self) {
        self.streak = 0;
        self.last_hit_ms = None;
    }

    /// Apply the idle reset if its window has elapsed. Returns true if it fired.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.last_hit_ms {
            Some(last) if now_ms.saturating_sub(last) >= self.idle_ms => {
                log::debug!("Combo of {} expired after {} ms idle", self.streak, self.idle_ms);
                self.reset();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_combo_score_tiers() {
        assert_eq!(combo_score(10, 0), 10);
        assert_eq!(combo_score(10, 4), 10);
        assert_eq!(combo_score(10, 5), 20);
        assert_eq!(combo_score(10, 9), 20);
        assert_eq!(combo_score(10, 10), 30);
        assert_eq!(combo_score(0, 25), 0);
    }

    #[test]
    fn test_streak_and_max() {
        let mut combo = ComboTracker::default();
        for t in 0..4 {
            combo.register_hit(t * 100);
        }
        assert_eq!(combo.streak(), 4);
        combo.reset();
        combo.register_hit(1000);
        assert_eq!(combo.streak(), 1);
        assert_eq!(combo.max_streak(), 4);
    }

    #[test]
    fn test_idle_reset_after_window() {
        let mut combo = ComboTracker::default();
        combo.register_hit(1000);
        combo.register_hit(2000);
        assert!(!combo.poll(2000 + COMBO_IDLE_MS - 1));
        assert_eq!(combo.streak(), 2);
        assert!(combo.poll(2000 + COMBO_IDLE_MS));
        assert_eq!(combo.streak(), 0);
        assert!(!combo.poll(10_000));
    }

    #[test]
    fn test_hit_rearms_idle_window() {
        let mut combo = ComboTracker::default();
        combo.register_hit(0);
        combo.poll(2500);
        combo.register_hit(2500);
        assert!(!combo.poll(4000));
        assert_eq!(combo.streak(), 2);
    }

    proptest! {
        #[test]
        fn test_combo_score_multiplier(value in 0u64..10_000, streak in 0u32..500) {
            let score = combo_score(value, streak);
            if streak < COMBO_STEP {
                prop_assert_eq!(score, value);
            } else {
                prop_assert_eq!(score, value * (streak / COMBO_STEP + 1) as u64);
            }
            prop_assert!(score >= value);
        }
    }
}
