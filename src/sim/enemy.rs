//! Formation members
//!
//! A unit survives `max(1, level / 3)` hits, is worth a tier-based point value,
//! and flips between two animation frames on a fixed cadence.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::cooldown::Cooldown;
use super::state::{Entity, SpriteTag};
use crate::consts::*;
use crate::level_tier;

/// Unit type class, assigned by row band. `E` is the top, most valuable band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    A,
    B,
    C,
    D,
    E,
}

impl Tier {
    /// Tier for `row` of `rows` (row 0 is the top).
    ///
    /// Bands are proportional: top 10% E, next 10% D, next 10% C, next 20% B,
    /// remainder A. Any input maps to some tier.
    pub fn for_row(row: usize, rows: usize) -> Self {
        if rows == 0 {
            return Tier::A;
        }
        // Compare row / rows against percent bands without rounding
        let scaled = row.min(rows - 1) * 100;
        if scaled < rows * PROPORTION_E {
            Tier::E
        } else if scaled < rows * (PROPORTION_E + PROPORTION_D) {
            Tier::D
        } else if scaled < rows * (PROPORTION_E + PROPORTION_D + PROPORTION_C) {
            Tier::C
        } else if scaled < rows * (PROPORTION_E + PROPORTION_D + PROPORTION_C + PROPORTION_B) {
            Tier::B
        } else {
            Tier::A
        }
    }

    pub fn base_points(&self) -> i32 {
        match self {
            Tier::A => 10,
            Tier::B => 20,
            Tier::C => 30,
            Tier::D => 40,
            Tier::E => 50,
        }
    }
}

/// Two-frame animation phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimFrame {
    First,
    Second,
}

impl AnimFrame {
    pub fn toggled(self) -> Self {
        match self {
            AnimFrame::First => AnimFrame::Second,
            AnimFrame::Second => AnimFrame::First,
        }
    }
}

/// Starting health for units spawned on `level`
pub fn initial_health(level: u32) -> i32 {
    level_tier(level).max(1) as i32
}

/// Point value: tier base + level bonus + external difficulty modifier
pub fn point_value(tier: Tier, level: u32, difficulty_modifier: i32) -> i32 {
    tier.base_points() + (level / 10) as i32 + difficulty_modifier
}

/// A single formation member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemyUnit {
    pub pos: IVec2,
    tier: Tier,
    health: i32,
    point_value: i32,
    destroyed: bool,
    frame: AnimFrame,
    animation: Cooldown,
}

impl EnemyUnit {
    pub fn new(x: i32, y: i32, tier: Tier, level: u32, difficulty_modifier: i32) -> Self {
        Self {
            pos: IVec2::new(x, y),
            tier,
            health: initial_health(level),
            point_value: point_value(tier, level, difficulty_modifier),
            destroyed: false,
            frame: AnimFrame::First,
            animation: Cooldown::new(ANIMATION_INTERVAL_MS),
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn point_value(&self) -> i32 {
        self.point_value
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn frame(&self) -> AnimFrame {
        self.frame
    }

    /// Take one hit. Returns true if this hit destroyed the unit.
    ///
    /// Hitting a destroyed unit does nothing.
    pub fn hit(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        self.health -= 1;
        if self.health <= 0 {
            self.health = 0;
            self.destroyed = true;
        }
        self.destroyed
    }

    /// Destroy outright, regardless of health. Returns false if already destroyed.
    pub fn destroy(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        self.health = 0;
        self.destroyed = true;
        true
    }

    pub fn move_by(&mut self, dx: i32, dy: i32) {
        self.pos += IVec2::new(dx, dy);
    }

    /// Flip the animation frame when the animation cooldown has elapsed
    pub fn animate(&mut self, now_ms: u64) {
        if self.animation.is_finished(now_ms) {
            self.animation.reset(now_ms);
            self.frame = self.frame.toggled();
        }
    }
}

impl Entity for EnemyUnit {
    fn pos(&self) -> IVec2 {
        self.pos
    }
    fn size(&self) -> IVec2 {
        IVec2::new(UNIT_WIDTH, UNIT_HEIGHT)
    }
    fn sprite(&self) -> SpriteTag {
        if self.destroyed {
            SpriteTag::Explosion
        } else {
            SpriteTag::Unit {
                tier: self.tier,
                frame: self.frame,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_scales_with_level() {
        assert_eq!(initial_health(1), 1);
        assert_eq!(initial_health(5), 1);
        assert_eq!(initial_health(6), 2);
        assert_eq!(initial_health(10), 3);
    }

    #[test]
    fn test_point_value() {
        assert_eq!(point_value(Tier::A, 3, 0), 10);
        assert_eq!(point_value(Tier::E, 12, 2), 53);
    }

    #[test]
    fn test_tier_bands_for_ten_rows() {
        let tiers: Vec<Tier> = (0..10).map(|r| Tier::for_row(r, 10)).collect();
        assert_eq!(
            tiers,
            vec![
                Tier::E,
                Tier::D,
                Tier::C,
                Tier::B,
                Tier::B,
                Tier::A,
                Tier::A,
                Tier::A,
                Tier::A,
                Tier::A
            ]
        );
    }

    #[test]
    fn test_tier_out_of_range_is_clamped() {
        assert_eq!(Tier::for_row(0, 0), Tier::A);
        assert_eq!(Tier::for_row(99, 3), Tier::for_row(2, 3));
        assert_eq!(Tier::for_row(0, 1), Tier::E);
    }

    #[test]
    fn test_destroyed_after_exactly_health_hits() {
        for level in [1, 6, 9, 15] {
            let mut unit = EnemyUnit::new(0, 0, Tier::A, level, 0);
            let health = unit.health();
            for _ in 0..health - 1 {
                assert!(!unit.hit());
                assert!(!unit.is_destroyed());
            }
            assert!(unit.hit());
            assert!(unit.is_destroyed());
            assert_eq!(unit.sprite(), SpriteTag::Explosion);
        }
    }

    #[test]
    fn test_hit_on_destroyed_is_noop() {
        let mut unit = EnemyUnit::new(0, 0, Tier::A, 1, 0);
        assert!(unit.hit());
        assert!(!unit.hit());
        assert!(!unit.destroy());
        assert_eq!(unit.health(), 0);
    }

    #[test]
    fn test_animation_toggles_on_cooldown() {
        let mut unit = EnemyUnit::new(0, 0, Tier::B, 1, 0);
        assert_eq!(unit.frame(), AnimFrame::First);
        unit.animate(0);
        assert_eq!(unit.frame(), AnimFrame::Second);
        unit.animate(100);
        assert_eq!(unit.frame(), AnimFrame::Second);
        unit.animate(ANIMATION_INTERVAL_MS + 1);
        assert_eq!(unit.frame(), AnimFrame::First);
    }
}
