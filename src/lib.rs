//! Invaders Core - simulation core of a formation shooter
//!
//! Core modules:
//! - `sim`: Deterministic simulation (formation, collisions, scoring, combos)
//! - `settings`: Difficulty, per-level formation settings and playfield
//! - `error`: Configuration errors

pub mod error;
pub mod settings;
pub mod sim;

pub use error::ConfigError;
pub use settings::{Difficulty, FormationSettings, Playfield, Settings};

/// Game tuning constants
pub mod consts {
    /// Fixed simulation timestep in milliseconds (60 Hz)
    pub const SIM_DT_MS: u64 = 16;

    /// Formation layout
    pub const INIT_POS_X: i32 = 20;
    pub const INIT_POS_Y: i32 = 100;
    pub const SEPARATION_DISTANCE: i32 = 40;

    /// Tier bands by relative row position, in percent (top rows first)
    pub const PROPORTION_E: usize = 10;
    pub const PROPORTION_D: usize = 10;
    pub const PROPORTION_C: usize = 10;
    pub const PROPORTION_B: usize = 20;

    /// Formation movement
    pub const X_SPEED: i32 = 8;
    pub const Y_SPEED: i32 = 4;
    pub const DESCENT_DISTANCE: i32 = 20;
    pub const SIDE_MARGIN: i32 = 20;
    pub const BOTTOM_MARGIN: i32 = 80;
    /// Added to the speed curve; a formation never moves more often than this
    pub const MINIMUM_SPEED: i32 = 10;

    /// Formation shooting
    pub const ENEMY_BULLET_SPEED: i32 = 4;
    /// Variance of the shooting interval as a fraction of it
    pub const SHOOTING_VARIANCE: f32 = 0.2;

    /// Enemy unit
    pub const UNIT_WIDTH: i32 = 24;
    pub const UNIT_HEIGHT: i32 = 16;
    pub const ANIMATION_INTERVAL_MS: u64 = 500;

    /// Bonus ship
    pub const SPECIAL_WIDTH: i32 = 32;
    pub const SPECIAL_HEIGHT: i32 = 14;
    pub const SPECIAL_START_X: i32 = -32;
    pub const SPECIAL_START_Y: i32 = 60;
    pub const SPECIAL_SPEED: i32 = 2;
    pub const SPECIAL_POINTS: i32 = 100;
    pub const SPECIAL_INTERVAL_MS: u64 = 20_000;
    pub const SPECIAL_VARIANCE_MS: u64 = 10_000;
    pub const EXPLOSION_LINGER_MS: u64 = 500;

    /// Scenery
    pub const BLOCK_WIDTH: i32 = 40;
    pub const BLOCK_HEIGHT: i32 = 14;
    pub const BARRIER_WIDTH: i32 = 40;
    pub const BARRIER_HEIGHT: i32 = 18;
    pub const BARRIER_HEALTH: i32 = 3;
    pub const ITEM_BOX_SIZE: i32 = 14;
    /// Item boxes cannot be collected right after dropping
    pub const ITEM_BOX_ARMING_MS: u64 = 500;

    /// Bullets
    pub const BULLET_WIDTH: i32 = 6;
    pub const BULLET_HEIGHT: i32 = 10;

    /// Player ship
    pub const SHIP_WIDTH: i32 = 26;
    pub const SHIP_HEIGHT: i32 = 16;
    pub const SHIP_SPEED: i32 = 2;
    pub const SHIP_BULLET_SPEED: i32 = -6;
    pub const SHIP_RELOAD_MS: u64 = 750;
    pub const SHIP_RESPAWN_MS: u64 = 1000;
    /// Distance of the ship from the bottom of the playfield
    pub const SHIP_BOTTOM_OFFSET: i32 = 70;
    pub const STARTING_LIVES: u32 = 3;

    /// HUD separation line; bullets above it leave the playfield
    pub const SEPARATION_LINE_HEIGHT: i32 = 40;

    /// Scoring
    pub const COMBO_IDLE_MS: u64 = 3000;
    /// Hits per combo tier
    pub const COMBO_STEP: u32 = 5;
    pub const LIFE_SCORE: u64 = 100;
    pub const LEVEL_END_DELAY_MS: u64 = 1500;
}

/// Level-tier divisor shared by health, volley size and the life penalty
#[inline]
pub fn level_tier(level: u32) -> u32 {
    level / 3
}
