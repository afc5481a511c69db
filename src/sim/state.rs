//! Game entities and scoring state
//!
//! Everything the collision resolver tests against, plus the counters it updates.

use glam::IVec2;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::cooldown::Cooldown;
use super::enemy::{AnimFrame, Tier};
use crate::consts::*;

/// Sprite/animation tag handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpriteTag {
    Unit { tier: Tier, frame: AnimFrame },
    Explosion,
    Special,
    Ship,
    ShipDestroyed,
    Bullet,
    Block,
    Barrier,
    ItemBox,
}

/// Anything with an axis-aligned box on the playfield
pub trait Entity {
    /// Top-left corner
    fn pos(&self) -> IVec2;
    fn size(&self) -> IVec2;
    fn sprite(&self) -> SpriteTag;

    fn center(&self) -> IVec2 {
        self.pos() + self.size() / 2
    }
}

/// Who fired a bullet, derived from the sign of its speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulletOwner {
    /// Positive speed, moving down
    Enemy,
    /// Negative speed, moving up
    Player,
}

/// A projectile. Pooled; see [`super::bullet_pool::BulletPool`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bullet {
    pub pos: IVec2,
    /// Vertical pixels per tick
    pub speed: i32,
}

impl Bullet {
    pub fn new(x: i32, y: i32, speed: i32) -> Self {
        Self {
            pos: IVec2::new(x, y),
            speed,
        }
    }

    /// Overwrite all state for reuse
    pub fn reset(&mut self, x: i32, y: i32, speed: i32) {
        self.pos = IVec2::new(x, y);
        self.speed = speed;
    }

    pub fn owner(&self) -> BulletOwner {
        if self.speed > 0 {
            BulletOwner::Enemy
        } else {
            BulletOwner::Player
        }
    }

    /// Advance one tick
    pub fn update(&mut self) {
        self.pos.y += self.speed;
    }
}

impl Entity for Bullet {
    fn pos(&self) -> IVec2 {
        self.pos
    }
    fn size(&self) -> IVec2 {
        IVec2::new(BULLET_WIDTH, BULLET_HEIGHT)
    }
    fn sprite(&self) -> SpriteTag {
        SpriteTag::Bullet
    }
}

/// The player's ship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerShip {
    pub pos: IVec2,
    /// Ghost mode: enemy bullets pass through
    pub invulnerable: bool,
    destroyed: bool,
    reload: Cooldown,
    destruction: Cooldown,
}

impl PlayerShip {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            pos: IVec2::new(x, y),
            invulnerable: false,
            destroyed: false,
            reload: Cooldown::new(SHIP_RELOAD_MS),
            destruction: Cooldown::new(SHIP_RESPAWN_MS),
        }
    }

    /// Ship centred horizontally near the bottom of a playfield
    pub fn spawn_in(width: i32, height: i32) -> Self {
        Self::new(width / 2, height - SHIP_BOTTOM_OFFSET)
    }

    /// Exploded and waiting to respawn
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn destroy(&mut self, now_ms: u64) {
        self.destroyed = true;
        self.destruction.reset(now_ms);
    }

    /// Respawn once the destruction delay has passed
    pub fn update(&mut self, now_ms: u64) {
        if self.destroyed && self.destruction.is_finished(now_ms) {
            self.destroyed = false;
        }
    }

    /// Move horizontally by `direction * SHIP_SPEED`, staying inside the playfield
    pub fn move_by(&mut self, direction: i32, playfield_width: i32) {
        let step = direction.signum() * SHIP_SPEED;
        let max_x = (playfield_width - SHIP_WIDTH - 1).max(1);
        self.pos.x = (self.pos.x + step).clamp(1, max_x);
    }

    /// Remaining reload time, for the HUD
    pub fn remaining_reload(&self, now_ms: u64) -> u64 {
        self.reload.remaining(now_ms)
    }

    /// Fire from the nose if reloaded; yields the bullet's `(x, y, speed)`
    pub fn try_shoot(&mut self, now_ms: u64) -> Option<(i32, i32, i32)> {
        if self.destroyed || !self.reload.is_finished(now_ms) {
            return None;
        }
        self.reload.reset(now_ms);
        Some((
            self.pos.x + SHIP_WIDTH / 2 - BULLET_WIDTH / 2,
            self.pos.y,
            SHIP_BULLET_SPEED,
        ))
    }
}

impl Entity for PlayerShip {
    fn pos(&self) -> IVec2 {
        self.pos
    }
    fn size(&self) -> IVec2 {
        IVec2::new(SHIP_WIDTH, SHIP_HEIGHT)
    }
    fn sprite(&self) -> SpriteTag {
        if self.destroyed {
            SpriteTag::ShipDestroyed
        } else {
            SpriteTag::Ship
        }
    }
}

/// Bonus ship crossing the top of the screen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialShip {
    pub pos: IVec2,
    destroyed: bool,
    explosion: Cooldown,
}

impl Default for SpecialShip {
    fn default() -> Self {
        Self {
            pos: IVec2::new(SPECIAL_START_X, SPECIAL_START_Y),
            destroyed: false,
            explosion: Cooldown::new(EXPLOSION_LINGER_MS),
        }
    }
}

impl SpecialShip {
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn point_value(&self) -> i32 {
        SPECIAL_POINTS
    }

    pub fn destroy(&mut self, now_ms: u64) {
        self.destroyed = true;
        self.explosion.reset(now_ms);
    }

    /// Explosion has lingered long enough to be removed
    pub fn explosion_done(&self, now_ms: u64) -> bool {
        self.destroyed && self.explosion.is_finished(now_ms)
    }

    pub fn advance(&mut self) {
        if !self.destroyed {
            self.pos.x += SPECIAL_SPEED;
        }
    }
}

impl Entity for SpecialShip {
    fn pos(&self) -> IVec2 {
        self.pos
    }
    fn size(&self) -> IVec2 {
        IVec2::new(SPECIAL_WIDTH, SPECIAL_HEIGHT)
    }
    fn sprite(&self) -> SpriteTag {
        if self.destroyed {
            SpriteTag::Explosion
        } else {
            SpriteTag::Special
        }
    }
}

/// Destructible scenery: stops bullets, is crushed by the advancing formation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub pos: IVec2,
}

impl Entity for Block {
    fn pos(&self) -> IVec2 {
        self.pos
    }
    fn size(&self) -> IVec2 {
        IVec2::new(BLOCK_WIDTH, BLOCK_HEIGHT)
    }
    fn sprite(&self) -> SpriteTag {
        SpriteTag::Block
    }
}

/// Defensive shield in front of the player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Barrier {
    pub pos: IVec2,
    pub health: i32,
}

impl Barrier {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            pos: IVec2::new(x, y),
            health: BARRIER_HEALTH,
        }
    }

    pub fn reduce_health(&mut self) {
        self.health = (self.health - 1).max(0);
    }

    pub fn is_destroyed(&self) -> bool {
        self.health <= 0
    }
}

impl Entity for Barrier {
    fn pos(&self) -> IVec2 {
        self.pos
    }
    fn size(&self) -> IVec2 {
        IVec2::new(BARRIER_WIDTH, BARRIER_HEIGHT)
    }
    fn sprite(&self) -> SpriteTag {
        SpriteTag::Barrier
    }
}

/// Pickup dropped by a destroyed formation unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemBox {
    pub pos: IVec2,
    dropped_at: u64,
}

impl ItemBox {
    pub fn new(pos: IVec2, now_ms: u64) -> Self {
        Self {
            pos,
            dropped_at: now_ms,
        }
    }

    /// Boxes cannot be shot in the instant they appear
    pub fn is_dropped_right_now(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.dropped_at) < ITEM_BOX_ARMING_MS
    }
}

impl Entity for ItemBox {
    fn pos(&self) -> IVec2 {
        self.pos
    }
    fn size(&self) -> IVec2 {
        IVec2::new(ITEM_BOX_SIZE, ITEM_BOX_SIZE)
    }
    fn sprite(&self) -> SpriteTag {
        SpriteTag::ItemBox
    }
}

/// Per-run counters exposed to the HUD and the score screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub score: u64,
    pub lives: u32,
    pub bullets_shot: u32,
    pub hit_bullets: u32,
    pub ships_destroyed: u32,
    pub max_combo: u32,
}

impl Default for Scoreboard {
    fn default() -> Self {
        Self {
            score: 0,
            lives: STARTING_LIVES,
            bullets_shot: 0,
            hit_bullets: 0,
            ships_destroyed: 0,
            max_combo: 0,
        }
    }
}

impl Scoreboard {
    /// Fraction of fired bullets that hit something
    pub fn accuracy(&self) -> f32 {
        if self.bullets_shot == 0 {
            0.0
        } else {
            self.hit_bullets as f32 / self.bullets_shot as f32
        }
    }
}

/// RNG state wrapper for serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed, stream: 0 }
    }

    pub fn to_rng(&self) -> Pcg32 {
        Pcg32::new(self.seed, self.stream.wrapping_mul(2).wrapping_add(1))
    }

    /// Independent generator for a named subsystem
    pub fn fork(&self, stream: u64) -> Pcg32 {
        RngState {
            seed: self.seed,
            stream,
        }
        .to_rng()
    }
}

impl Default for RngState {
    fn default() -> Self {
        Self::new(0)
    }
}
