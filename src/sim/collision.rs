//! Collision detection and response
//!
//! Every in-flight bullet is tested once per tick against the targets its
//! owner may hit: enemy bullets against the ship, barriers and blocks; player
//! bullets against formation units, the bonus ship, item boxes and blocks.
//! A bullet is spent by the first target it strikes.

use glam::IVec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::bullet_pool::BulletSet;
use super::combo::{ComboTracker, combo_score};
use super::events::{Feedback, GameEvent, SoundEffect};
use super::formation::{Formation, HitOutcome};
use super::state::{
    Barrier, Block, Bullet, BulletOwner, Entity, ItemBox, PlayerShip, Scoreboard, SpecialShip,
};
use crate::level_tier;

/// Item boxes drop at this offset from the destroyed unit
const ITEM_DROP_OFFSET: IVec2 = IVec2::new(6, 1);

/// Axis-aligned overlap: center distance strictly less than the half-extents on both axes
pub fn check_collision<A, B>(a: &A, b: &B) -> bool
where
    A: Entity + ?Sized,
    B: Entity + ?Sized,
{
    let distance = (a.center() - b.center()).abs();
    let max_distance = a.size() / 2 + b.size() / 2;
    distance.x < max_distance.x && distance.y < max_distance.y
}

/// Reward for collecting an item box
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReward {
    pub score: u64,
    /// Added to the destroyed-ships counter
    pub destroyed: u32,
    /// Grants a barrier in front of the player
    pub barrier: bool,
}

/// Drop-rate and item-effect collaborator
pub trait PickupHandler {
    /// Roll whether a destroyed unit drops an item box
    fn drop_item(&mut self) -> bool;

    /// Apply a collected item
    fn use_item(&mut self) -> Option<ItemReward>;

    /// Bullets per player shot. Miss detection only applies to single shots.
    fn shot_count(&self) -> u32 {
        1
    }

    /// While true the formation neither moves nor fires
    fn time_stop_active(&self) -> bool {
        false
    }
}

/// No drops, no rewards
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPickups;

impl PickupHandler for NoPickups {
    fn drop_item(&mut self) -> bool {
        false
    }

    fn use_item(&mut self) -> Option<ItemReward> {
        None
    }
}

/// Seeded drops with a fixed chance and a small reward table
#[derive(Debug, Clone)]
pub struct RandomItemDrops {
    drop_chance: f64,
    rng: Pcg32,
}

impl RandomItemDrops {
    /// Non-finite chances are treated as zero
    pub fn new(drop_chance: f64, rng: Pcg32) -> Self {
        let drop_chance = if drop_chance.is_finite() {
            drop_chance.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            drop_chance,
            rng,
        }
    }
}

impl PickupHandler for RandomItemDrops {
    fn drop_item(&mut self) -> bool {
        self.rng.random_bool(self.drop_chance)
    }

    fn use_item(&mut self) -> Option<ItemReward> {
        let reward = match self.rng.random_range(0..3) {
            0 => ItemReward {
                score: 50,
                ..Default::default()
            },
            1 => ItemReward {
                barrier: true,
                ..Default::default()
            },
            _ => ItemReward {
                score: 30,
                destroyed: 1,
                barrier: false,
            },
        };
        Some(reward)
    }
}

/// Mutable view of everything a bullet can strike
pub struct Arena<'a> {
    pub formation: &'a mut Formation,
    pub ship: &'a mut PlayerShip,
    pub special: &'a mut Option<SpecialShip>,
    pub blocks: &'a mut Vec<Block>,
    pub barriers: &'a mut Vec<Barrier>,
    pub item_boxes: &'a mut Vec<ItemBox>,
    pub scoreboard: &'a mut Scoreboard,
    pub combo: &'a mut ComboTracker,
}

impl Arena<'_> {
    /// Top edge of the highest live enemy, bonus ship included
    pub fn top_enemy_y(&self) -> Option<i32> {
        let special = self
            .special
            .as_ref()
            .filter(|s| !s.is_destroyed())
            .map(|s| s.pos.y);
        match (self.formation.top_live_y(), special) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// What a resolve pass left for the caller to apply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Indices of spent bullets, ascending
    pub spent: Vec<usize>,
    /// Barriers granted by collected items
    pub barriers_granted: u32,
    /// Blocks crushed by the formation
    pub blocks_crushed: usize,
}

/// Per-tick collision pass
#[derive(Debug, Clone, Copy)]
pub struct CollisionResolver {
    pub level: u32,
    pub now_ms: u64,
    /// No more player damage once the level is over
    pub level_finished: bool,
    /// Stereo pan for emitted sounds
    pub balance: f32,
}

impl CollisionResolver {
    pub fn new(level: u32, now_ms: u64) -> Self {
        Self {
            level,
            now_ms,
            level_finished: false,
            balance: 0.0,
        }
    }

    /// Resolve every bullet in `bullets` against `arena`.
    ///
    /// Bullets are only read; the caller recycles [`Resolution::spent`].
    pub fn resolve<P, F>(
        &self,
        bullets: &BulletSet,
        arena: &mut Arena<'_>,
        pickups: &mut P,
        feedback: &mut F,
    ) -> Resolution
    where
        P: PickupHandler + ?Sized,
        F: Feedback + ?Sized,
    {
        arena.combo.poll(self.now_ms);

        let mut resolution = Resolution::default();
        for (index, bullet) in bullets.iter().enumerate() {
            let spent = match bullet.owner() {
                BulletOwner::Enemy => self.enemy_bullet(bullet, arena, feedback),
                BulletOwner::Player => {
                    self.player_bullet(bullet, arena, pickups, feedback, &mut resolution)
                }
            };
            if spent {
                resolution.spent.push(index);
            }
        }

        resolution.blocks_crushed = crush_blocks(arena);
        resolution
    }

    fn enemy_bullet<F: Feedback + ?Sized>(
        &self,
        bullet: &Bullet,
        arena: &mut Arena<'_>,
        feedback: &mut F,
    ) -> bool {
        if !arena.ship.invulnerable && !self.level_finished && check_collision(bullet, &*arena.ship)
        {
            if !arena.ship.is_destroyed() {
                arena.ship.destroy(self.now_ms);
                let penalty = 1 + level_tier(self.level);
                let board = &mut *arena.scoreboard;
                board.lives = board.lives.saturating_sub(penalty);
                arena.combo.reset();
                feedback.sound(SoundEffect::PlayerHit, self.balance);
                feedback.emit(GameEvent::PlayerHit {
                    lives_remaining: board.lives,
                });
                log::info!("Hit on player ship, {} lives remaining", board.lives);
            }
            return true;
        }

        if let Some(index) = arena.barriers.iter().position(|b| check_collision(bullet, b)) {
            let barrier = &mut arena.barriers[index];
            barrier.reduce_health();
            feedback.sound(SoundEffect::BarrierHit, self.balance);
            if barrier.is_destroyed() {
                arena.barriers.remove(index);
            }
            return true;
        }

        arena.blocks.iter().any(|b| check_collision(bullet, b))
    }

    fn player_bullet<P, F>(
        &self,
        bullet: &Bullet,
        arena: &mut Arena<'_>,
        pickups: &mut P,
        feedback: &mut F,
        resolution: &mut Resolution,
    ) -> bool
    where
        P: PickupHandler + ?Sized,
        F: Feedback + ?Sized,
    {
        // Formation units
        let target = arena
            .formation
            .live_units()
            .find(|(_, unit)| check_collision(bullet, *unit))
            .map(|(slot, unit)| (slot, unit.pos));
        if let Some((slot, pos)) = target {
            let points = match arena.formation.hit(slot, self.balance, feedback) {
                HitOutcome::Destroyed { points } => {
                    arena.scoreboard.ships_destroyed += 1;
                    if pickups.drop_item() {
                        let drop_pos = pos + ITEM_DROP_OFFSET;
                        arena.item_boxes.push(ItemBox::new(drop_pos, self.now_ms));
                        feedback.emit(GameEvent::ItemDropped { pos: drop_pos });
                        log::info!("Item box dropped");
                    }
                    points.max(0) as u64
                }
                HitOutcome::Damaged | HitOutcome::Ignored => 0,
            };
            self.register_hit(points, arena);
            return true;
        }

        // Bonus ship
        if let Some(special) = arena.special.as_mut() {
            if !special.is_destroyed() && check_collision(bullet, &*special) {
                let points = special.point_value();
                special.destroy(self.now_ms);
                arena.scoreboard.ships_destroyed += 1;
                feedback.sound(SoundEffect::AlienHit, self.balance);
                feedback.emit(GameEvent::SpecialDestroyed { points });
                self.register_hit(points.max(0) as u64, arena);
                return true;
            }
        }

        // Item boxes
        let now = self.now_ms;
        if let Some(index) = arena
            .item_boxes
            .iter()
            .position(|item| !item.is_dropped_right_now(now) && check_collision(bullet, item))
        {
            arena.item_boxes.remove(index);
            arena.scoreboard.hit_bullets += 1;
            if let Some(reward) = pickups.use_item() {
                arena.scoreboard.score += reward.score;
                arena.scoreboard.ships_destroyed += reward.destroyed;
                if reward.barrier {
                    resolution.barriers_granted += 1;
                }
                feedback.emit(GameEvent::ItemCollected {
                    score: reward.score,
                    destroyed: reward.destroyed,
                });
            }
            feedback.sound(SoundEffect::ItemCollect, self.balance);
            return true;
        }

        // Blocks
        if arena.blocks.iter().any(|b| check_collision(bullet, b)) {
            feedback.sound(SoundEffect::BulletBlocking, self.balance);
            return true;
        }

        // Missed: passed the top of the formation without striking anything
        if pickups.shot_count() == 1 {
            if let Some(top) = arena.top_enemy_y() {
                if bullet.pos.y < top && arena.combo.streak() > 0 {
                    log::debug!("Shot missed, combo of {} lost", arena.combo.streak());
                    arena.combo.reset();
                }
            }
        }
        false
    }

    /// Score with the current streak, then extend the streak
    fn register_hit(&self, value: u64, arena: &mut Arena<'_>) {
        arena.scoreboard.score += combo_score(value, arena.combo.streak());
        let streak = arena.combo.register_hit(self.now_ms);
        arena.scoreboard.hit_bullets += 1;
        arena.scoreboard.max_combo = arena.scoreboard.max_combo.max(streak);
    }
}

/// Remove blocks overlapped by live formation units
fn crush_blocks(arena: &mut Arena<'_>) -> usize {
    let formation: &Formation = &*arena.formation;
    let before = arena.blocks.len();
    arena.blocks.retain(|block| {
        !formation
            .live_units()
            .any(|(_, unit)| check_collision(unit, block))
    });
    before - arena.blocks.len()
}
