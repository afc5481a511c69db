//! Enemy formation
//!
//! A grid of optional unit slots that moves as one body, speeds up as it is
//! thinned out, and fires volleys from the lowest surviving unit of each column.
//!
//! Slots are addressed by `(column, row)`. A destroyed unit's slot is emptied,
//! never removed, so column indices stay stable for the shooter roster.

use glam::IVec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::bullet_pool::BulletSink;
use super::cooldown::Cooldown;
use super::enemy::{EnemyUnit, Tier};
use super::events::{Feedback, GameEvent, SoundEffect};
use super::state::Entity;
use crate::consts::*;
use crate::level_tier;
use crate::settings::{Difficulty, FormationSettings, Playfield};

/// Formation heading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Right,
    Left,
    Down,
}

impl Direction {
    /// Per-step displacement
    pub fn displacement(self) -> IVec2 {
        match self {
            Direction::Right => IVec2::new(X_SPEED, 0),
            Direction::Left => IVec2::new(-X_SPEED, 0),
            Direction::Down => IVec2::new(0, Y_SPEED),
        }
    }

    fn opposite_horizontal(self) -> Self {
        match self {
            Direction::Right => Direction::Left,
            _ => Direction::Right,
        }
    }
}

/// Address of a formation slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId {
    pub column: usize,
    pub row: usize,
}

impl SlotId {
    pub fn new(column: usize, row: usize) -> Self {
        Self { column, row }
    }
}

/// Bounding box of the live units. All zero when none are left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Result of a shot landing on a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// Slot empty or unit already destroyed
    Ignored,
    /// Unit lost health but survives
    Damaged,
    /// Unit destroyed by this hit
    Destroyed { points: i32 },
}

/// The enemy formation
#[derive(Debug, Clone)]
pub struct Formation {
    /// `columns[c][r]`, row 0 at the top
    columns: Vec<Vec<Option<EnemyUnit>>>,
    rows: usize,
    total: usize,
    live: usize,
    bounds: Bounds,
    direction: Direction,
    /// Last horizontal heading, for leaving a descent
    previous_horizontal: Direction,
    movement_interval: i32,
    base_speed: i32,
    shooting: Cooldown,
    /// Lowest live unit of each non-empty column
    shooters: Vec<SlotId>,
    rng: Pcg32,
}

impl Formation {
    /// Build a `columns` x `rows` formation for `level`
    pub fn initialize(
        columns: usize,
        rows: usize,
        base_speed: i32,
        shoot_interval: u64,
        shoot_variance: u64,
        level: u32,
    ) -> Self {
        Self::build(
            columns,
            rows,
            base_speed,
            Cooldown::variable(shoot_interval, shoot_variance),
            level,
            0,
            Pcg32::seed_from_u64(0),
        )
    }

    /// Build from per-level settings, with difficulty points and a seeded RNG
    pub fn from_settings(
        settings: &FormationSettings,
        level: u32,
        difficulty: Difficulty,
        rng: Pcg32,
    ) -> Self {
        Self::build(
            settings.formation_width as usize,
            settings.formation_height as usize,
            settings.base_speed,
            Cooldown::variable(settings.shooting_frequency, settings.shooting_variance()),
            level,
            difficulty.point_modifier(),
            rng,
        )
    }

    /// Replace the shooter-selection RNG
    pub fn with_rng(mut self, rng: Pcg32) -> Self {
        self.rng = rng;
        self
    }

    fn build(
        columns: usize,
        rows: usize,
        base_speed: i32,
        shooting: Cooldown,
        level: u32,
        point_modifier: i32,
        rng: Pcg32,
    ) -> Self {
        log::info!(
            "Initializing {}x{} formation at ({},{})",
            columns,
            rows,
            INIT_POS_X,
            INIT_POS_Y
        );

        let grid: Vec<Vec<Option<EnemyUnit>>> = (0..columns)
            .map(|c| {
                (0..rows)
                    .map(|r| {
                        Some(EnemyUnit::new(
                            INIT_POS_X + SEPARATION_DISTANCE * c as i32,
                            INIT_POS_Y + SEPARATION_DISTANCE * r as i32,
                            Tier::for_row(r, rows),
                            level,
                            point_modifier,
                        ))
                    })
                    .collect()
            })
            .collect();

        let total = columns * rows;
        let shooters = if rows == 0 {
            Vec::new()
        } else {
            (0..columns).map(|c| SlotId::new(c, rows - 1)).collect()
        };

        let mut formation = Self {
            columns: grid,
            rows,
            total,
            live: total,
            bounds: Bounds::default(),
            direction: Direction::Right,
            previous_horizontal: Direction::Right,
            movement_interval: 0,
            base_speed,
            shooting,
            shooters,
            rng,
        };
        formation.recompute_bounds();
        formation
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Units not yet destroyed
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Units at creation
    pub fn total_count(&self) -> usize {
        self.total
    }

    /// Formation cleared
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Units currently allowed to fire, one per non-empty column
    pub fn shooters(&self) -> &[SlotId] {
        &self.shooters
    }

    pub fn unit(&self, slot: SlotId) -> Option<&EnemyUnit> {
        self.columns.get(slot.column)?.get(slot.row)?.as_ref()
    }

    fn unit_mut(&mut self, slot: SlotId) -> Option<&mut EnemyUnit> {
        self.columns.get_mut(slot.column)?.get_mut(slot.row)?.as_mut()
    }

    /// Every occupied slot in (column, row) order, including units that were
    /// destroyed but not yet cleared
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &EnemyUnit)> + '_ {
        self.columns.iter().enumerate().flat_map(|(c, column)| {
            column
                .iter()
                .enumerate()
                .filter_map(move |(r, slot)| slot.as_ref().map(|unit| (SlotId::new(c, r), unit)))
        })
    }

    /// Units that can still be hit, in (column, row) order
    pub fn live_units(&self) -> impl Iterator<Item = (SlotId, &EnemyUnit)> + '_ {
        self.iter().filter(|(_, unit)| !unit.is_destroyed())
    }

    /// Top edge of the highest live unit
    pub fn top_live_y(&self) -> Option<i32> {
        self.live_units().map(|(_, unit)| unit.pos.y).min()
    }

    /// Ticks between steps: fewer survivors means a smaller threshold
    pub fn movement_threshold(&self) -> i32 {
        let remaining = if self.total == 0 {
            0.0
        } else {
            self.live as f64 / self.total as f64
        };
        let curve = (remaining * remaining * self.base_speed as f64).floor() as i32;
        (curve + MINIMUM_SPEED).max(1)
    }

    /// Advance one tick. Returns true if the formation stepped.
    pub fn update(&mut self, playfield: &Playfield, now_ms: u64) -> bool {
        if !self.shooting.is_armed() {
            self.shooting.reset_random(now_ms, &mut self.rng);
        }

        self.movement_interval += 1;
        self.recompute_bounds();

        if self.is_empty() || self.movement_interval < self.movement_threshold() {
            return false;
        }
        self.movement_interval = 0;

        let next = self.next_direction(playfield);
        if next != self.direction {
            log::debug!("Formation now moving {:?}", next);
        }
        if matches!(self.direction, Direction::Left | Direction::Right) {
            self.previous_horizontal = self.direction;
        }
        self.direction = next;

        self.clear_destroyed();

        let delta = self.direction.displacement();
        for unit in self.columns.iter_mut().flatten().flatten() {
            unit.move_by(delta.x, delta.y);
            unit.animate(now_ms);
        }
        self.recompute_bounds();
        true
    }

    fn next_direction(&self, playfield: &Playfield) -> Direction {
        let b = self.bounds;
        let at_bottom = b.y + b.height > playfield.height - BOTTOM_MARGIN;
        let at_left = b.x <= SIDE_MARGIN;
        let at_right = b.x + b.width >= playfield.width - SIDE_MARGIN;

        match self.direction {
            Direction::Down if b.y.rem_euclid(DESCENT_DISTANCE) == 0 => {
                self.previous_horizontal.opposite_horizontal()
            }
            Direction::Left if at_left => {
                if at_bottom {
                    Direction::Right
                } else {
                    Direction::Down
                }
            }
            Direction::Right if at_right => {
                if at_bottom {
                    Direction::Left
                } else {
                    Direction::Down
                }
            }
            current => current,
        }
    }

    /// Empty the slots of destroyed units
    fn clear_destroyed(&mut self) {
        for (c, column) in self.columns.iter_mut().enumerate() {
            for (r, slot) in column.iter_mut().enumerate() {
                if slot.as_ref().is_some_and(|unit| unit.is_destroyed()) {
                    log::info!("Removed enemy {} from column {}", r, c);
                    *slot = None;
                }
            }
        }
    }

    /// Bounding box from live units only
    fn recompute_bounds(&mut self) {
        let mut left = i32::MAX;
        let mut right = i32::MIN;
        let mut top = i32::MAX;
        let mut bottom = i32::MIN;

        for (_, unit) in self.live_units() {
            left = left.min(unit.pos.x);
            right = right.max(unit.pos.x);
            top = top.min(unit.pos.y);
            bottom = bottom.max(unit.pos.y);
        }

        self.bounds = if left == i32::MAX {
            Bounds::default()
        } else {
            Bounds {
                x: left,
                y: top,
                width: right - left + UNIT_WIDTH,
                height: bottom - top + UNIT_HEIGHT,
            }
        };
    }

    /// Fire a volley if the shooting cooldown has elapsed.
    ///
    /// `min(level / 3 + 1, shooters)` shooters are drawn uniformly with
    /// replacement, so a unit may fire twice in one volley. Each fires
    /// `level / 3 + 1` bullets fanned out to its right. Returns bullets fired.
    pub fn shoot<S, F>(
        &mut self,
        sink: &mut S,
        level: u32,
        balance: f32,
        now_ms: u64,
        feedback: &mut F,
    ) -> usize
    where
        S: BulletSink + ?Sized,
        F: Feedback + ?Sized,
    {
        if self.shooters.is_empty() || !self.shooting.is_finished(now_ms) {
            return 0;
        }
        self.shooting.reset_random(now_ms, &mut self.rng);

        let per_shooter = level_tier(level) as usize + 1;
        let shooter_count = per_shooter.min(self.shooters.len());

        let mut fired = 0;
        for _ in 0..shooter_count {
            let pick = self.rng.random_range(0..self.shooters.len());
            let Some(unit) = self.unit(self.shooters[pick]) else {
                continue;
            };
            let origin = unit.pos + IVec2::new(unit.size().x / 2, 0);
            for i in 0..per_shooter {
                let offset = 10 * (i as i32 + 1);
                sink.fire(origin.x + offset, origin.y, ENEMY_BULLET_SPEED);
                fired += 1;
            }
            feedback.sound(SoundEffect::AlienLaser, balance);
        }

        log::debug!("Volley: {} shooters, {} bullets", shooter_count, fired);
        fired
    }

    /// Apply one hit to the unit in `slot`
    pub fn hit<F: Feedback + ?Sized>(&mut self, slot: SlotId, balance: f32, feedback: &mut F) -> HitOutcome {
        let Some(unit) = self.unit_mut(slot) else {
            return HitOutcome::Ignored;
        };
        if unit.is_destroyed() {
            return HitOutcome::Ignored;
        }
        let destroyed = unit.hit();
        let points = unit.point_value();
        feedback.sound(SoundEffect::AlienHit, balance);

        if destroyed {
            self.on_destroyed(slot, points, feedback);
            HitOutcome::Destroyed { points }
        } else {
            HitOutcome::Damaged
        }
    }

    /// Destroy the unit in `slot` outright. Returns false for empty or already destroyed slots.
    pub fn destroy<F: Feedback + ?Sized>(&mut self, slot: SlotId, balance: f32, feedback: &mut F) -> bool {
        let Some(unit) = self.unit_mut(slot) else {
            return false;
        };
        if !unit.destroy() {
            return false;
        }
        let points = unit.point_value();
        feedback.sound(SoundEffect::AlienHit, balance);
        self.on_destroyed(slot, points, feedback);
        true
    }

    fn on_destroyed<F: Feedback + ?Sized>(&mut self, slot: SlotId, points: i32, feedback: &mut F) {
        self.live = self.live.saturating_sub(1);
        log::info!("Destroyed unit at ({},{})", slot.column, slot.row);
        feedback.emit(GameEvent::UnitDestroyed {
            column: slot.column,
            row: slot.row,
            points,
        });

        if let Some(index) = self.shooters.iter().position(|s| *s == slot) {
            match self.next_shooter(slot.column) {
                Some(next) => self.shooters[index] = next,
                None => {
                    self.shooters.remove(index);
                    log::info!("Shooters list reduced to {} members", self.shooters.len());
                }
            }
        }
    }

    /// Lowest live unit of `column`
    pub fn next_shooter(&self, column: usize) -> Option<SlotId> {
        let units = self.columns.get(column)?;
        units
            .iter()
            .enumerate()
            .rev()
            .find(|(_, slot)| slot.as_ref().is_some_and(|u| !u.is_destroyed()))
            .map(|(row, _)| SlotId::new(column, row))
    }
}
