//! Fixed timestep simulation tick
//!
//! One call advances a level by one frame: player input, formation movement
//! and volleys, the bonus ship, collision resolution, bullet cleanup, then the
//! level-completion check.

use glam::IVec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::bullet_pool::{BulletSet, BulletSink};
use super::collision::{Arena, CollisionResolver, PickupHandler, Resolution, check_collision};
use super::combo::ComboTracker;
use super::cooldown::Cooldown;
use super::events::{Feedback, GameEvent, SoundEffect};
use super::formation::Formation;
use super::state::{
    Barrier, Block, Entity, ItemBox, PlayerShip, RngState, Scoreboard, SpecialShip, SpriteTag,
};
use crate::consts::*;
use crate::settings::{Playfield, Settings};

/// Blocks stay this far above the bottom of the playfield (player and barrier zone)
const PLAYER_ZONE_HEIGHT: i32 = 190;
/// Placement attempts per block before giving up
const BLOCK_PLACEMENT_ATTEMPTS: usize = 100;
/// Granted barriers sit this far above the ship
const BARRIER_OFFSET_Y: i32 = 40;
/// Horizontal spacing of multi-shot bullets
const SHOT_SPREAD: i32 = 10;

/// RNG streams
const STREAM_GAME: u64 = 0;
const STREAM_FORMATION: u64 = 1;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Horizontal ship movement: negative left, positive right
    pub move_dir: i32,
    /// Fire (held)
    pub fire: bool,
    /// Demo mode - AI plays the game
    pub idle_mode: bool,
}

/// Something to draw: position, size and sprite tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteInstance {
    pub pos: IVec2,
    pub size: IVec2,
    pub tag: SpriteTag,
}

impl SpriteInstance {
    pub fn of<E: Entity + ?Sized>(entity: &E) -> Self {
        Self {
            pos: entity.pos(),
            size: entity.size(),
            tag: entity.sprite(),
        }
    }
}

/// One level in play
#[derive(Debug, Clone)]
pub struct Game {
    pub level: u32,
    pub playfield: Playfield,
    /// Simulation clock in milliseconds
    pub time_ms: u64,
    /// Stereo pan for emitted sounds
    pub balance: f32,
    pub formation: Formation,
    pub bullets: BulletSet,
    pub ship: PlayerShip,
    pub special: Option<SpecialShip>,
    pub blocks: Vec<Block>,
    pub barriers: Vec<Barrier>,
    pub item_boxes: Vec<ItemBox>,
    pub scoreboard: Scoreboard,
    pub combo: ComboTracker,
    /// Formation cleared or lives exhausted; play is frozen
    pub level_finished: bool,
    /// Level-end delay elapsed and the life bonus applied
    done: bool,
    special_cooldown: Cooldown,
    level_end: Cooldown,
    rng_state: RngState,
    rng: Pcg32,
}

impl Game {
    /// Start `level` (1-based) with fresh counters
    pub fn new(settings: &Settings, level: u32) -> Self {
        Self::with_scoreboard(settings, level, Scoreboard::default())
    }

    /// Start `level` carrying over score and lives from the previous one
    pub fn with_scoreboard(settings: &Settings, level: u32, scoreboard: Scoreboard) -> Self {
        let level = level.max(1);
        let rng_state = RngState::new(settings.seed.wrapping_add(level as u64));
        let mut rng = rng_state.fork(STREAM_GAME);
        let playfield = settings.playfield;

        let formation_settings = settings.formation_for_level(level);
        let formation = Formation::from_settings(
            &formation_settings,
            level,
            settings.difficulty,
            rng_state.fork(STREAM_FORMATION),
        );

        let zone_top = {
            let bounds = formation.bounds();
            bounds.y + bounds.height
        };
        let blocks = place_blocks(
            (level / 2) as usize,
            &playfield,
            zone_top,
            playfield.height - PLAYER_ZONE_HEIGHT,
            &mut rng,
        );

        let mut special_cooldown = Cooldown::variable(SPECIAL_INTERVAL_MS, SPECIAL_VARIANCE_MS);
        special_cooldown.reset_random(0, &mut rng);

        log::info!(
            "Level {} ({}): {} blocks, seed {}",
            level,
            settings.difficulty.as_str(),
            blocks.len(),
            settings.seed
        );

        Self {
            level,
            playfield,
            time_ms: 0,
            balance: 0.0,
            formation,
            bullets: BulletSet::new(),
            ship: PlayerShip::spawn_in(playfield.width, playfield.height),
            special: None,
            blocks,
            barriers: Vec::new(),
            item_boxes: Vec::new(),
            scoreboard,
            combo: ComboTracker::default(),
            level_finished: false,
            done: false,
            special_cooldown,
            level_end: Cooldown::new(LEVEL_END_DELAY_MS),
            rng_state,
            rng,
        }
    }

    /// Level over and its end delay elapsed
    pub fn is_over(&self) -> bool {
        self.done
    }

    pub fn rng_state(&self) -> &RngState {
        &self.rng_state
    }

    /// Everything that needs drawing this frame, in a fixed order
    pub fn snapshot(&self) -> Vec<SpriteInstance> {
        let mut sprites = Vec::with_capacity(
            self.formation.total_count()
                + self.bullets.len()
                + self.blocks.len()
                + self.barriers.len()
                + self.item_boxes.len()
                + 2,
        );
        sprites.extend(self.formation.iter().map(|(_, unit)| SpriteInstance::of(unit)));
        sprites.extend(self.special.iter().map(SpriteInstance::of));
        sprites.push(SpriteInstance::of(&self.ship));
        sprites.extend(self.blocks.iter().map(SpriteInstance::of));
        sprites.extend(self.barriers.iter().map(SpriteInstance::of));
        sprites.extend(self.item_boxes.iter().map(SpriteInstance::of));
        sprites.extend(self.bullets.iter().map(SpriteInstance::of));
        sprites
    }

    fn resolve_collisions<P, F>(&mut self, pickups: &mut P, feedback: &mut F) -> Resolution
    where
        P: PickupHandler + ?Sized,
        F: Feedback + ?Sized,
    {
        let resolver = CollisionResolver {
            level: self.level,
            now_ms: self.time_ms,
            level_finished: self.level_finished,
            balance: self.balance,
        };
        let mut arena = Arena {
            formation: &mut self.formation,
            ship: &mut self.ship,
            special: &mut self.special,
            blocks: &mut self.blocks,
            barriers: &mut self.barriers,
            item_boxes: &mut self.item_boxes,
            scoreboard: &mut self.scoreboard,
            combo: &mut self.combo,
        };
        resolver.resolve(&self.bullets, &mut arena, pickups, feedback)
    }

    fn grant_barrier(&mut self) {
        let x = self.ship.pos.x + SHIP_WIDTH / 2 - BARRIER_WIDTH / 2;
        let y = self.ship.pos.y - BARRIER_OFFSET_Y;
        self.barriers.push(Barrier::new(x, y));
        log::info!("Barrier placed at ({},{})", x, y);
    }
}

/// Place up to `count` non-overlapping blocks between `min_y` and `max_y`
pub fn place_blocks(
    count: usize,
    playfield: &Playfield,
    min_y: i32,
    max_y: i32,
    rng: &mut Pcg32,
) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::with_capacity(count);
    let max_x = playfield.width - 2 * SIDE_MARGIN;
    if count == 0 || max_y <= min_y || max_x <= 0 {
        if count > 0 {
            log::warn!("No room for {} blocks between y={} and y={}", count, min_y, max_y);
        }
        return blocks;
    }

    for _ in 0..count {
        let placed = (0..BLOCK_PLACEMENT_ATTEMPTS).find_map(|_| {
            let candidate = Block {
                pos: IVec2::new(rng.random_range(0..max_x), rng.random_range(min_y..max_y)),
            };
            let overlaps = blocks.iter().any(|b| check_collision(b, &candidate));
            (!overlaps).then_some(candidate)
        });
        match placed {
            Some(block) => blocks.push(block),
            None => {
                log::warn!("Placed {} of {} blocks", blocks.len(), count);
                break;
            }
        }
    }
    blocks
}

/// Steer the ship under the nearest shooter and keep firing
fn autopilot(game: &Game) -> TickInput {
    let ship_x = game.ship.center().x;
    let target = game
        .formation
        .shooters()
        .iter()
        .filter_map(|slot| game.formation.unit(*slot))
        .map(|unit| unit.center().x)
        .min_by_key(|x| (x - ship_x).abs());

    let move_dir = match target {
        Some(x) if (x - ship_x).abs() > SHIP_SPEED => (x - ship_x).signum(),
        _ => 0,
    };
    TickInput {
        move_dir,
        fire: true,
        idle_mode: true,
    }
}

/// Advance the game by one fixed timestep
pub fn tick<P, F>(game: &mut Game, input: &TickInput, dt_ms: u64, pickups: &mut P, feedback: &mut F)
where
    P: PickupHandler + ?Sized,
    F: Feedback + ?Sized,
{
    if game.done {
        return;
    }
    game.time_ms += dt_ms;
    let now = game.time_ms;

    if !game.level_finished {
        let input = if input.idle_mode {
            autopilot(game)
        } else {
            input.clone()
        };
        update_ship(game, &input, now, pickups, feedback);

        if !pickups.time_stop_active() {
            game.formation.update(&game.playfield, now);
            game.formation
                .shoot(&mut game.bullets, game.level, game.balance, now, feedback);
        }

        update_special(game, now, feedback);

        let resolution = game.resolve_collisions(pickups, feedback);
        game.bullets.recycle_indices(&resolution.spent);
        for _ in 0..resolution.barriers_granted {
            game.grant_barrier();
        }

        clean_bullets(game);
    }

    check_level_completion(game, now, feedback);
}

fn update_ship<P, F>(game: &mut Game, input: &TickInput, now: u64, pickups: &mut P, feedback: &mut F)
where
    P: PickupHandler + ?Sized,
    F: Feedback + ?Sized,
{
    game.ship.update(now);
    if game.ship.is_destroyed() {
        return;
    }
    if input.move_dir != 0 {
        game.ship.move_by(input.move_dir, game.playfield.width);
    }
    if input.fire {
        if let Some((x, y, speed)) = game.ship.try_shoot(now) {
            let shots = pickups.shot_count().max(1) as i32;
            for i in 0..shots {
                let offset = (2 * i - (shots - 1)) * SHOT_SPREAD / 2;
                game.bullets.fire(x + offset, y, speed);
            }
            game.scoreboard.bullets_shot += shots as u32;
            feedback.sound(SoundEffect::PlayerShoot, game.balance);
        }
    }
}

fn update_special<F: Feedback + ?Sized>(game: &mut Game, now: u64, feedback: &mut F) {
    let expired = match game.special.as_mut() {
        Some(special) if !special.is_destroyed() => {
            special.advance();
            false
        }
        Some(special) => special.explosion_done(now),
        None => false,
    };
    if expired {
        game.special = None;
    }

    if game.special.is_none() && game.special_cooldown.is_finished(now) {
        game.special = Some(SpecialShip::default());
        game.special_cooldown.reset_random(now, &mut game.rng);
        feedback.sound(SoundEffect::UfoAppear, game.balance);
        log::info!("A special ship appears");
    }

    if game
        .special
        .as_ref()
        .is_some_and(|s| s.pos.x > game.playfield.width)
    {
        game.special = None;
        log::info!("The special ship has escaped");
    }
}

/// Move every bullet and recycle those that left the playfield
fn clean_bullets(game: &mut Game) {
    for bullet in game.bullets.iter_mut() {
        bullet.update();
    }
    let height = game.playfield.height;
    game.bullets
        .recycle_if(|_, b| b.pos.y < SEPARATION_LINE_HEIGHT || b.pos.y > height);
}

fn check_level_completion<F: Feedback + ?Sized>(game: &mut Game, now: u64, feedback: &mut F) {
    let lives = game.scoreboard.lives;
    if (game.formation.is_empty() || lives == 0) && !game.level_finished {
        game.level_finished = true;
        game.level_end.reset(now);
        if lives == 0 {
            feedback.sound(SoundEffect::GameEnd, game.balance);
        }
        let cleared = game.formation.is_empty();
        feedback.emit(GameEvent::LevelFinished { cleared });
        log::info!("Level {} finished (cleared: {})", game.level, cleared);
    }

    if game.level_finished && game.level_end.is_finished(now) {
        game.done = true;
        game.scoreboard.score += LIFE_SCORE * lives.saturating_sub(1) as u64;
        game.scoreboard.max_combo = game.scoreboard.max_combo.max(game.combo.max_streak());
        log::info!("Screen cleared with a score of {}", game.scoreboard.score);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::collision::{ItemReward, NoPickups, RandomItemDrops};
    use crate::sim::events::{NoFeedback, count_sounds};
    use crate::sim::formation::SlotId;
    use rand::SeedableRng;

    fn settings(seed: u64) -> Settings {
        Settings {
            seed,
            ..Default::default()
        }
    }

    fn run(game: &mut Game, input: &TickInput, ticks: usize, events: &mut Vec<GameEvent>) {
        for _ in 0..ticks {
            tick(game, input, SIM_DT_MS, &mut NoPickups, events);
        }
    }

    fn clear_formation(game: &mut Game) {
        let slots: Vec<SlotId> = game.formation.live_units().map(|(slot, _)| slot).collect();
        for slot in slots {
            game.formation.destroy(slot, 0.0, &mut NoFeedback);
        }
    }

    #[test]
    fn test_new_game_layout() {
        let game = Game::new(&settings(7), 1);
        assert_eq!(game.formation.column_count(), 5);
        assert_eq!(game.formation.row_count(), 4);
        assert_eq!(game.ship.pos, IVec2::new(224, 520 - SHIP_BOTTOM_OFFSET));
        assert!(game.blocks.is_empty());
        assert_eq!(game.scoreboard.lives, STARTING_LIVES);
        assert!(!game.level_finished);
    }

    #[test]
    fn test_blocks_do_not_overlap() {
        let game = Game::new(&settings(11), 8);
        assert_eq!(game.blocks.len(), 4);
        for (i, a) in game.blocks.iter().enumerate() {
            for b in &game.blocks[i + 1..] {
                assert!(!check_collision(a, b));
            }
            assert!(a.pos.y < 520 - PLAYER_ZONE_HEIGHT);
        }
    }

    #[test]
    fn test_place_blocks_without_room() {
        let mut rng = Pcg32::seed_from_u64(1);
        let blocks = place_blocks(3, &Playfield::default(), 300, 300, &mut rng);
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_player_fires_and_bullet_travels() {
        let mut game = Game::new(&settings(1), 1);
        let mut events = Vec::new();
        let fire = TickInput {
            fire: true,
            ..Default::default()
        };
        tick(&mut game, &fire, SIM_DT_MS, &mut NoPickups, &mut events);

        assert_eq!(game.scoreboard.bullets_shot, 1);
        assert_eq!(count_sounds(&events, SoundEffect::PlayerShoot), 1);
        let bullet = game.bullets.iter().find(|b| b.speed < 0).cloned().unwrap();
        assert_eq!(bullet.pos.y, game.ship.pos.y + SHIP_BULLET_SPEED);
    }

    #[test]
    fn test_bullets_leaving_playfield_are_recycled() {
        let mut game = Game::new(&settings(1), 1);
        game.bullets.fire(400, SEPARATION_LINE_HEIGHT + 2, SHIP_BULLET_SPEED);
        game.bullets.fire(400, game.playfield.height - 1, ENEMY_BULLET_SPEED);
        run(&mut game, &TickInput::default(), 1, &mut Vec::new());
        assert!(game.bullets.iter().all(|b| b.pos.x != 400));
        assert_eq!(game.bullets.pool().available(), 2);
    }

    #[test]
    fn test_ship_moves_with_input() {
        let mut game = Game::new(&settings(1), 1);
        let start = game.ship.pos.x;
        let right = TickInput {
            move_dir: 1,
            ..Default::default()
        };
        run(&mut game, &right, 3, &mut Vec::new());
        assert_eq!(game.ship.pos.x, start + 3 * SHIP_SPEED);
    }

    #[test]
    fn test_special_ship_appears_and_escapes() {
        let mut game = Game::new(&settings(1), 1);
        game.special_cooldown = Cooldown::new(SPECIAL_INTERVAL_MS);
        let mut events = Vec::new();
        run(&mut game, &TickInput::default(), 1, &mut events);
        assert!(game.special.is_some());
        assert_eq!(count_sounds(&events, SoundEffect::UfoAppear), 1);

        if let Some(special) = game.special.as_mut() {
            special.pos.x = game.playfield.width - 1;
        }
        run(&mut game, &TickInput::default(), 1, &mut events);
        assert!(game.special.is_none());
    }

    #[test]
    fn test_cleared_formation_finishes_level_with_bonus() {
        let mut game = Game::new(&settings(3), 1);
        clear_formation(&mut game);
        let mut events = Vec::new();

        run(&mut game, &TickInput::default(), 1, &mut events);
        assert!(game.level_finished);
        assert!(!game.is_over());
        assert!(events.contains(&GameEvent::LevelFinished { cleared: true }));

        let ticks = (LEVEL_END_DELAY_MS / SIM_DT_MS) as usize + 2;
        run(&mut game, &TickInput::default(), ticks, &mut events);
        assert!(game.is_over());
        assert_eq!(game.scoreboard.score, LIFE_SCORE * (STARTING_LIVES as u64 - 1));

        // Frozen once over
        let time = game.time_ms;
        run(&mut game, &TickInput::default(), 5, &mut events);
        assert_eq!(game.time_ms, time);
    }

    #[test]
    fn test_out_of_lives_ends_game() {
        let mut game = Game::new(&settings(3), 1);
        game.scoreboard.lives = 0;
        let mut events = Vec::new();
        run(&mut game, &TickInput::default(), 1, &mut events);
        assert!(game.level_finished);
        assert_eq!(count_sounds(&events, SoundEffect::GameEnd), 1);
        assert!(events.contains(&GameEvent::LevelFinished { cleared: false }));
    }

    #[test]
    fn test_finished_level_freezes_play() {
        let mut game = Game::new(&settings(3), 1);
        game.scoreboard.lives = 0;
        run(&mut game, &TickInput::default(), 1, &mut Vec::new());
        let bounds = game.formation.bounds();
        let fire = TickInput {
            fire: true,
            ..Default::default()
        };
        run(&mut game, &fire, 40, &mut Vec::new());
        assert_eq!(game.formation.bounds(), bounds);
        assert_eq!(game.scoreboard.bullets_shot, 0);
    }

    #[test]
    fn test_snapshot_lists_everything() {
        let mut game = Game::new(&settings(5), 4);
        game.bullets.fire(100, 200, ENEMY_BULLET_SPEED);
        let sprites = game.snapshot();
        let expected = game.formation.total_count() + 1 + game.blocks.len() + 1;
        assert_eq!(sprites.len(), expected);
        assert!(sprites.iter().any(|s| s.tag == SpriteTag::Ship));
        assert_eq!(sprites.last().map(|s| s.tag), Some(SpriteTag::Bullet));
    }

    #[test]
    fn test_demo_mode_scores() {
        let mut game = Game::new(&settings(21), 1);
        let demo = TickInput {
            idle_mode: true,
            ..Default::default()
        };
        let mut pickups = RandomItemDrops::new(0.2, Pcg32::seed_from_u64(21));
        for _ in 0..3000 {
            tick(&mut game, &demo, SIM_DT_MS, &mut pickups, &mut NoFeedback);
        }
        assert!(game.scoreboard.bullets_shot > 0);
        assert!(game.scoreboard.hit_bullets > 0);
    }

    /// Keeps the formation frozen
    struct TimeStop;

    impl PickupHandler for TimeStop {
        fn drop_item(&mut self) -> bool {
            false
        }

        fn use_item(&mut self) -> Option<ItemReward> {
            None
        }

        fn time_stop_active(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_time_stop_freezes_formation() {
        let mut frozen = Game::new(&settings(4), 3);
        let mut running = Game::new(&settings(4), 3);
        let start = frozen.formation.bounds();
        let idle = TickInput::default();
        let mut events = Vec::new();
        for _ in 0..600 {
            tick(&mut frozen, &idle, SIM_DT_MS, &mut TimeStop, &mut events);
            tick(&mut running, &idle, SIM_DT_MS, &mut NoPickups, &mut NoFeedback);
        }

        assert_eq!(frozen.formation.bounds(), start);
        assert!(frozen.bullets.is_empty());
        assert_eq!(count_sounds(&events, SoundEffect::AlienLaser), 0);
        assert_ne!(running.formation.bounds(), start);
    }

    #[test]
    fn test_determinism() {
        // Same seed and inputs, same outcome
        let mut game1 = Game::new(&settings(99999), 3);
        let mut game2 = Game::new(&settings(99999), 3);
        let mut drops1 = RandomItemDrops::new(0.3, Pcg32::seed_from_u64(5));
        let mut drops2 = RandomItemDrops::new(0.3, Pcg32::seed_from_u64(5));
        let mut events1 = Vec::new();
        let mut events2 = Vec::new();

        let inputs = [
            TickInput {
                move_dir: -1,
                fire: true,
                ..Default::default()
            },
            TickInput {
                idle_mode: true,
                ..Default::default()
            },
            TickInput::default(),
        ];

        for i in 0..1500 {
            let input = &inputs[(i / 100) % inputs.len()];
            tick(&mut game1, input, SIM_DT_MS, &mut drops1, &mut events1);
            tick(&mut game2, input, SIM_DT_MS, &mut drops2, &mut events2);
        }

        assert_eq!(game1.scoreboard, game2.scoreboard);
        assert_eq!(game1.snapshot(), game2.snapshot());
        assert_eq!(events1, events2);
        assert_eq!(game1.blocks, game2.blocks);
    }
}
