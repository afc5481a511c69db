//! Invaders Core headless runner
//!
//! Plays consecutive levels in demo mode and prints the final scoreboard.
//!
//! Usage: `invaders-core [settings.json] [levels]`

#[cfg(not(target_arch = "wasm32"))]
use invaders_core::Settings;
#[cfg(not(target_arch = "wasm32"))]
use invaders_core::consts::SIM_DT_MS;
#[cfg(not(target_arch = "wasm32"))]
use invaders_core::sim::{
    Feedback, Game, GameEvent, RandomItemDrops, Scoreboard, SoundEffect, TickInput, tick,
};

/// Default level count for a demo run
#[cfg(not(target_arch = "wasm32"))]
const DEFAULT_LEVELS: u32 = 3;
/// Safety cap on ticks per level (10 simulated minutes)
#[cfg(not(target_arch = "wasm32"))]
const MAX_TICKS_PER_LEVEL: u64 = 10 * 60 * 1000 / SIM_DT_MS;
/// Item drop chance used by the demo
#[cfg(not(target_arch = "wasm32"))]
const DEMO_DROP_CHANCE: f64 = 0.1;

/// Logs events and counts volleys
#[cfg(not(target_arch = "wasm32"))]
#[derive(Default)]
struct LogFeedback {
    volleys: u32,
    units_destroyed: u32,
}

#[cfg(not(target_arch = "wasm32"))]
impl Feedback for LogFeedback {
    fn emit(&mut self, event: GameEvent) {
        match &event {
            GameEvent::Sound {
                effect: SoundEffect::AlienLaser,
                ..
            } => self.volleys += 1,
            GameEvent::UnitDestroyed { .. } => self.units_destroyed += 1,
            _ => {}
        }
        log::trace!("{:?}", event);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Invaders Core (headless) starting...");

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => Settings::load_or_default(path),
        None => Settings::default(),
    };
    let levels = args
        .next()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(DEFAULT_LEVELS);

    let mut pickups = RandomItemDrops::new(
        DEMO_DROP_CHANCE,
        invaders_core::sim::RngState::new(settings.seed).fork(u64::MAX),
    );
    let mut feedback = LogFeedback::default();
    let mut scoreboard = Scoreboard::default();
    let demo = TickInput {
        idle_mode: true,
        ..Default::default()
    };

    for level in 1..=levels {
        let mut game = Game::with_scoreboard(&settings, level, scoreboard);
        let mut ticks = 0;
        while !game.is_over() && ticks < MAX_TICKS_PER_LEVEL {
            tick(&mut game, &demo, SIM_DT_MS, &mut pickups, &mut feedback);
            ticks += 1;
        }
        if !game.is_over() {
            log::warn!("Level {} did not finish within {} ticks", level, ticks);
        }
        log::info!(
            "Level {} done in {} ms: score {}, lives {}, accuracy {:.0}%",
            level,
            game.time_ms,
            game.scoreboard.score,
            game.scoreboard.lives,
            game.scoreboard.accuracy() * 100.0
        );
        scoreboard = game.scoreboard;
        if scoreboard.lives == 0 {
            break;
        }
    }

    log::info!(
        "{} volleys fired, {} formation units destroyed",
        feedback.volleys,
        feedback.units_destroyed
    );
    match serde_json::to_string_pretty(&scoreboard) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Failed to serialize scoreboard: {}", e),
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Headless runner is native only
}
