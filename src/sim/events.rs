//! Side-effect events emitted by the simulation
//!
//! The core never plays sounds or grants rewards itself. It reports what
//! happened through a [`Feedback`] sink handed in by the caller, and the
//! audio/reward collaborators act on it.

use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundEffect {
    /// Formation member fires
    AlienLaser,
    /// Formation member or bonus ship hit
    AlienHit,
    /// Player ship destroyed
    PlayerHit,
    /// Player fires
    PlayerShoot,
    /// Bullet absorbed by a block
    BulletBlocking,
    /// Barrier takes a hit
    BarrierHit,
    /// Bonus ship enters the playfield
    UfoAppear,
    /// Item box collected
    ItemCollect,
    /// Level ended with no lives left
    GameEnd,
}

/// Something the outside world may want to react to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Play a sound, panned by `balance` (-1.0 left .. 1.0 right)
    Sound { effect: SoundEffect, balance: f32 },
    /// A formation unit's health reached zero
    UnitDestroyed { column: usize, row: usize, points: i32 },
    /// The bonus ship was shot down
    SpecialDestroyed { points: i32 },
    /// Player ship lost lives
    PlayerHit { lives_remaining: u32 },
    /// An item box dropped at `pos`
    ItemDropped { pos: IVec2 },
    /// An item box was collected
    ItemCollected { score: u64, destroyed: u32 },
    /// Level finished (formation cleared or out of lives)
    LevelFinished { cleared: bool },
}

/// Receiver for simulation events
pub trait Feedback {
    fn emit(&mut self, event: GameEvent);

    fn sound(&mut self, effect: SoundEffect, balance: f32) {
        self.emit(GameEvent::Sound { effect, balance });
    }
}

impl Feedback for Vec<GameEvent> {
    fn emit(&mut self, event: GameEvent) {
        self.push(event);
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl Feedback for NoFeedback {
    fn emit(&mut self, _event: GameEvent) {}
}

/// Count sound events of a given effect (test/diagnostic helper)
pub fn count_sounds(events: &[GameEvent], effect: SoundEffect) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, GameEvent::Sound { effect: fx, .. } if *fx == effect))
        .count()
}
