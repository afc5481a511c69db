//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only, time is a caller-supplied millisecond clock
//! - Seeded RNG only
//! - Stable iteration order (by column, then row)
//! - No rendering, audio or platform dependencies; side effects go out as events

pub mod bullet_pool;
pub mod collision;
pub mod combo;
pub mod cooldown;
pub mod enemy;
pub mod events;
pub mod formation;
pub mod state;
pub mod tick;

pub use bullet_pool::{BulletPool, BulletSet, BulletSink};
pub use collision::{
    Arena, CollisionResolver, ItemReward, NoPickups, PickupHandler, RandomItemDrops, Resolution,
    check_collision,
};
pub use combo::{ComboTracker, combo_score};
pub use cooldown::Cooldown;
pub use enemy::{AnimFrame, EnemyUnit, Tier};
pub use events::{Feedback, GameEvent, NoFeedback, SoundEffect};
pub use formation::{Bounds, Direction, Formation, HitOutcome, SlotId};
pub use state::{
    Barrier, Block, Bullet, BulletOwner, Entity, ItemBox, PlayerShip, RngState, Scoreboard,
    SpecialShip, SpriteTag,
};
pub use tick::{Game, SpriteInstance, TickInput, place_blocks, tick};
