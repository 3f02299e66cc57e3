//! Deterministic simulation module
//!
//! All combat logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only (the driver may scale `dt` for hit-stop)
//! - Seeded RNG only
//! - Stable iteration order (by entity ID / pool slot)
//! - No rendering, audio or platform dependencies

pub mod boss;
pub mod collision;
pub mod combat;
pub mod encounter;
pub mod pool;
pub mod projectile;
pub mod rank;
pub mod spatial;
pub mod state;
pub mod tick;

pub use boss::{BOSS_ANCHOR_Y, Boss, BossAction, BossPhase};
pub use collision::{
    AreaHit, BlastMarker, circle_overlap, resolve_area_damage, resolve_area_damage_into,
    segment_vs_circle,
};
pub use encounter::{EncounterMachine, EncounterState, Transition};
pub use pool::{Handle, Particle, ParticlePool, ParticleSpawn, ParticleTag, Pool, Poolable};
pub use projectile::{Behavior, Blast, Faction, Homing, Projectile, ProjectileSpawn};
pub use rank::{RankConfig, RankController};
pub use spatial::SpatialGrid;
pub use state::{
    DamageOutcome, Damageable, Enemy, EnemyKind, GameEvent, GameState, Player, TargetRef,
    WaveProgress,
};
pub use tick::{TickInput, abort_encounter, begin_run, start_wave, tick};
