//! Game state and core simulation types
//!
//! `GameState` explicitly owns every pool, grid and controller; nothing in the
//! simulation is global.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::boss::{Boss, BossAction};
use super::collision::{AreaHit, BlastMarker};
use super::encounter::{EncounterMachine, EncounterState};
use super::pool::{ParticlePool, ParticleSpawn, ParticleTag, Pool};
use super::projectile::{Blast, Faction, Projectile, ProjectileSpawn};
use super::rank::RankController;
use super::spatial::SpatialGrid;
use crate::consts::*;
use crate::scores::EncounterSummary;
use crate::settings::{Settings, ShipType};
use crate::tuning::{EnemyTuning, Tuning};

/// Seconds a hit flash lasts on enemies and the player
pub const HIT_FLASH_SECS: f32 = 0.08;
/// Shield energy drained per second while held
pub const SHIELD_DRAIN_PER_SEC: f32 = 0.5;
/// Shield energy regained per second while released
pub const SHIELD_RECHARGE_PER_SEC: f32 = 0.2;
/// Knockback velocity lost per second (fraction)
pub const KNOCKBACK_DAMPING: f32 = 4.0;
/// How long blast markers stay in the overlay
pub const BLAST_MARKER_SECS: f32 = 0.35;

/// Reference to anything a projectile can hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetRef {
    /// Enemy by id (ids are stable for an enemy's whole life)
    Enemy(u32),
    Boss,
    Player,
}

/// Result of applying damage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Already defeated or currently invulnerable
    Ignored,
    Hit,
    /// HP crossed zero on this call
    Defeated,
}

/// Anything with hit points
pub trait Damageable {
    fn center(&self) -> Vec2;
    fn hit_radius(&self) -> f32;
    fn apply_damage(&mut self, amount: f32) -> DamageOutcome;
    fn is_defeated(&self) -> bool;
}

/// Shared HP bookkeeping: defeat is reported exactly once
pub(crate) fn apply_health_damage(
    hp: &mut f32,
    defeated: &mut bool,
    flash_timer: &mut f32,
    flash_secs: f32,
    amount: f32,
) -> DamageOutcome {
    if *defeated || !(amount > 0.0) {
        return DamageOutcome::Ignored;
    }
    *hp -= amount;
    *flash_timer = flash_secs;
    if *hp <= 0.0 {
        *hp = 0.0;
        *defeated = true;
        DamageOutcome::Defeated
    } else {
        DamageOutcome::Hit
    }
}

/// The player's ship
#[derive(Debug, Clone)]
pub struct Player {
    pub pos: Vec2,
    /// Hitbox radius
    pub radius: f32,
    /// Remaining lives; one standard enemy bullet costs one life
    pub hp: f32,
    pub ship: ShipType,
    pub invuln_timer: f32,
    pub invuln_secs: f32,
    pub flash_timer: f32,
    pub fire_cooldown: f32,
    pub missile_cooldown: f32,
    /// 0-1 shield charge
    pub shield_energy: f32,
    /// Shield raised this frame
    pub shielding: bool,
    defeated: bool,
}

impl Player {
    pub fn new(tuning: &Tuning, ship: ShipType) -> Self {
        Self {
            pos: Self::spawn_point(),
            radius: tuning.player.radius,
            hp: tuning.player.lives as f32,
            ship,
            invuln_timer: 0.0,
            invuln_secs: tuning.player.invuln_secs,
            flash_timer: 0.0,
            fire_cooldown: 0.0,
            missile_cooldown: 0.0,
            shield_energy: 1.0,
            shielding: false,
            defeated: false,
        }
    }

    pub fn spawn_point() -> Vec2 {
        Vec2::new(PLAYFIELD_WIDTH * 0.5, PLAYFIELD_HEIGHT - 64.0)
    }

    pub fn lives(&self) -> u8 {
        self.hp.ceil().clamp(0.0, u8::MAX as f32) as u8
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invuln_timer > 0.0
    }

    /// Move by `axis` (each component in [-1, 1]) and clamp to the playfield
    pub fn steer(&mut self, axis: Vec2, speed: f32, dt: f32) {
        let axis = if axis.is_finite() {
            axis.clamp_length_max(1.0)
        } else {
            Vec2::ZERO
        };
        self.pos += axis * speed * dt;
        self.pos = self.pos.clamp(
            Vec2::splat(self.radius),
            Vec2::new(PLAYFIELD_WIDTH - self.radius, PLAYFIELD_HEIGHT - self.radius),
        );
    }

    /// Raise or lower the shield, draining or recharging energy
    pub fn update_shield(&mut self, held: bool, dt: f32) {
        self.shielding = held && self.shield_energy > 0.0;
        if self.shielding {
            self.shield_energy = (self.shield_energy - SHIELD_DRAIN_PER_SEC * dt).max(0.0);
        } else {
            self.shield_energy = (self.shield_energy + SHIELD_RECHARGE_PER_SEC * dt).min(1.0);
        }
    }

    pub fn tick_timers(&mut self, dt: f32) {
        self.invuln_timer = (self.invuln_timer - dt).max(0.0);
        self.flash_timer = (self.flash_timer - dt).max(0.0);
        self.fire_cooldown = (self.fire_cooldown - dt).max(0.0);
        self.missile_cooldown = (self.missile_cooldown - dt).max(0.0);
    }
}

impl Damageable for Player {
    fn center(&self) -> Vec2 {
        self.pos
    }

    fn hit_radius(&self) -> f32 {
        self.radius
    }

    fn apply_damage(&mut self, amount: f32) -> DamageOutcome {
        if self.is_invulnerable() {
            return DamageOutcome::Ignored;
        }
        let outcome = apply_health_damage(
            &mut self.hp,
            &mut self.defeated,
            &mut self.flash_timer,
            HIT_FLASH_SECS,
            amount,
        );
        if outcome == DamageOutcome::Hit {
            self.invuln_timer = self.invuln_secs;
        }
        outcome
    }

    fn is_defeated(&self) -> bool {
        self.defeated
    }
}

/// Enemy archetypes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyKind {
    /// Sways down the screen firing aimed shots
    Drone,
    /// Like a drone, but its shots home in
    Gunner,
    /// Boss add: dives at the player, never fires
    Minion,
}

#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: u32,
    pub kind: EnemyKind,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Impulse from explosions, decays over time
    pub knockback: Vec2,
    pub radius: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub flash_timer: f32,
    pub fire_timer: f32,
    pub score: u64,
    age: f32,
    base_x: f32,
    defeated: bool,
    /// Left the playfield without being destroyed
    escaped: bool,
}

impl Enemy {
    pub fn new(id: u32, kind: EnemyKind, pos: Vec2, hp: f32, tuning: &EnemyTuning) -> Self {
        let (radius, vel, hp, score) = match kind {
            EnemyKind::Minion => (
                tuning.radius * 0.7,
                Vec2::new(0.0, tuning.speed * 2.2),
                hp * 0.5,
                tuning.score / 2,
            ),
            _ => (tuning.radius, Vec2::new(0.0, tuning.speed), hp, tuning.score),
        };
        Self {
            id,
            kind,
            pos,
            vel,
            knockback: Vec2::ZERO,
            radius,
            hp,
            max_hp: hp,
            flash_timer: 0.0,
            fire_timer: tuning.fire_interval * 0.5,
            score,
            age: 0.0,
            base_x: pos.x,
            defeated: false,
            escaped: false,
        }
    }

    pub fn is_escaped(&self) -> bool {
        self.escaped
    }

    /// Still part of the world after this frame's sweep
    pub fn is_active(&self) -> bool {
        !self.defeated && !self.escaped
    }

    pub fn fires(&self) -> bool {
        !matches!(self.kind, EnemyKind::Minion)
    }

    pub fn add_knockback(&mut self, impulse: Vec2) {
        if impulse.is_finite() {
            self.knockback += impulse;
        }
    }

    pub fn integrate(&mut self, dt: f32, tuning: &EnemyTuning) {
        self.age += dt;
        self.flash_timer = (self.flash_timer - dt).max(0.0);
        self.base_x += self.knockback.x * dt;
        self.pos.y += (self.vel.y + self.knockback.y) * dt;
        self.pos.x = match self.kind {
            EnemyKind::Minion => self.base_x,
            _ => {
                self.base_x
                    + (self.age * tuning.sway_frequency * TAU).sin() * tuning.sway_amplitude
            }
        };
        self.knockback *= (1.0 - KNOCKBACK_DAMPING * dt).max(0.0);

        if self.pos.y - self.radius > PLAYFIELD_HEIGHT + CULL_MARGIN {
            self.escaped = true;
        }
    }
}

impl Damageable for Enemy {
    fn center(&self) -> Vec2 {
        self.pos
    }

    fn hit_radius(&self) -> f32 {
        self.radius
    }

    fn apply_damage(&mut self, amount: f32) -> DamageOutcome {
        apply_health_damage(
            &mut self.hp,
            &mut self.defeated,
            &mut self.flash_timer,
            HIT_FLASH_SECS,
            amount,
        )
    }

    fn is_defeated(&self) -> bool {
        self.defeated
    }
}

/// Events produced during a tick, drained by the host
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    StateChanged {
        from: EncounterState,
        to: EncounterState,
    },
    WaveStarted {
        wave: u32,
        cycle: u32,
        boss: bool,
    },
    WaveCleared {
        wave: u32,
    },
    PlayerFired,
    EnemyHit {
        pos: Vec2,
    },
    EnemyKilled {
        id: u32,
        pos: Vec2,
    },
    BossSpawned {
        hp: f32,
    },
    BossEnraged,
    BossDefeated {
        pos: Vec2,
    },
    Explosion {
        pos: Vec2,
        radius: f32,
    },
    Graze {
        pos: Vec2,
    },
    ShieldBlock {
        pos: Vec2,
    },
    PlayerHit {
        lives_left: u8,
    },
    PlayerDestroyed,
    EncounterEnded {
        victory: bool,
    },
}

/// Wave bookkeeping
#[derive(Debug, Clone, Default)]
pub struct WaveProgress {
    /// 0-based wave index within the campaign
    pub index: u32,
    pub cycle: u32,
    pub boss_wave: bool,
    /// Enemies to spawn this wave (after rank scaling)
    pub quota: u32,
    pub spawned: u32,
    pub spawn_timer: f32,
    pub boss_spawned: bool,
}

impl WaveProgress {
    pub fn spawning_done(&self) -> bool {
        if self.boss_wave {
            self.boss_spawned
        } else {
            self.spawned >= self.quota
        }
    }
}

/// A target defeated during the collision pass, rewarded after it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KillRecord {
    pub target: TargetRef,
    pub pos: Vec2,
    pub score: u64,
}

/// Reusable per-frame buffers
#[derive(Debug, Default)]
pub(crate) struct Scratch {
    pub candidates: Vec<TargetRef>,
    pub area_targets: Vec<(TargetRef, Vec2)>,
    pub area_hits: Vec<AreaHit<TargetRef>>,
    pub detonations: Vec<(Vec2, Blast, Faction)>,
    pub kills: Vec<KillRecord>,
    pub grazes: Vec<Vec2>,
    /// Worst thing that happened to the player this frame
    pub player_outcome: Option<DamageOutcome>,
    pub boss_actions: Vec<BossAction>,
    pub spawns: Vec<ProjectileSpawn>,
}

/// Complete simulation state
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    rng: Pcg32,
    pub settings: Settings,
    pub tuning: Tuning,
    pub encounter: EncounterMachine,
    pub rank: RankController,
    pub player: Player,
    /// Sorted by id
    pub enemies: Vec<Enemy>,
    pub boss: Option<Boss>,
    pub projectiles: Pool<Projectile>,
    pub particles: ParticlePool,
    /// Enemies and boss, for player-faction projectiles
    pub hostile_grid: SpatialGrid<TargetRef>,
    /// The player, for enemy/boss projectiles
    pub player_grid: SpatialGrid<TargetRef>,
    /// Explosions shown by the diagnostic overlay
    pub blast_markers: Vec<BlastMarker>,
    pub wave: WaveProgress,
    pub score: u64,
    pub kills: u32,
    pub grazes: u32,
    /// Seconds of simulated encounter time
    pub elapsed: f32,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub(crate) events: Vec<GameEvent>,
    pub(crate) scratch: Scratch,
    summary: Option<EncounterSummary>,
    next_id: u32,
}

impl GameState {
    /// Create a new game state with the given seed
    pub fn new(seed: u64, settings: Settings, tuning: Tuning) -> Self {
        let particle_reserve = settings.quality.particle_reserve();
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            encounter: EncounterMachine::new(settings.strict_transitions),
            rank: RankController::new(settings.rank.clone()),
            player: Player::new(&tuning, settings.ship),
            enemies: Vec::new(),
            boss: None,
            projectiles: Pool::with_capacity(512),
            particles: ParticlePool::with_capacity(particle_reserve),
            hostile_grid: SpatialGrid::new(GRID_CELL_SIZE),
            player_grid: SpatialGrid::new(GRID_CELL_SIZE),
            blast_markers: Vec::new(),
            wave: WaveProgress::default(),
            score: 0,
            kills: 0,
            grazes: 0,
            elapsed: 0.0,
            time_ticks: 0,
            events: Vec::new(),
            scratch: Scratch::default(),
            summary: None,
            next_id: 1,
            settings,
            tuning,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn state(&self) -> EncounterState {
        self.encounter.state()
    }

    /// Move the encounter machine, recording a `StateChanged` event
    ///
    /// Strict-mode rejections are logged by the machine and leave state as is.
    pub fn change_state(&mut self, target: EncounterState) -> bool {
        use super::encounter::Transition;
        match self.encounter.transition(target) {
            Ok(Transition::Unchanged) => true,
            Ok(Transition::Moved { from, to }) | Ok(Transition::Forced { from, to }) => {
                self.events.push(GameEvent::StateChanged { from, to });
                true
            }
            Err(_) => false,
        }
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Events since the last drain, oldest first
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, GameEvent> {
        self.events.drain(..)
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Hand the finished encounter's summary to the caller (once)
    pub fn take_summary(&mut self) -> Option<EncounterSummary> {
        self.summary.take()
    }

    pub(crate) fn set_summary(&mut self, summary: EncounterSummary) {
        self.summary = Some(summary);
    }

    pub fn enemy_index(&self, id: u32) -> Option<usize> {
        self.enemies.binary_search_by_key(&id, |e| e.id).ok()
    }

    pub fn spawn_projectile(&mut self, spawn: ProjectileSpawn) {
        self.projectiles.acquire(spawn);
    }

    /// Number of live projectiles fired by `faction`
    pub fn projectile_count(&self, faction: Faction) -> usize {
        self.projectiles
            .iter()
            .filter(|(_, p)| p.faction == faction)
            .count()
    }

    pub fn spawn_enemy(&mut self, kind: EnemyKind, pos: Vec2) -> u32 {
        let id = self.next_entity_id();
        let hp = self.tuning.enemy_hp(self.wave.cycle);
        self.enemies
            .push(Enemy::new(id, kind, pos, hp, &self.tuning.enemy));
        id
    }

    /// Uniform random x within the playfield margins
    pub fn random_spawn_x(&mut self, margin: f32) -> f32 {
        let margin = margin.min(PLAYFIELD_WIDTH * 0.5 - 1.0).max(0.0);
        self.rng.random_range(margin..PLAYFIELD_WIDTH - margin)
    }

    pub fn roll_percent(&mut self) -> u32 {
        self.rng.random_range(0..100)
    }

    /// Spray `count` particles from `pos`, scaled by the quality preset
    pub fn emit_particles(&mut self, pos: Vec2, count: u32, tag: ParticleTag) {
        let count = (count as f32 * self.settings.quality.particle_scale()).round() as u32;
        for _ in 0..count {
            let angle = self.rng.random_range(0.0..TAU);
            let speed = self.rng.random_range(40.0..220.0);
            let life = self.rng.random_range(0.25..0.7);
            let size = self.rng.random_range(1.5..4.0);
            self.particles.acquire(ParticleSpawn {
                pos,
                vel: Vec2::new(angle.cos(), angle.sin()) * speed,
                life,
                size,
                tag,
            });
        }
    }

    /// Record a blast for the overlay, using the radius that dealt damage
    pub fn mark_blast(&mut self, origin: Vec2, radius: f32) {
        if self.settings.debug_overlay {
            self.blast_markers.push(BlastMarker {
                origin,
                radius,
                ttl: BLAST_MARKER_SECS,
            });
        }
    }

    pub fn build_summary(&self, victory: bool) -> EncounterSummary {
        EncounterSummary {
            score: self.score,
            kills: self.kills,
            wave: self.wave.index + 1,
            cycle: self.wave.cycle + 1,
            ship: self.player.ship,
            elapsed_secs: self.elapsed,
            victory,
        }
    }

    /// Fresh player, empty world, baseline rank: ready for a new run
    pub fn reset_run(&mut self) {
        self.projectiles.drain();
        self.particles.clear();
        self.enemies.clear();
        self.boss = None;
        self.blast_markers.clear();
        self.hostile_grid.clear();
        self.player_grid.clear();
        self.rank.reset();
        self.player = Player::new(&self.tuning, self.settings.ship);
        self.wave = WaveProgress::default();
        self.score = 0;
        self.kills = 0;
        self.grazes = 0;
        self.elapsed = 0.0;
        self.summary = None;
    }
}
