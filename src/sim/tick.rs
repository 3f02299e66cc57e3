//! Fixed timestep simulation tick
//!
//! One call advances the world by `dt`. Order within a frame: menu input,
//! encounter gating, player, spawner, enemy and boss AI, projectile and
//! particle integration, then the collision pass against the freshly
//! integrated positions.

use glam::Vec2;

use super::boss::{Boss, BossAction};
use super::combat;
use super::encounter::EncounterState;
use super::pool::ParticleTag;
use super::projectile::{Behavior, Blast, Faction, Homing, ProjectileSpawn};
use super::state::{DamageOutcome, Damageable, EnemyKind, GameEvent, GameState, WaveProgress};
use crate::consts::*;
use crate::settings::ShipType;

/// Particle velocity lost per second
const PARTICLE_DRAG: f32 = 1.5;
/// Horizontal offset of the twin guns
const GUN_OFFSET: f32 = 6.0;
const MISSILE_LAUNCH_SPEED: f32 = 260.0;
const MISSILE_TURN_RATE: f32 = 4.0;
const MISSILE_MAX_SPEED: f32 = 420.0;
const MISSILE_KNOCKBACK: f32 = 160.0;
const BEAM_SPEED: f32 = 900.0;
const ENEMY_HOMING_TURN_RATE: f32 = 1.5;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Movement axis, each component in [-1, 1]
    pub move_axis: Vec2,
    /// Primary (and secondary) weapon held
    pub fire: bool,
    /// Shield held
    pub shield: bool,
    /// Pause toggle (edge-triggered)
    pub pause: bool,
    /// Confirm / start (edge-triggered)
    pub start: bool,
    /// Abandon the current encounter
    pub abort: bool,
}

/// Advance the game state by one fixed timestep
///
/// `dt` may already be scaled by the driver (hit-stop); it is used as given.
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

    if input.abort && state.state().in_encounter() {
        abort_to_menu(state);
        return;
    }
    handle_menu_input(state, input);

    state.encounter.advance_clock(dt);
    let current = state.state();
    if !current.simulates() {
        return;
    }

    state.time_ticks += 1;
    state.elapsed += dt;
    state.rank.update(dt);

    update_player(state, input, dt, current.allows_fire());
    if current.allows_spawns() {
        update_spawner(state, dt);
    }
    update_enemies(state, dt, current.allows_fire());
    update_boss(state, dt, current.allows_fire());
    integrate_projectiles(state, dt);
    state.particles.update(dt, PARTICLE_DRAG);
    state.blast_markers.retain_mut(|m| {
        m.ttl -= dt;
        m.ttl > 0.0
    });

    combat::run(state);
    handle_player_damage(state);
    advance_encounter(state);
}

/// Menu flow and pause toggling
fn handle_menu_input(state: &mut GameState, input: &TickInput) {
    use EncounterState::*;

    if input.start {
        match state.state() {
            Intro | GameOver | Victory => {
                state.change_state(Hangar);
            }
            Hangar => begin_run(state),
            _ => {}
        }
    }

    if input.pause {
        match state.state() {
            Play | Warmup => {
                state.change_state(Pause);
            }
            Pause => {
                let resume = match state.encounter.previous() {
                    Warmup => Warmup,
                    _ => Play,
                };
                state.change_state(resume);
            }
            _ => {}
        }
    }
}

/// Fresh run starting at the first wave's warmup
pub fn begin_run(state: &mut GameState) {
    if !state.change_state(EncounterState::Warmup) {
        return;
    }
    state.reset_run();
    start_wave(state, 0);
    log::info!(
        "Run started (seed {}, ship {})",
        state.seed,
        state.player.ship.as_str()
    );
}

/// Drain every pool and rolling window; nothing in flight survives
pub fn abort_encounter(state: &mut GameState) {
    let released = state.projectiles.drain();
    state.particles.clear();
    state.enemies.clear();
    state.boss = None;
    state.blast_markers.clear();
    state.hostile_grid.clear();
    state.player_grid.clear();
    state.rank.clear_windows();
    state.scratch.player_outcome = None;
    log::debug!("Encounter aborted, released {released} projectiles");
}

fn abort_to_menu(state: &mut GameState) {
    if state.state().can_transition_to(EncounterState::Intro) {
        abort_encounter(state);
        state.change_state(EncounterState::Intro);
    } else {
        end_encounter(state, false);
    }
}

/// Finish the run, store the summary and move to GameOver / Victory
fn end_encounter(state: &mut GameState, victory: bool) {
    let summary = state.build_summary(victory);
    abort_encounter(state);
    let target = if victory {
        EncounterState::Victory
    } else {
        EncounterState::GameOver
    };
    if !state.change_state(target) {
        return;
    }
    log::info!(
        "Encounter ended ({}): score {}, wave {}, cycle {}",
        if victory { "victory" } else { "game over" },
        summary.score,
        summary.wave,
        summary.cycle
    );
    state.set_summary(summary);
    state.push_event(GameEvent::EncounterEnded { victory });
}

fn update_player(state: &mut GameState, input: &TickInput, dt: f32, allows_fire: bool) {
    let speed = state.tuning.player.speed;
    let player = &mut state.player;
    player.tick_timers(dt);
    player.steer(input.move_axis, speed, dt);
    player.update_shield(input.shield, dt);

    // No firing through the shield
    if !allows_fire || !input.fire || player.shielding || player.is_defeated() {
        return;
    }

    let tuning = &state.tuning.player;
    let pos = player.pos;
    let mut fired = false;

    if player.fire_cooldown <= 0.0 {
        player.fire_cooldown = tuning.fire_interval;
        fired = true;
        match player.ship {
            ShipType::Lancer => {
                state.scratch.spawns.push(
                    ProjectileSpawn::new(
                        pos,
                        Vec2::new(0.0, -BEAM_SPEED),
                        Faction::Player,
                        3.0,
                        tuning.beam_damage,
                    )
                    .with_behavior(Behavior::Beam {
                        length: tuning.beam_length,
                    })
                    .with_ttl(1.0),
                );
            }
            ShipType::Vanguard | ShipType::Striker => {
                for side in [-1.0, 1.0] {
                    state.scratch.spawns.push(ProjectileSpawn::new(
                        pos + Vec2::new(side * GUN_OFFSET, -4.0),
                        Vec2::new(0.0, -tuning.bullet_speed),
                        Faction::Player,
                        tuning.bullet_radius,
                        tuning.bullet_damage,
                    ));
                }
            }
        }
    }

    if player.ship == ShipType::Striker && player.missile_cooldown <= 0.0 {
        player.missile_cooldown = tuning.missile_interval;
        fired = true;
        let blast = Blast {
            radius: tuning.missile_blast_radius,
            damage: tuning.missile_damage,
            knockback: MISSILE_KNOCKBACK,
            particles: 16,
        };
        state.scratch.spawns.push(
            ProjectileSpawn::new(
                pos,
                Vec2::new(0.0, -MISSILE_LAUNCH_SPEED),
                Faction::Player,
                5.0,
                tuning.missile_damage,
            )
            .with_behavior(Behavior::Missile {
                homing: Homing::new(MISSILE_TURN_RATE, MISSILE_MAX_SPEED),
                blast,
            }),
        );
    }

    flush_spawns(state);
    if fired {
        state.push_event(GameEvent::PlayerFired);
    }
}

fn flush_spawns(state: &mut GameState) {
    let mut spawns = std::mem::take(&mut state.scratch.spawns);
    for spawn in spawns.drain(..) {
        state.spawn_projectile(spawn);
    }
    state.scratch.spawns = spawns;
}

/// Set up wave `index`; quota is scaled by the current rank
pub fn start_wave(state: &mut GameState, index: u32) {
    let waves = &state.tuning.waves;
    let per_cycle = waves.waves_per_cycle.max(1);
    let boss_wave = waves.boss_every > 0 && (index + 1) % waves.boss_every == 0;
    let density = state.rank.enemy_count_multiplier();
    let base = waves.base_enemies + waves.enemies_per_wave * index;
    let quota = ((base as f32 * density).round() as u32).max(1);

    state.wave = WaveProgress {
        index,
        cycle: index / per_cycle,
        boss_wave,
        quota,
        spawned: 0,
        spawn_timer: 0.0,
        boss_spawned: false,
    };
    log::info!(
        "Wave {} (cycle {}) started{}",
        index + 1,
        state.wave.cycle + 1,
        if boss_wave { " - boss wave" } else { "" }
    );
    log::debug!(
        "Wave {} tuning: quota {quota} (density x{density:.2}), fire rate x{:.2}",
        index + 1,
        state.rank.fire_rate_multiplier()
    );
    state.push_event(GameEvent::WaveStarted {
        wave: index + 1,
        cycle: state.wave.cycle + 1,
        boss: boss_wave,
    });
}

fn update_spawner(state: &mut GameState, dt: f32) {
    if state.wave.boss_wave {
        if !state.wave.boss_spawned && state.enemies.is_empty() {
            spawn_boss(state);
        }
        return;
    }

    state.wave.spawn_timer -= dt;
    while state.wave.spawn_timer <= 0.0 && state.wave.spawned < state.wave.quota {
        state.wave.spawn_timer += state.tuning.waves.spawn_interval;
        state.wave.spawned += 1;

        let radius = state.tuning.enemy.radius;
        let x = state.random_spawn_x(radius + state.tuning.enemy.sway_amplitude);
        let kind = if state.roll_percent() < state.tuning.enemy.homing_chance {
            EnemyKind::Gunner
        } else {
            EnemyKind::Drone
        };
        state.spawn_enemy(kind, Vec2::new(x, -radius));
    }
}

fn spawn_boss(state: &mut GameState) {
    let tuning = &state.tuning.boss;
    let size = Vec2::new(tuning.width, tuning.height);
    let hp = state.tuning.boss_hp(state.wave.index, state.wave.cycle);
    let id = state.next_entity_id();
    state.boss = Some(Boss::new(
        id,
        Vec2::new(PLAYFIELD_WIDTH * 0.5, -size.y * 0.5),
        size,
        hp,
    ));
    state.wave.boss_spawned = true;
    log::info!("Boss spawned with {hp:.0} HP");
    state.push_event(GameEvent::BossSpawned { hp });
}

fn update_enemies(state: &mut GameState, dt: f32, allows_fire: bool) {
    let fire_mult = state.rank.fire_rate_multiplier().max(0.05);
    let tuning = &state.tuning.enemy;
    let player_pos = state.player.pos;

    for enemy in &mut state.enemies {
        enemy.integrate(dt, tuning);
        if !allows_fire || !enemy.fires() || enemy.pos.y < 0.0 {
            continue;
        }
        enemy.fire_timer -= dt;
        if enemy.fire_timer > 0.0 {
            continue;
        }
        enemy.fire_timer += tuning.fire_interval / fire_mult;

        let dir = (player_pos - enemy.pos).normalize_or(Vec2::Y);
        let mut shot = ProjectileSpawn::new(
            enemy.pos,
            dir * tuning.bullet_speed,
            Faction::Enemy,
            tuning.bullet_radius,
            tuning.bullet_damage,
        );
        if enemy.kind == EnemyKind::Gunner {
            shot = shot.with_behavior(Behavior::Homing(Homing::new(
                ENEMY_HOMING_TURN_RATE,
                tuning.bullet_speed,
            )));
        }
        state.scratch.spawns.push(shot);
    }
    flush_spawns(state);
}

fn update_boss(state: &mut GameState, dt: f32, allows_fire: bool) {
    let Some(boss) = state.boss.as_mut() else {
        return;
    };
    if boss.update_phase(state.tuning.boss.rage_threshold) {
        log::info!("Boss enraged at {:.0}/{:.0} HP", boss.hp, boss.max_hp);
        state.events.push(GameEvent::BossEnraged);
    }

    let mut actions = std::mem::take(&mut state.scratch.boss_actions);
    actions.clear();
    boss.update(
        dt,
        state.player.pos,
        PLAYFIELD_WIDTH,
        &state.tuning.boss,
        state.rank.fire_rate_multiplier(),
        &mut actions,
    );

    if allows_fire {
        for action in actions.drain(..) {
            match action {
                BossAction::Fire(spawn) => state.spawn_projectile(spawn),
                BossAction::SpawnMinion(pos) => {
                    state.spawn_enemy(EnemyKind::Minion, pos);
                }
            }
        }
    }
    actions.clear();
    state.scratch.boss_actions = actions;
}

/// Refresh homing targets, then move every projectile
fn integrate_projectiles(state: &mut GameState, dt: f32) {
    let GameState {
        projectiles,
        enemies,
        boss,
        player,
        ..
    } = state;
    let player_pos = (!player.is_defeated()).then_some(player.pos);

    for (_, proj) in projectiles.iter_mut() {
        let faction = proj.faction;
        let pos = proj.pos;
        if let Some(homing) = proj.behavior.homing_mut() {
            homing.target = if faction.is_hostile() {
                player_pos
            } else {
                nearest_hostile(pos, enemies, boss.as_ref())
            };
        }
        proj.integrate(dt);
    }
}

fn nearest_hostile(
    from: Vec2,
    enemies: &[super::state::Enemy],
    boss: Option<&Boss>,
) -> Option<Vec2> {
    enemies
        .iter()
        .filter(|e| e.is_active())
        .map(|e| e.pos)
        .chain(boss.filter(|b| !b.is_defeated()).map(|b| b.center()))
        .min_by(|a, b| {
            a.distance_squared(from)
                .partial_cmp(&b.distance_squared(from))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// Lost a life: rank penalty, bullet clear; out of lives ends the run
fn handle_player_damage(state: &mut GameState) {
    let Some(outcome) = state.scratch.player_outcome.take() else {
        return;
    };
    if outcome == DamageOutcome::Ignored {
        return;
    }

    state.rank.on_death();
    let cleared = state.projectiles.release_where(|p| p.faction.is_hostile());
    let lives_left = state.player.lives();
    log::info!("Player hit, {lives_left} lives left ({cleared} bullets cleared)");
    state.push_event(GameEvent::PlayerHit { lives_left });
    let pos = state.player.pos;
    state.emit_particles(pos, 24, ParticleTag::Shield);

    if outcome == DamageOutcome::Defeated {
        state.push_event(GameEvent::PlayerDestroyed);
        end_encounter(state, false);
    }
}

/// Timed state changes and wave completion
fn advance_encounter(state: &mut GameState) {
    let waves = &state.tuning.waves;
    let warmup_secs = waves.warmup_secs;
    let intermission_secs = waves.intermission_secs;
    let total_waves = waves.waves_per_cycle.max(1) * waves.final_cycle.max(1);
    let in_state = state.encounter.time_in_state();

    match state.state() {
        EncounterState::Warmup if in_state >= warmup_secs => {
            state.change_state(EncounterState::Play);
        }
        EncounterState::Play => {
            let clear = state.wave.spawning_done() && state.enemies.is_empty() && state.boss.is_none();
            if !clear {
                return;
            }
            let wave = state.wave.index + 1;
            state.push_event(GameEvent::WaveCleared { wave });
            if wave >= total_waves {
                end_encounter(state, true);
            } else {
                log::info!("Wave {wave} cleared");
                state.change_state(EncounterState::Intermission);
            }
        }
        EncounterState::Intermission if in_state >= intermission_secs => {
            let next = state.wave.index + 1;
            start_wave(state, next);
            state.change_state(EncounterState::Play);
        }
        _ => {}
    }
}
