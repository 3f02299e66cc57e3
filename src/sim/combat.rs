//! Per-frame collision pass
//!
//! Runs after every position has been integrated. Damage is applied during the
//! pass, but nothing is removed from a pool or collection until `sweep`, so the
//! collections being iterated never change underneath the loop.

use glam::Vec2;

use super::collision::{circle_overlap, resolve_area_damage_into, segment_vs_circle};
use super::pool::ParticleTag;
use super::state::{DamageOutcome, Damageable, GameEvent, GameState, KillRecord, TargetRef};
use crate::consts::*;

/// Blast particles per explosion before quality scaling
const KILL_PARTICLES: u32 = 12;
const BOSS_PARTICLES: u32 = 80;

/// Full collision pass for one frame
pub fn run(state: &mut GameState) {
    rebuild_grids(state);
    resolve_projectiles(state);
    resolve_detonations(state);
    resolve_contacts(state);
    detect_grazes(state);
    reward_kills(state);
    sweep(state);
}

/// Re-register every live target at its current position
pub fn rebuild_grids(state: &mut GameState) {
    state.hostile_grid.clear();
    state.player_grid.clear();

    for enemy in state.enemies.iter().filter(|e| e.is_active()) {
        state
            .hostile_grid
            .insert(TargetRef::Enemy(enemy.id), enemy.pos, enemy.radius);
    }
    if let Some(boss) = state.boss.as_ref().filter(|b| !b.is_defeated()) {
        state
            .hostile_grid
            .insert(TargetRef::Boss, boss.center(), boss.hit_radius());
    }
    if !state.player.is_defeated() {
        state
            .player_grid
            .insert(TargetRef::Player, state.player.pos, state.player.radius);
    }
}

/// Test every unmarked projectile against the opposing faction's grid
pub fn resolve_projectiles(state: &mut GameState) {
    let GameState {
        projectiles,
        enemies,
        boss,
        player,
        hostile_grid,
        player_grid,
        scratch,
        events,
        ..
    } = state;
    let shielding = player.shielding;

    for (_, proj) in projectiles.iter_mut() {
        if proj.marked {
            continue;
        }
        let grid = if proj.faction.is_hostile() {
            &*player_grid
        } else {
            &*hostile_grid
        };

        // Beams query around their midpoint so the whole segment is covered
        let beam = proj.beam_segment();
        let (query_center, query_radius) = match beam {
            Some((a, b)) => ((a + b) * 0.5, a.distance(b) * 0.5 + proj.radius),
            None => (proj.pos, proj.radius),
        };
        scratch.candidates.clear();
        grid.query_into(query_center, query_radius, &mut scratch.candidates);

        for &target in &scratch.candidates {
            if proj.has_hit(target) {
                continue;
            }
            let body: &mut dyn Damageable = match target {
                TargetRef::Enemy(id) => {
                    match enemies.binary_search_by_key(&id, |e| e.id) {
                        Ok(idx) => &mut enemies[idx],
                        Err(_) => continue,
                    }
                }
                TargetRef::Boss => match boss.as_mut() {
                    Some(b) => b,
                    None => continue,
                },
                TargetRef::Player => &mut *player,
            };
            if body.is_defeated() {
                continue;
            }

            let center = body.center();
            let reach = body.hit_radius();
            let touching = match beam {
                Some((a, b)) => segment_vs_circle(a, b, center, reach + proj.radius),
                None => circle_overlap(proj.pos, proj.radius, center, reach),
            };
            if !touching {
                continue;
            }

            proj.record_hit(target);

            // Explosives damage everything in range instead of the single target
            if let Some(blast) = proj.behavior.blast() {
                scratch.detonations.push((proj.pos, blast, proj.faction));
                proj.marked = true;
                break;
            }

            if target == TargetRef::Player && shielding {
                events.push(GameEvent::ShieldBlock { pos: proj.pos });
                proj.marked = true;
                break;
            }

            let outcome = body.apply_damage(proj.effective_damage());
            match (target, outcome) {
                // Invulnerable: the bullet passes through and may still graze
                (TargetRef::Player, DamageOutcome::Ignored) => continue,
                (TargetRef::Player, outcome) => note_player_outcome(&mut scratch.player_outcome, outcome),
                (_, DamageOutcome::Hit) => events.push(GameEvent::EnemyHit { pos: proj.pos }),
                (_, DamageOutcome::Defeated) => {
                    let score = match target {
                        TargetRef::Enemy(id) => enemies
                            .binary_search_by_key(&id, |e| e.id)
                            .map(|idx| enemies[idx].score)
                            .unwrap_or(0),
                        _ => 0,
                    };
                    scratch.kills.push(KillRecord {
                        target,
                        pos: center,
                        score,
                    });
                }
                (_, DamageOutcome::Ignored) => {}
            }

            if !proj.behavior.penetrates() {
                proj.marked = true;
                break;
            }
        }
    }
}

/// Apply queued explosions as area damage
pub fn resolve_detonations(state: &mut GameState) {
    let mut detonations = std::mem::take(&mut state.scratch.detonations);

    for &(origin, blast, faction) in &detonations {
        let scratch = &mut state.scratch;
        scratch.area_targets.clear();
        if faction.is_hostile() {
            if !state.player.is_defeated() {
                scratch.area_targets.push((TargetRef::Player, state.player.pos));
            }
        } else {
            scratch.area_targets.extend(
                state
                    .enemies
                    .iter()
                    .filter(|e| e.is_active())
                    .map(|e| (TargetRef::Enemy(e.id), e.pos)),
            );
            if let Some(boss) = state.boss.as_ref().filter(|b| !b.is_defeated()) {
                scratch.area_targets.push((TargetRef::Boss, boss.center()));
            }
        }

        resolve_area_damage_into(
            origin,
            blast.radius,
            blast.damage,
            blast.knockback,
            scratch.area_targets.iter().copied(),
            &mut scratch.area_hits,
        );

        for hit in &scratch.area_hits {
            match hit.target {
                TargetRef::Enemy(id) => {
                    let Ok(idx) = state.enemies.binary_search_by_key(&id, |e| e.id) else {
                        continue;
                    };
                    let enemy = &mut state.enemies[idx];
                    enemy.add_knockback(hit.knockback);
                    if enemy.apply_damage(hit.damage) == DamageOutcome::Defeated {
                        scratch.kills.push(KillRecord {
                            target: hit.target,
                            pos: enemy.pos,
                            score: enemy.score,
                        });
                    }
                }
                // Boss and player hold their ground; only enemies are pushed
                TargetRef::Boss => {
                    if let Some(boss) = state.boss.as_mut()
                        && boss.apply_damage(hit.damage) == DamageOutcome::Defeated
                    {
                        scratch.kills.push(KillRecord {
                            target: hit.target,
                            pos: boss.center(),
                            score: 0,
                        });
                    }
                }
                TargetRef::Player => {
                    if !state.player.shielding {
                        let outcome = state.player.apply_damage(hit.damage);
                        note_player_outcome(&mut scratch.player_outcome, outcome);
                    }
                }
            }
        }

        state.events.push(GameEvent::Explosion {
            pos: origin,
            radius: blast.radius,
        });
        state.mark_blast(origin, blast.radius);
        state.emit_particles(origin, blast.particles, ParticleTag::Ember);
    }

    detonations.clear();
    state.scratch.detonations = detonations;
}

/// Ramming an enemy or the boss hurts the player
pub fn resolve_contacts(state: &mut GameState) {
    let player = &mut state.player;
    if player.is_defeated() || player.is_invulnerable() {
        return;
    }
    let contact_damage = state.tuning.enemy.contact_damage;

    let rammed = state
        .enemies
        .iter()
        .filter(|e| e.is_active())
        .any(|e| circle_overlap(player.pos, player.radius, e.pos, e.radius))
        || state
            .boss
            .as_ref()
            .filter(|b| !b.is_defeated())
            .is_some_and(|b| circle_overlap(player.pos, player.radius, b.center(), b.hit_radius()));

    if rammed {
        let outcome = player.apply_damage(contact_damage);
        note_player_outcome(&mut state.scratch.player_outcome, outcome);
    }
}

/// Count hostile projectiles brushing past the player without hitting
pub fn detect_grazes(state: &mut GameState) {
    if state.player.is_defeated() {
        return;
    }
    let player_pos = state.player.pos;
    let player_radius = state.player.radius;
    let graze_radius = state.tuning.graze_radius;
    let mut grazed_at = std::mem::take(&mut state.scratch.grazes);
    grazed_at.clear();

    for (_, proj) in state.projectiles.iter_mut() {
        if proj.marked || proj.grazed || !proj.faction.is_hostile() {
            continue;
        }
        let near = circle_overlap(proj.pos, proj.radius, player_pos, player_radius + graze_radius);
        let touching = circle_overlap(proj.pos, proj.radius, player_pos, player_radius);
        if near && !touching {
            proj.grazed = true;
            grazed_at.push(proj.pos);
        }
    }

    for &pos in &grazed_at {
        state.grazes += 1;
        state.score += state.tuning.graze_score;
        state.rank.on_graze();
        state.events.push(GameEvent::Graze { pos });
        state.emit_particles(pos, 2, ParticleTag::Spark);
    }
    grazed_at.clear();
    state.scratch.grazes = grazed_at;
}

/// Score, rank and effects for everything defeated this frame
pub fn reward_kills(state: &mut GameState) {
    let mut kills = std::mem::take(&mut state.scratch.kills);

    for kill in &kills {
        match kill.target {
            TargetRef::Enemy(id) => {
                state.kills += 1;
                state.score += kill.score;
                state.rank.on_kill();
                state.events.push(GameEvent::EnemyKilled { id, pos: kill.pos });
                state.emit_particles(kill.pos, KILL_PARTICLES, ParticleTag::Spark);
            }
            TargetRef::Boss => {
                state.kills += 1;
                state.score += state.tuning.boss.score;
                state.rank.on_kill();
                log::info!("Boss defeated on wave {}", state.wave.index + 1);
                state.events.push(GameEvent::BossDefeated { pos: kill.pos });
                state.emit_particles(kill.pos, BOSS_PARTICLES, ParticleTag::Ember);
                state.emit_particles(kill.pos, BOSS_PARTICLES / 2, ParticleTag::Smoke);
            }
            TargetRef::Player => {}
        }
    }

    kills.clear();
    state.scratch.kills = kills;
}

/// Release consumed and out-of-bounds projectiles, drop dead entities
pub fn sweep(state: &mut GameState) {
    state
        .projectiles
        .release_where(|p| p.marked || p.ttl <= 0.0 || out_of_bounds(p.pos, p.radius));
    state.enemies.retain(|e| e.is_active());
    if state.boss.as_ref().is_some_and(|b| b.is_defeated()) {
        state.boss = None;
    }
}

fn out_of_bounds(pos: Vec2, radius: f32) -> bool {
    let margin = CULL_MARGIN + radius;
    !pos.is_finite()
        || pos.x < -margin
        || pos.y < -margin
        || pos.x > PLAYFIELD_WIDTH + margin
        || pos.y > PLAYFIELD_HEIGHT + margin
}

/// Keep the most severe player outcome seen this frame
fn note_player_outcome(slot: &mut Option<DamageOutcome>, outcome: DamageOutcome) {
    match (outcome, *slot) {
        (DamageOutcome::Ignored, _) => {}
        (_, Some(DamageOutcome::Defeated)) => {}
        _ => *slot = Some(outcome),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::sim::boss::Boss;
    use crate::sim::projectile::{Behavior, Blast, Faction, Homing, ProjectileSpawn};
    use crate::sim::state::EnemyKind;
    use crate::tuning::Tuning;

    fn new_state() -> GameState {
        let settings = Settings {
            debug_overlay: true,
            ..Settings::default()
        };
        GameState::new(42, settings, Tuning::default())
    }

    fn player_shot(pos: Vec2) -> ProjectileSpawn {
        ProjectileSpawn::new(pos, Vec2::new(0.0, -100.0), Faction::Player, 4.0, 10.0)
    }

    #[test]
    fn test_standard_shot_hits_one_target_and_is_consumed() {
        let mut state = new_state();
        let a = state.spawn_enemy(EnemyKind::Drone, Vec2::new(100.0, 100.0));
        let b = state.spawn_enemy(EnemyKind::Drone, Vec2::new(104.0, 100.0));
        state.spawn_projectile(player_shot(Vec2::new(102.0, 100.0)));

        run(&mut state);

        let hurt: Vec<_> = state.enemies.iter().filter(|e| e.hp < e.max_hp).map(|e| e.id).collect();
        assert_eq!(hurt.len(), 1);
        assert!(hurt[0] == a || hurt[0] == b);
        assert!(state.projectiles.is_empty());
    }

    #[test]
    fn test_piercing_shot_hits_each_target_once() {
        let mut state = new_state();
        state.spawn_enemy(EnemyKind::Drone, Vec2::new(100.0, 100.0));
        state.spawn_enemy(EnemyKind::Drone, Vec2::new(104.0, 100.0));
        state.spawn_projectile(player_shot(Vec2::new(102.0, 100.0)).with_behavior(Behavior::Piercing));

        run(&mut state);
        assert!(state.enemies.iter().all(|e| e.hp == e.max_hp - 10.0));
        assert_eq!(state.projectiles.len(), 1);

        // Same targets, next frame: no repeat damage
        run(&mut state);
        assert!(state.enemies.iter().all(|e| e.hp == e.max_hp - 10.0));
    }

    #[test]
    fn test_beam_hits_target_beside_its_tip() {
        let mut state = new_state();
        let id = state.spawn_enemy(EnemyKind::Drone, Vec2::new(100.0, 40.0));
        // Beam starts well below the enemy; only its body reaches it
        state.spawn_projectile(
            ProjectileSpawn::new(Vec2::new(100.0, 120.0), Vec2::new(0.0, -900.0), Faction::Player, 3.0, 4.0)
                .with_behavior(Behavior::Beam { length: 90.0 }),
        );

        run(&mut state);
        let idx = state.enemy_index(id).unwrap();
        assert_eq!(state.enemies[idx].hp, state.enemies[idx].max_hp - 4.0);
        assert_eq!(state.projectiles.len(), 1);
    }

    #[test]
    fn test_missile_detonation_uses_area_damage() {
        let mut state = new_state();
        let near = state.spawn_enemy(EnemyKind::Drone, Vec2::new(200.0, 200.0));
        let edge = state.spawn_enemy(EnemyKind::Drone, Vec2::new(240.0, 200.0));
        let far = state.spawn_enemy(EnemyKind::Drone, Vec2::new(300.0, 200.0));
        let blast = Blast {
            radius: 40.0,
            damage: 20.0,
            knockback: 100.0,
            particles: 4,
        };
        state.spawn_projectile(player_shot(Vec2::new(200.0, 200.0)).with_behavior(Behavior::Missile {
            homing: Homing::new(4.0, 400.0),
            blast,
        }));

        run(&mut state);

        let hp = |s: &GameState, id| {
            let e = &s.enemies[s.enemy_index(id).unwrap()];
            e.max_hp - e.hp
        };
        assert_eq!(hp(&state, near), 20.0);
        assert_eq!(hp(&state, edge), 10.0);
        assert_eq!(hp(&state, far), 0.0);
        assert_eq!(state.blast_markers.len(), 1);
        assert_eq!(state.blast_markers[0].radius, 40.0);
        assert!(state.events().iter().any(|e| matches!(e, GameEvent::Explosion { radius, .. } if *radius == 40.0)));
    }

    #[test]
    fn test_area_damage_reaches_boss_by_center() {
        let mut state = new_state();
        state.boss = Some(Boss::new(99, Vec2::new(240.0, 130.0), Vec2::new(120.0, 80.0), 500.0));
        let blast = Blast {
            radius: 30.0,
            damage: 40.0,
            knockback: 0.0,
            particles: 0,
        };
        // Touches the bottom edge of the hitbox; center is 30 away
        state.spawn_projectile(
            player_shot(Vec2::new(240.0, 160.0)).with_behavior(Behavior::Explosive(blast)),
        );

        run(&mut state);
        let boss = state.boss.as_ref().unwrap();
        assert_eq!(boss.hp, 480.0);
    }

    #[test]
    fn test_kill_is_rewarded_once() {
        let mut state = new_state();
        let id = state.spawn_enemy(EnemyKind::Drone, Vec2::new(100.0, 100.0));
        for _ in 0..5 {
            state.spawn_projectile(player_shot(Vec2::new(100.0, 100.0)));
        }

        run(&mut state);

        assert_eq!(state.kills, 1);
        assert_eq!(state.score, state.tuning.enemy.score);
        assert_eq!(state.rank.kill_count(), 1);
        assert!(state.enemies.is_empty());
        let killed = state
            .events()
            .iter()
            .filter(|e| matches!(e, GameEvent::EnemyKilled { id: k, .. } if *k == id))
            .count();
        assert_eq!(killed, 1);
        // Shots arriving after the kill find nothing to hit
        assert_eq!(state.projectiles.len(), 2);
    }

    #[test]
    fn test_boss_defeat_emitted_once() {
        let mut state = new_state();
        state.boss = Some(Boss::new(99, Vec2::new(240.0, 130.0), Vec2::new(120.0, 80.0), 15.0));
        state.spawn_projectile(player_shot(Vec2::new(240.0, 130.0)));
        state.spawn_projectile(player_shot(Vec2::new(240.0, 130.0)));

        run(&mut state);
        run(&mut state);

        let defeated = state
            .events()
            .iter()
            .filter(|e| matches!(e, GameEvent::BossDefeated { .. }))
            .count();
        assert_eq!(defeated, 1);
        assert!(state.boss.is_none());
        assert_eq!(state.score, state.tuning.boss.score);
    }

    #[test]
    fn test_shield_absorbs_enemy_shot() {
        let mut state = new_state();
        state.player.shielding = true;
        let pos = state.player.pos;
        state.spawn_projectile(ProjectileSpawn::new(pos, Vec2::Y, Faction::Enemy, 5.0, 1.0));

        run(&mut state);
        assert_eq!(state.player.lives(), 3);
        assert!(state.scratch.player_outcome.is_none());
        assert!(state.projectiles.is_empty());
        assert!(state.events().iter().any(|e| matches!(e, GameEvent::ShieldBlock { .. })));
    }

    #[test]
    fn test_enemy_shot_hurts_player() {
        let mut state = new_state();
        let pos = state.player.pos;
        state.spawn_projectile(ProjectileSpawn::new(pos, Vec2::Y, Faction::Boss, 5.0, 1.0));

        run(&mut state);
        assert_eq!(state.player.lives(), 2);
        assert_eq!(state.scratch.player_outcome, Some(DamageOutcome::Hit));
    }

    #[test]
    fn test_invulnerable_player_lets_shot_through() {
        let mut state = new_state();
        state.player.invuln_timer = 1.0;
        let pos = state.player.pos;
        state.spawn_projectile(ProjectileSpawn::new(pos, Vec2::Y, Faction::Enemy, 3.0, 1.0));

        run(&mut state);
        assert_eq!(state.player.lives(), 3);
        assert_eq!(state.projectile_count(Faction::Enemy), 1);
        assert_eq!(state.scratch.player_outcome, None);

        // Once it drifts clear of the hull it can still count as a graze
        let offset = Vec2::new(state.player.radius + 8.0, 0.0);
        for (_, p) in state.projectiles.iter_mut() {
            p.pos = pos + offset;
        }
        run(&mut state);
        assert_eq!(state.grazes, 1);
        assert_eq!(state.player.lives(), 3);
    }

    #[test]
    fn test_player_shots_ignore_player() {
        let mut state = new_state();
        let pos = state.player.pos;
        state.spawn_projectile(player_shot(pos));
        run(&mut state);
        assert_eq!(state.player.lives(), 3);
        assert_eq!(state.projectiles.len(), 1);
    }

    #[test]
    fn test_graze_counted_once_per_projectile() {
        let mut state = new_state();
        let pos = state.player.pos + Vec2::new(state.player.radius + 10.0, 0.0);
        state.spawn_projectile(ProjectileSpawn::new(pos, Vec2::ZERO, Faction::Enemy, 3.0, 1.0));

        run(&mut state);
        run(&mut state);
        assert_eq!(state.grazes, 1);
        assert_eq!(state.rank.graze_count(), 1);
        assert_eq!(state.score, state.tuning.graze_score);
        assert_eq!(state.player.lives(), 3);
    }

    #[test]
    fn test_contact_damage_from_enemy() {
        let mut state = new_state();
        let pos = state.player.pos;
        state.spawn_enemy(EnemyKind::Minion, pos);
        run(&mut state);
        assert_eq!(state.player.lives(), 2);
        assert!(state.player.is_invulnerable());
    }

    #[test]
    fn test_sweep_culls_offscreen_and_expired() {
        let mut state = new_state();
        state.spawn_projectile(player_shot(Vec2::new(100.0, -200.0)));
        state.spawn_projectile(player_shot(Vec2::new(100.0, 300.0)).with_ttl(0.0));
        state.spawn_projectile(player_shot(Vec2::new(f32::NAN, 300.0)));
        state.spawn_projectile(player_shot(Vec2::new(100.0, 300.0)));
        sweep(&mut state);
        assert_eq!(state.projectiles.len(), 1);
    }
}
