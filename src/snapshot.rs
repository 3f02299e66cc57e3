//! Read-only render snapshot
//!
//! The renderer gets flat, GPU-ready sprite instances once per frame and owns
//! no simulation state.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::sim::state::HIT_FLASH_SECS;
use crate::sim::{
    BlastMarker, BossPhase, Damageable, EncounterState, EnemyKind, Faction, GameState, ParticleTag,
};

/// Sprite kinds understood by the renderer
pub mod kinds {
    pub const PLAYER: u32 = 0;
    pub const SHIELD: u32 = 1;
    pub const DRONE: u32 = 2;
    pub const GUNNER: u32 = 3;
    pub const MINION: u32 = 4;
    pub const BOSS: u32 = 5;
    pub const PLAYER_SHOT: u32 = 6;
    pub const ENEMY_SHOT: u32 = 7;
    pub const BEAM: u32 = 8;
    pub const PARTICLE: u32 = 9;
}

/// Colors for game elements
pub mod colors {
    pub const PLAYER: [f32; 4] = [0.2, 0.8, 0.4, 1.0];
    pub const SHIELD: [f32; 4] = [0.4, 0.7, 1.0, 0.5];
    pub const DRONE: [f32; 4] = [0.9, 0.3, 0.3, 1.0];
    pub const GUNNER: [f32; 4] = [1.0, 0.55, 0.2, 1.0];
    pub const MINION: [f32; 4] = [0.8, 0.4, 0.9, 1.0];
    pub const BOSS: [f32; 4] = [0.7, 0.7, 0.8, 1.0];
    pub const BOSS_RAGE: [f32; 4] = [1.0, 0.2, 0.35, 1.0];
    pub const PLAYER_SHOT: [f32; 4] = [0.6, 1.0, 0.9, 1.0];
    pub const ENEMY_SHOT: [f32; 4] = [1.0, 0.85, 0.3, 1.0];
    pub const SPARK: [f32; 4] = [1.0, 1.0, 0.8, 1.0];
    pub const SMOKE: [f32; 4] = [0.35, 0.35, 0.4, 0.8];
    pub const EMBER: [f32; 4] = [1.0, 0.4, 0.2, 1.0];
}

/// One sprite instance, laid out for direct upload
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct SpriteInstance {
    pub position: [f32; 2],
    /// Radius (or half-width for boxes)
    pub size: f32,
    pub rotation: f32,
    pub color: [f32; 4],
    pub kind: u32,
    /// 0-1 hit flash intensity
    pub flash: f32,
}

impl SpriteInstance {
    pub fn new(pos: Vec2, size: f32, kind: u32, color: [f32; 4]) -> Self {
        Self {
            position: pos.to_array(),
            size,
            rotation: 0.0,
            color,
            kind,
            flash: 0.0,
        }
    }

    fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    fn with_flash(mut self, flash: f32) -> Self {
        self.flash = flash.clamp(0.0, 1.0);
        self
    }
}

/// Everything the renderer needs for one frame
#[derive(Debug, Clone, Default)]
pub struct RenderSnapshot {
    pub sprites: Vec<SpriteInstance>,
    /// Explosion overlays, same radius that dealt the damage
    pub blasts: Vec<BlastMarker>,
    pub score: u64,
    pub lives: u8,
    pub wave: u32,
    pub cycle: u32,
    pub rank: f32,
    /// `None` when no boss is on the field
    pub boss_hp: Option<f32>,
    pub shield_energy: f32,
    pub state: Option<EncounterState>,
}

impl RenderSnapshot {
    /// Sprite data as raw bytes for a vertex/instance buffer
    pub fn sprite_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.sprites)
    }
}

impl GameState {
    /// Fill `out` with this frame's view, reusing its allocations
    pub fn snapshot_into(&self, out: &mut RenderSnapshot) {
        out.sprites.clear();
        out.blasts.clear();

        let player = &self.player;
        if !player.is_defeated() {
            // Blink while invulnerable
            let visible = !player.is_invulnerable() || (player.invuln_timer * 10.0) as i32 % 2 == 0;
            if visible {
                out.sprites.push(
                    SpriteInstance::new(player.pos, 12.0, kinds::PLAYER, colors::PLAYER)
                        .with_flash(player.flash_timer / HIT_FLASH_SECS),
                );
            }
            if player.shielding {
                out.sprites
                    .push(SpriteInstance::new(player.pos, 20.0, kinds::SHIELD, colors::SHIELD));
            }
        }

        for enemy in self.enemies.iter().filter(|e| e.is_active()) {
            let (kind, color) = match enemy.kind {
                EnemyKind::Drone => (kinds::DRONE, colors::DRONE),
                EnemyKind::Gunner => (kinds::GUNNER, colors::GUNNER),
                EnemyKind::Minion => (kinds::MINION, colors::MINION),
            };
            out.sprites.push(
                SpriteInstance::new(enemy.pos, enemy.radius, kind, color)
                    .with_flash(enemy.flash_timer / HIT_FLASH_SECS),
            );
        }

        if let Some(boss) = &self.boss {
            let color = match boss.phase() {
                BossPhase::Normal => colors::BOSS,
                BossPhase::Rage => colors::BOSS_RAGE,
            };
            out.sprites.push(
                SpriteInstance::new(boss.center(), boss.size.x * 0.5, kinds::BOSS, color)
                    .with_flash(boss.flash_timer / HIT_FLASH_SECS),
            );
        }

        for (_, proj) in self.projectiles.iter() {
            let heading = proj.vel.y.atan2(proj.vel.x);
            let sprite = match (proj.beam_segment(), proj.faction) {
                (Some((a, b)), _) => SpriteInstance::new(
                    (a + b) * 0.5,
                    a.distance(b) * 0.5,
                    kinds::BEAM,
                    colors::PLAYER_SHOT,
                ),
                (None, Faction::Player) => {
                    SpriteInstance::new(proj.pos, proj.radius, kinds::PLAYER_SHOT, colors::PLAYER_SHOT)
                }
                (None, _) => {
                    SpriteInstance::new(proj.pos, proj.radius, kinds::ENEMY_SHOT, colors::ENEMY_SHOT)
                }
            };
            out.sprites.push(sprite.with_rotation(heading));
        }

        for particle in self.particles.active() {
            let base = match particle.tag {
                ParticleTag::Spark => colors::SPARK,
                ParticleTag::Smoke => colors::SMOKE,
                ParticleTag::Ember => colors::EMBER,
                ParticleTag::Shield => colors::SHIELD,
            };
            let fade = particle.life_fraction();
            let color = [base[0], base[1], base[2], base[3] * fade];
            out.sprites
                .push(SpriteInstance::new(particle.pos, particle.size, kinds::PARTICLE, color));
        }

        out.blasts.extend_from_slice(&self.blast_markers);
        out.score = self.score;
        out.lives = player.lives();
        out.wave = self.wave.index + 1;
        out.cycle = self.wave.cycle + 1;
        out.rank = self.rank.rank();
        out.boss_hp = self.boss.as_ref().map(|b| b.hp_fraction());
        out.shield_energy = player.shield_energy;
        out.state = Some(self.state());
    }

    pub fn snapshot(&self) -> RenderSnapshot {
        let mut out = RenderSnapshot::default();
        self.snapshot_into(&mut out);
        out
    }
}
