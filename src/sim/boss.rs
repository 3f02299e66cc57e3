//! Boss entity with a one-way normal -> rage phase machine

use std::f32::consts::{FRAC_PI_2, TAU};

use glam::Vec2;

use super::projectile::{Faction, ProjectileSpawn};
use super::state::{DamageOutcome, Damageable, apply_health_damage};
use crate::consts::GEOMETRY_EPSILON;
use crate::normalize_angle;
use crate::tuning::BossTuning;

/// Height the boss settles at after entering from the top
pub const BOSS_ANCHOR_Y: f32 = 130.0;
/// Seconds the hit flash lasts
const FLASH_SECS: f32 = 0.08;

/// Boss behavior phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BossPhase {
    /// Patrol and paired shots
    Normal,
    /// Center-and-track, bidirectional spiral, minion adds
    Rage,
}

/// Something the boss wants the world to do this frame
#[derive(Debug, Clone, Copy)]
pub enum BossAction {
    Fire(ProjectileSpawn),
    SpawnMinion(Vec2),
}

#[derive(Debug, Clone)]
pub struct Boss {
    pub id: u32,
    /// Top-left corner of the bounding box
    pub origin: Vec2,
    pub size: Vec2,
    pub vel: Vec2,
    pub hp: f32,
    pub max_hp: f32,
    pub flash_timer: f32,
    phase: BossPhase,
    defeated: bool,
    /// +1 patrolling right, -1 left
    patrol_dir: f32,
    fire_timer: f32,
    spiral_timer: f32,
    spiral_angle: f32,
    minion_timer: f32,
}

impl Boss {
    pub fn new(id: u32, center: Vec2, size: Vec2, max_hp: f32) -> Self {
        Self {
            id,
            origin: center - size * 0.5,
            size,
            vel: Vec2::ZERO,
            hp: max_hp,
            max_hp,
            flash_timer: 0.0,
            phase: BossPhase::Normal,
            defeated: false,
            patrol_dir: 1.0,
            fire_timer: 1.0,
            spiral_timer: 0.0,
            spiral_angle: 0.0,
            minion_timer: 0.0,
        }
    }

    #[inline]
    pub fn phase(&self) -> BossPhase {
        self.phase
    }

    /// Remaining HP as a fraction of max
    pub fn hp_fraction(&self) -> f32 {
        if self.max_hp <= 0.0 {
            0.0
        } else {
            self.hp / self.max_hp
        }
    }

    /// Enter rage the first time HP falls strictly below `threshold`
    ///
    /// Returns true only on the frame the phase flips. There is no way back.
    pub fn update_phase(&mut self, threshold: f32) -> bool {
        if self.phase == BossPhase::Normal && !self.defeated && self.hp_fraction() < threshold {
            self.phase = BossPhase::Rage;
            self.spiral_timer = 0.0;
            self.minion_timer = 0.0;
            return true;
        }
        false
    }

    /// Move, then queue attacks into `actions`
    ///
    /// `fire_mult` scales attack frequency (rank fire-rate multiplier).
    pub fn update(
        &mut self,
        dt: f32,
        player_pos: Vec2,
        playfield_width: f32,
        tuning: &BossTuning,
        fire_mult: f32,
        actions: &mut Vec<BossAction>,
    ) {
        if self.defeated {
            return;
        }
        self.flash_timer = (self.flash_timer - dt).max(0.0);
        self.steer(player_pos, playfield_width, tuning);
        self.origin += self.vel * dt;

        let fire_mult = fire_mult.max(0.05);
        match self.phase {
            BossPhase::Normal => {
                self.fire_timer -= dt;
                if self.fire_timer <= 0.0 {
                    self.fire_timer += tuning.pair_interval / fire_mult;
                    self.fire_pair(player_pos, tuning, actions);
                }
            }
            BossPhase::Rage => {
                self.spiral_timer -= dt;
                while self.spiral_timer <= 0.0 {
                    self.spiral_timer += tuning.spiral_interval / fire_mult;
                    self.fire_spiral(tuning, actions);
                }
                self.minion_timer -= dt;
                if self.minion_timer <= 0.0 {
                    self.minion_timer += tuning.minion_interval;
                    let offset = Vec2::new(self.size.x * 0.5 + 24.0, 0.0);
                    actions.push(BossAction::SpawnMinion(self.center() - offset));
                    actions.push(BossAction::SpawnMinion(self.center() + offset));
                }
            }
        }
    }

    fn steer(&mut self, player_pos: Vec2, playfield_width: f32, tuning: &BossTuning) {
        let center = self.center();
        let half_w = self.size.x * 0.5;

        // Descend into view before doing anything else
        if center.y < BOSS_ANCHOR_Y {
            self.vel = Vec2::new(0.0, tuning.patrol_speed);
            return;
        }

        match self.phase {
            BossPhase::Normal => {
                if center.x <= half_w {
                    self.patrol_dir = 1.0;
                } else if center.x >= playfield_width - half_w {
                    self.patrol_dir = -1.0;
                }
                self.vel = Vec2::new(self.patrol_dir * tuning.patrol_speed, 0.0);
            }
            BossPhase::Rage => {
                // Hold the middle of the screen, leaning toward the player
                let mid = playfield_width * 0.5;
                let target_x = (mid + (player_pos.x - mid) * 0.6).clamp(half_w, playfield_width - half_w);
                let to_target = Vec2::new(target_x, BOSS_ANCHOR_Y) - center;
                let dist = to_target.length();
                self.vel = if dist > 1.0 {
                    to_target / dist * tuning.track_speed.min(dist * 8.0)
                } else {
                    Vec2::ZERO
                };
            }
        }
    }

    fn fire_pair(&self, player_pos: Vec2, tuning: &BossTuning, actions: &mut Vec<BossAction>) {
        let muzzle_y = self.origin.y + self.size.y;
        for side in [-1.0, 1.0] {
            let muzzle = Vec2::new(self.center().x + side * self.size.x * 0.3, muzzle_y);
            let aim = player_pos - muzzle;
            let dir = if aim.length_squared() > GEOMETRY_EPSILON {
                aim.normalize()
            } else {
                Vec2::Y
            };
            actions.push(BossAction::Fire(boss_shot(muzzle, dir * tuning.bullet_speed)));
        }
    }

    fn fire_spiral(&mut self, tuning: &BossTuning, actions: &mut Vec<BossAction>) {
        let center = self.center();
        // Two arms winding in opposite directions from straight down
        for angle in [FRAC_PI_2 + self.spiral_angle, FRAC_PI_2 - self.spiral_angle] {
            let dir = Vec2::new(angle.cos(), angle.sin());
            actions.push(BossAction::Fire(boss_shot(center, dir * tuning.bullet_speed)));
        }
        self.spiral_angle = normalize_angle((self.spiral_angle + tuning.spiral_step) % TAU);
    }
}

fn boss_shot(pos: Vec2, vel: Vec2) -> ProjectileSpawn {
    ProjectileSpawn::new(pos, vel, Faction::Boss, 6.0, 1.0)
}

impl Damageable for Boss {
    fn center(&self) -> Vec2 {
        self.origin + self.size * 0.5
    }

    fn hit_radius(&self) -> f32 {
        self.size.x.min(self.size.y) * 0.5
    }

    fn apply_damage(&mut self, amount: f32) -> DamageOutcome {
        apply_health_damage(
            &mut self.hp,
            &mut self.defeated,
            &mut self.flash_timer,
            FLASH_SECS,
            amount,
        )
    }

    fn is_defeated(&self) -> bool {
        self.defeated
    }
}
