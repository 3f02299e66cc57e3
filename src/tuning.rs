//! Data-driven game balance
//!
//! Every number here is externally supplied configuration; the simulation only
//! reads it. Missing fields in JSON fall back to the defaults below.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Pixels per second
    pub speed: f32,
    /// Hitbox radius (deliberately smaller than the sprite)
    pub radius: f32,
    pub lives: u8,
    /// Seconds between primary shots
    pub fire_interval: f32,
    pub bullet_speed: f32,
    pub bullet_damage: f32,
    pub bullet_radius: f32,
    /// Seconds between missile salvos (Striker)
    pub missile_interval: f32,
    pub missile_damage: f32,
    pub missile_blast_radius: f32,
    /// Beam length (Lancer)
    pub beam_length: f32,
    pub beam_damage: f32,
    /// Invulnerability after losing a life
    pub invuln_secs: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            speed: 260.0,
            radius: 4.0,
            lives: 3,
            fire_interval: 0.12,
            bullet_speed: 720.0,
            bullet_damage: 10.0,
            bullet_radius: 4.0,
            missile_interval: 0.8,
            missile_damage: 24.0,
            missile_blast_radius: 48.0,
            beam_length: 90.0,
            beam_damage: 4.0,
            invuln_secs: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    pub hp: f32,
    pub radius: f32,
    /// Downward drift speed
    pub speed: f32,
    pub sway_amplitude: f32,
    pub sway_frequency: f32,
    /// Base seconds between shots (divided by the rank fire multiplier)
    pub fire_interval: f32,
    pub bullet_speed: f32,
    pub bullet_radius: f32,
    pub bullet_damage: f32,
    /// Damage dealt to the player by touching an enemy
    pub contact_damage: f32,
    pub score: u64,
    /// Percent of spawned enemies firing homing shots
    pub homing_chance: u32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            hp: 30.0,
            radius: 14.0,
            speed: 70.0,
            sway_amplitude: 40.0,
            sway_frequency: 1.3,
            fire_interval: 1.6,
            bullet_speed: 180.0,
            bullet_radius: 5.0,
            bullet_damage: 1.0,
            contact_damage: 1.0,
            score: 100,
            homing_chance: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BossTuning {
    pub base_hp: f32,
    pub hp_per_wave: f32,
    /// Bounding box size
    pub width: f32,
    pub height: f32,
    /// HP fraction below which the boss enrages
    pub rage_threshold: f32,
    pub patrol_speed: f32,
    pub track_speed: f32,
    /// Seconds between paired shots (normal phase)
    pub pair_interval: f32,
    /// Seconds between spiral volleys (rage phase)
    pub spiral_interval: f32,
    /// Radians the spiral advances per volley
    pub spiral_step: f32,
    /// Seconds between minion adds (rage phase)
    pub minion_interval: f32,
    pub bullet_speed: f32,
    pub score: u64,
}

impl Default for BossTuning {
    fn default() -> Self {
        Self {
            base_hp: 500.0,
            hp_per_wave: 120.0,
            width: 120.0,
            height: 80.0,
            rage_threshold: 0.5,
            patrol_speed: 90.0,
            track_speed: 140.0,
            pair_interval: 0.9,
            spiral_interval: 0.08,
            spiral_step: 0.35,
            minion_interval: 4.0,
            bullet_speed: 160.0,
            score: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveTuning {
    pub base_enemies: u32,
    pub enemies_per_wave: u32,
    /// Seconds between enemy spawns
    pub spawn_interval: f32,
    /// Every Nth wave is a boss wave
    pub boss_every: u32,
    pub waves_per_cycle: u32,
    /// Cycles to clear for campaign victory
    pub final_cycle: u32,
    pub warmup_secs: f32,
    pub intermission_secs: f32,
    /// Per-cycle multiplier applied to enemy and boss HP
    pub cycle_hp_scale: f32,
}

impl Default for WaveTuning {
    fn default() -> Self {
        Self {
            base_enemies: 6,
            enemies_per_wave: 2,
            spawn_interval: 0.7,
            boss_every: 5,
            waves_per_cycle: 5,
            final_cycle: 2,
            warmup_secs: 2.0,
            intermission_secs: 3.0,
            cycle_hp_scale: 1.5,
        }
    }
}

/// All balance tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub player: PlayerTuning,
    pub enemy: EnemyTuning,
    pub boss: BossTuning,
    pub waves: WaveTuning,
    /// Enemy bullets passing this close without hitting count as a graze
    pub graze_radius: f32,
    pub graze_score: u64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            player: PlayerTuning::default(),
            enemy: EnemyTuning::default(),
            boss: BossTuning::default(),
            waves: WaveTuning::default(),
            graze_radius: 18.0,
            graze_score: 10,
        }
    }
}

impl Tuning {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(value: f32, field: &'static str) -> Result<(), ConfigError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: "must be a positive number",
                })
            }
        }

        positive(self.player.fire_interval, "player.fire_interval")?;
        positive(self.player.missile_interval, "player.missile_interval")?;
        positive(self.player.radius, "player.radius")?;
        positive(self.enemy.fire_interval, "enemy.fire_interval")?;
        positive(self.enemy.radius, "enemy.radius")?;
        positive(self.enemy.hp, "enemy.hp")?;
        positive(self.boss.base_hp, "boss.base_hp")?;
        positive(self.boss.pair_interval, "boss.pair_interval")?;
        positive(self.boss.spiral_interval, "boss.spiral_interval")?;
        positive(self.boss.minion_interval, "boss.minion_interval")?;
        positive(self.waves.spawn_interval, "waves.spawn_interval")?;

        if !(self.boss.rage_threshold > 0.0 && self.boss.rage_threshold < 1.0) {
            return Err(ConfigError::Invalid {
                field: "boss.rage_threshold",
                reason: "must be between 0 and 1",
            });
        }
        if !(self.graze_radius >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "graze_radius",
                reason: "must not be negative",
            });
        }
        if self.waves.waves_per_cycle == 0 {
            return Err(ConfigError::Invalid {
                field: "waves.waves_per_cycle",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    /// Boss HP for a 0-based wave index
    pub fn boss_hp(&self, wave: u32, cycle: u32) -> f32 {
        (self.boss.base_hp + self.boss.hp_per_wave * wave as f32) * self.cycle_scale(cycle)
    }

    /// Regular enemy HP for a cycle
    pub fn enemy_hp(&self, cycle: u32) -> f32 {
        self.enemy.hp * self.cycle_scale(cycle)
    }

    fn cycle_scale(&self, cycle: u32) -> f32 {
        self.waves.cycle_hp_scale.max(0.0).powi(cycle as i32)
    }
}
