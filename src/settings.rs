//! Game settings and preferences
//!
//! Supplied by the host as JSON; anything missing falls back to defaults.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sim::RankConfig;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Particle slots pre-allocated at startup (the pool still grows past this)
    pub fn particle_reserve(&self) -> usize {
        match self {
            QualityPreset::Low => 256,
            QualityPreset::Medium => 1024,
            QualityPreset::High => 4096,
        }
    }

    /// Particles emitted per explosion, relative to the requested count
    pub fn particle_scale(&self) -> f32 {
        match self {
            QualityPreset::Low => 0.25,
            QualityPreset::Medium => 0.6,
            QualityPreset::High => 1.0,
        }
    }
}

/// Selectable player ship; decides the secondary weapon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ShipType {
    /// Twin shots only
    #[default]
    Vanguard,
    /// Twin shots + homing missiles
    Striker,
    /// Piercing beam
    Lancer,
}

impl ShipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipType::Vanguard => "vanguard",
            ShipType::Striker => "striker",
            ShipType::Lancer => "lancer",
        }
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,
    /// Reject encounter transitions missing from the adjacency table
    pub strict_transitions: bool,
    /// Keep blast markers around for the diagnostic overlay
    pub debug_overlay: bool,
    /// Ship used for the next run
    pub ship: ShipType,
    /// Adaptive difficulty controller
    pub rank: RankConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            strict_transitions: false,
            debug_overlay: false,
            ship: ShipType::Vanguard,
            rank: RankConfig::default(),
        }
    }
}

impl Settings {
    /// Create settings from a quality preset
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse `json` if given, logging and falling back to defaults on error
    pub fn load_or_default(json: Option<&str>) -> Self {
        match json.map(Self::from_json) {
            Some(Ok(settings)) => {
                log::info!("Loaded settings ({} quality)", settings.quality.as_str());
                settings
            }
            Some(Err(err)) => {
                log::warn!("Ignoring settings: {err}");
                Self::default()
            }
            None => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rank = &self.rank;
        if !(rank.window_secs > 0.0) {
            return Err(ConfigError::Invalid {
                field: "rank.window_secs",
                reason: "must be positive",
            });
        }
        if !(rank.approach_per_sec >= 0.0 && rank.decay_per_sec >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "rank.approach_per_sec",
                reason: "rates must not be negative",
            });
        }
        if !(rank.death_penalty >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "rank.death_penalty",
                reason: "must not be negative",
            });
        }
        for (range, field) in [
            (rank.fire_rate_range, "rank.fire_rate_range"),
            (rank.density_range, "rank.density_range"),
        ] {
            if !(range.0 > 0.0 && range.0 <= range.1) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "expected 0 < min <= max",
                });
            }
        }
        Ok(())
    }
}
