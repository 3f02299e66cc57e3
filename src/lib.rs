//! Starfall - combat simulation core for a vertical arcade shooter
//!
//! Core modules:
//! - `sim`: Deterministic simulation (pools, spatial grid, collisions, rank, encounters)
//! - `tuning`: Data-driven game balance
//! - `settings`: Player-facing preferences and rank controller config
//! - `audio`: Sound cue collaborator interface
//! - `scores`: Encounter summaries and local leaderboard
//! - `snapshot`: Read-only render snapshot for the renderer collaborator

pub mod audio;
pub mod error;
pub mod scores;
pub mod settings;
pub mod sim;
pub mod snapshot;
pub mod tuning;

pub use error::{ConfigError, TransitionError};
pub use scores::{EncounterSummary, LocalScoreTable, SummarySink};
pub use settings::{QualityPreset, Settings, ShipType};
pub use tuning::Tuning;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz frame budget)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 4;

    /// Playfield dimensions (y grows downward, player lives near the bottom)
    pub const PLAYFIELD_WIDTH: f32 = 480.0;
    pub const PLAYFIELD_HEIGHT: f32 = 640.0;
    /// Projectiles may drift this far outside the playfield before release
    pub const CULL_MARGIN: f32 = 32.0;

    /// Spatial grid cell size; larger than any projectile + target radius sum
    pub const GRID_CELL_SIZE: f32 = 64.0;

    /// Distances below this are treated as colocated
    pub const GEOMETRY_EPSILON: f32 = 1e-4;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    if !angle.is_finite() {
        return 0.0;
    }
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Linear interpolation between `a` and `b`
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_normalize_angle_wraps() {
        assert!((normalize_angle(2.5 * PI) - PI / 2.0).abs() < 1e-4);
        // Exactly on the seam either sign is the same heading
        let seam = normalize_angle(3.0 * PI);
        assert!((seam.abs() - PI).abs() < 1e-4);
        assert!((normalize_angle(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-4);
        assert_eq!(normalize_angle(f32::NAN), 0.0);
    }

    #[test]
    fn test_lerp_endpoints() {
        assert_eq!(lerp(0.5, 1.5, 0.0), 0.5);
        assert_eq!(lerp(0.5, 1.5, 1.0), 1.5);
        assert_eq!(lerp(0.5, 1.5, 0.5), 1.0);
    }
}
