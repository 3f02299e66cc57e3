//! Sound cue collaborator interface
//!
//! The simulation only names cues; synthesis belongs to whatever `AudioSink`
//! the host plugs in. A missing sink makes every call a silent no-op.

use crate::sim::GameEvent;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCue {
    /// Player weapon volley
    Shot,
    /// Projectile hit an enemy or boss without killing it
    Hit,
    /// Enemy destroyed
    EnemyDown,
    /// Missile / area blast
    Explosion,
    /// Enemy bullet brushed past the player
    Graze,
    /// Shield absorbed a bullet
    ShieldBlock,
    /// Player lost a life
    PlayerHit,
    /// Boss enters the field
    BossWarning,
    /// Boss switched to its rage phase
    BossRage,
    /// Boss destroyed
    BossDown,
    /// Wave cleared
    WaveClear,
    GameOver,
    Victory,
}

impl SoundCue {
    /// Number of distinct cues
    pub const COUNT: usize = 13;

    /// Stable name used by asset-driven sinks
    pub fn name(&self) -> &'static str {
        match self {
            SoundCue::Shot => "shot",
            SoundCue::Hit => "hit",
            SoundCue::EnemyDown => "enemy_down",
            SoundCue::Explosion => "explosion",
            SoundCue::Graze => "graze",
            SoundCue::ShieldBlock => "shield_block",
            SoundCue::PlayerHit => "player_hit",
            SoundCue::BossWarning => "boss_warning",
            SoundCue::BossRage => "boss_rage",
            SoundCue::BossDown => "boss_down",
            SoundCue::WaveClear => "wave_clear",
            SoundCue::GameOver => "game_over",
            SoundCue::Victory => "victory",
        }
    }

    /// Cue for a simulation event, if it makes a sound
    pub fn for_event(event: &GameEvent) -> Option<Self> {
        Some(match event {
            GameEvent::PlayerFired => SoundCue::Shot,
            GameEvent::EnemyHit { .. } => SoundCue::Hit,
            GameEvent::EnemyKilled { .. } => SoundCue::EnemyDown,
            GameEvent::Explosion { .. } => SoundCue::Explosion,
            GameEvent::Graze { .. } => SoundCue::Graze,
            GameEvent::ShieldBlock { .. } => SoundCue::ShieldBlock,
            GameEvent::PlayerHit { .. } => SoundCue::PlayerHit,
            GameEvent::BossSpawned { .. } => SoundCue::BossWarning,
            GameEvent::BossEnraged => SoundCue::BossRage,
            GameEvent::BossDefeated { .. } => SoundCue::BossDown,
            GameEvent::WaveCleared { .. } => SoundCue::WaveClear,
            GameEvent::EncounterEnded { victory: true } => SoundCue::Victory,
            GameEvent::EncounterEnded { victory: false } => SoundCue::GameOver,
            GameEvent::StateChanged { .. }
            | GameEvent::WaveStarted { .. }
            | GameEvent::PlayerDestroyed => return None,
        })
    }
}

/// Something that can play sound cues
pub trait AudioSink {
    /// Play `cue` at `volume` (0.0 - 1.0)
    fn play(&mut self, cue: SoundCue, volume: f32);
}

/// Volume controls applied before cues reach the sink
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioMix {
    pub master_volume: f32,
    pub sfx_volume: f32,
    pub muted: bool,
}

impl Default for AudioMix {
    fn default() -> Self {
        Self {
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
        }
    }
}

impl AudioMix {
    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Set SFX volume (0.0 - 1.0)
    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }
}

/// Forward one frame's events to `sink` as cues
///
/// Each cue plays at most once per call so a burst of kills doesn't stack
/// the same sample. Returns the number of cues played.
pub fn dispatch(events: &[GameEvent], mix: &AudioMix, sink: Option<&mut dyn AudioSink>) -> usize {
    let Some(sink) = sink else {
        return 0;
    };
    let volume = mix.effective_volume();
    if volume <= 0.0 {
        return 0;
    }

    let mut seen = [false; SoundCue::COUNT];
    let mut played = 0;
    for cue in events.iter().filter_map(SoundCue::for_event) {
        if std::mem::replace(&mut seen[cue as usize], true) {
            continue;
        }
        sink.play(cue, volume);
        played += 1;
    }
    played
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[derive(Default)]
    struct RecordingSink {
        played: Vec<(SoundCue, f32)>,
    }

    impl AudioSink for RecordingSink {
        fn play(&mut self, cue: SoundCue, volume: f32) {
            self.played.push((cue, volume));
        }
    }

    fn sample_events() -> Vec<GameEvent> {
        vec![
            GameEvent::PlayerFired,
            GameEvent::EnemyKilled {
                id: 1,
                pos: Vec2::ZERO,
            },
            GameEvent::EnemyKilled {
                id: 2,
                pos: Vec2::ONE,
            },
            GameEvent::WaveStarted {
                wave: 1,
                cycle: 1,
                boss: false,
            },
            GameEvent::Explosion {
                pos: Vec2::ZERO,
                radius: 40.0,
            },
        ]
    }

    #[test]
    fn test_missing_sink_is_noop() {
        assert_eq!(dispatch(&sample_events(), &AudioMix::default(), None), 0);
    }

    #[test]
    fn test_dispatch_dedups_cues() {
        let mut sink = RecordingSink::default();
        let played = dispatch(&sample_events(), &AudioMix::default(), Some(&mut sink));
        assert_eq!(played, 3);
        let cues: Vec<_> = sink.played.iter().map(|(c, _)| *c).collect();
        assert_eq!(cues, vec![SoundCue::Shot, SoundCue::EnemyDown, SoundCue::Explosion]);
        assert!(sink.played.iter().all(|(_, v)| (*v - 0.8).abs() < 1e-6));
    }

    #[test]
    fn test_muted_plays_nothing() {
        let mut sink = RecordingSink::default();
        let mix = AudioMix {
            muted: true,
            ..AudioMix::default()
        };
        assert_eq!(dispatch(&sample_events(), &mix, Some(&mut sink)), 0);
        assert!(sink.played.is_empty());
    }

    #[test]
    fn test_encounter_end_cue() {
        assert_eq!(
            SoundCue::for_event(&GameEvent::EncounterEnded { victory: true }),
            Some(SoundCue::Victory)
        );
        assert_eq!(SoundCue::for_event(&GameEvent::PlayerDestroyed), None);
        assert_eq!(SoundCue::BossRage.name(), "boss_rage");
        assert_eq!(SoundCue::Victory as usize, SoundCue::COUNT - 1);
    }

    #[test]
    fn test_volume_clamped() {
        let mut mix = AudioMix::default();
        mix.set_master_volume(3.0);
        mix.set_sfx_volume(-1.0);
        assert_eq!(mix.master_volume, 1.0);
        assert_eq!(mix.effective_volume(), 0.0);
    }
}
