//! Encounter lifecycle state machine
//!
//! The adjacency table documents the expected flow. In permissive mode an
//! unlisted transition still happens but is logged and counted; strict mode
//! rejects it.

use serde::{Deserialize, Serialize};

use crate::error::TransitionError;

/// Top-level game state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncounterState {
    /// Title / intro
    Intro,
    /// Ship select
    Hangar,
    /// Short countdown before a wave
    Warmup,
    /// Active gameplay
    Play,
    Pause,
    /// Rest between waves
    Intermission,
    /// Narrative beat between waves
    Story,
    GameOver,
    /// Campaign completed
    Victory,
    Settings,
}

use EncounterState::*;

impl EncounterState {
    pub const ALL: [EncounterState; 10] = [
        Intro,
        Hangar,
        Warmup,
        Play,
        Pause,
        Intermission,
        Story,
        GameOver,
        Victory,
        Settings,
    ];

    /// States reachable from `self` without raising an anomaly
    pub fn legal_targets(&self) -> &'static [EncounterState] {
        match self {
            Intro => &[Hangar, Warmup, Settings, Story],
            Hangar => &[Intro, Warmup, Play, Settings],
            Warmup => &[Play, Pause, GameOver, Intro],
            Play => &[Pause, Intermission, Story, GameOver, Victory],
            Pause => &[Play, Warmup, Intermission, Intro, Settings, GameOver],
            Intermission => &[Play, Warmup, Story, Hangar, GameOver, Victory],
            Story => &[Play, Warmup, Intermission, Hangar, Intro, Victory],
            GameOver => &[Intro, Hangar],
            Victory => &[Intro, Hangar],
            Settings => &[Intro, Hangar, Pause],
        }
    }

    pub fn can_transition_to(&self, target: EncounterState) -> bool {
        self.legal_targets().contains(&target)
    }

    /// World simulation (movement, collisions) runs
    pub fn simulates(&self) -> bool {
        matches!(self, Warmup | Play | Intermission)
    }

    /// New enemies and bosses may spawn
    pub fn allows_spawns(&self) -> bool {
        matches!(self, Play)
    }

    /// Weapons may fire
    pub fn allows_fire(&self) -> bool {
        matches!(self, Play)
    }

    /// An encounter is in progress (including paused/between waves)
    pub fn in_encounter(&self) -> bool {
        matches!(self, Warmup | Play | Pause | Intermission | Story)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GameOver | Victory)
    }
}

/// Outcome of a successful `transition` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Target equals the current state
    Unchanged,
    Moved {
        from: EncounterState,
        to: EncounterState,
    },
    /// Not in the adjacency table; performed anyway (permissive mode)
    Forced {
        from: EncounterState,
        to: EncounterState,
    },
}

/// Owner of the single current-state tag
#[derive(Debug, Clone)]
pub struct EncounterMachine {
    state: EncounterState,
    previous: EncounterState,
    strict: bool,
    anomalies: u32,
    /// Seconds spent in the current state
    time_in_state: f32,
    /// Clock of the state that was paused, restored on resume
    paused_clock: f32,
}

impl EncounterMachine {
    pub fn new(strict: bool) -> Self {
        Self {
            state: Intro,
            previous: Intro,
            strict,
            anomalies: 0,
            time_in_state: 0.0,
            paused_clock: 0.0,
        }
    }

    #[inline]
    pub fn state(&self) -> EncounterState {
        self.state
    }

    pub fn previous(&self) -> EncounterState {
        self.previous
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Number of off-table transitions performed in permissive mode
    pub fn anomalies(&self) -> u32 {
        self.anomalies
    }

    pub fn time_in_state(&self) -> f32 {
        self.time_in_state
    }

    pub fn advance_clock(&mut self, dt: f32) {
        self.time_in_state += dt;
    }

    /// Move to `target`
    pub fn transition(&mut self, target: EncounterState) -> Result<Transition, TransitionError> {
        let from = self.state;
        if from == target {
            return Ok(Transition::Unchanged);
        }

        let outcome = if from.can_transition_to(target) {
            Transition::Moved { from, to: target }
        } else if self.strict {
            log::warn!("Rejected encounter transition {:?} -> {:?}", from, target);
            return Err(TransitionError::Illegal { from, to: target });
        } else {
            self.anomalies += 1;
            log::warn!(
                "Off-table encounter transition {:?} -> {:?} (anomaly #{})",
                from,
                target,
                self.anomalies
            );
            Transition::Forced { from, to: target }
        };

        log::debug!("Encounter {:?} -> {:?}", from, target);
        let resumed = from == Pause && target == self.previous;
        if target == Pause && from.simulates() {
            self.paused_clock = self.time_in_state;
        }
        self.time_in_state = if resumed { self.paused_clock } else { 0.0 };
        self.previous = from;
        self.state = target;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intro_hangar_play_path() {
        let mut m = EncounterMachine::new(false);
        assert_eq!(m.transition(Hangar), Ok(Transition::Moved { from: Intro, to: Hangar }));
        assert_eq!(m.transition(Play), Ok(Transition::Moved { from: Hangar, to: Play }));
        assert_eq!(m.state(), Play);
        assert_eq!(m.anomalies(), 0);
    }

    #[test]
    fn test_intro_warmup_play_path() {
        let mut m = EncounterMachine::new(true);
        m.transition(Warmup).unwrap();
        m.transition(Play).unwrap();
        assert_eq!(m.state(), Play);
    }

    #[test]
    fn test_reentering_current_state_is_noop() {
        let mut m = EncounterMachine::new(true);
        m.transition(Warmup).unwrap();
        m.transition(Play).unwrap();
        m.advance_clock(3.0);

        assert_eq!(m.transition(Play), Ok(Transition::Unchanged));
        assert_eq!(m.state(), Play);
        assert_eq!(m.previous(), Warmup);
        assert_eq!(m.time_in_state(), 3.0);
    }

    #[test]
    fn test_resume_keeps_paused_clock() {
        let mut m = EncounterMachine::new(true);
        m.transition(Warmup).unwrap();
        m.advance_clock(1.5);
        m.transition(Pause).unwrap();
        m.advance_clock(10.0);
        m.transition(Warmup).unwrap();
        assert!((m.time_in_state() - 1.5).abs() < 1e-6);

        // Leaving pause anywhere else starts a fresh clock
        m.transition(Pause).unwrap();
        m.transition(Play).unwrap();
        assert_eq!(m.time_in_state(), 0.0);
    }

    #[test]
    fn test_permissive_mode_forces_and_counts() {
        let mut m = EncounterMachine::new(false);
        let out = m.transition(Victory).unwrap();
        assert_eq!(out, Transition::Forced { from: Intro, to: Victory });
        assert_eq!(m.state(), Victory);
        assert_eq!(m.anomalies(), 1);
    }

    #[test]
    fn test_strict_mode_rejects() {
        let mut m = EncounterMachine::new(true);
        let err = m.transition(Victory).unwrap_err();
        assert_eq!(err, TransitionError::Illegal { from: Intro, to: Victory });
        assert_eq!(m.state(), Intro);
        assert_eq!(m.anomalies(), 0);
    }

    #[test]
    fn test_every_state_has_an_exit() {
        for state in EncounterState::ALL {
            assert!(!state.legal_targets().is_empty(), "{state:?} is a dead end");
            assert!(!state.can_transition_to(state));
        }
    }

    #[test]
    fn test_gating_flags() {
        assert!(Play.allows_spawns() && Play.allows_fire() && Play.simulates());
        assert!(!Pause.simulates());
        assert!(Intermission.simulates() && !Intermission.allows_spawns());
        assert!(Pause.in_encounter());
        assert!(GameOver.is_terminal() && !GameOver.in_encounter());
    }
}
