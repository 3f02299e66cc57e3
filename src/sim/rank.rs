//! Adaptive difficulty ("rank")
//!
//! A scalar in [-1, 1] estimated from recent kills and grazes. The controller
//! only emits continuous multipliers; it never picks a named difficulty tier.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::lerp;

/// Rank controller tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankConfig {
    /// When false every method is a no-op and multipliers are 1.0
    pub enabled: bool,
    /// Rolling window length in seconds
    pub window_secs: f32,
    /// Target rank contributed per kill/sec
    pub kill_weight: f32,
    /// Target rank contributed per graze/sec
    pub graze_weight: f32,
    /// Target rank with no events
    pub bias: f32,
    /// Max rank change per second toward the target
    pub approach_per_sec: f32,
    /// Fraction of rank bled toward zero per second
    pub decay_per_sec: f32,
    /// Subtracted from rank on player death
    pub death_penalty: f32,
    /// Fire-rate multiplier at rank -1 and +1
    pub fire_rate_range: (f32, f32),
    /// Enemy-count multiplier at rank -1 and +1
    pub density_range: (f32, f32),
    /// Hard cap on queued events per kind
    pub max_events: usize,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 10.0,
            kill_weight: 0.25,
            graze_weight: 0.1,
            bias: 0.0,
            approach_per_sec: 0.1,
            decay_per_sec: 0.01,
            death_penalty: 0.25,
            fire_rate_range: (0.6, 1.6),
            density_range: (0.7, 1.5),
            max_events: 512,
        }
    }
}

/// Rolling-window skill estimator
#[derive(Debug, Clone)]
pub struct RankController {
    config: RankConfig,
    rank: f32,
    /// Seconds of play observed (scaled dt accumulates here)
    clock: f64,
    kills: VecDeque<f64>,
    grazes: VecDeque<f64>,
}

impl RankController {
    pub fn new(config: RankConfig) -> Self {
        let capacity = config.max_events.min(1024);
        Self {
            config,
            rank: 0.0,
            clock: 0.0,
            kills: VecDeque::with_capacity(capacity),
            grazes: VecDeque::with_capacity(capacity),
        }
    }

    pub fn config(&self) -> &RankConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Current rank in [-1, 1]
    pub fn rank(&self) -> f32 {
        self.rank
    }

    pub fn kill_count(&self) -> usize {
        self.kills.len()
    }

    pub fn graze_count(&self) -> usize {
        self.grazes.len()
    }

    pub fn on_kill(&mut self) {
        if !self.config.enabled {
            return;
        }
        Self::push_event(&mut self.kills, self.clock, self.config.max_events);
    }

    pub fn on_graze(&mut self) {
        if !self.config.enabled {
            return;
        }
        Self::push_event(&mut self.grazes, self.clock, self.config.max_events);
    }

    /// Death costs a fixed penalty and wipes recent momentum
    pub fn on_death(&mut self) {
        if !self.config.enabled {
            return;
        }
        self.rank = (self.rank - self.config.death_penalty).clamp(-1.0, 1.0);
        self.clear_windows();
    }

    /// Advance the estimator by `dt` seconds
    pub fn update(&mut self, dt: f32) {
        if !self.config.enabled || !(dt > 0.0) {
            return;
        }
        self.clock += dt as f64;
        let horizon = self.clock - self.config.window_secs as f64;
        Self::prune(&mut self.kills, horizon);
        Self::prune(&mut self.grazes, horizon);

        let target = self.target_rank();
        let max_step = self.config.approach_per_sec.max(0.0) * dt;
        self.rank += (target - self.rank).clamp(-max_step, max_step);

        let decay = (self.config.decay_per_sec.max(0.0) * dt).min(1.0);
        self.rank -= self.rank * decay;
        self.rank = self.rank.clamp(-1.0, 1.0);
    }

    /// Rank the current window's event rates point at
    pub fn target_rank(&self) -> f32 {
        let window = self.config.window_secs.max(f32::EPSILON);
        let kills_per_sec = self.kills.len() as f32 / window;
        let grazes_per_sec = self.grazes.len() as f32 / window;
        (self.config.bias
            + self.config.kill_weight * kills_per_sec
            + self.config.graze_weight * grazes_per_sec)
            .clamp(-1.0, 1.0)
    }

    /// Multiplier applied to enemy fire rate
    pub fn fire_rate_multiplier(&self) -> f32 {
        self.map_range(self.config.fire_rate_range)
    }

    /// Multiplier applied to enemy spawn counts
    pub fn enemy_count_multiplier(&self) -> f32 {
        self.map_range(self.config.density_range)
    }

    /// Forget queued events but keep the rank (encounter abort)
    pub fn clear_windows(&mut self) {
        self.kills.clear();
        self.grazes.clear();
    }

    /// Back to baseline for a new campaign
    pub fn reset(&mut self) {
        self.rank = 0.0;
        self.clock = 0.0;
        self.clear_windows();
    }

    fn map_range(&self, (min, max): (f32, f32)) -> f32 {
        if !self.config.enabled {
            return 1.0;
        }
        lerp(min, max, (self.rank + 1.0) * 0.5)
    }

    fn push_event(queue: &mut VecDeque<f64>, now: f64, cap: usize) {
        queue.push_back(now);
        while queue.len() > cap.max(1) {
            queue.pop_front();
        }
    }

    /// Events are pushed in time order, so expired ones are always at the front
    fn prune(queue: &mut VecDeque<f64>, horizon: f64) {
        while queue.front().is_some_and(|&t| t <= horizon) {
            queue.pop_front();
        }
    }
}
