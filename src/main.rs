//! Starfall headless driver
//!
//! Runs one seeded encounter with a scripted autopilot through the same
//! fixed-timestep loop a windowed frontend would use, then prints the
//! encounter summary as JSON.
//!
//! Usage: `starfall [seed] [max_seconds] [settings.json]`

use std::collections::BTreeMap;

use glam::Vec2;

use starfall::audio::{self, AudioMix, AudioSink, SoundCue};
use starfall::consts::*;
use starfall::sim::{EncounterState, Faction, GameEvent, GameState, Player, TickInput, tick};
use starfall::{EncounterSummary, LocalScoreTable, Settings, SummarySink, Tuning};

/// Frames of slow motion after a big hit
const HIT_STOP_FRAMES: u32 = 8;
const HIT_STOP_SCALE: f32 = 0.25;

/// Counts cues instead of playing them
#[derive(Default)]
struct CueCounter {
    counts: BTreeMap<&'static str, u32>,
}

impl AudioSink for CueCounter {
    fn play(&mut self, cue: SoundCue, _volume: f32) {
        *self.counts.entry(cue.name()).or_default() += 1;
    }
}

struct Driver {
    state: GameState,
    accumulator: f32,
    input: TickInput,
    hit_stop: u32,
    mix: AudioMix,
    audio: CueCounter,
    scores: LocalScoreTable,
    last_summary: Option<EncounterSummary>,
    events: Vec<GameEvent>,
}

impl Driver {
    fn new(seed: u64, settings: Settings) -> Self {
        Self {
            state: GameState::new(seed, settings, Tuning::default()),
            accumulator: 0.0,
            input: TickInput::default(),
            hit_stop: 0,
            mix: AudioMix::default(),
            audio: CueCounter::default(),
            scores: LocalScoreTable::new(),
            last_summary: None,
            events: Vec::new(),
        }
    }

    /// One rendered frame: step the sim in fixed increments
    fn update(&mut self, frame_dt: f32) {
        let mut dt = frame_dt.min(0.1);
        if self.hit_stop > 0 {
            self.hit_stop -= 1;
            dt *= HIT_STOP_SCALE;
        }
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            self.input = autopilot(&self.state);
            tick(&mut self.state, &self.input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // Clear one-shot inputs after processing
            self.input.start = false;
            self.input.pause = false;
            self.input.abort = false;
        }
        self.events.clear();
        self.events.extend(self.state.drain_events());
        audio::dispatch(&self.events, &self.mix, Some(&mut self.audio));

        for event in &self.events {
            match event {
                GameEvent::PlayerHit { .. } | GameEvent::BossDefeated { .. } => {
                    self.hit_stop = HIT_STOP_FRAMES;
                }
                GameEvent::StateChanged { from, to } => {
                    log::debug!("{from:?} -> {to:?}");
                }
                _ => {}
            }
        }

        self.collect_summary();
    }

    fn collect_summary(&mut self) {
        if let Some(summary) = self.state.take_summary() {
            self.scores.submit(&summary);
            self.last_summary = Some(summary);
        }
    }

    fn finished(&self) -> bool {
        self.state.state().is_terminal()
    }
}

/// Scripted pilot: start the run, chase the nearest enemy column, dodge close
/// bullets and raise the shield when something is about to land.
fn autopilot(state: &GameState) -> TickInput {
    let mut input = TickInput {
        fire: true,
        ..Default::default()
    };
    match state.state() {
        EncounterState::Intro | EncounterState::Hangar => {
            input.start = true;
            return input;
        }
        s if !s.simulates() => return input,
        _ => {}
    }

    let me = state.player.pos;
    let target_x = state
        .boss
        .as_ref()
        .map(|b| b.origin.x + b.size.x * 0.5)
        .or_else(|| {
            state
                .enemies
                .iter()
                .filter(|e| e.pos.y > 0.0)
                .min_by(|a, b| {
                    (a.pos.x - me.x)
                        .abs()
                        .partial_cmp(&(b.pos.x - me.x).abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|e| e.pos.x)
        })
        .unwrap_or(PLAYFIELD_WIDTH * 0.5);

    let mut threat = Vec2::ZERO;
    let mut closest = f32::MAX;
    for (_, p) in state.projectiles.iter() {
        if p.faction == Faction::Player {
            continue;
        }
        let offset = me - p.pos;
        let dist = offset.length();
        closest = closest.min(dist);
        if dist < 80.0 && dist > GEOMETRY_EPSILON {
            threat += offset / (dist * dist);
        }
    }

    let chase = ((target_x - me.x) / 40.0).clamp(-1.0, 1.0);
    let dodge = if threat != Vec2::ZERO {
        threat.normalize() * 1.5
    } else {
        Vec2::ZERO
    };
    // Drift back toward the spawn row when nothing is threatening
    let home = ((Player::spawn_point().y - me.y) / 60.0).clamp(-1.0, 1.0);
    input.move_axis = Vec2::new(chase, home) + dodge;
    input.shield = closest < 14.0;
    input
}

fn load_settings(path: Option<&str>) -> Settings {
    let json = path.and_then(|p| match std::fs::read_to_string(p) {
        Ok(json) => Some(json),
        Err(err) => {
            log::warn!("Could not read {p}: {err}");
            None
        }
    });
    Settings::load_or_default(json.as_deref())
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let seed = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(12345u64);
    let max_seconds: f32 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(300.0);
    let settings = load_settings(args.get(3).map(String::as_str));

    log::info!("Starfall (headless) starting, seed {seed}");
    let mut driver = Driver::new(seed, settings);

    let max_frames = (max_seconds / SIM_DT) as u64;
    let mut frames = 0u64;
    while frames < max_frames && !driver.finished() {
        driver.update(SIM_DT);
        frames += 1;
    }

    if !driver.finished() {
        log::info!("Time limit reached, ending encounter");
        driver.input.abort = true;
        tick(&mut driver.state, &driver.input, 0.0);
        driver.collect_summary();
    }

    for (cue, count) in &driver.audio.counts {
        log::debug!("cue {cue}: {count}");
    }

    match driver.last_summary.as_ref().map(EncounterSummary::to_json) {
        Some(Ok(json)) => println!("{json}"),
        Some(Err(err)) => log::warn!("Could not encode summary: {err}"),
        None => println!("{{}}"),
    }
}
