//! Simulated collaborators for running an examination without a headset.
//!
//! Random streams use a seeded PCG generator so runs with the same seed
//! produce the same log. Handles returned by `Clone` share state, which is
//! how tests observe a collaborator after handing it to a sequencer.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use chrono::{DateTime, Local};
use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;

use crate::audio::{AudioPlayer, Cue};
use crate::sensors::{EyeKind, GazeProvider, GazeSample, HeadPose, HeadPoseProvider, Space, Vector3};
use crate::storage::AudioConfig;

/// Interpupillary half distance in metres.
const HALF_IPD: f32 = 0.032;
/// Eye height of a seated patient.
const EYE_HEIGHT: f32 = 1.2;

/// Plausible gaze readings with random dropouts.
#[derive(Debug, Clone)]
pub struct SimulatedGaze {
    rng: Mcg128Xsl64,
    dropout: f64,
}

impl SimulatedGaze {
    /// `dropout` is the probability that a single reading is invalid and
    /// is clamped to `0.0..=1.0`. `None` seeds from entropy.
    pub fn new(seed: Option<u64>, dropout: f64) -> Self {
        let rng = match seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        let dropout = if dropout.is_nan() { 0.0 } else { dropout.clamp(0.0, 1.0) };
        Self { rng, dropout }
    }

    fn jitter(&mut self, spread: f32) -> f32 {
        self.rng.gen_range(-spread..=spread)
    }
}

impl GazeProvider for SimulatedGaze {
    fn sample(&mut self, eye: EyeKind, space: Space, _at: DateTime<Local>) -> GazeSample {
        if self.rng.gen_bool(self.dropout) {
            return GazeSample::invalid(eye, space);
        }
        let lateral = match eye {
            EyeKind::Left => -HALF_IPD,
            EyeKind::Right => HALF_IPD,
            EyeKind::Combined => 0.0,
        };
        let mut position = Vector3::new(lateral, 0.0, 0.0);
        if space == Space::World {
            position = position + Vector3::new(0.0, EYE_HEIGHT, 0.0);
        }
        let direction =
            Vector3::new(self.jitter(0.15), self.jitter(0.1), 1.0).normalized();
        GazeSample::new(eye, space, position, direction)
    }
}

#[derive(Debug, Default)]
struct Script {
    queued: VecDeque<bool>,
    fallback: bool,
}

/// Gaze with explicit validity per call. Clones share the script.
///
/// Each call consumes one queued value; once the queue is empty the
/// fallback is used.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGaze {
    script: Rc<RefCell<Script>>,
}

impl ScriptedGaze {
    pub fn new(queued: impl IntoIterator<Item = bool>, fallback: bool) -> Self {
        Self {
            script: Rc::new(RefCell::new(Script {
                queued: queued.into_iter().collect(),
                fallback,
            })),
        }
    }

    pub fn always(valid: bool) -> Self {
        Self::new([], valid)
    }

    pub fn push(&self, valid: bool) {
        self.script.borrow_mut().queued.push_back(valid);
    }

    pub fn set_fallback(&self, valid: bool) {
        self.script.borrow_mut().fallback = valid;
    }

    pub fn remaining(&self) -> usize {
        self.script.borrow().queued.len()
    }
}

impl GazeProvider for ScriptedGaze {
    fn sample(&mut self, eye: EyeKind, space: Space, _at: DateTime<Local>) -> GazeSample {
        let mut script = self.script.borrow_mut();
        let fallback = script.fallback;
        if script.queued.pop_front().unwrap_or(fallback) {
            GazeSample::new(eye, space, Vector3::ZERO, Vector3::FORWARD)
        } else {
            GazeSample::invalid(eye, space)
        }
    }
}

/// Slow sinusoidal head sway, advanced one step per query.
#[derive(Debug, Clone)]
pub struct SimulatedHead {
    step_secs: f64,
    t: f64,
}

impl SimulatedHead {
    pub fn new(step_secs: f64) -> Self {
        Self { step_secs, t: 0.0 }
    }
}

impl Default for SimulatedHead {
    fn default() -> Self {
        Self::new(1.0 / 90.0)
    }
}

impl HeadPoseProvider for SimulatedHead {
    fn current_pose(&mut self) -> HeadPose {
        let t = self.t;
        self.t += self.step_secs;
        let yaw = (t * 0.5).sin() * 10.0;
        let pitch = (t * 0.3).sin() * 5.0;
        HeadPose::from_euler(
            Vector3::new(0.0, EYE_HEIGHT, 0.0),
            // Unity reports angles in 0..360.
            Vector3::new(pitch.rem_euclid(360.0) as f32, yaw.rem_euclid(360.0) as f32, 0.0),
        )
    }
}

/// Audio player with a fixed clip table that records what was played.
/// Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct SimulatedAudio {
    clips: BTreeMap<Cue, f64>,
    played: Rc<RefCell<Vec<Cue>>>,
}

impl SimulatedAudio {
    pub fn from_config(audio: &AudioConfig) -> Self {
        Self {
            clips: Cue::ALL
                .into_iter()
                .map(|cue| (cue, audio.clip_secs(cue)))
                .collect(),
            played: Rc::default(),
        }
    }

    pub fn uniform(secs: f64) -> Self {
        Self::from_config(&AudioConfig::uniform(secs))
    }

    pub fn with_clip(mut self, cue: Cue, secs: f64) -> Self {
        self.clips.insert(cue, secs);
        self
    }

    pub fn played(&self) -> Vec<Cue> {
        self.played.borrow().clone()
    }
}

impl AudioPlayer for SimulatedAudio {
    fn play(&mut self, cue: Cue) {
        tracing::trace!(cue = cue.as_str(), "simulated playback");
        self.played.borrow_mut().push(cue);
    }

    fn duration_of(&self, cue: Cue) -> f64 {
        self.clips.get(&cue).copied().unwrap_or(0.0)
    }
}
