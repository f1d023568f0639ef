//! Instructional audio cues.
//!
//! Playback is fire-and-forget; "waiting" for a cue is done by the sequencer
//! scheduling a completion timer for the clip's length. Clip lengths are
//! static, so they are captured once when a session is built.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Every clip the examination plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    /// "Say your name", played when the examination is started.
    SayName,
    Intro,
    /// "Look around the room".
    FreeGaze,
    /// "Hold still". Also the preamble of the look-up and look-down cues.
    HoldStill,
    /// "Look at the nose".
    FixateNear,
    LookLeft,
    LookRight,
    LookUp,
    LookDown,
    /// Short chime for the final phase and for a finished save.
    Notification,
}

impl Cue {
    pub const ALL: [Cue; 10] = [
        Cue::SayName,
        Cue::Intro,
        Cue::FreeGaze,
        Cue::HoldStill,
        Cue::FixateNear,
        Cue::LookLeft,
        Cue::LookRight,
        Cue::LookUp,
        Cue::LookDown,
        Cue::Notification,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Cue::SayName => "say_name",
            Cue::Intro => "intro",
            Cue::FreeGaze => "free_gaze",
            Cue::HoldStill => "hold_still",
            Cue::FixateNear => "fixate_near",
            Cue::LookLeft => "look_left",
            Cue::LookRight => "look_right",
            Cue::LookUp => "look_up",
            Cue::LookDown => "look_down",
            Cue::Notification => "notification",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Cue::ALL.into_iter().find(|cue| cue.as_str() == s)
    }
}

/// Audio output collaborator.
pub trait AudioPlayer {
    /// Starts playback and returns immediately.
    fn play(&mut self, cue: Cue);

    /// Length of the clip in seconds.
    fn duration_of(&self, cue: Cue) -> f64;
}

/// Clip lengths captured from an [`AudioPlayer`] at session start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipLengths {
    secs: BTreeMap<Cue, f64>,
}

impl ClipLengths {
    /// Queries every cue once.
    ///
    /// # Errors
    ///
    /// Returns an error if the player reports a negative or non-finite length.
    pub fn capture(player: &dyn AudioPlayer) -> Result<Self, ConfigError> {
        let mut secs = BTreeMap::new();
        for cue in Cue::ALL {
            let length = player.duration_of(cue);
            if !length.is_finite() || length < 0.0 {
                return Err(ConfigError::invalid(
                    format!("audio.clips.{}", cue.as_str()),
                    format!("clip length must be a non-negative number of seconds, got {length}"),
                ));
            }
            secs.insert(cue, length);
        }
        Ok(Self { secs })
    }

    pub fn get(&self, cue: Cue) -> f64 {
        self.secs.get(&cue).copied().unwrap_or(0.0)
    }
}
