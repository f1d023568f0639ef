use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audio::Cue;
use crate::phase::PhaseId;

/// Every state change of an examination produces an Event.
/// `tick()` returns them in the order they happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ExaminationStarted {
        session_id: Uuid,
        at: DateTime<Local>,
    },
    /// The readiness gate opened.
    ReadinessReached {
        at: DateTime<Local>,
    },
    PhaseEntered {
        phase: PhaseId,
        index: usize,
        at: DateTime<Local>,
    },
    CueStarted {
        phase: PhaseId,
        cue: Cue,
        duration_secs: f64,
        at: DateTime<Local>,
    },
    CueCompleted {
        phase: PhaseId,
        cue: Cue,
        at: DateTime<Local>,
    },
    MarkerWritten {
        phase: PhaseId,
        at: DateTime<Local>,
    },
    SaveArmed {
        delay_secs: f64,
        at: DateTime<Local>,
    },
    SessionSaved {
        label: String,
        /// Wherever the storage writer put the log.
        location: String,
        bytes: usize,
        at: DateTime<Local>,
    },
    SaveFailed {
        label: String,
        message: String,
        at: DateTime<Local>,
    },
    SessionReset {
        session_id: Uuid,
        epoch: u64,
        at: DateTime<Local>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Local> {
        match self {
            Event::ExaminationStarted { at, .. }
            | Event::ReadinessReached { at }
            | Event::PhaseEntered { at, .. }
            | Event::CueStarted { at, .. }
            | Event::CueCompleted { at, .. }
            | Event::MarkerWritten { at, .. }
            | Event::SaveArmed { at, .. }
            | Event::SessionSaved { at, .. }
            | Event::SaveFailed { at, .. }
            | Event::SessionReset { at, .. } => *at,
        }
    }
}
