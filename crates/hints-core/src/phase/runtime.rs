use std::collections::BTreeMap;

use serde::Serialize;

use super::table::PhaseId;

/// Per-activation state of one phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PhaseRuntimeState {
    /// The cue (or cue chain) has been issued; guards against re-issuing.
    pub cue_requested: bool,
    /// The primary cue finished playing.
    pub audio_cue_started: bool,
    pub marker_written: bool,
    /// Seconds accumulated since `audio_cue_started`.
    pub elapsed: f64,
    pub notification_scheduled: bool,
    pub notification_done: bool,
}

/// `PhaseId -> PhaseRuntimeState` for every phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeTable {
    states: BTreeMap<PhaseId, PhaseRuntimeState>,
}

impl Default for RuntimeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeTable {
    pub fn new() -> Self {
        Self {
            states: PhaseId::ALL
                .into_iter()
                .map(|id| (id, PhaseRuntimeState::default()))
                .collect(),
        }
    }

    pub fn get(&self, id: PhaseId) -> &PhaseRuntimeState {
        // Every PhaseId is inserted in `new`.
        &self.states[&id]
    }

    pub fn get_mut(&mut self, id: PhaseId) -> &mut PhaseRuntimeState {
        self.states.entry(id).or_default()
    }

    /// Replaces the state of `id` with a fresh one.
    pub fn activate(&mut self, id: PhaseId) {
        self.states.insert(id, PhaseRuntimeState::default());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PhaseId, &PhaseRuntimeState)> {
        self.states.iter()
    }
}
