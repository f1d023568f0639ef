use chrono::{DateTime, Local};
use uuid::Uuid;

use crate::measurement::{SessionLog, LABEL_FORMAT};
use crate::phase::{PhaseDescriptor, PhaseId, PhaseRuntimeState, PhaseTable, RuntimeTable};
use crate::save::{SaveSchedule, SaveScheduler};

/// Aggregate root of one examination run.
///
/// Mutated only by the sequencer. A reset replaces everything except the
/// phase table, which depends on configuration alone.
#[derive(Debug, Clone)]
pub struct ExaminationSession {
    id: Uuid,
    phases: PhaseTable,
    runtime: RuntimeTable,
    current: PhaseId,
    started_at: DateTime<Local>,
    pub(crate) log: SessionLog,
    pub(crate) save: SaveScheduler,
}

impl ExaminationSession {
    pub fn new(phases: PhaseTable, started_at: DateTime<Local>) -> Self {
        Self {
            id: Uuid::new_v4(),
            phases,
            runtime: RuntimeTable::new(),
            current: PhaseId::ReadinessGate,
            started_at,
            log: SessionLog::new(),
            save: SaveScheduler::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phases(&self) -> &PhaseTable {
        &self.phases
    }

    pub fn runtime(&self) -> &RuntimeTable {
        &self.runtime
    }

    pub fn current_phase(&self) -> PhaseId {
        self.current
    }

    pub fn current_index(&self) -> usize {
        self.current.ordinal()
    }

    pub fn current_descriptor(&self) -> &PhaseDescriptor {
        self.phases.phase(self.current)
    }

    pub fn current_state(&self) -> &PhaseRuntimeState {
        self.runtime.get(self.current)
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// `yyyy_MM_dd_HH_mm_ss` of the session start; names the output folder.
    pub fn label(&self) -> String {
        self.started_at.format(LABEL_FORMAT).to_string()
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn save_schedule(&self) -> &SaveSchedule {
        self.save.schedule()
    }

    pub fn is_terminal(&self) -> bool {
        self.current == PhaseId::Finalize
    }

    pub(crate) fn state_mut(&mut self, id: PhaseId) -> &mut PhaseRuntimeState {
        self.runtime.get_mut(id)
    }

    /// Moves to the next phase with a fresh runtime state.
    /// Returns the entered phase, or `None` when already terminal.
    pub(crate) fn advance(&mut self) -> Option<PhaseId> {
        let next = *PhaseId::ALL.get(self.current.ordinal() + 1)?;
        self.current = next;
        self.runtime.activate(next);
        Some(next)
    }

    /// Back to the first phase with an empty log and no save armed.
    pub(crate) fn restart(&mut self, started_at: DateTime<Local>) {
        self.id = Uuid::new_v4();
        self.runtime = RuntimeTable::new();
        self.current = PhaseId::ReadinessGate;
        self.started_at = started_at;
        self.log = SessionLog::new();
        self.save.reset();
    }
}
