mod runtime;
mod table;

pub use runtime::{PhaseRuntimeState, RuntimeTable};
pub use table::{ExitRule, PhaseDescriptor, PhaseDurations, PhaseId, PhaseTable};

pub(crate) use table::check_duration;
