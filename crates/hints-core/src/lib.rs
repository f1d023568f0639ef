//! # HINTS Core Library
//!
//! This library drives the HINTS vestibular examination: a fixed sequence
//! of instructed eye and head movements, recorded as one append-only text
//! log per session. All operations are available from the `hints-cli`
//! binary; a headset front end is a thin layer over the same library.
//!
//! ## Architecture
//!
//! - **Phase Sequencer**: a tick-driven state machine. The caller invokes
//!   `tick()` once per frame; nothing in the core blocks or spawns threads
//! - **Timers**: one-shot, epoch-guarded timers evaluated against the
//!   sequencer clock; audio completion and the delayed save use them
//! - **Measurement**: the session log and its byte-exact text format
//! - **Storage**: TOML configuration, the calibration flag and session files
//!
//! ## Key Components
//!
//! - [`PhaseSequencer`]: Core examination state machine
//! - [`Examination`]: Calibration and start/reset workflow around it
//! - [`SessionLog`]: Records and markers in chronological order
//! - [`Config`]: Application configuration management

pub mod audio;
pub mod error;
pub mod events;
pub mod exam;
pub mod measurement;
pub mod phase;
pub mod readiness;
pub mod save;
pub mod sensors;
pub mod sequencer;
pub mod sim;
pub mod storage;
pub mod timer;

pub use audio::{AudioPlayer, ClipLengths, Cue};
pub use error::{ConfigError, CoreError, StorageError};
pub use events::Event;
pub use exam::Examination;
pub use measurement::{MeasurementRecord, SessionLog};
pub use phase::{PhaseDescriptor, PhaseDurations, PhaseId, PhaseTable};
pub use readiness::{ReadinessGate, ReadinessMode};
pub use sensors::{EyeKind, GazeProvider, GazeSample, HeadPose, HeadPoseProvider, Space};
pub use sequencer::{Collaborators, ExaminationSession, PhaseSequencer, SequencerSettings};
pub use storage::{CalibrationStore, Config, FileCalibrationStore, FileStorageWriter, StorageWriter};
