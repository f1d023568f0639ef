//! One line of the session log.
//!
//! The text format is consumed by the offline analysis scripts and has to
//! stay byte-compatible: comma-separated `label: value` pairs in fixed
//! column order, vectors as `(x, y, z)` with six decimals, and the literal
//! `(NotAvailable)` for both fields of a reading that was not valid.

use std::fmt::Write as _;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::sensors::{EyeKind, GazeSample, HeadPose, Space, Vector3};

/// Sentinel written in place of an unavailable position or direction.
pub const NOT_AVAILABLE: &str = "(NotAvailable)";

/// `yyyy-MM-dd HH:mm:ss.fff`, used for record timestamps and markers.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// `yyyy_MM_dd_HH_mm_ss`, used for session labels and file names.
pub const LABEL_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

/// Column header, including its trailing space and newline.
pub const HEADER: &str = "timestamp, \
worldLeftEyePosition, worldLeftEyeDirection, worldRightEyePosition, worldRightEyeDirection, worldCombinedEyePosition, worldCombinedEyeDirection, \
cameraLeftEyePosition, cameraLeftEyeDirection, cameraRightEyePosition, cameraRightEyeDirection, cameraCombinedEyePosition, cameraCombinedEyeDirection, \
headPosition, headEulerAngles, headQuaternion \n";

/// Column order of the six gaze readings in a record.
pub const SAMPLE_ORDER: [(Space, EyeKind); 6] = [
    (Space::World, EyeKind::Left),
    (Space::World, EyeKind::Right),
    (Space::World, EyeKind::Combined),
    (Space::Camera, EyeKind::Left),
    (Space::Camera, EyeKind::Right),
    (Space::Camera, EyeKind::Combined),
];

/// A gaze reading as it appears in the log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GazeReading {
    Available {
        eye: EyeKind,
        space: Space,
        position: Vector3,
        direction: Vector3,
    },
    Unavailable {
        eye: EyeKind,
        space: Space,
    },
}

impl From<GazeSample> for GazeReading {
    fn from(sample: GazeSample) -> Self {
        if sample.valid {
            GazeReading::Available {
                eye: sample.eye,
                space: sample.space,
                position: sample.position,
                direction: sample.direction,
            }
        } else {
            GazeReading::Unavailable {
                eye: sample.eye,
                space: sample.space,
            }
        }
    }
}

impl GazeReading {
    pub fn is_available(&self) -> bool {
        matches!(self, GazeReading::Available { .. })
    }

    fn write_fields(&self, out: &mut String) {
        // Writing into a String cannot fail.
        let _ = match self {
            GazeReading::Available {
                eye,
                space,
                position,
                direction,
            } => write!(
                out,
                "{prefix}{eye}EyePosition: {position}, {prefix}{eye}EyeDirection: {direction}, ",
                prefix = space.prefix(),
                eye = eye.label(),
            ),
            GazeReading::Unavailable { eye, space } => write!(
                out,
                "{eye}Eye{space}Position: {NOT_AVAILABLE}, {eye}Eye{space}Direction: {NOT_AVAILABLE}, ",
                eye = eye.label(),
                space = space.label(),
            ),
        };
    }
}

/// One sampling tick: six gaze readings plus the head pose.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementRecord {
    pub timestamp: DateTime<Local>,
    /// In [`SAMPLE_ORDER`].
    pub gaze: [GazeReading; 6],
    pub head: HeadPose,
}

impl MeasurementRecord {
    pub fn write_line(&self, out: &mut String) {
        let _ = write!(out, "{}, ", self.timestamp.format(TIMESTAMP_FORMAT));
        for reading in &self.gaze {
            reading.write_fields(out);
        }
        let _ = writeln!(
            out,
            "HeadPosition: {}, HeadEulerAngles: {}, HeadQuaternion: {}",
            self.head.position, self.head.euler_angles, self.head.orientation
        );
    }

    pub fn to_line(&self) -> String {
        let mut line = String::with_capacity(1024);
        self.write_line(&mut line);
        line
    }

    pub fn unavailable_count(&self) -> usize {
        self.gaze.iter().filter(|r| !r.is_available()).count()
    }
}
