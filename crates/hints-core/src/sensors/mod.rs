//! Gaze and head-pose readings, and the provider traits the sequencer samples.
//!
//! Acquisition itself lives outside this crate; a provider only has to hand
//! back a reading without blocking. Invalid readings are normal and are
//! logged as sentinels, never dropped.

mod geometry;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

pub use geometry::{Quaternion, Vector3};

/// Which eye a gaze reading describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EyeKind {
    Left,
    Right,
    Combined,
}

impl EyeKind {
    pub fn label(self) -> &'static str {
        match self {
            EyeKind::Left => "Left",
            EyeKind::Right => "Right",
            EyeKind::Combined => "Combined",
        }
    }
}

/// Reference frame of a gaze reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Space {
    /// Absolute room coordinates.
    World,
    /// Relative to the headset camera.
    Camera,
}

impl Space {
    pub fn label(self) -> &'static str {
        match self {
            Space::World => "World",
            Space::Camera => "Camera",
        }
    }

    /// Lower-case prefix used by the column names.
    pub fn prefix(self) -> &'static str {
        match self {
            Space::World => "world",
            Space::Camera => "camera",
        }
    }
}

/// One eye-tracking reading. Immutable once returned by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GazeSample {
    pub eye: EyeKind,
    pub space: Space,
    pub position: Vector3,
    pub direction: Vector3,
    pub valid: bool,
}

impl GazeSample {
    pub fn new(eye: EyeKind, space: Space, position: Vector3, direction: Vector3) -> Self {
        Self {
            eye,
            space,
            position,
            direction,
            valid: true,
        }
    }

    pub fn invalid(eye: EyeKind, space: Space) -> Self {
        Self {
            eye,
            space,
            position: Vector3::ZERO,
            direction: Vector3::ZERO,
            valid: false,
        }
    }
}

/// Head position and orientation at the instant a gaze batch was taken.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadPose {
    pub position: Vector3,
    /// Degrees.
    pub euler_angles: Vector3,
    pub orientation: Quaternion,
}

impl HeadPose {
    pub fn from_euler(position: Vector3, euler_angles: Vector3) -> Self {
        Self {
            position,
            euler_angles,
            orientation: Quaternion::from_euler_degrees(euler_angles),
        }
    }
}

/// Source of gaze readings. Called up to six times per sampling tick.
pub trait GazeProvider {
    fn sample(&mut self, eye: EyeKind, space: Space, at: DateTime<Local>) -> GazeSample;
}

/// Source of head poses.
pub trait HeadPoseProvider {
    fn current_pose(&mut self) -> HeadPose;
}
