use std::fmt;

use serde::{Deserialize, Serialize};

/// Position or direction in metres / unit vector space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const FORWARD: Self = Self::new(0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit vector in the same direction, or `self` for a zero vector.
    pub fn normalized(&self) -> Self {
        let len = self.length();
        if len <= f32::EPSILON {
            return *self;
        }
        Self::new(self.x / len, self.y / len, self.z / len)
    }
}

impl std::ops::Add for Vector3 {
    type Output = Vector3;

    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

/// `(x, y, z)` with six decimals: the column format of the session log.
impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6}, {:.6})", self.x, self.y, self.z)
    }
}

/// Rotation quaternion, stored `x, y, z, w`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Builds a rotation from Euler angles in degrees.
    ///
    /// Rotation order is Z, then X, then Y, which is the convention head
    /// trackers report `eulerAngles` in.
    pub fn from_euler_degrees(angles: Vector3) -> Self {
        let (sx, cx) = (angles.x.to_radians() * 0.5).sin_cos();
        let (sy, cy) = (angles.y.to_radians() * 0.5).sin_cos();
        let (sz, cz) = (angles.z.to_radians() * 0.5).sin_cos();

        Self {
            x: cy * sx * cz + sy * cx * sz,
            y: sy * cx * cz - cy * sx * sz,
            z: cy * cx * sz - sy * sx * cz,
            w: cy * cx * cz + sy * sx * sz,
        }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// `(x, y, z, w)` with six decimals.
impl fmt::Display for Quaternion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.6}, {:.6}, {:.6}, {:.6})",
            self.x, self.y, self.z, self.w
        )
    }
}
