//! Small vector and bounding-box math shared by the store and the simulation.
//!
//! Coordinates are right-handed with Y up. The horizontal plane is XZ, which
//! is the plane the spatial index partitions.

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

// ---------------------------------------------------------------------------
// Vec3
// ---------------------------------------------------------------------------

/// A 3-component vector. Serialized as a `[x, y, z]` array on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Vec3 {
    /// Horizontal axis.
    pub x: f64,
    /// Vertical axis.
    pub y: f64,
    /// Horizontal (depth) axis.
    pub z: f64,
}

impl Vec3 {
    /// The zero vector.
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Construct a vector from its components.
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean length.
    #[inline]
    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Length of the XZ projection.
    #[inline]
    pub fn horizontal_length(self) -> f64 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    /// Distance between two points in the XZ plane, ignoring Y.
    #[inline]
    pub fn horizontal_distance(self, other: Vec3) -> f64 {
        (other - self).horizontal_length()
    }

    /// The XZ projection (Y zeroed).
    #[inline]
    pub fn horizontal(self) -> Vec3 {
        Vec3::new(self.x, 0.0, self.z)
    }

    /// Unit-length copy, or zero when the vector is (near) zero.
    pub fn normalize_or_zero(self) -> Vec3 {
        let len = self.length();
        if len > f64::EPSILON {
            self * (1.0 / len)
        } else {
            Vec3::ZERO
        }
    }

    /// Linear interpolation between `self` (t = 0) and `other` (t = 1).
    #[inline]
    pub fn lerp(self, other: Vec3, t: f64) -> Vec3 {
        self + (other - self) * t
    }

    /// Whether every component is finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(v: [f64; 3]) -> Self {
        Vec3::new(v[0], v[1], v[2])
    }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self {
        [v.x, v.y, v.z]
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vec3 {
    fn sub_assign(&mut self, rhs: Vec3) {
        *self = *self - rhs;
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f64) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

// ---------------------------------------------------------------------------
// Aabb
// ---------------------------------------------------------------------------

/// Axis-aligned bounding box stored as center + half extents.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Box center.
    pub center: Vec3,
    /// Half the box size along each axis.
    pub half: Vec3,
}

impl Aabb {
    /// Box from a center and half extents.
    pub fn new(center: Vec3, half: Vec3) -> Self {
        Self { center, half }
    }

    /// Box from a center and full size (the entity wire convention).
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        Self {
            center,
            half: size * 0.5,
        }
    }

    /// Lowest Y of the box.
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.center.y - self.half.y
    }

    /// Highest Y of the box.
    #[inline]
    pub fn top(&self) -> f64 {
        self.center.y + self.half.y
    }

    /// Strict overlap test: boxes that merely touch do not intersect.
    pub fn intersects(&self, other: &Aabb) -> bool {
        let d = other.center - self.center;
        d.x.abs() < self.half.x + other.half.x
            && d.y.abs() < self.half.y + other.half.y
            && d.z.abs() < self.half.z + other.half.z
    }

    /// Penetration depth along each axis (positive when overlapping).
    pub fn overlap(&self, other: &Aabb) -> Vec3 {
        let d = other.center - self.center;
        Vec3::new(
            self.half.x + other.half.x - d.x.abs(),
            self.half.y + other.half.y - d.y.abs(),
            self.half.z + other.half.z - d.z.abs(),
        )
    }
}

// ---------------------------------------------------------------------------
// Angles
// ---------------------------------------------------------------------------

/// Wrap an angle into `(-PI, PI]`.
pub fn wrap_angle(mut angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    angle %= TAU;
    if angle <= -PI {
        angle += TAU;
    } else if angle > PI {
        angle -= TAU;
    }
    angle
}

/// Rotate `from` toward `to` by fraction `t` along the shorter arc.
///
/// The delta is wrapped first, so the result never turns more than PI.
pub fn lerp_angle(from: f64, to: f64, t: f64) -> f64 {
    let delta = wrap_angle(to - from);
    wrap_angle(from + delta * t.clamp(0.0, 1.0))
}

/// Yaw (rotation about Y) that faces along the XZ direction `(dx, dz)`.
#[inline]
pub fn yaw_towards(dx: f64, dz: f64) -> f64 {
    dx.atan2(dz)
}
