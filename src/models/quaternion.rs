use std::ops::Mul;
use serde::{Deserialize, Serialize};
use crate::models::{Matrix3, Vector3};

/// Body-frame axis that an orientation maps onto the particle director.
pub const INITIAL_DIRECTOR: Vector3 = Vector3::new(0.0, 0.0, 1.0);

/// Unit quaternion describing the orientation of a rotating particle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Quaternion::identity()
    }
}

impl Quaternion {
    /// Creates a new identity quaternion (no rotation)
    pub const fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Creates a quaternion from an axis and an angle in radians
    pub fn from_axis_angle(axis: Vector3, angle: f64) -> Self {
        let axis = match axis.normalized() {
            Some(axis) => axis,
            None => return Quaternion::identity(),
        };
        let half_angle = angle / 2.0;
        let sin_half = half_angle.sin();

        Quaternion {
            w: half_angle.cos(),
            x: axis.x * sin_half,
            y: axis.y * sin_half,
            z: axis.z * sin_half,
        }
    }

    /// Finite rotation about `rotation.normalized()` by the angle `|rotation|`.
    ///
    /// This is the rotation generated by an angular velocity `w` acting for a
    /// time `dt` when called with `w * dt`.
    pub fn from_rotation_axis(rotation: Vector3) -> Self {
        let angle = rotation.nrm();
        if angle == 0.0 {
            return Quaternion::identity();
        }
        Quaternion::from_axis_angle(rotation / angle, angle)
    }

    /// Shortest-arc rotation taking the direction `from` onto the direction `to`
    pub fn from_to(from: Vector3, to: Vector3) -> Self {
        let (from, to) = match (from.normalized(), to.normalized()) {
            (Some(a), Some(b)) => (a, b),
            _ => return Quaternion::identity(),
        };
        let cos_angle = from.dot(&to);
        if cos_angle <= -1.0 + 1e-12 {
            // Antiparallel: any perpendicular axis works
            let trial = if from.x.abs() < 0.9 { Vector3::unit(0) } else { Vector3::unit(1) };
            return Quaternion::from_axis_angle(from.cross(&trial), std::f64::consts::PI);
        }
        let axis = from.cross(&to);
        Quaternion {
            w: 1.0 + cos_angle,
            x: axis.x,
            y: axis.y,
            z: axis.z,
        }
        .normalized()
    }

    /// Returns the length/magnitude of the quaternion
    pub fn magnitude(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Returns a normalized version of the quaternion
    pub fn normalized(&self) -> Self {
        let mag = self.magnitude();
        if mag < 1e-10 {
            return Quaternion::identity();
        }
        Quaternion {
            w: self.w / mag,
            x: self.x / mag,
            y: self.y / mag,
            z: self.z / mag,
        }
    }

    /// Returns the conjugate, which is the inverse of a unit quaternion
    pub fn conjugate(&self) -> Quaternion {
        Quaternion {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    /// Rotates a vector by this (unit) quaternion
    pub fn rotate(&self, v: Vector3) -> Vector3 {
        // v' = v + 2 q_v x (q_v x v + w v)
        let qv = Vector3::new(self.x, self.y, self.z);
        let t = qv.cross(&v) + v * self.w;
        v + qv.cross(&t) * 2.0
    }

    /// The particle director, i.e. the rotated body axis
    pub fn director(&self) -> Vector3 {
        self.rotate(INITIAL_DIRECTOR)
    }

    pub fn to_matrix(&self) -> Matrix3 {
        Matrix3::from_rows(
            Vector3::new(
                1.0 - 2.0 * (self.y * self.y + self.z * self.z),
                2.0 * (self.x * self.y - self.w * self.z),
                2.0 * (self.x * self.z + self.w * self.y),
            ),
            Vector3::new(
                2.0 * (self.x * self.y + self.w * self.z),
                1.0 - 2.0 * (self.x * self.x + self.z * self.z),
                2.0 * (self.y * self.z - self.w * self.x),
            ),
            Vector3::new(
                2.0 * (self.x * self.z - self.w * self.y),
                2.0 * (self.y * self.z + self.w * self.x),
                1.0 - 2.0 * (self.x * self.x + self.y * self.y),
            ),
        )
    }
}

impl Mul for Quaternion {
    type Output = Quaternion;

    /// Composition of rotations: `(a * b).rotate(v) == a.rotate(b.rotate(v))`
    fn mul(self, other: Quaternion) -> Quaternion {
        Quaternion {
            w: self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
            x: self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            y: self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            z: self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
        }
    }
}
