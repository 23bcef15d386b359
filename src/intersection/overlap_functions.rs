//! Smooth scalar functions of time whose roots mark contact between two
//! shapes whose separation cannot be written as a low-order polynomial
//! (rotating rods, oscillating plates).
//!
//! The Frenkel root search only needs bounds on the first and second time
//! derivatives of these functions, plus a test deciding whether a root is a
//! genuine contact.

use crate::models::{Quaternion, Vector3};

/// A function of time that is searched for contact roots.
///
/// Times are measured from the moment the function was built.
pub trait OverlapFunction {
    /// Value (`deriv == 0`), first or second derivative at time `t`.
    fn eval(&self, t: f64, deriv: usize) -> f64;

    /// Upper bound on the magnitude of the first (`deriv == 1`) or second
    /// (`deriv == 2`) derivative over all times.
    fn max_derivative(&self, deriv: usize) -> f64;

    /// Whether a root found at time `t` is a physical contact.
    fn test_root(&self, t: f64) -> bool;

    /// Moves the origin of time forward by `dt`.
    fn stream(&mut self, dt: f64);
}

//==============================================================================
// THIN RODS
//==============================================================================

/// Overlap function of two infinitely thin rotating rods of equal `length`.
///
/// `f(t) = (u1 x u2) . r12` vanishes when the two rod lines are coplanar; the
/// root is a contact if the closest points of the two lines lie on both rods.
#[derive(Debug, Clone)]
pub struct Lines {
    r12: Vector3,
    v12: Vector3,
    w1: Vector3,
    w2: Vector3,
    u1: Vector3,
    u2: Vector3,
    length: f64,
}

impl Lines {
    /// `u1` and `u2` are the current unit directors of the two rods.
    pub fn new(r12: Vector3, v12: Vector3, w1: Vector3, w2: Vector3, u1: Vector3, u2: Vector3, length: f64) -> Self {
        Lines { r12, v12, w1, w2, u1, u2, length }
    }

    /// Builds the function from the particle orientations.
    pub fn from_orientations(
        r12: Vector3,
        v12: Vector3,
        w1: Vector3,
        w2: Vector3,
        q1: &Quaternion,
        q2: &Quaternion,
        length: f64,
    ) -> Self {
        Lines::new(r12, v12, w1, w2, q1.director(), q2.director(), length)
    }

    fn directors_at(&self, t: f64) -> (Vector3, Vector3) {
        (
            Quaternion::from_rotation_axis(self.w1 * t).rotate(self.u1),
            Quaternion::from_rotation_axis(self.w2 * t).rotate(self.u2),
        )
    }

    /// Positions along each rod (measured from its centre) of the closest
    /// points of the two rod lines at time `t`.
    pub fn collision_points(&self, t: f64) -> (f64, f64) {
        let (u1, u2) = self.directors_at(t);
        let r12 = self.r12 + self.v12 * t;
        collision_points(&r12, &u1, &u2)
    }

    pub fn length(&self) -> f64 {
        self.length
    }
}

/// Closest-point parameters `(s1, s2)` of the lines `r1 + s1 u1` and `r2 + s2 u2`,
/// with `r12 = r1 - r2`. Parallel lines have no unique answer and give NaN.
pub fn collision_points(r12: &Vector3, u1: &Vector3, u2: &Vector3) -> (f64, f64) {
    let a = r12.dot(u1);
    let b = r12.dot(u2);
    let c = u1.dot(u2);
    let denominator = 1.0 - c * c;
    if denominator == 0.0 {
        return (f64::NAN, f64::NAN);
    }
    ((c * b - a) / denominator, (b - c * a) / denominator)
}

impl OverlapFunction for Lines {
    fn eval(&self, t: f64, deriv: usize) -> f64 {
        let (u1, u2) = self.directors_at(t);
        let r12 = self.r12 + self.v12 * t;
        let du1 = self.w1.cross(&u1);
        let du2 = self.w2.cross(&u2);
        match deriv {
            0 => u1.cross(&u2).dot(&r12),
            1 => (du1.cross(&u2) + u1.cross(&du2)).dot(&r12) + u1.cross(&u2).dot(&self.v12),
            _ => {
                let ddu1 = self.w1.cross(&du1);
                let ddu2 = self.w2.cross(&du2);
                (ddu1.cross(&u2) + du1.cross(&du2) * 2.0 + u1.cross(&ddu2)).dot(&r12)
                    + (du1.cross(&u2) + u1.cross(&du2)).dot(&self.v12) * 2.0
            }
        }
    }

    fn max_derivative(&self, deriv: usize) -> f64 {
        // Valid while the rod centres are closer than one rod length
        let w_sum = self.w1.nrm() + self.w2.nrm();
        match deriv {
            1 => self.length * w_sum + self.v12.nrm(),
            _ => w_sum * (2.0 * self.v12.nrm() + self.length * w_sum),
        }
    }

    fn test_root(&self, t: f64) -> bool {
        let (s1, s2) = self.collision_points(t);
        let half = 0.5 * self.length;
        s1.abs() < half && s2.abs() < half
    }

    fn stream(&mut self, dt: f64) {
        let (u1, u2) = self.directors_at(dt);
        self.u1 = u1;
        self.u2 = u2;
        self.r12 += self.v12 * dt;
    }
}

//==============================================================================
// OSCILLATING PLATE
//==============================================================================

/// Overlap function of a point and a plate oscillating along its normal.
///
/// The plate centre sits at `delta * cos(omega * (t0 + t))` along `n`, the
/// point at `r + v t`. The signed contact offset `sigma` is positive when the
/// point is on the `+n` side, so `f = (r + v t).n - plate(t) - sigma` is zero
/// at contact and `sigma * f > 0` while separated.
#[derive(Debug, Clone)]
pub struct OscillatingPlate {
    r_n: f64,
    v_n: f64,
    delta: f64,
    omega: f64,
    t0: f64,
    sigma: f64,
}

impl OscillatingPlate {
    /// `r_n` and `v_n` are the point's position and velocity along the unit
    /// normal relative to the plate rest position; `t0` is the current phase time.
    pub fn new(r_n: f64, v_n: f64, delta: f64, omega: f64, t0: f64, sigma: f64) -> Self {
        OscillatingPlate { r_n, v_n, delta, omega, t0, sigma }
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Swaps to the other face of the plate.
    pub fn flip_sigma(&mut self) {
        self.sigma = -self.sigma;
    }

    /// Chooses the face from the side the point currently sits on.
    pub fn fix_sigma_sign(&mut self) {
        let offset = self.r_n - self.wall_position(0.0);
        if (offset < 0.0) != (self.sigma < 0.0) {
            self.flip_sigma();
        }
    }

    /// Plate displacement along the normal at time `t`.
    pub fn wall_position(&self, t: f64) -> f64 {
        self.delta * (self.omega * (self.t0 + t)).cos()
    }

    /// Plate velocity along the normal at time `t`.
    pub fn wall_velocity(&self, t: f64) -> f64 {
        -self.delta * self.omega * (self.omega * (self.t0 + t)).sin()
    }

    pub fn max_wall_velocity(&self) -> f64 {
        self.delta * self.omega
    }
}

impl OverlapFunction for OscillatingPlate {
    fn eval(&self, t: f64, deriv: usize) -> f64 {
        let phase = self.omega * (self.t0 + t);
        match deriv {
            0 => self.r_n + self.v_n * t - self.delta * phase.cos() - self.sigma,
            1 => self.v_n + self.delta * self.omega * phase.sin(),
            _ => self.delta * self.omega * self.omega * phase.cos(),
        }
    }

    fn max_derivative(&self, deriv: usize) -> f64 {
        match deriv {
            1 => self.v_n.abs() + self.delta * self.omega,
            _ => self.delta * self.omega * self.omega,
        }
    }

    fn test_root(&self, t: f64) -> bool {
        // The point must be closing in on the face it touches
        self.sigma * self.eval(t, 1) < 0.0
    }

    fn stream(&mut self, dt: f64) {
        self.r_n += self.v_n * dt;
        self.t0 += dt;
    }
}
