use std::ops::{Add, AddAssign, Mul, Sub};
use crate::models::Vector3;

/// Row-major 3x3 matrix.
///
/// Used for rotation matrices and for the dyadic (outer) products that
/// accumulate collisional stress from pair impulses.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Matrix3 {
    pub rows: [[f64; 3]; 3],
}

impl Matrix3 {
    pub const fn zero() -> Self {
        Self { rows: [[0.0; 3]; 3] }
    }

    pub const fn identity() -> Self {
        Self {
            rows: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    pub fn from_rows(r0: Vector3, r1: Vector3, r2: Vector3) -> Self {
        Self { rows: [r0.to_array(), r1.to_array(), r2.to_array()] }
    }

    /// Outer product `a b^T`.
    pub fn dyadic(a: &Vector3, b: &Vector3) -> Self {
        let mut m = Self::zero();
        for i in 0..3 {
            for j in 0..3 {
                m.rows[i][j] = a[i] * b[j];
            }
        }
        m
    }

    pub fn row(&self, i: usize) -> Vector3 {
        Vector3::from(self.rows[i])
    }

    pub fn column(&self, j: usize) -> Vector3 {
        Vector3::new(self.rows[0][j], self.rows[1][j], self.rows[2][j])
    }

    pub fn transpose(&self) -> Self {
        Self::from_rows(self.column(0), self.column(1), self.column(2))
    }

    pub fn trace(&self) -> f64 {
        self.rows[0][0] + self.rows[1][1] + self.rows[2][2]
    }

    pub fn determinant(&self) -> f64 {
        self.row(0).dot(&self.row(1).cross(&self.row(2)))
    }

    pub fn scale(&self, factor: f64) -> Self {
        let mut m = *self;
        for row in m.rows.iter_mut() {
            for value in row.iter_mut() {
                *value *= factor;
            }
        }
        m
    }
}

impl Mul<Vector3> for Matrix3 {
    type Output = Vector3;
    fn mul(self, v: Vector3) -> Vector3 {
        Vector3::new(self.row(0).dot(&v), self.row(1).dot(&v), self.row(2).dot(&v))
    }
}

impl Mul for Matrix3 {
    type Output = Matrix3;
    fn mul(self, rhs: Matrix3) -> Matrix3 {
        let mut m = Matrix3::zero();
        for i in 0..3 {
            for j in 0..3 {
                m.rows[i][j] = self.row(i).dot(&rhs.column(j));
            }
        }
        m
    }
}

impl Add for Matrix3 {
    type Output = Matrix3;
    fn add(self, rhs: Matrix3) -> Matrix3 {
        let mut m = self;
        m += rhs;
        m
    }
}

impl AddAssign for Matrix3 {
    fn add_assign(&mut self, rhs: Matrix3) {
        for i in 0..3 {
            for j in 0..3 {
                self.rows[i][j] += rhs.rows[i][j];
            }
        }
    }
}

impl Sub for Matrix3 {
    type Output = Matrix3;
    fn sub(self, rhs: Matrix3) -> Matrix3 {
        self + rhs.scale(-1.0)
    }
}
