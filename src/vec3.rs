//! Three-component vector used for positions, offsets and rotation axes.

use std::fmt;
use std::ops::{Add, Div, Index, IndexMut, Mul, Neg, Rem, Sub};

use nalgebra::{Matrix3, Point3, Vector3};

use crate::kinematic_error::KinematicError;

/// Tolerance used by `approx_eq` and the epsilon-based helpers
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Plain 3D vector. `==` compares components exactly; use [`Vec3::approx_eq`]
/// when values come out of floating point computations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3 { x, y, z }
    }

    pub const fn zeros() -> Self {
        Vec3 { x: 0.0, y: 0.0, z: 0.0 }
    }

    /// Checked component access (0 = x, 1 = y, 2 = z).
    pub fn at(&self, n: usize) -> Result<f64, KinematicError> {
        match n {
            0 => Ok(self.x),
            1 => Ok(self.y),
            2 => Ok(self.z),
            _ => Err(KinematicError::IndexOutOfRange { index: n as isize, len: 3 }),
        }
    }

    /// Checked component update.
    pub fn set(&mut self, n: usize, value: f64) -> Result<(), KinematicError> {
        match n {
            0 => self.x = value,
            1 => self.y = value,
            2 => self.z = value,
            _ => return Err(KinematicError::IndexOutOfRange { index: n as isize, len: 3 }),
        }
        Ok(())
    }

    pub fn dot(&self, other: &Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product, also available as `a % b`.
    pub fn cross(&self, other: &Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Division that reports a zero divisor instead of producing infinities.
    pub fn checked_div(&self, k: f64) -> Result<Vec3, KinematicError> {
        if k == 0.0 {
            return Err(KinematicError::DivisionByZero);
        }
        Ok(*self / k)
    }

    /// Unit vector in the same direction.
    pub fn normalized(&self) -> Result<Vec3, KinematicError> {
        let n = self.norm();
        if n <= DEFAULT_TOLERANCE {
            return Err(KinematicError::DivisionByZero);
        }
        Ok(*self / n)
    }

    pub fn is_nan(&self) -> bool {
        self.x.is_nan() || self.y.is_nan() || self.z.is_nan()
    }

    pub fn is_inf(&self) -> bool {
        self.x.is_infinite() || self.y.is_infinite() || self.z.is_infinite()
    }

    /// Neither NaN nor infinite
    pub fn is_num(&self) -> bool {
        !self.is_nan() && !self.is_inf()
    }

    pub fn approx_eq(&self, other: &Vec3, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps
            && (self.y - other.y).abs() <= eps
            && (self.z - other.z).abs() <= eps
    }

    /// Skew-symmetric matrix such that `tilde(a) * b == a % b`.
    pub fn tilde(&self) -> Matrix3<f64> {
        Vector3::from(*self).cross_matrix()
    }

    /// 1 for every component that is zero within tolerance, 0 otherwise.
    pub fn zero_mask(&self) -> Vec3 {
        let mask = |v: f64| if v.abs() > DEFAULT_TOLERANCE { 0.0 } else { 1.0 };
        Vec3::new(mask(self.x), mask(self.y), mask(self.z))
    }

    /// Component-wise sign, with values within tolerance of zero mapped to 0.
    pub fn sign(&self) -> Vec3 {
        let sign = |v: f64| {
            if v.abs() <= DEFAULT_TOLERANCE { 0.0 } else if v > 0.0 { 1.0 } else { -1.0 }
        };
        Vec3::new(sign(self.x), sign(self.y), sign(self.z))
    }
}

impl Index<usize> for Vec3 {
    type Output = f64;

    fn index(&self, n: usize) -> &f64 {
        match n {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vec3 index out of range: {}", n),
        }
    }
}

impl IndexMut<usize> for Vec3 {
    fn index_mut(&mut self, n: usize) -> &mut f64 {
        match n {
            0 => &mut self.x,
            1 => &mut self.y,
            2 => &mut self.z,
            _ => panic!("Vec3 index out of range: {}", n),
        }
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, o: Vec3) -> Vec3 {
        Vec3::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, o: Vec3) -> Vec3 {
        Vec3::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}

impl Rem for Vec3 {
    type Output = Vec3;
    fn rem(self, o: Vec3) -> Vec3 {
        self.cross(&o)
    }
}

// Scalar operators, both sides. Scalar add/subtract apply to every component.
impl Add<f64> for Vec3 {
    type Output = Vec3;
    fn add(self, k: f64) -> Vec3 {
        Vec3::new(self.x + k, self.y + k, self.z + k)
    }
}

impl Add<Vec3> for f64 {
    type Output = Vec3;
    fn add(self, v: Vec3) -> Vec3 {
        v + self
    }
}

impl Sub<f64> for Vec3 {
    type Output = Vec3;
    fn sub(self, k: f64) -> Vec3 {
        Vec3::new(self.x - k, self.y - k, self.z - k)
    }
}

impl Sub<Vec3> for f64 {
    type Output = Vec3;
    fn sub(self, v: Vec3) -> Vec3 {
        Vec3::new(self - v.x, self - v.y, self - v.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, k: f64) -> Vec3 {
        Vec3::new(self.x * k, self.y * k, self.z * k)
    }
}

impl Mul<Vec3> for f64 {
    type Output = Vec3;
    fn mul(self, v: Vec3) -> Vec3 {
        v * self
    }
}

/// IEEE division, dividing by zero yields infinities (or NaN for 0/0).
/// See [`Vec3::checked_div`] for the guarded version.
impl Div<f64> for Vec3 {
    type Output = Vec3;
    fn div(self, k: f64) -> Vec3 {
        Vec3::new(self.x / k, self.y / k, self.z / k)
    }
}

impl Div<Vec3> for f64 {
    type Output = Vec3;
    fn div(self, v: Vec3) -> Vec3 {
        Vec3::new(self / v.x, self / v.y, self / v.z)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:+.4e}, {:+.4e}, {:+.4e}]", self.x, self.y, self.z)
    }
}

impl From<Vector3<f64>> for Vec3 {
    fn from(v: Vector3<f64>) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

impl From<Vec3> for Vector3<f64> {
    fn from(v: Vec3) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

impl From<Point3<f64>> for Vec3 {
    fn from(p: Point3<f64>) -> Self {
        Vec3::new(p.x, p.y, p.z)
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(a: [f64; 3]) -> Self {
        Vec3::new(a[0], a[1], a[2])
    }
}
