//! Quaternion used to represent orientation.
//!
//! Components are stored as (x, y, z, w) with `w` the scalar part, so the identity
//! rotation is (0, 0, 0, 1). A quaternion only represents a rotation when it has unit
//! norm; this is not enforced automatically, call [`Vec4::normalize`] where needed.

use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::ops::{Add, Div, Index, Mul, Neg, Sub};

use nalgebra::{Matrix3, Quaternion, Rotation3, UnitQuaternion};

use crate::kinematic_error::KinematicError;
use crate::vec3::{Vec3, DEFAULT_TOLERANCE};

/// Norm below which a quaternion cannot be normalized
const MIN_NORM: f64 = 1e-6;

/// |sin(pitch)| above which roll and yaw can no longer be told apart
const GIMBAL_LOCK: f64 = 1.0 - 4.0 * f64::EPSILON;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec4 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Vec4 {
    fn default() -> Self {
        Vec4::identity()
    }
}

impl Vec4 {
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Vec4 { x, y, z, w }
    }

    pub const fn identity() -> Self {
        Vec4 { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
    }

    /// Rotation of `theta` radians about `axis`. The axis does not need to be of unit
    /// length but must not be zero. The result is kept on the w >= 0 hemisphere.
    pub fn from_axis_angle(axis: &Vec3, theta: f64) -> Result<Self, KinematicError> {
        let nrm = axis.norm();
        if nrm <= DEFAULT_TOLERANCE {
            return Err(KinematicError::DivisionByZero);
        }
        Ok(Self::from_unit_axis_angle(&(*axis / nrm), theta))
    }

    /// Same as [`Vec4::from_axis_angle`] for an axis already known to be of unit length.
    pub(crate) fn from_unit_axis_angle(axis: &Vec3, theta: f64) -> Self {
        let (s, c) = (theta / 2.0).sin_cos();
        let q = Vec4::new(axis.x * s, axis.y * s, axis.z * s, c);
        if q.w < 0.0 { -q } else { q }
    }

    /// From 3-2-1 Euler angles: rotation about Z by yaw, then Y by pitch, then X by roll.
    pub fn from_rpy(roll: f64, pitch: f64, yaw: f64) -> Self {
        let q: Vec4 = UnitQuaternion::from_euler_angles(roll, pitch, yaw).into();
        if q.w < 0.0 { -q } else { q }
    }

    /// From a proper rotation matrix.
    pub fn from_rotation_matrix(m: &Matrix3<f64>) -> Self {
        Self::from_rotation(&Rotation3::from_matrix_unchecked(*m))
    }

    pub fn from_rotation(rotation: &Rotation3<f64>) -> Self {
        let q: Vec4 = UnitQuaternion::from_rotation_matrix(rotation).into();
        if q.w < 0.0 { -q } else { q }
    }

    pub fn at(&self, n: usize) -> Result<f64, KinematicError> {
        match n {
            0 => Ok(self.x),
            1 => Ok(self.y),
            2 => Ok(self.z),
            3 => Ok(self.w),
            _ => Err(KinematicError::IndexOutOfRange { index: n as isize, len: 4 }),
        }
    }

    pub fn set(&mut self, n: usize, value: f64) -> Result<(), KinematicError> {
        match n {
            0 => self.x = value,
            1 => self.y = value,
            2 => self.z = value,
            3 => self.w = value,
            _ => return Err(KinematicError::IndexOutOfRange { index: n as isize, len: 4 }),
        }
        Ok(())
    }

    /// Vector part
    pub fn v(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    pub fn conj(&self) -> Vec4 {
        Vec4::new(-self.x, -self.y, -self.z, self.w)
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    /// Unit quaternion on the w >= 0 hemisphere.
    pub fn normalize(&self) -> Result<Vec4, KinematicError> {
        let nrm = self.norm();
        if nrm <= MIN_NORM {
            return Err(KinematicError::DivisionByZero);
        }
        let ret = *self / nrm;
        Ok(if self.w < 0.0 { -ret } else { ret })
    }

    /// Rescales to unit norm without touching the sign; leaves degenerate values as they are.
    pub(crate) fn unit(&self) -> Vec4 {
        let nrm = self.norm();
        if nrm > MIN_NORM { *self / nrm } else { *self }
    }

    /// 3-2-1 Euler angles (roll, pitch, yaw). At pitch ±π/2 only roll ∓ yaw is
    /// defined; yaw is then reported as zero.
    pub fn rpy(&self) -> Vec3 {
        let rotation = self.to_rotation();
        let m = rotation.matrix();
        let sin_pitch = -m[(2, 0)];
        if sin_pitch.abs() < GIMBAL_LOCK {
            let (roll, pitch, yaw) = rotation.euler_angles();
            return Vec3::new(roll, pitch, yaw);
        }
        // Row 1 of Ry(±π/2) * Rx(roll) is (0, cos roll, -sin roll)
        let roll = f64::atan2(-m[(1, 2)], m[(1, 1)]);
        Vec3::new(roll, FRAC_PI_2.copysign(sin_pitch), 0.0)
    }

    pub fn to_rotation(&self) -> Rotation3<f64> {
        UnitQuaternion::from(*self).to_rotation_matrix()
    }

    /// Rotation matrix, `R * v == self.rotate(v)`.
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.to_rotation().into_inner()
    }

    /// Direction cosine matrix, the transpose of [`Vec4::rotation_matrix`].
    pub fn dcm(&self) -> Matrix3<f64> {
        self.rotation_matrix().transpose()
    }

    /// Rotates a vector given in this frame into the reference frame: q v q*.
    pub fn rotate(&self, v: &Vec3) -> Vec3 {
        let p = *self * Vec4::new(v.x, v.y, v.z, 0.0) * self.conj();
        p.v()
    }

    /// Axis (in this frame) and angle in [0, pi] of the rotation leading from this
    /// orientation to `other`, so that `self * from_axis_angle(axis, angle) ~ other`.
    /// A zero axis and angle are returned when both orientations coincide.
    pub fn rotation_to(&self, other: &Vec4) -> (Vec3, f64) {
        let a: UnitQuaternion<f64> = (*self).into();
        let b: UnitQuaternion<f64> = (*other).into();
        match (a.inverse() * b).axis_angle() {
            Some((axis, angle)) if angle > DEFAULT_TOLERANCE => (axis.into_inner().into(), angle),
            _ => (Vec3::zeros(), 0.0),
        }
    }

    /// Spherical linear interpolation towards `other`, `t` in [0, 1]. The shorter
    /// arc is taken unless `detour` is requested.
    pub fn slerp(&self, other: &Vec4, t: f64, detour: bool) -> Result<Vec4, KinematicError> {
        if !(0.0..=1.0).contains(&t) {
            return Err(KinematicError::InvalidArgument(
                format!("slerp parameter {} outside of [0, 1]", t)));
        }
        let mut target = *other;
        let mut dot = self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w;
        if (dot > 0.0 && detour) || (dot < 0.0 && !detour) {
            target = -target;
            dot = -dot;
        }
        let theta = dot.clamp(-1.0, 1.0).acos();
        let s = theta.sin();
        if s.abs() < DEFAULT_TOLERANCE {
            return Ok(*self);
        }
        let a = ((1.0 - t) * theta).sin() / s;
        let b = (t * theta).sin() / s;
        Ok(*self * a + target * b)
    }

    pub fn approx_eq(&self, other: &Vec4, eps: f64) -> bool {
        (self.x - other.x).abs() <= eps
            && (self.y - other.y).abs() <= eps
            && (self.z - other.z).abs() <= eps
            && (self.w - other.w).abs() <= eps
    }

    /// True if both quaternions encode the same rotation (q and -q are equivalent).
    pub fn same_rotation(&self, other: &Vec4, eps: f64) -> bool {
        self.approx_eq(other, eps) || (-*self).approx_eq(other, eps)
    }

    pub fn is_nan(&self) -> bool {
        self.x.is_nan() || self.y.is_nan() || self.z.is_nan() || self.w.is_nan()
    }

    pub fn is_inf(&self) -> bool {
        self.x.is_infinite() || self.y.is_infinite() || self.z.is_infinite() || self.w.is_infinite()
    }

    pub fn is_num(&self) -> bool {
        !self.is_nan() && !self.is_inf()
    }
}

impl Index<usize> for Vec4 {
    type Output = f64;

    fn index(&self, n: usize) -> &f64 {
        match n {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            3 => &self.w,
            _ => panic!("Vec4 index out of range: {}", n),
        }
    }
}

/// Quaternion (Hamilton) product.
impl Mul for Vec4 {
    type Output = Vec4;
    fn mul(self, o: Vec4) -> Vec4 {
        let (s1, v1) = (self.w, self.v());
        let (s2, v2) = (o.w, o.v());
        let s = s1 * s2 - v1.dot(&v2);
        let v = s1 * v2 + s2 * v1 + v1 % v2;
        Vec4::new(v.x, v.y, v.z, s)
    }
}

impl Neg for Vec4 {
    type Output = Vec4;
    fn neg(self) -> Vec4 {
        Vec4::new(-self.x, -self.y, -self.z, -self.w)
    }
}

impl Add for Vec4 {
    type Output = Vec4;
    fn add(self, o: Vec4) -> Vec4 {
        Vec4::new(self.x + o.x, self.y + o.y, self.z + o.z, self.w + o.w)
    }
}

impl Sub for Vec4 {
    type Output = Vec4;
    fn sub(self, o: Vec4) -> Vec4 {
        Vec4::new(self.x - o.x, self.y - o.y, self.z - o.z, self.w - o.w)
    }
}

impl Mul<f64> for Vec4 {
    type Output = Vec4;
    fn mul(self, k: f64) -> Vec4 {
        Vec4::new(self.x * k, self.y * k, self.z * k, self.w * k)
    }
}

impl Mul<Vec4> for f64 {
    type Output = Vec4;
    fn mul(self, q: Vec4) -> Vec4 {
        q * self
    }
}

impl Div<f64> for Vec4 {
    type Output = Vec4;
    fn div(self, k: f64) -> Vec4 {
        Vec4::new(self.x / k, self.y / k, self.z / k, self.w / k)
    }
}

impl fmt::Display for Vec4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[({:+.4e}, {:+.4e}, {:+.4e}), {:+.4e}]", self.x, self.y, self.z, self.w)
    }
}

impl From<UnitQuaternion<f64>> for Vec4 {
    fn from(q: UnitQuaternion<f64>) -> Self {
        Vec4::new(q.i, q.j, q.k, q.w)
    }
}

/// Normalizes on the way, nalgebra requires unit quaternions for rotations.
impl From<Vec4> for UnitQuaternion<f64> {
    fn from(q: Vec4) -> Self {
        UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
    }
}
