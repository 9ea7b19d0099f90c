//! Position and orientation of a coordinate frame.

use std::f64::consts::PI;
use std::fmt;
use std::ops::{Div, Mul};

use nalgebra::{Isometry3, Translation3, UnitQuaternion};

use crate::kinematic_error::KinematicError;
use crate::vec3::{Vec3, DEFAULT_TOLERANCE};
use crate::vec4::Vec4;

/// Minimal |ray . normal| for a ray to be considered crossing a plane.
const MIN_INCIDENCE: f64 = 1e-6;

/// Frame given by the position `p` of its origin and its orientation `q`, both
/// expressed in the reference frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub p: Vec3,
    pub q: Vec4,
}

impl Pose {
    pub const fn new(p: Vec3, q: Vec4) -> Self {
        Pose { p, q }
    }

    pub const fn identity() -> Self {
        Pose { p: Vec3::zeros(), q: Vec4::identity() }
    }

    /// Pose from position and 3-2-1 Euler angles (roll, pitch, yaw) in radians.
    pub fn from_xyz_rpy(p: Vec3, rpy: Vec3) -> Self {
        Pose { p, q: Vec4::from_rpy(rpy.x, rpy.y, rpy.z) }
    }

    /// Pose of `other` (given in this frame) in the reference frame: `self * other`.
    /// The resulting quaternion is renormalized so long chains do not drift.
    pub fn compose(&self, other: &Pose) -> Pose {
        Pose {
            p: self.p + self.q.rotate(&other.p),
            q: (self.q * other.q).unit(),
        }
    }

    /// This pose expressed in `frame`, so that `frame * (self / frame) == self`.
    pub fn relative_to(&self, frame: &Pose) -> Pose {
        let inv = frame.q.conj();
        Pose {
            p: inv.rotate(&(self.p - frame.p)),
            q: (inv * self.q).unit(),
        }
    }

    /// Maps this pose into the local coordinates of `frame`. Same as [`Pose::relative_to`].
    pub fn projection(&self, frame: &Pose) -> Pose {
        self.relative_to(frame)
    }

    pub fn inverse(&self) -> Pose {
        Pose::identity().relative_to(self)
    }

    /// Rotates about the local x (0), y (1) or z (2) axis.
    pub fn rotate(&self, axis: usize, angle: f64) -> Result<Pose, KinematicError> {
        let mut alfa = Vec3::zeros();
        alfa.set(axis, 1.0)?;
        Ok(Pose {
            p: self.p,
            q: (self.q * Vec4::from_axis_angle(&alfa, angle)?).unit(),
        })
    }

    /// Rotates this pose about the line through the origin of `frame` with direction
    /// `axis`, the direction being given in `frame` coordinates.
    pub fn rotate_about(&self, axis: &Vec3, angle: f64, frame: &Pose) -> Result<Pose, KinematicError> {
        let local = Vec4::from_axis_angle(axis, angle)?;
        let r = frame.q * local * frame.q.conj();
        Ok(Pose {
            p: frame.p + r.rotate(&(self.p - frame.p)),
            q: (r * self.q).unit(),
        })
    }

    /// Point given in this frame, expressed in `frame`.
    pub fn trans_pnt(&self, pnt: &Vec3, frame: &Pose) -> Vec3 {
        let global = self.p + self.q.rotate(pnt);
        frame.q.conj().rotate(&(global - frame.p))
    }

    /// Free vector given in this frame, expressed in `frame`. Unlike points, vectors
    /// ignore the frame origins.
    pub fn trans_vec(&self, v: &Vec3, frame: &Pose) -> Vec3 {
        frame.q.conj().rotate(&self.q.rotate(v))
    }

    /// Plane frame sharing this origin, with its z axis turned to `normal` (given in
    /// this frame) and then rotated by `yaw` about the new z axis.
    pub fn surface(&self, normal: &Vec3, yaw: f64) -> Result<Pose, KinematicError> {
        let n = normal.normalized()?;
        let z = Vec3::new(0.0, 0.0, 1.0);
        let alfa = z % n;
        let theta = z.dot(&n).clamp(-1.0, 1.0).acos();

        let tilt = if alfa.norm() > DEFAULT_TOLERANCE {
            Vec4::from_axis_angle(&alfa, theta)?
        } else if n.z > 0.0 {
            Vec4::identity()
        } else {
            // Normal points straight down, flip about x
            Vec4::from_axis_angle(&Vec3::new(1.0, 0.0, 0.0), PI)?
        };

        let mut q = self.q * tilt;
        if yaw != 0.0 {
            q = q * Vec4::from_rpy(0.0, 0.0, yaw);
        }
        Ok(Pose { p: self.p, q: q.unit() })
    }

    /// Stretch factor `k` at which the ray `k * ray` from this origin (ray given in
    /// this frame) meets the plane through `surf` with the given normal (in `surf`
    /// coordinates). `None` when the ray runs parallel to the plane. Negative values
    /// mean the plane is behind.
    pub fn ray_scale(&self, ray: &Vec3, surf: &Pose, normal: &Vec3) -> Option<f64> {
        let identity = Pose::identity();
        let n = surf.trans_vec(normal, &identity);
        let r = self.trans_vec(ray, &identity);
        let incidence = r.dot(&n);
        if incidence.abs() <= MIN_INCIDENCE {
            return None;
        }
        Some((surf.p - self.p).dot(&n) / incidence)
    }

    pub fn approx_eq(&self, other: &Pose, eps: f64) -> bool {
        self.p.approx_eq(&other.p, eps) && self.q.same_rotation(&other.q, eps)
    }

    pub fn is_num(&self) -> bool {
        self.p.is_num() && self.q.is_num()
    }
}

impl Mul for Pose {
    type Output = Pose;
    fn mul(self, other: Pose) -> Pose {
        self.compose(&other)
    }
}

impl Div for Pose {
    type Output = Pose;
    fn div(self, frame: Pose) -> Pose {
        self.relative_to(&frame)
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pos[ m ] = {}\nrpy[deg] = {}", self.p, self.q.rpy() * (180.0 / PI))
    }
}

impl From<Isometry3<f64>> for Pose {
    fn from(iso: Isometry3<f64>) -> Self {
        Pose {
            p: iso.translation.vector.into(),
            q: iso.rotation.into(),
        }
    }
}

impl From<Pose> for Isometry3<f64> {
    fn from(pose: Pose) -> Self {
        let rotation: UnitQuaternion<f64> = pose.q.into();
        Isometry3::from_parts(Translation3::new(pose.p.x, pose.p.y, pose.p.z), rotation)
    }
}
