//! Pinhole camera model.
//!
//! The camera looks along its +z axis; image x and y run along camera x and y.
//! A point `(x, y, z)` in the camera frame with `z > 0` lands on
//!
//! `u = fx * x / z + cx`, `v = fy * y / z + cy`.
//!
//! The camera is placed in the world by its mount pose, which is only needed by the
//! world-frame conversions (`world2image`, `image2pos`, ...).

use nalgebra::{Point2, Rotation3};

use crate::kinematic_error::KinematicError;
use crate::pose::Pose;
use crate::vec3::{Vec3, DEFAULT_TOLERANCE};
use crate::vec4::Vec4;

/// Default viewing distance used when back-projecting without an explicit depth, meters.
pub const DEFAULT_Z_LEN: f64 = 0.05;

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Focal lengths in image units
    pub fx: f64,
    pub fy: f64,
    /// Principal point
    pub cx: f64,
    pub cy: f64,
    /// Image extent; valid coordinates are [0, width] x [0, height].
    pub width: f64,
    pub height: f64,
    /// Camera frame in the world.
    pub mount: Pose,
    /// Depth used by [`Camera::image2pos`] to build viewing rays.
    pub z_len: f64,
}

impl Camera {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Camera { fx, fy, cx, cy, width, height, mount: Pose::identity(), z_len: DEFAULT_Z_LEN }
    }

    pub fn with_mount(self, mount: Pose) -> Self {
        Camera { mount, ..self }
    }

    /// Camera with the image normalized to [0, 1] x [0, 1], given the tangents of half
    /// the horizontal and vertical field of view. The mount is turned by `yaw` about
    /// the viewing direction.
    pub fn from_fov(tan_h: f64, tan_v: f64, mount: Pose, yaw: f64) -> Result<Self, KinematicError> {
        if !(tan_h > 0.0 && tan_v > 0.0) {
            return Err(KinematicError::InvalidArgument(
                format!("field of view tangents must be positive, got {} and {}", tan_h, tan_v)));
        }
        Ok(Camera::new(0.5 / tan_h, 0.5 / tan_v, 0.5, 0.5, 1.0, 1.0)
            .with_mount(mount.rotate(2, yaw)?))
    }

    /// Projects a point given in the camera frame. No field of view check.
    pub fn pos2image(&self, point: &Vec3) -> Result<Point2<f64>, KinematicError> {
        if !(point.z > 0.0) {
            return Err(KinematicError::BehindCamera { depth: point.z });
        }
        Ok(Point2::new(
            self.fx * point.x / point.z + self.cx,
            self.fy * point.y / point.z + self.cy,
        ))
    }

    /// Lazy projection of many points, one result per point in input order.
    /// The iterator can be cloned to run it again.
    pub fn pos2image_iter<'a>(&'a self, points: &'a [Vec3])
                              -> impl Iterator<Item = Result<Point2<f64>, KinematicError>> + Clone + 'a {
        points.iter().map(move |p| self.pos2image(p))
    }

    /// Projects all points, failing on the first one that cannot be projected.
    pub fn pos2image_all(&self, points: &[Vec3]) -> Result<Vec<Point2<f64>>, KinematicError> {
        self.pos2image_iter(points).collect()
    }

    pub fn in_view(&self, uv: &Point2<f64>) -> bool {
        (0.0..=self.width).contains(&uv.x) && (0.0..=self.height).contains(&uv.y)
    }

    /// World point expressed in the camera frame.
    pub fn world2camera(&self, point: &Vec3) -> Vec3 {
        Pose::identity().trans_pnt(point, &self.mount)
    }

    /// World point to image coordinates, failing if it falls outside of the image.
    pub fn world2image(&self, point: &Vec3) -> Result<Point2<f64>, KinematicError> {
        let uv = self.pos2image(&self.world2camera(point))?;
        if !self.in_view(&uv) {
            return Err(KinematicError::OutOfView { u: uv.x, v: uv.y });
        }
        Ok(uv)
    }

    /// Point in the camera frame at depth `len` seen at image coordinates `uv`.
    pub fn image2camera(&self, uv: &Point2<f64>, len: f64) -> Result<Vec3, KinematicError> {
        if !(len > 0.0) {
            return Err(KinematicError::InvalidArgument(format!("depth must be positive, got {}", len)));
        }
        if !self.in_view(uv) {
            return Err(KinematicError::OutOfView { u: uv.x, v: uv.y });
        }
        Ok(Vec3::new(
            (uv.x - self.cx) / self.fx * len,
            (uv.y - self.cy) / self.fy * len,
            len,
        ))
    }

    /// World point where the viewing ray through `uv` meets the plane `surf` (z axis
    /// of `surf` is the plane normal).
    pub fn image2pos(&self, uv: &Point2<f64>, surf: &Pose) -> Result<Vec3, KinematicError> {
        let ray = self.image2camera(uv, self.z_len)?;
        let scale = self.mount.ray_scale(&ray, surf, &Vec3::new(0.0, 0.0, 1.0))
            .ok_or_else(|| KinematicError::DegenerateGeometry("viewing ray parallel to the plane".into()))?;
        if scale < 0.0 {
            return Err(KinematicError::BehindCamera { depth: scale * ray.z });
        }
        Ok(self.mount.trans_pnt(&(ray * scale), &Pose::identity()))
    }

    /// Frame on the plane `surf` with its origin under image point `origin`, x axis
    /// towards the point under `toward` and z axis along the plane normal.
    pub fn coordinate_by_2(&self, origin: &Point2<f64>, toward: &Point2<f64>, surf: &Pose) -> Result<Pose, KinematicError> {
        let a = self.image2pos(origin, surf)?;
        let b = self.image2pos(toward, surf)?;
        let z = surf.trans_vec(&Vec3::new(0.0, 0.0, 1.0), &Pose::identity());
        let d = b - a;
        let in_plane = d - z * d.dot(&z);
        if in_plane.norm() <= DEFAULT_TOLERANCE {
            return Err(KinematicError::DegenerateGeometry("both image points map to the same place".into()));
        }
        let x = in_plane.normalized()?;
        let y = z % x;
        let rotation = Rotation3::from_basis_unchecked(&[x.into(), y.into(), z.into()]);
        Ok(Pose::new(a, Vec4::from_rotation(&rotation)))
    }

    /// Corners of the image projected onto the plane `surf`, in the order
    /// (0, 0), (width, 0), (width, height), (0, height).
    pub fn footprint(&self, surf: &Pose) -> Result<[Vec3; 4], KinematicError> {
        Ok([
            self.image2pos(&Point2::new(0.0, 0.0), surf)?,
            self.image2pos(&Point2::new(self.width, 0.0), surf)?,
            self.image2pos(&Point2::new(self.width, self.height), surf)?,
            self.image2pos(&Point2::new(0.0, self.height), surf)?,
        ])
    }
}
