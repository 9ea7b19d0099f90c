//! Hardcoded chain parameters for a few arms

use crate::parameters::ChainParameters;
use crate::pose::Pose;
use crate::vec3::Vec3;
use crate::vec4::Vec4;

const Y: Vec3 = Vec3::new(0.0, 1.0, 0.0);
const Z: Vec3 = Vec3::new(0.0, 0.0, 1.0);

impl ChainParameters {
    /// Compact six-axis arm (joint axes z, y, y, z, y, z), flange at the last joint.
    pub fn six_axis_arm() -> Self {
        ChainParameters {
            offsets: vec![
                Vec3::new(0.0, 0.0, 0.295),
                Vec3::new(0.0, 0.0797, 0.0),
                Vec3::new(0.0, -0.0367, 0.230),
                Vec3::new(-0.050, -0.043, 0.0725),
                Vec3::new(0.0, 0.0, 0.1975),
                Vec3::new(0.0, 0.0, 0.07),
            ],
            axes: vec![Z, Y, Y, Z, Y, Z],
            flange: Pose::identity(),
        }
    }

    /// Arm moving in the xy plane: two links of lengths `l1` and `l2` turning about z.
    pub fn planar_two_link(l1: f64, l2: f64) -> Self {
        ChainParameters {
            offsets: vec![Vec3::zeros(), Vec3::new(l1, 0.0, 0.0)],
            axes: vec![Z, Z],
            flange: Pose::new(Vec3::new(l2, 0.0, 0.0), Vec4::identity()),
        }
    }

    /// Three-joint arm with a vertical first axis and two horizontal ones, the
    /// smallest chain whose inverse needs the full 3D solver.
    pub fn elbow_arm(base_height: f64, upper: f64, forearm: f64) -> Self {
        ChainParameters {
            offsets: vec![
                Vec3::new(0.0, 0.0, base_height),
                Vec3::zeros(),
                Vec3::new(0.0, 0.0, upper),
            ],
            axes: vec![Z, Y, Y],
            flange: Pose::new(Vec3::new(0.0, 0.0, forearm), Vec4::identity()),
        }
    }
}
