//! Defines the link parameters of a serial chain

use crate::kinematic_error::KinematicError;
use crate::pose::Pose;
use crate::pose_array::{Link, PoseArray};
use crate::utils::deg;
use crate::vec3::Vec3;

/// Geometry of a serial chain of revolute joints. See
/// [parameters_robots.rs](parameters_robots.rs) for concrete arms.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainParameters {
    /// Position of each joint relative to the previous one (the first one relative to
    /// the base), expressed in the frame of the previous joint.
    pub offsets: Vec<Vec3>,

    /// Rotation axis of each joint in its own frame.
    pub axes: Vec<Vec3>,

    /// Fixed transform from the last joint to the flange. Identity if the flange
    /// coincides with the last joint.
    pub flange: Pose,
}

impl ChainParameters {
    pub fn new(offsets: Vec<Vec3>, axes: Vec<Vec3>) -> Result<Self, KinematicError> {
        let parameters = ChainParameters { offsets, axes, flange: Pose::identity() };
        parameters.validate()?;
        Ok(parameters)
    }

    pub fn with_flange(self, flange: Pose) -> Self {
        ChainParameters { flange, ..self }
    }

    /// Degrees of freedom, the number of joints.
    pub fn dof(&self) -> usize {
        self.offsets.len()
    }

    /// Checks the parameters describe a chain: same number of offsets and axes,
    /// at least one joint, no zero axes.
    pub fn validate(&self) -> Result<(), KinematicError> {
        if self.offsets.is_empty() {
            return Err(KinematicError::InvalidLength { expected: 1, found: 0 });
        }
        if self.axes.len() != self.offsets.len() {
            return Err(KinematicError::InvalidLength {
                expected: self.offsets.len(),
                found: self.axes.len(),
            });
        }
        for axis in &self.axes {
            axis.normalized()?;
        }
        Ok(())
    }

    /// The chain for the given joint angles: one pose per joint followed by the flange.
    pub fn chain(&self, joints: &[f64], base: &Pose) -> Result<PoseArray, KinematicError> {
        if joints.len() != self.dof() {
            return Err(KinematicError::InvalidLength { expected: self.dof(), found: joints.len() });
        }
        let mut chain = PoseArray::new(&self.offsets, &self.axes, joints, *base)?;
        chain.push(self.flange);
        Ok(chain)
    }

    /// Converts to the YAML robot description (quick viewing, round trip through files).
    pub fn to_yaml(&self) -> String {
        let links = self.offsets.iter().zip(&self.axes)
            .map(|(offset, axis)| format!(
                "    - offset: [{}, {}, {}]\n      axis: [{}, {}, {}]\n",
                offset.x, offset.y, offset.z, axis.x, axis.y, axis.z))
            .collect::<String>();
        let rpy = self.flange.q.rpy();
        format!(
            "robot:\n  \
               links:\n{}  \
               flange:\n    \
                 position: [{}, {}, {}]\n    \
                 rpy: [{}, {}, {}]\n",
            links,
            self.flange.p.x, self.flange.p.y, self.flange.p.z,
            deg(&rpy.x), deg(&rpy.y), deg(&rpy.z),
        )
    }
}
