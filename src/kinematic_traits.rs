//! Common interface of kinematic models

use crate::kinematic_error::KinematicError;
use crate::pose::Pose;

/// Joint angles in radians, one value per revolute joint, base first.
pub type Joints = Vec<f64>;

pub trait Kinematics {
    /// Number of revolute joints.
    fn dof(&self) -> usize;

    /// Pose of the tool (or the last link if there is no tool) for the given joints.
    fn forward(&self, joints: &[f64]) -> Result<Pose, KinematicError>;

    /// Joint angles that bring the tool to `target`, searching from `seed`.
    /// Fails with [`KinematicError::ConvergenceFailure`] if no solution is found.
    fn inverse(&self, target: &Pose, seed: &[f64]) -> Result<Joints, KinematicError>;
}
