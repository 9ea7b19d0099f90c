//! Jacobian of a serial chain, analytic and numerical

use nalgebra::{DMatrix, DVector, Isometry3, Vector3, Vector6, UnitQuaternion};
use nalgebra::linalg::SVD;
use rayon::prelude::*;

use crate::kinematic_error::KinematicError;
use crate::kinematic_traits::{Joints, Kinematics};
use crate::pose_array::PoseArray;
use crate::vec3::Vec3;

/// Struct representing the Jacobian matrix
pub struct Jacobian {
    /// A 6 x dof matrix representing the Jacobian
    ///
    /// The Jacobian matrix maps the joint velocities to the end-effector velocities.
    /// Each column corresponds to a joint, rows 0..3 hold the linear and rows 3..6
    /// the angular velocity of the end-effector.
    matrix: DMatrix<f64>,

    /// Singular values below this are treated as zero by the pseudo-inverse
    epsilon: f64,
}

impl Jacobian {
    /// Numerical Jacobian of the robot at `joints`, by forward differences with step `epsilon`.
    pub fn new(robot: &(impl Kinematics + Sync), joints: &[f64], epsilon: f64) -> Result<Self, KinematicError> {
        let matrix = compute_jacobian(robot, joints, epsilon)?;
        Ok(Self { matrix, epsilon })
    }

    /// Geometric Jacobian of the chain for a point `tip` given in world coordinates.
    /// For a revolute joint at `o` with axis `a` the column is `[a x (tip - o); a]`.
    pub fn from_chain(chain: &PoseArray, tip: &Vec3, epsilon: f64) -> Self {
        let axes = chain.joint_axes();
        let mut matrix = DMatrix::zeros(6, axes.len());
        for (i, (origin, axis)) in axes.iter().enumerate() {
            let linear = *axis % (*tip - *origin);
            matrix.fixed_view_mut::<3, 1>(0, i).copy_from(&Vector3::from(linear));
            matrix.fixed_view_mut::<3, 1>(3, i).copy_from(&Vector3::from(*axis));
        }
        Self { matrix, epsilon }
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Computes the joint velocities required to achieve a desired end-effector velocity
    ///
    /// The translation of `desired_end_effector_velocity` is the linear velocity, the
    /// scaled axis of its rotation the angular velocity.
    pub fn velocities(&self, desired_end_effector_velocity: &Isometry3<f64>) -> Result<Joints, KinematicError> {
        let linear_velocity = desired_end_effector_velocity.translation.vector;
        let angular_velocity = desired_end_effector_velocity.rotation.scaled_axis();

        let desired_velocity = Vector6::new(
            linear_velocity.x, linear_velocity.y, linear_velocity.z,
            angular_velocity.x, angular_velocity.y, angular_velocity.z,
        );
        self.velocities_from_vector(&desired_velocity)
    }

    /// Joint velocities for a 6D end-effector velocity. Uses the inverse when the
    /// Jacobian is square and invertible, the SVD pseudo-inverse otherwise.
    pub fn velocities_from_vector(&self, desired_end_effector_velocity: &Vector6<f64>) -> Result<Joints, KinematicError> {
        let desired = DVector::from_column_slice(desired_end_effector_velocity.as_slice());
        if self.matrix.is_square() {
            if let Some(jacobian_inverse) = self.matrix.clone().try_inverse() {
                return Ok((jacobian_inverse * desired).iter().copied().collect());
            }
        }
        let svd = SVD::new(self.matrix.clone(), true, true);
        let jacobian_pseudoinverse = svd.pseudo_inverse(self.epsilon)
            .map_err(|e| KinematicError::DegenerateGeometry(e.to_string()))?;
        Ok((jacobian_pseudoinverse * desired).iter().copied().collect())
    }

    /// Joint torques balancing a force (translation) and torque (scaled axis) at the end-effector.
    pub fn torques(&self, desired_force_torque: &Isometry3<f64>) -> Joints {
        let linear_force = desired_force_torque.translation.vector;
        let angular_torque = desired_force_torque.rotation.scaled_axis();
        let wrench = DVector::from_column_slice(&[
            linear_force.x, linear_force.y, linear_force.z,
            angular_torque.x, angular_torque.y, angular_torque.z,
        ]);
        (self.matrix.transpose() * wrench).iter().copied().collect()
    }
}

/// Numerical Jacobian, one forward difference per joint. Columns are computed in parallel.
pub fn compute_jacobian(robot: &(impl Kinematics + Sync), joints: &[f64], epsilon: f64) -> Result<DMatrix<f64>, KinematicError> {
    let current_pose = robot.forward(joints)?;
    let current_position: Vector3<f64> = current_pose.p.into();
    let current_orientation: UnitQuaternion<f64> = current_pose.q.into();

    let jacobian_columns = (0..joints.len()).into_par_iter().map(|i| -> Result<(Vector3<f64>, Vector3<f64>), KinematicError> {
        let mut perturbed_qs = joints.to_vec();
        perturbed_qs[i] += epsilon;
        let perturbed_pose = robot.forward(&perturbed_qs)?;
        let perturbed_position: Vector3<f64> = perturbed_pose.p.into();
        let perturbed_orientation: UnitQuaternion<f64> = perturbed_pose.q.into();

        let delta_position = (perturbed_position - current_position) / epsilon;
        let delta_orientation = (perturbed_orientation * current_orientation.inverse()).scaled_axis() / epsilon;
        Ok((delta_position, delta_orientation))
    }).collect::<Result<Vec<_>, KinematicError>>()?;

    let mut jacobian = DMatrix::zeros(6, joints.len());
    for (i, (delta_position, delta_orientation)) in jacobian_columns.into_iter().enumerate() {
        jacobian.fixed_view_mut::<3, 1>(0, i).copy_from(&delta_position);
        jacobian.fixed_view_mut::<3, 1>(3, i).copy_from(&delta_orientation);
    }
    Ok(jacobian)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Pose;
    use crate::vec4::Vec4;

    const EPSILON: f64 = 1e-6;

    /// Single rotary joint about z with a unit arm along x.
    struct SingleRotaryJointRobot;

    impl Kinematics for SingleRotaryJointRobot {
        fn dof(&self) -> usize {
            1
        }

        fn forward(&self, qs: &[f64]) -> Result<Pose, KinematicError> {
            let angle = qs[0];
            Ok(Pose::new(Vec3::new(angle.cos(), angle.sin(), 0.0), Vec4::from_rpy(0.0, 0.0, angle)))
        }

        fn inverse(&self, target: &Pose, _seed: &[f64]) -> Result<Joints, KinematicError> {
            Ok(vec![target.p.y.atan2(target.p.x)])
        }
    }

    fn assert_matrix_approx_eq(left: &DMatrix<f64>, right: &DMatrix<f64>, epsilon: f64) {
        assert_eq!(left.shape(), right.shape());
        for i in 0..left.nrows() {
            for j in 0..left.ncols() {
                assert!((left[(i, j)] - right[(i, j)]).abs() < epsilon,
                        "left[{0},{1}] = {2} is not approximately equal to right[{0},{1}] = {3}",
                        i, j, left[(i, j)], right[(i, j)]);
            }
        }
    }

    #[test]
    fn test_compute_jacobian() {
        let jacobian = compute_jacobian(&SingleRotaryJointRobot, &[0.0], EPSILON).expect("forward works");
        let mut expected = DMatrix::zeros(6, 1);
        expected[(1, 0)] = 1.0; // Y position is affected by the joint
        expected[(5, 0)] = 1.0; // Z orientation is affected by the joint
        assert_matrix_approx_eq(&jacobian, &expected, 1e-5);
    }

    #[test]
    fn test_geometric_matches_numerical() {
        let parameters = crate::parameters::ChainParameters::six_axis_arm();
        let joints = [0.1, -0.4, 0.8, 0.3, -0.6, 0.2];
        let chain = parameters.chain(&joints, &Pose::identity()).expect("six joints");
        let geometric = Jacobian::from_chain(&chain, &chain.end().p, EPSILON);

        struct Arm(crate::parameters::ChainParameters);
        impl Kinematics for Arm {
            fn dof(&self) -> usize {
                self.0.dof()
            }
            fn forward(&self, joints: &[f64]) -> Result<Pose, KinematicError> {
                Ok(self.0.chain(joints, &Pose::identity())?.end())
            }
            fn inverse(&self, _target: &Pose, seed: &[f64]) -> Result<Joints, KinematicError> {
                Ok(seed.to_vec())
            }
        }
        let numerical = compute_jacobian(&Arm(parameters), &joints, 1e-7).expect("forward works");
        assert_matrix_approx_eq(geometric.matrix(), &numerical, 1e-5);
    }

    #[test]
    fn test_velocities_from_iso() {
        let jacobian = Jacobian::new(&SingleRotaryJointRobot, &[0.0], EPSILON).expect("forward works");

        // End effector one meter from the axis, joint turning at one radian per second:
        // the tip moves at one meter per second along y.
        let desired_velocity_isometry =
            Isometry3::new(Vector3::new(0.0, 1.0, 0.0), Vector3::new(0.0, 0.0, 1.0));
        let joint_velocities = jacobian.velocities(&desired_velocity_isometry).expect("pseudo-inverse exists");
        assert_eq!(joint_velocities.len(), 1);
        assert!((joint_velocities[0] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_square_jacobian_inverse() {
        let parameters = crate::parameters::ChainParameters::six_axis_arm();
        let chain = parameters.chain(&[0.1, -0.4, 0.8, 0.3, -0.6, 0.2], &Pose::identity()).expect("six joints");
        let jacobian = Jacobian::from_chain(&chain, &chain.end().p, EPSILON);
        let qd = [0.1, 0.2, -0.3, 0.4, -0.5, 0.6];
        let twist = jacobian.matrix() * DVector::from_column_slice(&qd);
        let restored = jacobian.velocities_from_vector(&Vector6::from_column_slice(twist.as_slice()))
            .expect("regular configuration");
        for (a, b) in restored.iter().zip(&qd) {
            assert!((a - b).abs() < 1e-9, "{:?}", restored);
        }
    }

    #[test]
    fn test_compute_joint_torques() {
        let jacobian = Jacobian::new(&SingleRotaryJointRobot, &[0.0], EPSILON).expect("forward works");
        let desired_force_torque = Isometry3::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.234));
        let joint_torques = jacobian.torques(&desired_force_torque);
        assert!((joint_torques[0] - 1.234).abs() < 1e-5);
    }
}
