//! Forward and inverse kinematics for serial robot arms of revolute joints, with a pinhole
//! camera model for hand-eye setups.
//!
//! The arm is described by the offset and rotation axis of every joint
//! ([`parameters::ChainParameters`]). Poses are a position plus a unit quaternion
//! ([`pose::Pose`]) and compose with `*`, so the chain of an arm is simply the product of
//! its link transforms ([`pose_array::PoseArray`]).
//!
//! # Features
//!
//! - Forward kinematics for any number of joints, with base, flange and tool.
//! - Numerical inverse kinematics (damped least squares) matching either the position or the
//!   full pose of the tool, respecting joint limits, with optional random restarts.
//! - Geometric and numerical Jacobians, joint velocities and torques.
//! - Pinhole camera: projection of points into the image, back-projection of image points
//!   onto a plane, and a camera carried on the flange of the robot.
//! - Posture flags (wrist flip, elbow below, left side) and joint turn counts.
//! - Robot descriptions from YAML and chain extraction from URDF (`allow_filesystem` feature).
//!
//! # Example
//!
//! ```
//! use rs_chain_kinematics::parameters::ChainParameters;
//! use rs_chain_kinematics::pose::Pose;
//! use rs_chain_kinematics::robot::Robot;
//! use rs_chain_kinematics::vec3::Vec3;
//! use rs_chain_kinematics::vec4::Vec4;
//!
//! let mut robot = Robot::new(ChainParameters::planar_two_link(1.0, 1.0)).expect("valid chain");
//! let target = Pose::new(Vec3::new(1.0, 1.0, 0.0), Vec4::identity());
//! let joints = robot.pos2jnt(&target, Some(&[0.1, 0.5])).expect("reachable");
//! let reached = robot.jnt2pos(&joints).expect("two joints");
//! assert!(reached.p.approx_eq(&target.p, 1e-6));
//! ```

pub mod kinematic_error;
pub mod vec3;
pub mod vec4;
pub mod pose;
pub mod pose_array;

pub mod parameters;
pub mod parameters_robots;

#[cfg(feature = "allow_filesystem")]
pub mod parameters_from_file;

#[path = "utils/utils.rs"]
pub mod utils;
pub mod kinematic_traits;

pub mod constraints;

pub mod jacobian;
pub mod ik_solver;

pub mod robot;
pub mod camera;
pub mod posture;

#[cfg(feature = "allow_filesystem")]
pub mod urdf;
#[cfg(feature = "allow_filesystem")]
pub mod parameter_error;

#[cfg(test)]
#[cfg(feature = "allow_filesystem")]
mod tests;
