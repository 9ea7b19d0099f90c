//! Damped least squares (Levenberg-Marquardt) inverse kinematics.
//!
//! Iteratively moves the joints of a serial chain so that its tool reaches a target,
//! using the geometric Jacobian of the chain:
//!
//! `dq = Jᵀ (J Jᵀ + λ² I)⁻¹ e`
//!
//! where `e` is the remaining position (and, in [`SolverMode::Pose`], orientation)
//! error. Steps are limited to [`SolverConfig::max_step`] radians per joint and
//! clamped into the joint constraints when these are present.

use nalgebra::{DMatrix, DVector, UnitQuaternion};
use rand::Rng;
use std::f64::consts::PI;
use tracing::{debug, warn};

use crate::constraints::Constraints;
use crate::jacobian::Jacobian;
use crate::kinematic_error::KinematicError;
use crate::kinematic_traits::Joints;
use crate::parameters::ChainParameters;
use crate::pose::Pose;
use crate::pose_array::PoseArray;
use crate::vec3::Vec3;

/// Step below which the solver is considered stuck in a singular configuration
const STALL_STEP: f64 = 1e-12;

/// Joint displacement used to leave a singular configuration
const PERTURBATION: f64 = 0.1;

/// Pseudo-inverse threshold of the Jacobians built here; the damped step does not use it
const SVD_EPSILON: f64 = 1e-10;

/// What the solver should match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverMode {
    /// Tool position only, orientation is free.
    #[default]
    Position,
    /// Tool position and orientation.
    Pose,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Position error tolerance (meters).
    pub tolerance: f64,
    /// Orientation error tolerance (radians), only used in [`SolverMode::Pose`].
    pub angle_tolerance: f64,
    pub max_iterations: usize,
    /// Damping factor (lambda). Higher is more robust near singularities but converges slower.
    pub damping: f64,
    /// Largest change of any joint in one iteration (radians).
    pub max_step: f64,
    pub mode: SolverMode,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            tolerance: 1e-6,
            angle_tolerance: 1e-6,
            max_iterations: 500,
            damping: 0.01,
            max_step: 0.5,
            mode: SolverMode::Position,
        }
    }
}

impl SolverConfig {
    pub fn with_mode(self, mode: SolverMode) -> Self {
        SolverConfig { mode, ..self }
    }
}

/// Converged joint values with the figures of the run.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub joints: Joints,
    pub iterations: usize,
    pub position_error: f64,
    /// Zero in [`SolverMode::Position`].
    pub orientation_error: f64,
}

/// Everything the solver needs to know about the arm.
#[derive(Debug, Clone)]
pub struct ChainModel<'a> {
    pub parameters: &'a ChainParameters,
    pub base: Pose,
    /// Flange to tool center point.
    pub tool: Pose,
    pub constraints: Option<&'a Constraints>,
}

impl<'a> ChainModel<'a> {
    pub fn new(parameters: &'a ChainParameters) -> Self {
        ChainModel { parameters, base: Pose::identity(), tool: Pose::identity(), constraints: None }
    }

    /// Joint poses, flange and tool for the given joints.
    pub fn chain(&self, joints: &[f64]) -> Result<PoseArray, KinematicError> {
        let mut chain = self.parameters.chain(joints, &self.base)?;
        chain.push(self.tool);
        Ok(chain)
    }

    fn clamp(&self, joints: &mut Joints) {
        if let Some(constraints) = self.constraints {
            let (clamped, _) = constraints.sat(joints);
            *joints = clamped;
        }
    }
}

pub struct IkSolver {
    config: SolverConfig,
}

impl IkSolver {
    pub const fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(SolverConfig::default())
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solves for joints placing the tool of `model` at `target`, starting from `seed`.
    ///
    /// Convergence is checked before every step, so a seed that already satisfies the
    /// target comes back unchanged. The tolerances bound the remaining position and
    /// orientation error of the tool, not the distance of the joints to an exact
    /// solution; near a singularity the joints may still be noticeably off.
    /// On failure the error carries the best joints seen.
    pub fn solve(&self, model: &ChainModel, target: &Pose, seed: &[f64]) -> Result<Solution, KinematicError> {
        let dof = model.parameters.dof();
        if seed.len() != dof {
            return Err(KinematicError::InvalidLength { expected: dof, found: seed.len() });
        }
        let mut q: Joints = seed.to_vec();
        model.clamp(&mut q);

        let mut best: (Joints, f64) = (q.clone(), f64::INFINITY);
        let max_iterations = self.config.max_iterations;

        // One check more than steps, so the joints after the last step are evaluated too
        for iteration in 0..=max_iterations {
            let chain = model.chain(&q)?;
            let end = chain.end();
            let (pos_err, ori_err, error_vec) = self.compute_error(&end, target);

            if pos_err + ori_err < best.1 {
                best = (q.clone(), pos_err + ori_err);
            }

            let converged = match self.config.mode {
                SolverMode::Position => pos_err < self.config.tolerance,
                SolverMode::Pose => pos_err < self.config.tolerance && ori_err < self.config.angle_tolerance,
            };
            if converged {
                debug!("IK converged in {} iterations, error {:.3e}", iteration, pos_err + ori_err);
                return Ok(Solution { joints: q, iterations: iteration, position_error: pos_err, orientation_error: ori_err });
            }
            if iteration == max_iterations {
                break;
            }

            let mut dq = self.step(&chain, &end.p, &error_vec)
                .filter(|dq| dq.norm() > STALL_STEP)
                .unwrap_or_else(|| {
                    debug!("IK stalled at {:?}, perturbing", q);
                    perturbation(dof, iteration)
                });

            let largest = dq.amax();
            if largest > self.config.max_step {
                dq *= self.config.max_step / largest;
            }
            for (qi, dqi) in q.iter_mut().zip(dq.iter()) {
                *qi += dqi;
            }
            model.clamp(&mut q);
        }

        warn!("IK did not converge in {} iterations, best error {:.3e}", max_iterations, best.1);
        Err(KinematicError::ConvergenceFailure {
            joints: best.0,
            error: best.1,
            iterations: max_iterations,
        })
    }

    /// Runs [`IkSolver::solve`] from `seed`, then from up to `restarts` random seeds
    /// (within the constraints, or within ±π). Returns the first converged solution
    /// or the failure with the lowest error.
    pub fn solve_with_restarts<R: Rng + ?Sized>(&self, model: &ChainModel, target: &Pose, seed: &[f64],
                                                 restarts: usize, rng: &mut R) -> Result<Solution, KinematicError> {
        let limits = model.constraints.cloned()
            .unwrap_or_else(|| Constraints::full_turn(model.parameters.dof()));

        let mut failure = match self.solve(model, target, seed) {
            Ok(solution) => return Ok(solution),
            Err(e @ KinematicError::ConvergenceFailure { .. }) => e,
            Err(e) => return Err(e),
        };

        for attempt in 0..restarts {
            let reseed = limits.random_within(rng);
            debug!("IK restart {} from {:?}", attempt + 1, reseed);
            match self.solve(model, target, &reseed) {
                Ok(solution) => return Ok(solution),
                Err(e @ KinematicError::ConvergenceFailure { .. }) => {
                    if failure_error(&e) < failure_error(&failure) {
                        failure = e;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(failure)
    }

    /// Position error norm, orientation error angle and the error vector (3 or 6 rows).
    fn compute_error(&self, end: &Pose, target: &Pose) -> (f64, f64, DVector<f64>) {
        let pos_err = target.p - end.p;
        match self.config.mode {
            SolverMode::Position => {
                (pos_err.norm(), 0.0, DVector::from_column_slice(&[pos_err.x, pos_err.y, pos_err.z]))
            }
            SolverMode::Pose => {
                let ori_err = orientation_error(end, target);
                (pos_err.norm(), ori_err.norm(), DVector::from_column_slice(&[
                    pos_err.x, pos_err.y, pos_err.z,
                    ori_err.x, ori_err.y, ori_err.z,
                ]))
            }
        }
    }

    /// One damped least squares step, `None` if the damped matrix cannot be inverted.
    fn step(&self, chain: &PoseArray, tip: &Vec3, error: &DVector<f64>) -> Option<DVector<f64>> {
        let full = Jacobian::from_chain(chain, tip, SVD_EPSILON);
        let jacobian: DMatrix<f64> = full.matrix().rows(0, error.len()).into_owned();
        let m = jacobian.nrows();
        let jjt = &jacobian * jacobian.transpose();
        let damped = jjt + DMatrix::identity(m, m) * (self.config.damping * self.config.damping);
        let damped_inv = damped.try_inverse()?;
        Some(jacobian.transpose() * damped_inv * error)
    }
}

/// Rotation from the current to the target orientation as axis * angle, world frame.
fn orientation_error(end: &Pose, target: &Pose) -> Vec3 {
    let current: UnitQuaternion<f64> = end.q.into();
    let wanted: UnitQuaternion<f64> = target.q.into();
    (wanted * current.inverse()).scaled_axis().into()
}

/// Alternating joint offsets, sign flipping with the iteration so repeated stalls
/// do not push the same way.
fn perturbation(dof: usize, iteration: usize) -> DVector<f64> {
    DVector::from_fn(dof, |j, _| if (j + iteration) % 2 == 0 { PERTURBATION } else { -PERTURBATION })
}

fn failure_error(e: &KinematicError) -> f64 {
    match e {
        KinematicError::ConvergenceFailure { error, .. } => *error,
        _ => f64::INFINITY,
    }
}

/// Wraps an angle into (-π, π].
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped == -PI { PI } else { wrapped }
}
