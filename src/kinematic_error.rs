//! Error conditions of the kinematic algebra, the chain and the solvers

use std::fmt;

/// Local, recoverable failures reported at the point where they happen.
/// None of them is fatal; the caller decides whether to retry (for instance
/// re-seed the IK solver) or report.
#[derive(Debug, Clone, PartialEq)]
pub enum KinematicError {
    /// Scalar division or normalization by zero (or by a norm too close to zero).
    DivisionByZero,
    /// Component or link index outside the valid range.
    IndexOutOfRange { index: isize, len: usize },
    /// The iterative solver did not reach the tolerance within its iteration budget.
    /// Carries the best joint values found and their remaining error: the position error
    /// in meters, plus the orientation error in radians when the orientation is matched too.
    ConvergenceFailure { joints: Vec<f64>, error: f64, iterations: usize },
    /// Point at non-positive depth cannot be projected.
    BehindCamera { depth: f64 },
    /// Projected point falls outside the image.
    OutOfView { u: f64, v: f64 },
    /// Parallel sequences of different lengths, or an empty sequence.
    InvalidLength { expected: usize, found: usize },
    InvalidArgument(String),
    /// Geometry admits no unique answer (parallel planes, colinear points).
    DegenerateGeometry(String),
}

impl fmt::Display for KinematicError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            KinematicError::DivisionByZero =>
                write!(f, "Division by zero"),
            KinematicError::IndexOutOfRange { index, len } =>
                write!(f, "Index out of range: {} (length {})", index, len),
            KinematicError::ConvergenceFailure { ref joints, error, iterations } =>
                write!(f, "No convergence after {} iterations, best error {:.3e} at {:?}",
                       iterations, error, joints),
            KinematicError::BehindCamera { depth } =>
                write!(f, "Point is behind the camera (depth {})", depth),
            KinematicError::OutOfView { u, v } =>
                write!(f, "Point ({:.4}, {:.4}) is outside of the image", u, v),
            KinematicError::InvalidLength { expected, found } =>
                write!(f, "Invalid Length: expected {}, found {}", expected, found),
            KinematicError::InvalidArgument(ref msg) =>
                write!(f, "Invalid argument: {}", msg),
            KinematicError::DegenerateGeometry(ref msg) =>
                write!(f, "Degenerate geometry: {}", msg),
        }
    }
}

impl std::error::Error for KinematicError {}
