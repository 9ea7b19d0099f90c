//! Joint limits

use std::f64::consts::PI;

use rand::Rng;

use crate::kinematic_error::KinematicError;
use crate::kinematic_traits::Joints;

#[derive(Debug, Clone, PartialEq)]
pub struct Constraints {
    /// Lower limit of every joint, radians
    pub from: Vec<f64>,

    /// Upper limit of every joint, radians. Never less than the lower limit.
    pub to: Vec<f64>,
}

impl Constraints {
    pub fn new(from: Vec<f64>, to: Vec<f64>) -> Result<Self, KinematicError> {
        if from.len() != to.len() {
            return Err(KinematicError::InvalidLength { expected: from.len(), found: to.len() });
        }
        for (j, (f, t)) in from.iter().zip(&to).enumerate() {
            if !(f <= t) {
                return Err(KinematicError::InvalidArgument(
                    format!("joint {}: lower limit {} above upper limit {}", j + 1, f, t)));
            }
        }
        Ok(Constraints { from, to })
    }

    /// Every joint free to turn a full circle around zero.
    pub fn full_turn(dof: usize) -> Self {
        Constraints { from: vec![-PI; dof], to: vec![PI; dof] }
    }

    pub fn dof(&self) -> usize {
        self.from.len()
    }

    pub fn compliant(&self, angles: &[f64]) -> bool {
        angles.len() == self.dof()
            && angles.iter().zip(self.from.iter().zip(&self.to))
            .all(|(a, (f, t))| *a >= *f && *a <= *t)
    }

    /// Clamps the angles into the limits. The mask tells which joints were clamped.
    pub fn sat(&self, angles: &[f64]) -> (Joints, Vec<bool>) {
        angles.iter().enumerate()
            .map(|(j, &a)| match (self.from.get(j), self.to.get(j)) {
                (Some(&f), Some(&t)) => {
                    let clamped = a.clamp(f, t);
                    (clamped, clamped != a)
                }
                _ => (a, false),
            })
            .unzip()
    }

    pub fn filter(&self, angles: &[Joints]) -> Vec<Joints> {
        angles.iter()
            .filter(|angle_array| self.compliant(angle_array))
            .cloned()
            .collect()
    }

    /// Middle of every range.
    pub fn centers(&self) -> Joints {
        self.from.iter().zip(&self.to).map(|(f, t)| 0.5 * (f + t)).collect()
    }

    /// Uniformly random joint values within the limits.
    pub fn random_within<R: Rng + ?Sized>(&self, rng: &mut R) -> Joints {
        self.from.iter().zip(&self.to)
            .map(|(&f, &t)| if f < t { rng.gen_range(f..=t) } else { f })
            .collect()
    }
}
