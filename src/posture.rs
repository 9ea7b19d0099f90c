//! Posture of an arm: which of the inverse kinematic branches a joint configuration
//! belongs to, and how many full turns each joint has made.

use std::f64::consts::PI;
use std::fmt;

use bitflags::bitflags;

use crate::kinematic_error::KinematicError;
use crate::parameters::ChainParameters;
use crate::pose::Pose;
use crate::robot::pos_b;
use crate::vec4::Vec4;

bitflags! {
    /// Configuration flags. Unset flags mean the opposite state (no flip, above, right).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PostureFlags: u32 {
        /// Wrist flipped, joint 5 negative
        const FLIP =  0b0000_0001;

        /// Elbow below, joint 3 negative
        const BELOW = 0b0000_0010;

        /// Wrist centre behind the first axis, as seen in the frame of joint 1
        const LEFT =  0b0000_0100;
    }
}

impl fmt::Display for PostureFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(NF, AB, RL) = ({}, {}, {})",
               self.contains(PostureFlags::FLIP) as u8,
               self.contains(PostureFlags::BELOW) as u8,
               self.contains(PostureFlags::LEFT) as u8)
    }
}

/// Signed turn count of up to eight joints packed into four bits each, joint 1 in
/// the lowest nibble. Negative counts are stored in two's complement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TurnCounts(u32);

impl TurnCounts {
    pub const MAX_JOINTS: usize = 8;
    pub const MAX_TURNS: i32 = 7;

    pub fn from_raw(raw: u32) -> Self {
        TurnCounts(raw)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Turn counts of the given joints: zero for angles in [-π, π), one for [π, 3π) and so on.
    pub fn from_joints(joints: &[f64]) -> Result<Self, KinematicError> {
        let mut counts = TurnCounts::default();
        for (j, angle) in joints.iter().enumerate() {
            let turns = ((angle + PI) / (2.0 * PI)).floor();
            if !turns.is_finite() || turns.abs() > Self::MAX_TURNS as f64 {
                return Err(KinematicError::InvalidArgument(
                    format!("joint {} angle {} is too many turns away from zero", j + 1, angle)));
            }
            counts.set(j, turns as i32)?;
        }
        Ok(counts)
    }

    pub fn set(&mut self, joint: usize, turns: i32) -> Result<(), KinematicError> {
        if joint >= Self::MAX_JOINTS {
            return Err(KinematicError::IndexOutOfRange { index: joint as isize, len: Self::MAX_JOINTS });
        }
        if turns.abs() > Self::MAX_TURNS {
            return Err(KinematicError::InvalidArgument(format!("turn count {} out of range", turns)));
        }
        let shift = 4 * joint;
        let nibble = (turns & 0xF) as u32;
        self.0 = (self.0 & !(0xF << shift)) | (nibble << shift);
        Ok(())
    }

    pub fn get(&self, joint: usize) -> Result<i32, KinematicError> {
        if joint >= Self::MAX_JOINTS {
            return Err(KinematicError::IndexOutOfRange { index: joint as isize, len: Self::MAX_JOINTS });
        }
        let nibble = ((self.0 >> (4 * joint)) & 0xF) as i32;
        Ok(if nibble >= 8 { nibble - 16 } else { nibble })
    }
}

impl fmt::Display for TurnCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = (0..Self::MAX_JOINTS)
            .map(|j| self.get(j).map(|t| t.to_string()).unwrap_or_default())
            .collect();
        write!(f, "turns = ({})", values.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Posture {
    pub flags: PostureFlags,
    pub turns: TurnCounts,
}

impl fmt::Display for Posture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.flags, self.turns)
    }
}

/// Posture of an arm with at least five joints (wrist at joint 5).
pub fn posture(parameters: &ChainParameters, joints: &[f64]) -> Result<Posture, KinematicError> {
    if joints.len() < 5 {
        return Err(KinematicError::InvalidLength { expected: 5, found: joints.len() });
    }
    let mut flags = PostureFlags::empty();
    flags.set(PostureFlags::FLIP, joints[4] < 0.0);
    flags.set(PostureFlags::BELOW, joints[2] < 0.0);

    let wrist = pos_b(parameters, joints, 4, &Pose::identity())?;
    let j1 = Pose::new(parameters.offsets[0], Vec4::from_axis_angle(&parameters.axes[0], joints[0])?);
    let local = Pose::identity().trans_pnt(&wrist, &j1);
    flags.set(PostureFlags::LEFT, local.x < 0.0);

    Ok(Posture { flags, turns: TurnCounts::from_joints(joints)? })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_counts() {
        let mut counts = TurnCounts::default();
        counts.set(0, 1).expect("valid");
        counts.set(1, -1).expect("valid");
        counts.set(7, -7).expect("valid");
        assert_eq!(counts.get(0), Ok(1));
        assert_eq!(counts.get(1), Ok(-1));
        assert_eq!(counts.get(2), Ok(0));
        assert_eq!(counts.get(7), Ok(-7));
        assert_eq!(counts.raw() & 0xFF, 0xF1);

        assert!(counts.set(8, 0).is_err());
        assert!(counts.set(0, 8).is_err());
        assert!(counts.get(8).is_err());

        counts.set(1, 2).expect("valid");
        assert_eq!(counts.get(1), Ok(2));
        assert_eq!(TurnCounts::from_raw(counts.raw()), counts);
    }

    #[test]
    fn test_turns_from_joints() {
        let counts = TurnCounts::from_joints(&[0.0, 3.5, -3.5, 7.0, -PI]).expect("few turns");
        assert_eq!(counts.get(0), Ok(0));
        assert_eq!(counts.get(1), Ok(1));
        assert_eq!(counts.get(2), Ok(-1));
        assert_eq!(counts.get(3), Ok(1));
        assert_eq!(counts.get(4), Ok(0));
        assert!(TurnCounts::from_joints(&[100.0]).is_err());
    }

    #[test]
    fn test_flags() {
        let parameters = ChainParameters::six_axis_arm();
        let p = posture(&parameters, &[0.0, 0.5, 0.3, 0.0, 0.4, 0.0]).expect("six joints");
        assert_eq!(p.flags, PostureFlags::empty());

        let p = posture(&parameters, &[0.0, -0.5, -0.3, 0.0, -0.4, 0.0]).expect("six joints");
        assert_eq!(p.flags, PostureFlags::FLIP | PostureFlags::BELOW | PostureFlags::LEFT);

        // Turning the base does not change the side
        let p = posture(&parameters, &[2.0, 0.5, 0.3, 0.0, 0.4, 0.0]).expect("six joints");
        assert!(!p.flags.contains(PostureFlags::LEFT));

        assert!(posture(&parameters, &[0.0; 4]).is_err());
    }

    #[test]
    fn test_display() {
        let flags = PostureFlags::FLIP | PostureFlags::LEFT;
        assert_eq!(flags.to_string(), "(NF, AB, RL) = (1, 0, 1)");
        let counts = TurnCounts::from_joints(&[3.5, -3.5]).expect("few turns");
        assert_eq!(counts.to_string(), "turns = (1, -1, 0, 0, 0, 0, 0, 0)");
    }
}
