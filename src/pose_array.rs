//! Kinematic chain: the poses of all links, composed from the base outwards.

use std::ops::{Index, ShlAssign};

use crate::kinematic_error::KinematicError;
use crate::pose::Pose;
use crate::vec3::Vec3;
use crate::vec4::Vec4;

/// One element of the chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Link {
    /// Translation by `offset` followed by a rotation of `theta` about the unit `axis`,
    /// both in the frame of the previous link.
    Revolute { offset: Vec3, axis: Vec3, theta: f64 },
    /// Rigid attachment (tool, camera, flange) given relative to the previous link.
    Fixed(Pose),
}

impl Link {
    /// Revolute link; the axis is normalized, a zero axis is rejected.
    pub fn revolute(offset: Vec3, axis: Vec3, theta: f64) -> Result<Link, KinematicError> {
        Ok(Link::Revolute { offset, axis: axis.normalized()?, theta })
    }

    /// Pose of this link relative to the previous one.
    pub fn local_pose(&self) -> Pose {
        match *self {
            Link::Revolute { offset, axis, theta } =>
                Pose::new(offset, Vec4::from_unit_axis_angle(&axis, theta)),
            Link::Fixed(pose) => pose,
        }
    }

    pub fn is_joint(&self) -> bool {
        matches!(self, Link::Revolute { .. })
    }
}

/// Poses of a serial chain seeded by the base pose. Entry `i` is
/// `base * link[0] * ... * link[i]`, so there is exactly one pose per link.
///
/// Joint angles are only changed through [`PoseArray::set_theta`] and
/// [`PoseArray::set_thetas`], both of which rebuild the whole chain.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseArray {
    base: Pose,
    links: Vec<Link>,
    poses: Vec<Pose>,
}

impl PoseArray {
    /// Builds the chain from parallel sequences of link offsets, rotation axes and
    /// joint angles, all of the same non-zero length.
    pub fn new(pos: &[Vec3], alfa: &[Vec3], theta: &[f64], pos_i: Pose) -> Result<Self, KinematicError> {
        if pos.is_empty() {
            return Err(KinematicError::InvalidLength { expected: 1, found: 0 });
        }
        for found in [alfa.len(), theta.len()] {
            if found != pos.len() {
                return Err(KinematicError::InvalidLength { expected: pos.len(), found });
            }
        }
        let links = pos.iter().zip(alfa).zip(theta)
            .map(|((offset, axis), angle)| Link::revolute(*offset, *axis, *angle))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_links(links, pos_i)
    }

    pub fn from_links(links: Vec<Link>, base: Pose) -> Result<Self, KinematicError> {
        if links.is_empty() {
            return Err(KinematicError::InvalidLength { expected: 1, found: 0 });
        }
        let mut chain = PoseArray { base, links, poses: Vec::new() };
        chain.rebuild();
        Ok(chain)
    }

    /// Recomputes every pose from the base and the current link parameters.
    pub fn rebuild(&mut self) {
        self.poses.clear();
        self.poses.reserve(self.links.len());
        let mut current = self.base;
        for link in &self.links {
            current = current * link.local_pose();
            self.poses.push(current);
        }
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// Never true for a constructed chain, kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    pub fn base(&self) -> &Pose {
        &self.base
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Number of revolute links.
    pub fn dof(&self) -> usize {
        self.links.iter().filter(|l| l.is_joint()).count()
    }

    /// Current joint angles, one per revolute link.
    pub fn thetas(&self) -> Vec<f64> {
        self.links.iter().filter_map(|l| match l {
            Link::Revolute { theta, .. } => Some(*theta),
            Link::Fixed(_) => None,
        }).collect()
    }

    /// Local pose of link `i` relative to link `i - 1` (or the base).
    pub fn link_pose(&self, i: usize) -> Result<Pose, KinematicError> {
        self.links.get(i)
            .map(Link::local_pose)
            .ok_or(KinematicError::IndexOutOfRange { index: i as isize, len: self.links.len() })
    }

    /// Sets the angle of joint `joint` (counting revolute links only) and rebuilds.
    pub fn set_theta(&mut self, joint: usize, value: f64) -> Result<(), KinematicError> {
        let dof = self.dof();
        let slot = self.links.iter_mut()
            .filter_map(|l| match l {
                Link::Revolute { theta, .. } => Some(theta),
                Link::Fixed(_) => None,
            })
            .nth(joint)
            .ok_or(KinematicError::IndexOutOfRange { index: joint as isize, len: dof })?;
        *slot = value;
        self.rebuild();
        Ok(())
    }

    /// Sets all joint angles at once and rebuilds.
    pub fn set_thetas(&mut self, thetas: &[f64]) -> Result<(), KinematicError> {
        let dof = self.dof();
        if thetas.len() != dof {
            return Err(KinematicError::InvalidLength { expected: dof, found: thetas.len() });
        }
        let mut values = thetas.iter();
        for link in self.links.iter_mut() {
            if let Link::Revolute { theta, .. } = link {
                if let Some(v) = values.next() {
                    *theta = *v;
                }
            }
        }
        self.rebuild();
        Ok(())
    }

    /// Appends a fixed link, composed with the current tail.
    pub fn push(&mut self, pose: Pose) -> &mut Self {
        let tail = self.poses.last().copied().unwrap_or(self.base);
        self.links.push(Link::Fixed(pose));
        self.poses.push(tail * pose);
        self
    }

    /// Pose at `index`; negative values count from the end (-1 is the last pose).
    pub fn get(&self, index: isize) -> Result<&Pose, KinematicError> {
        let len = self.poses.len();
        let resolved = if index < 0 { len as isize + index } else { index };
        if resolved < 0 || resolved as usize >= len {
            return Err(KinematicError::IndexOutOfRange { index, len });
        }
        Ok(&self.poses[resolved as usize])
    }

    /// The last pose of the chain (tool or end effector).
    pub fn end(&self) -> Pose {
        self.poses.last().copied().unwrap_or(self.base)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Pose> {
        self.poses.iter()
    }

    pub fn p(&self) -> Vec<Vec3> {
        self.poses.iter().map(|pose| pose.p).collect()
    }

    pub fn q(&self) -> Vec<Vec4> {
        self.poses.iter().map(|pose| pose.q).collect()
    }

    /// Base origin followed by all link origins, a polyline through the arm.
    pub fn path(&self) -> Vec<Vec3> {
        std::iter::once(self.base.p).chain(self.poses.iter().map(|pose| pose.p)).collect()
    }

    /// Origin and world-frame axis of every revolute joint, in chain order.
    pub fn joint_axes(&self) -> Vec<(Vec3, Vec3)> {
        self.links.iter().zip(&self.poses)
            .filter_map(|(link, pose)| match link {
                Link::Revolute { axis, .. } => Some((pose.p, pose.q.rotate(axis))),
                Link::Fixed(_) => None,
            })
            .collect()
    }
}

impl Index<usize> for PoseArray {
    type Output = Pose;

    fn index(&self, i: usize) -> &Pose {
        &self.poses[i]
    }
}

/// `chain <<= pose` appends a fixed link.
impl ShlAssign<Pose> for PoseArray {
    fn shl_assign(&mut self, pose: Pose) {
        self.push(pose);
    }
}

impl<'a> IntoIterator for &'a PoseArray {
    type Item = &'a Pose;
    type IntoIter = std::slice::Iter<'a, Pose>;

    fn into_iter(self) -> Self::IntoIter {
        self.poses.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-9;

    fn z() -> Vec3 {
        Vec3::new(0.0, 0.0, 1.0)
    }

    /// Planar arm with two unit links turning about z
    fn planar(theta: [f64; 2]) -> PoseArray {
        PoseArray::new(
            &[Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0)],
            &[z(), z()],
            &theta,
            Pose::identity(),
        ).expect("valid chain")
    }

    #[test]
    fn test_zero_chain_equals_base() {
        let base = Pose::from_xyz_rpy(Vec3::new(0.5, -1.0, 2.0), Vec3::new(0.1, 0.2, 0.3));
        let axes = [z(), Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 0.0, 0.0)];
        let chain = PoseArray::new(&[Vec3::zeros(); 3], &axes, &[0.0; 3], base).expect("valid chain");
        assert_eq!(chain.len(), 3);
        for pose in &chain {
            assert!(pose.approx_eq(&base, EPS));
        }
    }

    #[test]
    fn test_length_mismatch() {
        let r = PoseArray::new(&[Vec3::zeros(); 2], &[z()], &[0.0; 2], Pose::identity());
        assert_eq!(r, Err(KinematicError::InvalidLength { expected: 2, found: 1 }));

        let r = PoseArray::new(&[], &[], &[], Pose::identity());
        assert!(matches!(r, Err(KinematicError::InvalidLength { .. })));

        let r = PoseArray::new(&[Vec3::zeros()], &[Vec3::zeros()], &[0.0], Pose::identity());
        assert_eq!(r, Err(KinematicError::DivisionByZero));
    }

    #[test]
    fn test_composition() {
        let chain = planar([FRAC_PI_2, 0.0]);
        assert!(chain[0].p.approx_eq(&Vec3::zeros(), EPS));
        // Second link starts one unit along the rotated x axis
        assert!(chain[1].p.approx_eq(&Vec3::new(0.0, 1.0, 0.0), EPS));
        assert!(chain[1].q.same_rotation(&Vec4::from_rpy(0.0, 0.0, FRAC_PI_2), EPS));

        for i in 0..chain.len() {
            let expected = if i == 0 {
                *chain.base() * chain.link_pose(0).expect("in range")
            } else {
                chain[i - 1] * chain.link_pose(i).expect("in range")
            };
            assert!(chain[i].approx_eq(&expected, EPS));
        }
    }

    #[test]
    fn test_set_theta_rebuilds() {
        let mut chain = planar([0.0, 0.0]);
        chain.push(Pose::new(Vec3::new(1.0, 0.0, 0.0), Vec4::identity()));
        assert!(chain.end().p.approx_eq(&Vec3::new(2.0, 0.0, 0.0), EPS));

        chain.set_theta(0, FRAC_PI_2).expect("joint exists");
        assert!(chain.end().p.approx_eq(&Vec3::new(0.0, 2.0, 0.0), EPS));

        chain.set_thetas(&[0.0, FRAC_PI_2]).expect("two joints");
        assert!(chain.end().p.approx_eq(&Vec3::new(1.0, 1.0, 0.0), EPS));
        assert_eq!(chain.thetas(), vec![0.0, FRAC_PI_2]);

        assert!(chain.set_theta(2, 1.0).is_err());
        assert_eq!(chain.set_thetas(&[1.0]), Err(KinematicError::InvalidLength { expected: 2, found: 1 }));
    }

    #[test]
    fn test_push_chaining() {
        let mut chain = planar([0.0, 0.0]);
        let step = Pose::new(Vec3::new(0.5, 0.0, 0.0), Vec4::identity());
        chain.push(step).push(step);
        chain <<= step;
        assert_eq!(chain.len(), 5);
        assert_eq!(chain.dof(), 2);
        assert!(chain.end().p.approx_eq(&Vec3::new(2.5, 0.0, 0.0), EPS));
    }

    #[test]
    fn test_python_indexing() {
        let mut chain = planar([0.0, 0.0]);
        chain <<= Pose::new(Vec3::new(1.0, 0.0, 0.0), Vec4::identity());

        assert_eq!(chain.get(-1).expect("in range"), &chain[2]);
        assert_eq!(chain.get(-3).expect("in range"), &chain[0]);
        assert_eq!(chain.get(1).expect("in range"), &chain[1]);
        assert_eq!(chain.get(3), Err(KinematicError::IndexOutOfRange { index: 3, len: 3 }));
        assert_eq!(chain.get(-4), Err(KinematicError::IndexOutOfRange { index: -4, len: 3 }));
    }

    #[test]
    #[should_panic]
    fn test_index_panics() {
        let chain = planar([0.0, 0.0]);
        let _ = chain[5];
    }

    #[test]
    fn test_path_and_axes() {
        let base = Pose::new(Vec3::new(0.0, 0.0, 1.0), Vec4::identity());
        let mut chain = PoseArray::new(
            &[Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0)], &[z(), z()], &[0.0, 0.0], base,
        ).expect("valid chain");
        chain <<= Pose::new(Vec3::new(1.0, 0.0, 0.0), Vec4::identity());

        let path = chain.path();
        assert_eq!(path.len(), 4);
        assert!(path[0].approx_eq(&Vec3::new(0.0, 0.0, 1.0), EPS));
        assert!(path[3].approx_eq(&Vec3::new(2.0, 0.0, 1.0), EPS));
        assert_eq!(chain.p().len(), 3);
        assert_eq!(chain.q().len(), 3);

        let axes = chain.joint_axes();
        assert_eq!(axes.len(), 2);
        assert!(axes[1].0.approx_eq(&Vec3::new(1.0, 0.0, 1.0), EPS));
        assert!(axes[1].1.approx_eq(&z(), EPS));
    }
}
