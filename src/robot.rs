//! Robot arm: chain geometry together with its base, tool, hand-eye camera,
//! joint limits and solver settings.

use std::f64::consts::PI;

use tracing::debug;

use crate::camera::Camera;
use crate::constraints::Constraints;
use crate::ik_solver::{ChainModel, IkSolver, SolverConfig};
use crate::kinematic_error::KinematicError;
use crate::kinematic_traits::{Joints, Kinematics};
use crate::parameters::ChainParameters;
use crate::pose::Pose;
use crate::pose_array::PoseArray;
use crate::posture::{self, Posture};
use crate::vec3::Vec3;

/// Camera attached to the flange.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraMount {
    /// Camera frame relative to the flange, before the yaw is applied
    pub flange_to_camera: Pose,
    /// Tangent of half the horizontal field of view
    pub tan_h: f64,
    /// Tangent of half the vertical field of view
    pub tan_v: f64,
    /// Rotation of the image about the viewing direction
    pub yaw: f64,
}

#[derive(Debug, Clone)]
pub struct Robot {
    pub parameters: ChainParameters,
    pub base: Pose,
    /// Flange to hand (tool center point)
    pub tool: Option<Pose>,
    pub camera: Option<CameraMount>,
    pub constraints: Option<Constraints>,
    pub solver: SolverConfig,

    /// Chain of the last joints given to [`Robot::jnt2pos`] or found by [`Robot::pos2jnt`]
    links: PoseArray,
}

impl Robot {
    pub fn new(parameters: ChainParameters) -> Result<Self, KinematicError> {
        parameters.validate()?;
        let links = parameters.chain(&vec![0.0; parameters.dof()], &Pose::identity())?;
        Ok(Robot {
            parameters,
            base: Pose::identity(),
            tool: None,
            camera: None,
            constraints: None,
            solver: SolverConfig::default(),
            links,
        })
    }

    /// The six-axis arm with its hand and wrist camera.
    pub fn six_axis_arm() -> Result<Self, KinematicError> {
        let robot = Robot::new(ChainParameters::six_axis_arm())?
            .with_tool(Pose::from_xyz_rpy(Vec3::new(0.0, 0.0, 0.1), Vec3::new(PI / 2.0, 0.0, 0.0)))?
            .with_camera(CameraMount {
                flange_to_camera: Pose::from_xyz_rpy(Vec3::new(-0.07, 0.0, 0.0), Vec3::new(0.0, PI / 18.0, 0.0)),
                tan_h: (20.0_f64).to_radians().tan(),
                tan_v: (10.0_f64).to_radians().tan(),
                yaw: -PI / 2.0,
            });
        Ok(robot)
    }

    pub fn with_base(mut self, base: Pose) -> Result<Self, KinematicError> {
        self.base = base;
        self.refresh()?;
        Ok(self)
    }

    pub fn with_tool(mut self, tool: Pose) -> Result<Self, KinematicError> {
        self.tool = Some(tool);
        self.refresh()?;
        Ok(self)
    }

    pub fn with_camera(self, camera: CameraMount) -> Self {
        Robot { camera: Some(camera), ..self }
    }

    pub fn with_constraints(self, constraints: Constraints) -> Result<Self, KinematicError> {
        if constraints.dof() != self.parameters.dof() {
            return Err(KinematicError::InvalidLength { expected: self.parameters.dof(), found: constraints.dof() });
        }
        Ok(Robot { constraints: Some(constraints), ..self })
    }

    pub fn with_solver(self, solver: SolverConfig) -> Self {
        Robot { solver, ..self }
    }

    fn refresh(&mut self) -> Result<(), KinematicError> {
        let joints = self.links.thetas();
        self.links = self.chain(&joints)?;
        Ok(())
    }

    /// Joint poses, the flange and the tool if there is one.
    pub fn chain(&self, joints: &[f64]) -> Result<PoseArray, KinematicError> {
        let mut links = self.parameters.chain(joints, &self.base)?;
        if let Some(tool) = self.tool {
            links <<= tool;
        }
        Ok(links)
    }

    pub fn model(&self) -> ChainModel<'_> {
        ChainModel {
            parameters: &self.parameters,
            base: self.base,
            tool: self.tool.unwrap_or_default(),
            constraints: self.constraints.as_ref(),
        }
    }

    /// Rebuilds the chain for `joints` and returns the hand pose.
    pub fn jnt2pos(&mut self, joints: &[f64]) -> Result<Pose, KinematicError> {
        self.links = self.chain(joints)?;
        Ok(self.links.end())
    }

    /// Joint angles bringing the hand to `target`, searching from `seed` or from the
    /// current joints. On success the chain is rebuilt for the solution.
    pub fn pos2jnt(&mut self, target: &Pose, seed: Option<&[f64]>) -> Result<Joints, KinematicError> {
        let current = self.links.thetas();
        let seed = seed.unwrap_or(current.as_slice());
        let solution = IkSolver::new(self.solver.clone()).solve(&self.model(), target, seed)?;
        debug!("pos2jnt: {} iterations, position error {:.3e}", solution.iterations, solution.position_error);
        self.links = self.chain(&solution.joints)?;
        Ok(solution.joints)
    }

    pub fn links(&self) -> &PoseArray {
        &self.links
    }

    pub fn joints(&self) -> Joints {
        self.links.thetas()
    }

    pub fn flange(&self) -> Pose {
        self.links[self.parameters.dof()]
    }

    pub fn hand(&self) -> Pose {
        self.links.end()
    }

    /// Camera placed on the current flange, if the robot carries one.
    pub fn camera(&self) -> Result<Option<Camera>, KinematicError> {
        self.camera.as_ref()
            .map(|mount| Camera::from_fov(mount.tan_h, mount.tan_v,
                                          self.flange() * mount.flange_to_camera, mount.yaw))
            .transpose()
    }

    /// Plane of the hand used for visual servoing: normal along (1, 1, 0) of the hand
    /// frame, turned half a circle.
    pub fn hand_surface(&self) -> Result<Pose, KinematicError> {
        self.hand().surface(&Vec3::new(1.0, 1.0, 0.0), PI)
    }

    pub fn posture(&self, joints: &[f64]) -> Result<Posture, KinematicError> {
        posture::posture(&self.parameters, joints)
    }
}

impl Kinematics for Robot {
    fn dof(&self) -> usize {
        self.parameters.dof()
    }

    fn forward(&self, joints: &[f64]) -> Result<Pose, KinematicError> {
        Ok(self.chain(joints)?.end())
    }

    fn inverse(&self, target: &Pose, seed: &[f64]) -> Result<Joints, KinematicError> {
        IkSolver::new(self.solver.clone()).solve(&self.model(), target, seed).map(|s| s.joints)
    }
}

/// Chain of the given parameters and joints placed at `base`.
pub fn jnt2pos_array(parameters: &ChainParameters, joints: &[f64], base: &Pose) -> Result<PoseArray, KinematicError> {
    parameters.chain(joints, base)
}

/// Standalone inverse kinematics: joints that bring the flange of the chain to `target`.
pub fn pos2jnt(parameters: &ChainParameters, base: &Pose, target: &Pose, seed: &[f64],
               config: &SolverConfig) -> Result<Joints, KinematicError> {
    let model = ChainModel { base: *base, ..ChainModel::new(parameters) };
    IkSolver::new(config.clone()).solve(&model, target, seed).map(|s| s.joints)
}

/// World position of the origin of joint `link` (0-based). `link == dof` is the flange.
pub fn pos_b(parameters: &ChainParameters, joints: &[f64], link: usize, base: &Pose) -> Result<Vec3, KinematicError> {
    let chain = parameters.chain(joints, base)?;
    if link >= chain.len() {
        return Err(KinematicError::IndexOutOfRange { index: link as isize, len: chain.len() });
    }
    Ok(chain[link].p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec4::Vec4;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_planar_forward() {
        let mut robot = Robot::new(ChainParameters::planar_two_link(1.0, 1.0)).expect("valid");
        let hand = robot.jnt2pos(&[PI / 2.0, -PI / 2.0]).expect("two joints");
        assert!(hand.p.approx_eq(&Vec3::new(1.0, 1.0, 0.0), EPS));
        assert_eq!(robot.links().len(), 3);
        assert!(robot.flange().approx_eq(&hand, EPS));
    }

    #[test]
    fn test_pos2jnt_updates_links() {
        let mut robot = Robot::new(ChainParameters::planar_two_link(1.0, 1.0)).expect("valid");
        let target = Pose::new(Vec3::new(0.5, 1.2, 0.0), Vec4::identity());
        let joints = robot.pos2jnt(&target, Some(&[0.3, 0.3])).expect("reachable");
        assert!(robot.hand().p.approx_eq(&target.p, 1e-6));
        assert_eq!(robot.joints(), joints);
    }

    #[test]
    fn test_free_functions() {
        let parameters = ChainParameters::planar_two_link(1.0, 1.0);
        let base = Pose::new(Vec3::new(0.0, 0.0, 1.0), Vec4::identity());
        let chain = jnt2pos_array(&parameters, &[0.0, 0.0], &base).expect("two joints");
        assert!(chain.end().p.approx_eq(&Vec3::new(2.0, 0.0, 1.0), EPS));

        let target = Pose::new(Vec3::new(1.0, 1.0, 1.0), Vec4::identity());
        let joints = pos2jnt(&parameters, &base, &target, &[0.1, 0.5], &SolverConfig::default())
            .expect("reachable");
        let reached = jnt2pos_array(&parameters, &joints, &base).expect("two joints").end();
        assert!(reached.p.approx_eq(&target.p, 1e-6));

        let elbow = pos_b(&parameters, &[PI / 2.0, 0.0], 1, &base).expect("in range");
        assert!(elbow.approx_eq(&Vec3::new(0.0, 1.0, 1.0), EPS));
        assert!(pos_b(&parameters, &[0.0, 0.0], 3, &base).is_err());
    }

    #[test]
    fn test_six_axis_arm() {
        let mut robot = Robot::six_axis_arm().expect("preset is valid");
        let hand = robot.jnt2pos(&[0.0; 6]).expect("six joints");
        // Hand 0.1 above the flange
        assert!((hand.p - robot.flange().p).approx_eq(&Vec3::new(0.0, 0.0, 0.1), EPS));
        assert_eq!(robot.links().len(), 8);

        let camera = robot.camera().expect("valid mount").expect("robot has a camera");
        let expected = robot.flange() * Pose::from_xyz_rpy(Vec3::new(-0.07, 0.0, 0.0), Vec3::new(0.0, PI / 18.0, 0.0));
        assert!(camera.mount.p.approx_eq(&expected.p, EPS));

        let surf = robot.hand_surface().expect("non zero normal");
        assert_eq!(surf.p, hand.p);
    }

    #[test]
    fn test_kinematics_trait() {
        let robot = Robot::six_axis_arm().expect("preset is valid");
        let joints = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let target = robot.forward(&joints).expect("six joints");
        let solved = robot.inverse(&target, &[0.0, 0.1, 0.2, 0.3, 0.4, 0.5]).expect("reachable");
        let reached = robot.forward(&solved).expect("six joints");
        assert!(reached.p.approx_eq(&target.p, 1e-6));
        assert_eq!(robot.dof(), 6);
    }

    #[test]
    fn test_constraints_length() {
        let robot = Robot::new(ChainParameters::planar_two_link(1.0, 1.0)).expect("valid");
        let limits = Constraints::full_turn(3);
        assert!(matches!(robot.with_constraints(limits), Err(KinematicError::InvalidLength { .. })));
    }
}
