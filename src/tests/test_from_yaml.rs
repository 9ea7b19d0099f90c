#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use crate::ik_solver::SolverMode;
    use crate::kinematic_traits::Kinematics;
    use crate::parameter_error::ParameterError;
    use crate::parameters::ChainParameters;
    use crate::pose::Pose;
    use crate::robot::Robot;
    use crate::vec3::Vec3;

    const READ_ERROR: &str = "Failed to load robot from file";

    #[test]
    fn test_robot_from_yaml() {
        let loaded = Robot::from_yaml_file("src/tests/data/six_axis_arm.yaml").expect(READ_ERROR);
        let preset = Robot::six_axis_arm().expect("preset is valid");

        assert_eq!(loaded.parameters, preset.parameters);
        assert_eq!(loaded.solver.mode, SolverMode::Pose);
        assert_eq!(loaded.solver.tolerance, 1.0e-7);
        assert_eq!(loaded.solver.max_iterations, 300);

        let constraints = loaded.constraints.as_ref().expect("limits in file");
        assert!((constraints.to[5] - 2.0 * PI).abs() < 1e-12);

        let joints = [0.3, -0.2, 0.5, 0.1, 0.4, -0.6];
        let a = loaded.forward(&joints).expect("six joints");
        let b = preset.forward(&joints).expect("six joints");
        assert!(a.approx_eq(&b, 1e-12), "{} vs {}", a, b);

        let camera = loaded.camera.as_ref().expect("camera in file");
        let expected = preset.camera.as_ref().expect("preset has camera");
        assert!((camera.tan_h - expected.tan_h).abs() < 1e-12);
        assert!((camera.tan_v - expected.tan_v).abs() < 1e-12);
        assert!((camera.yaw - expected.yaw).abs() < 1e-12);
        assert!(camera.flange_to_camera.approx_eq(&expected.flange_to_camera, 1e-12));
    }

    #[test]
    fn test_parameters_from_yaml() {
        let parameters = ChainParameters::from_yaml_file("src/tests/data/planar_arm.yaml").expect(READ_ERROR);
        assert_eq!(parameters, ChainParameters::planar_two_link(1.0, 1.0));
    }

    #[test]
    fn test_loaded_robot_solves() {
        let mut robot = Robot::from_yaml_file("src/tests/data/six_axis_arm.yaml").expect(READ_ERROR);
        let joints = [0.2, 0.3, 0.4, 0.5, 0.6, 0.7];
        let target = robot.jnt2pos(&joints).expect("six joints");

        let seed: Vec<f64> = joints.iter().map(|j| j - 0.15).collect();
        let solved = robot.pos2jnt(&target, Some(seed.as_slice())).expect("reachable target");
        let reached = robot.forward(&solved).expect("six joints");
        assert!(reached.approx_eq(&target, 1e-5), "{} vs {}", reached, target);
        assert!(robot.constraints.as_ref().expect("limits in file").compliant(&solved));
    }

    #[test]
    fn test_missing_file() {
        let result = Robot::from_yaml_file("src/tests/data/no_such_robot.yaml");
        assert!(matches!(result, Err(ParameterError::IoError(_))));
    }

    #[test]
    fn test_yaml_round_trip_through_file() {
        let parameters = ChainParameters::elbow_arm(0.3, 0.4, 0.35)
            .with_flange(Pose::from_xyz_rpy(Vec3::new(0.0, 0.0, 0.35), Vec3::new(0.0, PI / 3.0, 0.0)));
        let path = std::env::temp_dir().join("rs_chain_kinematics_elbow_arm.yaml");
        std::fs::write(&path, parameters.to_yaml()).expect("temporary file is writable");

        let restored = ChainParameters::from_yaml_file(&path).expect(READ_ERROR);
        let _ = std::fs::remove_file(&path);
        assert_eq!(restored.offsets, parameters.offsets);
        assert!(restored.flange.approx_eq(&parameters.flange, 1e-5));
    }
}
