//! Supports reading the robot description from YAML file (optional)

use std::path::Path;

use regex::Regex;
use tracing::debug;
use yaml_rust2::{Yaml, YamlLoader};

use crate::constraints::Constraints;
use crate::ik_solver::{SolverConfig, SolverMode};
use crate::parameter_error::ParameterError;
use crate::parameters::ChainParameters;
use crate::pose::Pose;
use crate::robot::{CameraMount, Robot};
use crate::vec3::Vec3;

impl ChainParameters {
    /// Read the chain geometry from YAML file. See [`Robot::from_yaml`] for the format;
    /// only the `robot.links` and `robot.flange` entries are used here.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ParameterError> {
        let doc = load_document(contents)?;
        parse_chain(&doc["robot"])
    }
}

impl Robot {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ParameterError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Read the robot from YAML. YAML like this is supported:
    /// ```yaml
    /// robot:
    ///   links:
    ///     - offset: [0, 0, 0.295]
    ///       axis: [0, 0, 1]
    ///     - offset: [0, 0, 0.2]
    ///       axis: [0, 1, 0]
    ///   flange:
    ///     position: [0.3, 0, 0]
    ///     rpy: [0, deg(90), 0]
    ///   base:
    ///     position: [0, 0, 0.5]
    ///   tool:
    ///     position: [0, 0, 0.1]
    ///     rpy: [deg(90), 0, 0]
    ///   limits:
    ///     from: [deg(-170), deg(-90)]
    ///     to: [deg(170), deg(90)]
    /// camera:
    ///   fov_h: deg(40)
    ///   tan_v: 0.176
    ///   mount:
    ///     position: [-0.07, 0, 0]
    ///     rpy: [0, deg(10), 0]
    ///   yaw: deg(-90)
    /// solver:
    ///   mode: pose
    ///   tolerance: 1.0e-6
    ///   max_iterations: 200
    /// ```
    /// Only `robot.links` is required. Angles are radians unless written as `deg(angle)`.
    /// Field of view angles (`fov_h`, `fov_v`) are full angles; `tan_h`, `tan_v` are tangents
    /// of the half angles.
    pub fn from_yaml(contents: &str) -> Result<Self, ParameterError> {
        let doc = load_document(contents)?;
        let robot_node = &doc["robot"];
        let mut robot = Robot::new(parse_chain(robot_node)?)?;

        if !robot_node["base"].is_badvalue() {
            robot = robot.with_base(parse_pose(&robot_node["base"], "robot.base")?)?;
        }
        if !robot_node["tool"].is_badvalue() {
            robot = robot.with_tool(parse_pose(&robot_node["tool"], "robot.tool")?)?;
        }
        let limits = &robot_node["limits"];
        if !limits.is_badvalue() {
            let from = parse_angles(&limits["from"], "robot.limits.from")?;
            let to = parse_angles(&limits["to"], "robot.limits.to")?;
            robot = robot.with_constraints(Constraints::new(from, to)?)?;
        }
        if !doc["camera"].is_badvalue() {
            robot = robot.with_camera(parse_camera(&doc["camera"])?);
        }
        if !doc["solver"].is_badvalue() {
            robot = robot.with_solver(parse_solver(&doc["solver"])?);
        }
        debug!("Robot with {} joints read from YAML, camera: {}, limits: {}",
            robot.parameters.dof(), robot.camera.is_some(), robot.constraints.is_some());
        Ok(robot)
    }
}

fn load_document(contents: &str) -> Result<Yaml, ParameterError> {
    let docs = YamlLoader::load_from_str(contents)
        .map_err(|e| ParameterError::ParseError(e.to_string()))?;
    docs.into_iter().next()
        .ok_or_else(|| ParameterError::ParseError("Empty YAML document".to_string()))
}

fn parse_chain(robot: &Yaml) -> Result<ChainParameters, ParameterError> {
    let links = robot["links"].as_vec()
        .ok_or_else(|| ParameterError::MissingField("robot.links".to_string()))?;

    let mut offsets = Vec::with_capacity(links.len());
    let mut axes = Vec::with_capacity(links.len());
    for (i, link) in links.iter().enumerate() {
        offsets.push(parse_vec3(&link["offset"], &format!("robot.links[{}].offset", i))?);
        axes.push(parse_vec3(&link["axis"], &format!("robot.links[{}].axis", i))?);
    }
    let mut parameters = ChainParameters::new(offsets, axes)?;
    if !robot["flange"].is_badvalue() {
        parameters = parameters.with_flange(parse_pose(&robot["flange"], "robot.flange")?);
    }
    Ok(parameters)
}

fn parse_camera(camera: &Yaml) -> Result<CameraMount, ParameterError> {
    let tan_h = parse_half_angle_tangent(camera, "tan_h", "fov_h")?;
    let tan_v = parse_half_angle_tangent(camera, "tan_v", "fov_v")?;
    let flange_to_camera = if camera["mount"].is_badvalue() {
        Pose::identity()
    } else {
        parse_pose(&camera["mount"], "camera.mount")?
    };
    let yaw = if camera["yaw"].is_badvalue() { 0.0 } else { parse_angle(&camera["yaw"], "camera.yaw")? };
    Ok(CameraMount { flange_to_camera, tan_h, tan_v, yaw })
}

/// The tangent is either given directly or as the full field of view angle.
fn parse_half_angle_tangent(camera: &Yaml, tan_key: &str, fov_key: &str) -> Result<f64, ParameterError> {
    if !camera[tan_key].is_badvalue() {
        parse_number(&camera[tan_key], &format!("camera.{}", tan_key))
    } else if !camera[fov_key].is_badvalue() {
        let fov = parse_angle(&camera[fov_key], &format!("camera.{}", fov_key))?;
        Ok((fov / 2.0).tan())
    } else {
        Err(ParameterError::MissingField(format!("camera.{} or camera.{}", tan_key, fov_key)))
    }
}

fn parse_solver(solver: &Yaml) -> Result<SolverConfig, ParameterError> {
    let mut config = SolverConfig::default();
    if let Some(mode) = solver["mode"].as_str() {
        config.mode = match mode.to_lowercase().as_str() {
            "position" => SolverMode::Position,
            "pose" => SolverMode::Pose,
            other => return Err(ParameterError::ParseError(format!("Unknown solver mode: {}", other))),
        };
    }
    if !solver["tolerance"].is_badvalue() {
        config.tolerance = parse_number(&solver["tolerance"], "solver.tolerance")?;
    }
    if !solver["angle_tolerance"].is_badvalue() {
        config.angle_tolerance = parse_angle(&solver["angle_tolerance"], "solver.angle_tolerance")?;
    }
    if !solver["damping"].is_badvalue() {
        config.damping = parse_number(&solver["damping"], "solver.damping")?;
    }
    if !solver["max_step"].is_badvalue() {
        config.max_step = parse_angle(&solver["max_step"], "solver.max_step")?;
    }
    if !solver["max_iterations"].is_badvalue() {
        let iterations = solver["max_iterations"].as_i64()
            .filter(|&n| n > 0)
            .ok_or_else(|| ParameterError::ParseError("solver.max_iterations must be a positive integer".to_string()))?;
        config.max_iterations = iterations as usize;
    }
    Ok(config)
}

/// `{position: [x, y, z], rpy: [roll, pitch, yaw]}`, both optional.
fn parse_pose(node: &Yaml, field: &str) -> Result<Pose, ParameterError> {
    if node.as_hash().is_none() {
        return Err(ParameterError::ParseError(format!("{} must be a mapping", field)));
    }
    let position = if node["position"].is_badvalue() {
        Vec3::zeros()
    } else {
        parse_vec3(&node["position"], &format!("{}.position", field))?
    };
    let rpy = if node["rpy"].is_badvalue() {
        Vec3::zeros()
    } else {
        let angles = parse_angles(&node["rpy"], &format!("{}.rpy", field))?;
        expect_three(&angles)?;
        Vec3::new(angles[0], angles[1], angles[2])
    };
    Ok(Pose::from_xyz_rpy(position, rpy))
}

fn parse_vec3(node: &Yaml, field: &str) -> Result<Vec3, ParameterError> {
    let values = node.as_vec()
        .ok_or_else(|| ParameterError::MissingField(field.to_string()))?
        .iter()
        .map(|v| parse_number(v, field))
        .collect::<Result<Vec<f64>, _>>()?;
    expect_three(&values)?;
    Ok(Vec3::new(values[0], values[1], values[2]))
}

fn expect_three(values: &[f64]) -> Result<(), ParameterError> {
    if values.len() != 3 {
        return Err(ParameterError::InvalidLength { expected: 3, found: values.len() });
    }
    Ok(())
}

fn parse_angles(node: &Yaml, field: &str) -> Result<Vec<f64>, ParameterError> {
    node.as_vec()
        .ok_or_else(|| ParameterError::MissingField(field.to_string()))?
        .iter()
        .map(|v| parse_angle(v, field))
        .collect()
}

fn parse_number(node: &Yaml, field: &str) -> Result<f64, ParameterError> {
    let value = match node {
        Yaml::Real(s) => s.parse::<f64>().ok(),
        Yaml::Integer(i) => Some(*i as f64),
        Yaml::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    value
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParameterError::ParseError(format!("{} is not a number: {:?}", field, node)))
}

/// Radians, or degrees when written as `deg(angle)`.
fn parse_angle(node: &Yaml, field: &str) -> Result<f64, ParameterError> {
    match node {
        Yaml::String(s) => {
            let re = Regex::new(r"^deg\(\s*(-?\d+(\.\d+)?)\s*\)$")
                .map_err(|_| ParameterError::ParseError("Invalid regex pattern".to_string()))?;
            if let Some(caps) = re.captures(s.trim()) {
                let degrees: f64 = caps.get(1)
                    .ok_or_else(|| ParameterError::WrongAngle(format!("{}: {}", field, s)))?
                    .as_str()
                    .parse()
                    .map_err(|_| ParameterError::WrongAngle(format!("{}: {}", field, s)))?;
                Ok(degrees.to_radians())
            } else {
                s.trim().parse::<f64>()
                    .map_err(|_| ParameterError::WrongAngle(format!("{}: {}", field, s)))
            }
        }
        _ => parse_number(node, field),
    }
}
