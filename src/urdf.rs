//! Supports extracting a serial chain from URDF (optional)

extern crate sxd_document;

use std::collections::HashMap;
use std::f64::consts::PI;
use std::fs::read_to_string;
use std::path::Path;

use regex::Regex;
use sxd_document::{dom, parser, QName};
use tracing::debug;

use crate::constraints::Constraints;
use crate::parameter_error::ParameterError;
use crate::parameters::ChainParameters;
use crate::pose::Pose;
use crate::robot::Robot;
use crate::vec3::Vec3;
use crate::vec4::Vec4;

/// Rotations smaller than this in a joint origin are ignored
const ROTATION_TOLERANCE: f64 = 1e-9;

/// Reads the robot from URDF file, following the joints from the root link to `tip_link`
/// (or to the only leaf link if not given). See [`from_urdf`].
///
/// # Example
/// ```
/// let robot = rs_chain_kinematics::urdf::from_urdf_file("src/tests/data/planar_arm.urdf", None)
///     .expect("Failed to read URDF");
/// println!("{} joints", robot.parameters.dof());
/// ```
pub fn from_urdf_file<P: AsRef<Path>>(path: P, tip_link: Option<&str>) -> Result<Robot, ParameterError> {
    let xml_content = read_to_string(path)?;
    from_urdf(&xml_content, tip_link)?.to_robot()
}

/// Parses URDF XML content into chain parameters, joint limits and the tool.
///
/// Revolute and continuous joints on the path to the tip become the joints of the chain.
/// Fixed joints before or between them are folded into the offsets, so their origins
/// must not be rotated; fixed joints after the last moving joint form the tool.
/// Revolute joints take their limits from the file; continuous joints, and revolute ones
/// without readable limits, get a full turn in either direction.
pub fn from_urdf(xml_content: &str, tip_link: Option<&str>) -> Result<UrdfChain, ParameterError> {
    let joints = process_joints(xml_content)?;
    let path = joint_path(&joints, tip_link)?;
    populate_chain(&path)
}

/// Chain as extracted from URDF. Can be inspected or modified before converting to
/// the robot.
#[derive(Debug, Clone)]
pub struct UrdfChain {
    pub parameters: ChainParameters,
    pub constraints: Constraints,
    /// Flange to tool center point, from trailing fixed joints
    pub tool: Option<Pose>,
    /// Names of the moving joints in the chain order
    pub joint_names: Vec<String>,
}

impl UrdfChain {
    pub fn to_robot(self) -> Result<Robot, ParameterError> {
        let mut robot = Robot::new(self.parameters)?.with_constraints(self.constraints)?;
        if let Some(tool) = self.tool {
            robot = robot.with_tool(tool)?;
        }
        Ok(robot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum JointType {
    Revolute,
    Continuous,
    Fixed,
}

#[derive(Debug, Clone, PartialEq)]
struct JointData {
    name: String,
    joint_type: JointType,
    parent: String,
    child: String,
    origin: Pose,
    axis: Vec3,
    limits: Option<(f64, f64)>,
}

fn process_joints(xml: &str) -> Result<Vec<JointData>, ParameterError> {
    let package = parser::parse(xml)
        .map_err(|e| ParameterError::XmlProcessingError(format!("Failed to parse XML: {}", e)))?;
    let document = package.as_document();

    let root_element = document.root().children().into_iter()
        .find_map(|e| e.element())
        .ok_or_else(|| ParameterError::XmlProcessingError("No root element found".to_string()))?;

    let mut joints = Vec::new();
    collect_joints(root_element, &mut joints)?;
    Ok(joints)
}

// Recursive, as joints may be wrapped into xacro macros
fn collect_joints(element: dom::Element, joints: &mut Vec<JointData>) -> Result<(), ParameterError> {
    let joint_tag = QName::new("joint");

    for child in element.children().into_iter().filter_map(|e| e.element()) {
        if child.name() == joint_tag {
            joints.push(read_joint(child)?);
        } else {
            collect_joints(child, joints)?;
        }
    }
    Ok(())
}

fn read_joint(element: dom::Element) -> Result<JointData, ParameterError> {
    let name = element.attribute("name")
        .map(|attr| attr.value().to_string())
        .unwrap_or_else(|| "Unnamed".to_string());

    let type_name = element.attribute("type").map(|attr| attr.value()).unwrap_or("fixed");
    let joint_type = match type_name {
        "revolute" => JointType::Revolute,
        "continuous" => JointType::Continuous,
        "fixed" => JointType::Fixed,
        other => return Err(ParameterError::XmlProcessingError(
            format!("Joint {} has unsupported type {}", name, other))),
    };

    let parent = child_element(element, "parent")
        .and_then(|e| e.attribute("link"))
        .map(|attr| attr.value().to_string())
        .ok_or_else(|| ParameterError::MissingField(format!("parent link of joint {}", name)))?;
    let child = child_element(element, "child")
        .and_then(|e| e.attribute("link"))
        .map(|attr| attr.value().to_string())
        .ok_or_else(|| ParameterError::MissingField(format!("child link of joint {}", name)))?;

    let origin = match child_element(element, "origin") {
        Some(origin) => {
            let xyz = origin.attribute("xyz").map_or(Ok(Vec3::zeros()), |a| parse_triplet(a.value()))?;
            let rpy = origin.attribute("rpy").map_or(Ok(Vec3::zeros()), |a| parse_triplet(a.value()))?;
            Pose::from_xyz_rpy(xyz, rpy)
        }
        None => Pose::identity(),
    };

    // URDF default axis is x
    let axis = match child_element(element, "axis").and_then(|e| e.attribute("xyz")) {
        Some(attr) => parse_triplet(attr.value())?,
        None => Vec3::new(1.0, 0.0, 0.0),
    };

    let limits = match child_element(element, "limit").map(get_limits).transpose() {
        Ok(limits) => limits,
        Err(e) => {
            debug!("Joint limits defined but not readable for {}: {}", name, e);
            None
        }
    };

    Ok(JointData { name, joint_type, parent, child, origin, axis, limits })
}

fn child_element<'d>(element: dom::Element<'d>, tag: &str) -> Option<dom::Element<'d>> {
    let tag = QName::new(tag);
    element.children().into_iter()
        .find_map(|e| e.element().filter(|el| el.name() == tag))
}

fn parse_triplet(value: &str) -> Result<Vec3, ParameterError> {
    let coords: Vec<f64> = value.split_whitespace()
        .map(parse_angle)
        .collect::<Result<_, _>>()?;
    if coords.len() != 3 {
        return Err(ParameterError::InvalidLength { expected: 3, found: coords.len() });
    }
    Ok(Vec3::new(coords[0], coords[1], coords[2]))
}

fn parse_angle(attr_value: &str) -> Result<f64, ParameterError> {
    // Regular expression to match the ${radians(<number>)} format that is common in xacro
    let re = Regex::new(r"^\$\{radians\((-?\d+(\.\d+)?)\)\}$")
        .map_err(|_| ParameterError::ParseError("Invalid regex pattern".to_string()))?;

    if let Some(caps) = re.captures(attr_value) {
        let degrees_str = caps.get(1)
            .ok_or_else(|| ParameterError::WrongAngle(format!("Bad representation: {}", attr_value)))?
            .as_str();
        let degrees: f64 = degrees_str.parse()
            .map_err(|_| ParameterError::WrongAngle(attr_value.to_string()))?;
        Ok(degrees.to_radians())
    } else {
        attr_value.parse()
            .map_err(|_| ParameterError::WrongAngle(attr_value.to_string()))
    }
}

fn get_limits(element: dom::Element) -> Result<(f64, f64), ParameterError> {
    let lower_attr = element.attribute("lower")
        .ok_or_else(|| ParameterError::MissingField("lower limit not found".into()))?
        .value();
    let lower_limit = parse_angle(lower_attr)?;

    let upper_attr = element.attribute("upper")
        .ok_or_else(|| ParameterError::MissingField("upper limit not found".into()))?
        .value();
    let upper_limit = parse_angle(upper_attr)?;

    Ok((lower_limit, upper_limit))
}

/// Joints from the root link to the tip link, in this order.
fn joint_path<'a>(joints: &'a [JointData], tip_link: Option<&str>) -> Result<Vec<&'a JointData>, ParameterError> {
    let mut by_child: HashMap<&str, &JointData> = HashMap::new();
    for joint in joints {
        if let Some(existing) = by_child.insert(joint.child.as_str(), joint) {
            if existing != joint {
                return Err(ParameterError::XmlProcessingError(
                    format!("Link {} has more than one parent joint", joint.child)));
            }
        }
    }

    let tip = match tip_link {
        Some(tip) => tip.to_string(),
        None => {
            let leaves: Vec<&str> = joints.iter()
                .map(|j| j.child.as_str())
                .filter(|child| !joints.iter().any(|j| j.parent == *child))
                .collect();
            match leaves.as_slice() {
                [leaf] => leaf.to_string(),
                [] => return Err(ParameterError::XmlProcessingError("No joints found".to_string())),
                _ => return Err(ParameterError::XmlProcessingError(
                    format!("Several tip links, choose one of {:?}", leaves))),
            }
        }
    };

    let mut path = Vec::new();
    let mut link = tip.as_str();
    while let Some(joint) = by_child.get(link) {
        if path.len() > joints.len() {
            return Err(ParameterError::XmlProcessingError("Joints form a loop".to_string()));
        }
        path.push(*joint);
        link = joint.parent.as_str();
    }
    if path.is_empty() {
        return Err(ParameterError::XmlProcessingError(format!("No joint leads to link {}", tip)));
    }
    path.reverse();
    Ok(path)
}

fn populate_chain(path: &[&JointData]) -> Result<UrdfChain, ParameterError> {
    let mut offsets = Vec::new();
    let mut axes = Vec::new();
    let mut from = Vec::new();
    let mut to = Vec::new();
    let mut joint_names = Vec::new();

    // Fixed transforms accumulated since the previous moving joint
    let mut pending = Pose::identity();
    for joint in path {
        let origin = pending * joint.origin;
        if joint.joint_type == JointType::Fixed {
            pending = origin;
            continue;
        }
        if !origin.q.same_rotation(&Vec4::identity(), ROTATION_TOLERANCE) {
            return Err(ParameterError::XmlProcessingError(
                format!("Origin of joint {} (or a fixed joint before it) is rotated", joint.name)));
        }
        offsets.push(origin.p);
        axes.push(joint.axis);
        let (lower, upper) = match (joint.joint_type, joint.limits) {
            (JointType::Revolute, Some(limits)) => limits,
            _ => (-PI, PI),
        };
        from.push(lower);
        to.push(upper);
        joint_names.push(joint.name.clone());
        pending = Pose::identity();
    }

    if offsets.is_empty() {
        return Err(ParameterError::XmlProcessingError("No revolute joints on the path".to_string()));
    }
    let tool = if pending.approx_eq(&Pose::identity(), ROTATION_TOLERANCE) { None } else { Some(pending) };
    debug!("Extracted {} joints from URDF: {:?}", joint_names.len(), joint_names);

    Ok(UrdfChain {
        parameters: ChainParameters::new(offsets, axes)?,
        constraints: Constraints::new(from, to)?,
        tool,
        joint_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARM: &str = r#"
        <robot name="arm">
            <link name="world"/>
            <link name="base_link"/>
            <link name="link_1"/>
            <link name="link_2"/>
            <link name="tcp"/>
            <joint name="world_joint" type="fixed">
                <origin xyz="0 0 0.5" rpy="0 0 0"/>
                <parent link="world"/>
                <child link="base_link"/>
            </joint>
            <joint name="joint_1" type="revolute">
                <origin xyz="0 0 0.1"/>
                <parent link="base_link"/>
                <child link="link_1"/>
                <axis xyz="0 0 1"/>
                <limit lower="${radians(-170)}" upper="${radians(170)}" effort="0" velocity="3.67"/>
            </joint>
            <joint name="joint_2" type="continuous">
                <origin xyz="0.4 0 0"/>
                <parent link="link_1"/>
                <child link="link_2"/>
                <axis xyz="0 -1 0"/>
            </joint>
            <joint name="tool_joint" type="fixed">
                <origin xyz="0.2 0 0" rpy="0 1.5707963267948966 0"/>
                <parent link="link_2"/>
                <child link="tcp"/>
            </joint>
        </robot>
    "#;

    #[test]
    fn test_extract_chain() {
        let chain = from_urdf(ARM, None).expect("valid URDF");
        assert_eq!(chain.joint_names, vec!["joint_1", "joint_2"]);
        assert_eq!(chain.parameters.offsets, vec![Vec3::new(0.0, 0.0, 0.6), Vec3::new(0.4, 0.0, 0.0)]);
        assert_eq!(chain.parameters.axes[1], Vec3::new(0.0, -1.0, 0.0));

        assert!((chain.constraints.from[0] + 170.0_f64.to_radians()).abs() < 1e-12);
        assert!((chain.constraints.to[0] - 170.0_f64.to_radians()).abs() < 1e-12);
        assert_eq!(chain.constraints.from[1], -PI);

        let tool = chain.tool.expect("trailing fixed joint");
        assert!(tool.p.approx_eq(&Vec3::new(0.2, 0.0, 0.0), 1e-12));
        assert!((tool.q.rpy().y - PI / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_tip_link() {
        let chain = from_urdf(ARM, Some("link_1")).expect("valid URDF");
        assert_eq!(chain.joint_names, vec!["joint_1"]);
        assert!(chain.tool.is_none());
        assert!(matches!(from_urdf(ARM, Some("nowhere")), Err(ParameterError::XmlProcessingError(_))));
    }

    #[test]
    fn test_to_robot() {
        let mut robot = from_urdf(ARM, None).expect("valid URDF").to_robot().expect("valid chain");
        let hand = robot.jnt2pos(&[0.0, 0.0]).expect("two joints");
        assert!(hand.p.approx_eq(&Vec3::new(0.6, 0.0, 0.6), 1e-12));
        assert!(robot.constraints.is_some());
    }

    #[test]
    fn test_rejected() {
        let rotated = ARM.replace(r#"<origin xyz="0.4 0 0"/>"#, r#"<origin xyz="0.4 0 0" rpy="0.3 0 0"/>"#);
        assert!(matches!(from_urdf(&rotated, None), Err(ParameterError::XmlProcessingError(_))));

        let prismatic = ARM.replace(r#"type="continuous""#, r#"type="prismatic""#);
        assert!(matches!(from_urdf(&prismatic, None), Err(ParameterError::XmlProcessingError(_))));

        assert!(matches!(from_urdf("<robot></robot>", None), Err(ParameterError::XmlProcessingError(_))));
        assert!(matches!(from_urdf("<robot", None), Err(ParameterError::XmlProcessingError(_))));
    }

    #[test]
    fn test_parse_angle() {
        assert_eq!(parse_angle("1.5").expect("plain radians"), 1.5);
        assert!((parse_angle("${radians(-90)}").expect("xacro") + PI / 2.0).abs() < 1e-12);
        assert!(matches!(parse_angle("ninety"), Err(ParameterError::WrongAngle(_))));
    }
}
