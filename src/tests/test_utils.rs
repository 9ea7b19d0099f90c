use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use yaml_rust2::{Yaml, YamlLoader};

use crate::kinematic_traits::Joints;
use crate::parameters::ChainParameters;
use crate::pose::Pose;
use crate::vec3::Vec3;
use crate::vec4::Vec4;

#[derive(Debug, Clone)]
pub struct Case {
    pub id: i64,
    pub(crate) robot: String,
    /// Degrees, as written in the file
    pub(crate) joints: Vec<f64>,
    pub(crate) pose: Pose,
    /// Border of the workspace or wrist singularity; the solver converges slowly there
    pub(crate) singular: bool,
}

impl Case {
    pub fn joints_in_radians(&self) -> Joints {
        self.joints.iter().map(|j| j.to_radians()).collect()
    }
}

fn number(node: &Yaml) -> Result<f64> {
    match node {
        Yaml::Real(s) => s.parse::<f64>().with_context(|| format!("Not a number: {}", s)),
        Yaml::Integer(i) => Ok(*i as f64),
        other => bail!("Not a number: {:?}", other),
    }
}

fn numbers(node: &Yaml, expected: usize) -> Result<Vec<f64>> {
    let values = node.as_vec()
        .ok_or_else(|| anyhow!("Sequence expected, found {:?}", node))?
        .iter()
        .map(number)
        .collect::<Result<Vec<_>>>()?;
    if expected > 0 && values.len() != expected {
        bail!("Expected {} values, found {}", expected, values.len());
    }
    Ok(values)
}

/// Load test cases from YAML: `cases: [{id, robot, joints, pose: {translation, quaternion}}]`
/// with joints in degrees and the quaternion as `[x, y, z, w]`.
pub(crate) fn load_yaml(file_path: impl AsRef<Path>) -> Result<Vec<Case>> {
    let p = file_path.as_ref();
    let contents = std::fs::read_to_string(p)
        .with_context(|| format!("Failed to read YAML file: {}", p.display()))?;
    let docs = YamlLoader::load_from_str(&contents)
        .with_context(|| format!("Failed to parse YAML file: {}", p.display()))?;
    let root = docs.first().ok_or_else(|| anyhow!("Empty YAML file: {}", p.display()))?;

    let entries = root["cases"].as_vec().ok_or_else(|| anyhow!("No cases in {}", p.display()))?;
    let mut cases = Vec::with_capacity(entries.len());
    for entry in entries {
        let id = entry["id"].as_i64().ok_or_else(|| anyhow!("Case without id"))?;
        let translation = numbers(&entry["pose"]["translation"], 3)
            .with_context(|| format!("Case {}: translation", id))?;
        let quaternion = numbers(&entry["pose"]["quaternion"], 4)
            .with_context(|| format!("Case {}: quaternion", id))?;
        cases.push(Case {
            id,
            robot: entry["robot"].as_str()
                .ok_or_else(|| anyhow!("Case {}: robot name missing", id))?
                .to_string(),
            joints: numbers(&entry["joints"], 0).with_context(|| format!("Case {}: joints", id))?,
            pose: Pose::new(
                Vec3::new(translation[0], translation[1], translation[2]),
                Vec4::new(quaternion[0], quaternion[1], quaternion[2], quaternion[3]),
            ),
            singular: entry["singular"].as_bool().unwrap_or(false),
        });
    }
    Ok(cases)
}

pub(crate) fn create_parameter_map() -> HashMap<String, ChainParameters> {
    HashMap::from([
        ("six_axis_arm".to_string(), ChainParameters::six_axis_arm()),
        ("planar_two_link".to_string(), ChainParameters::planar_two_link(1.0, 1.0)),
        ("elbow_arm".to_string(), ChainParameters::elbow_arm(0.3, 0.4, 0.35)),
    ])
}

/// Compare two poses with separate tolerances.
/// - `trans_tol_m`: max allowed distance in meters
/// - `rot_tol_rad`: max allowed rotation angle between the orientations
pub fn are_poses_close(a: &Pose, b: &Pose, trans_tol_m: f64, rot_tol_rad: f64) -> bool {
    if (a.p - b.p).norm() > trans_tol_m {
        return false;
    }
    let (_, angle) = a.q.rotation_to(&b.q);
    angle <= rot_tol_rad
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_are_poses_close() {
        let a = Pose::from_xyz_rpy(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 0.1));
        let b = Pose::from_xyz_rpy(Vec3::new(1.0, 0.0, 0.001), Vec3::new(0.0, 0.0, 0.1 + 1e-4));
        assert!(are_poses_close(&a, &b, 1e-2, 1e-3));
        assert!(!are_poses_close(&a, &b, 1e-4, 1e-3));
        assert!(!are_poses_close(&a, &b, 1e-2, 1e-5));

        // Opposite quaternions are the same rotation
        let c = Pose::new(a.p, -a.q);
        assert!(are_poses_close(&a, &c, 1e-12, 1e-9));
    }
}
