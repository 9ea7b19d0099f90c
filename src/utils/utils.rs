//! Helper functions

use crate::kinematic_traits::Joints;
use crate::pose::Pose;

/// Checks if all joint values are finite
pub fn is_valid(qs: &[f64]) -> bool {
    qs.iter().all(|&q| q.is_finite())
}

/// Print joint values, converting radians to degrees.
pub fn dump_joints(joints: &[f64]) {
    println!("{}", format_joints(joints));
}

/// Joint values in degrees as `[ 10.00  -5.00 ...]`.
pub fn format_joints(joints: &[f64]) -> String {
    let mut row_str = String::new();
    for computed in joints {
        row_str.push_str(&format!("{:5.2} ", computed.to_degrees()));
    }
    format!("[{}]", row_str.trim_end())
}

pub fn dump_pose(pose: &Pose) {
    let rpy = pose.q.rpy();
    println!(
        "x: {:.5}, y: {:.5}, z: {:.5},  rpy: {:.3},{:.3},{:.3},  quat: {:.5},{:.5},{:.5},{:.5}",
        pose.p.x, pose.p.y, pose.p.z,
        rpy.x.to_degrees(), rpy.y.to_degrees(), rpy.z.to_degrees(),
        pose.q.x, pose.q.y, pose.q.z, pose.q.w
    );
}

/// Allows to specify joint values in degrees (converts to radians)
pub fn as_radians(degrees: &[i32]) -> Joints {
    degrees.iter().map(|&d| (d as f64).to_radians()).collect()
}

/// formatting for YAML output
pub(crate) fn deg(x: &f64) -> String {
    if *x == 0.0 {
        return "0".to_string();
    }
    format!("deg({:.4})", x.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deg_formatting() {
        assert_eq!(deg(&0.0), "0");
        assert_eq!(deg(&std::f64::consts::FRAC_PI_2), "deg(90.0000)");
    }

    #[test]
    fn test_as_radians() {
        let joints = as_radians(&[0, 90, -180]);
        assert_eq!(joints.len(), 3);
        assert!((joints[1] - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((joints[2] + std::f64::consts::PI).abs() < 1e-12);
        assert!(is_valid(&joints));
        assert!(!is_valid(&[0.0, f64::NAN]));
    }

    #[test]
    fn test_format_joints() {
        assert_eq!(format_joints(&as_radians(&[10, -5])), "[10.00 -5.00]");
    }
}
