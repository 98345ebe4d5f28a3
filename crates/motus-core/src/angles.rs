//! Joint angle geometry
//!
//! Angles are measured in the image plane (x, y) in degrees. Provider depth
//! is too noisy to include in the angle itself.

use crate::{AngleId, Joint, KeypointSet, Position3D};

/// Angle at `vertex` between the segments to `a` and `c`, in degrees.
///
/// Uses cos(θ) = (v1 · v2) / (|v1| × |v2|). A degenerate segment (zero
/// length) yields 180° (treated as straight) rather than NaN.
pub fn three_point_angle(a: Position3D, vertex: Position3D, c: Position3D) -> f64 {
    let v1 = (a.x - vertex.x, a.y - vertex.y);
    let v2 = (c.x - vertex.x, c.y - vertex.y);

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let mag1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let mag2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();

    if mag1 < 1e-9 || mag2 < 1e-9 {
        return 180.0;
    }

    let cos_angle = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees()
}

/// Trunk inclination from vertical in degrees (0 = upright).
///
/// Image y grows downward, so an upright trunk has the shoulder midpoint
/// above (smaller y than) the hip midpoint.
pub fn trunk_inclination(shoulder_mid: Position3D, hip_mid: Position3D) -> f64 {
    let dx = (shoulder_mid.x - hip_mid.x).abs();
    let up = hip_mid.y - shoulder_mid.y;
    if dx < 1e-9 && up.abs() < 1e-9 {
        return 0.0;
    }
    dx.atan2(up).to_degrees()
}

/// Keypoint triple (a, vertex, c) that defines a limb angle
pub fn angle_keypoints(angle: AngleId) -> Option<(Joint, Joint, Joint)> {
    match angle {
        AngleId::LeftKnee => Some((Joint::LeftHip, Joint::LeftKnee, Joint::LeftAnkle)),
        AngleId::RightKnee => Some((Joint::RightHip, Joint::RightKnee, Joint::RightAnkle)),
        AngleId::LeftHip => Some((Joint::LeftShoulder, Joint::LeftHip, Joint::LeftKnee)),
        AngleId::RightHip => Some((Joint::RightShoulder, Joint::RightHip, Joint::RightKnee)),
        AngleId::LeftElbow => Some((Joint::LeftShoulder, Joint::LeftElbow, Joint::LeftWrist)),
        AngleId::RightElbow => Some((Joint::RightShoulder, Joint::RightElbow, Joint::RightWrist)),
        AngleId::LeftShoulder => Some((Joint::LeftHip, Joint::LeftShoulder, Joint::LeftElbow)),
        AngleId::RightShoulder => {
            Some((Joint::RightHip, Joint::RightShoulder, Joint::RightElbow))
        }
        AngleId::Torso => None,
    }
}

/// Compute one tracked angle from a keypoint set, if its keypoints are confident
pub fn angle_from_keypoints(
    keypoints: &KeypointSet,
    angle: AngleId,
    min_confidence: f64,
) -> Option<f64> {
    match angle_keypoints(angle) {
        Some((a, vertex, c)) => {
            let a = keypoints.confident(a, min_confidence)?;
            let vertex = keypoints.confident(vertex, min_confidence)?;
            let c = keypoints.confident(c, min_confidence)?;
            Some(three_point_angle(a, vertex, c))
        }
        None => {
            let ls = keypoints.confident(Joint::LeftShoulder, min_confidence)?;
            let rs = keypoints.confident(Joint::RightShoulder, min_confidence)?;
            let lh = keypoints.confident(Joint::LeftHip, min_confidence)?;
            let rh = keypoints.confident(Joint::RightHip, min_confidence)?;
            Some(trunk_inclination(ls.midpoint(&rs), lh.midpoint(&rh)))
        }
    }
}

/// All tracked angles computable from `keypoints`
pub fn joint_angles(keypoints: &KeypointSet, min_confidence: f64) -> Vec<(AngleId, f64)> {
    AngleId::ALL
        .iter()
        .filter_map(|&angle| {
            angle_from_keypoints(keypoints, angle, min_confidence).map(|value| (angle, value))
        })
        .collect()
}
