//! Skeleton topology and tracked-angle identifiers
//!
//! Joints and angles are small closed enums so per-joint state can live in
//! fixed arrays indexed by discriminant instead of hash maps.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Joint identifier for body skeleton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    // Head
    Head,
    Neck,

    // Torso
    Spine,
    Chest,
    Pelvis,

    // Left arm
    LeftShoulder,
    LeftElbow,
    LeftWrist,
    LeftHand,

    // Right arm
    RightShoulder,
    RightElbow,
    RightWrist,
    RightHand,

    // Left leg
    LeftHip,
    LeftKnee,
    LeftAnkle,
    LeftFoot,

    // Right leg
    RightHip,
    RightKnee,
    RightAnkle,
    RightFoot,
}

impl Joint {
    /// Number of joints
    pub const COUNT: usize = 21;

    /// All joints in order
    pub const ALL: [Joint; Joint::COUNT] = [
        Joint::Head,
        Joint::Neck,
        Joint::Spine,
        Joint::Chest,
        Joint::Pelvis,
        Joint::LeftShoulder,
        Joint::LeftElbow,
        Joint::LeftWrist,
        Joint::LeftHand,
        Joint::RightShoulder,
        Joint::RightElbow,
        Joint::RightWrist,
        Joint::RightHand,
        Joint::LeftHip,
        Joint::LeftKnee,
        Joint::LeftAnkle,
        Joint::LeftFoot,
        Joint::RightHip,
        Joint::RightKnee,
        Joint::RightAnkle,
        Joint::RightFoot,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Joint::Head => "head",
            Joint::Neck => "neck",
            Joint::Spine => "spine",
            Joint::Chest => "chest",
            Joint::Pelvis => "pelvis",
            Joint::LeftShoulder => "left_shoulder",
            Joint::LeftElbow => "left_elbow",
            Joint::LeftWrist => "left_wrist",
            Joint::LeftHand => "left_hand",
            Joint::RightShoulder => "right_shoulder",
            Joint::RightElbow => "right_elbow",
            Joint::RightWrist => "right_wrist",
            Joint::RightHand => "right_hand",
            Joint::LeftHip => "left_hip",
            Joint::LeftKnee => "left_knee",
            Joint::LeftAnkle => "left_ankle",
            Joint::LeftFoot => "left_foot",
            Joint::RightHip => "right_hip",
            Joint::RightKnee => "right_knee",
            Joint::RightAnkle => "right_ankle",
            Joint::RightFoot => "right_foot",
        }
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anatomical group an angle belongs to (message lookup key)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointGroup {
    Knee,
    Hip,
    Elbow,
    Shoulder,
    Torso,
}

/// A joint angle tracked by the prediction engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleId {
    LeftKnee,
    RightKnee,
    LeftHip,
    RightHip,
    LeftElbow,
    RightElbow,
    LeftShoulder,
    RightShoulder,
    /// Trunk inclination from vertical
    Torso,
}

impl AngleId {
    pub const COUNT: usize = 9;

    pub const ALL: [AngleId; AngleId::COUNT] = [
        AngleId::LeftKnee,
        AngleId::RightKnee,
        AngleId::LeftHip,
        AngleId::RightHip,
        AngleId::LeftElbow,
        AngleId::RightElbow,
        AngleId::LeftShoulder,
        AngleId::RightShoulder,
        AngleId::Torso,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn group(self) -> JointGroup {
        match self {
            AngleId::LeftKnee | AngleId::RightKnee => JointGroup::Knee,
            AngleId::LeftHip | AngleId::RightHip => JointGroup::Hip,
            AngleId::LeftElbow | AngleId::RightElbow => JointGroup::Elbow,
            AngleId::LeftShoulder | AngleId::RightShoulder => JointGroup::Shoulder,
            AngleId::Torso => JointGroup::Torso,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AngleId::LeftKnee => "left_knee",
            AngleId::RightKnee => "right_knee",
            AngleId::LeftHip => "left_hip",
            AngleId::RightHip => "right_hip",
            AngleId::LeftElbow => "left_elbow",
            AngleId::RightElbow => "right_elbow",
            AngleId::LeftShoulder => "left_shoulder",
            AngleId::RightShoulder => "right_shoulder",
            AngleId::Torso => "torso",
        }
    }
}

impl fmt::Display for AngleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 3D position (provider coordinates; y grows downward in image space)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Image-plane position with no depth
    pub fn planar(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Euclidean distance to another position
    pub fn distance(&self, other: &Position3D) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn midpoint(&self, other: &Position3D) -> Position3D {
        Position3D {
            x: (self.x + other.x) * 0.5,
            y: (self.y + other.y) * 0.5,
            z: (self.z + other.z) * 0.5,
        }
    }
}

/// A single detected keypoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub position: Position3D,
    /// Detection confidence in [0, 1]
    pub confidence: f64,
}

impl Keypoint {
    pub fn new(position: Position3D, confidence: f64) -> Self {
        Self {
            position,
            confidence,
        }
    }
}

/// One frame of keypoints indexed by [`Joint`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeypointSet {
    points: [Option<Keypoint>; Joint::COUNT],
}

impl KeypointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, joint: Joint, keypoint: Keypoint) -> Self {
        self.set(joint, keypoint);
        self
    }

    pub fn set(&mut self, joint: Joint, keypoint: Keypoint) {
        self.points[joint.index()] = Some(keypoint);
    }

    pub fn remove(&mut self, joint: Joint) {
        self.points[joint.index()] = None;
    }

    pub fn get(&self, joint: Joint) -> Option<&Keypoint> {
        self.points[joint.index()].as_ref()
    }

    /// Position of `joint` if present with confidence at least `min_confidence`
    pub fn confident(&self, joint: Joint, min_confidence: f64) -> Option<Position3D> {
        self.get(joint)
            .filter(|kp| kp.confidence >= min_confidence)
            .map(|kp| kp.position)
    }

    /// Present keypoints in joint order
    pub fn iter(&self) -> impl Iterator<Item = (Joint, &Keypoint)> + '_ {
        Joint::ALL
            .iter()
            .zip(self.points.iter())
            .filter_map(|(&joint, kp)| kp.as_ref().map(|kp| (joint, kp)))
    }

    pub fn len(&self) -> usize {
        self.points.iter().filter(|kp| kp.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
