//! Synthetic movement generator
//!
//! Produces pixel-space keypoint frames for repeated squats or hip hinges.
//! The side-view leg is built by forward kinematics from the ankle up, so
//! the knee, hip and trunk angles of every frame are known exactly:
//! - knee flexion = shank tilt + thigh tilt
//! - hip flexion  = thigh tilt + trunk lean
//!
//! Optional seeded jitter and keypoint dropout model a noisy pose provider.

use std::f64::consts::PI;

use motus_core::{FrameTime, Joint, Keypoint, KeypointSet, Position3D};
use motus_runtime::FrameInput;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Segment lengths in pixels
const SHANK: f64 = 120.0;
const THIGH: f64 = 130.0;
const TORSO: f64 = 150.0;
const UPPER_ARM: f64 = 110.0;

/// Flexion held at the top of each rep (degrees)
const BASE_KNEE_FLEXION: f64 = 10.0;
const BASE_HIP_FLEXION: f64 = 10.0;
const BASE_TRUNK_LEAN: f64 = 8.0;

/// Ankle position and half the stance width
const ANKLE: (f64, f64) = (320.0, 500.0);
const HALF_STANCE: f64 = 25.0;

/// Shape of one repetition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MovementProfile {
    /// Knee and hip flex together, trunk stays fairly upright
    Squat,
    /// Hip-dominant hinge with a strong forward lean
    Hinge,
}

impl MovementProfile {
    /// (knee flexion, hip flexion, share of hip flexion taken by trunk lean)
    /// at full depth
    fn amplitudes(self) -> (f64, f64, f64) {
        match self {
            MovementProfile::Squat => (100.0, 90.0, 0.3),
            MovementProfile::Hinge => (30.0, 80.0, 0.8),
        }
    }
}

/// Generator settings
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub profile: MovementProfile,
    /// Duration of one full rep (ms)
    pub period_ms: u32,
    /// Fraction of the profile's full depth reached, in [0, 1]
    pub depth: f64,
    /// Time between frames (ms)
    pub frame_interval_ms: u32,
    /// Uniform positional noise amplitude (pixels)
    pub jitter_px: f64,
    /// Probability that a keypoint is missing from a frame
    pub dropout: f64,
    /// Reported keypoint confidence
    pub confidence: f64,
    /// Fraction by which the right knee flexes less than the left
    pub knee_asymmetry: f64,
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            profile: MovementProfile::Squat,
            period_ms: 3000,
            depth: 1.0,
            frame_interval_ms: 33,
            jitter_px: 0.0,
            dropout: 0.0,
            confidence: 0.9,
            knee_asymmetry: 0.0,
            seed: 0x4D4F_5455,
        }
    }
}

/// Joint angles the generator built a frame from (degrees)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrueAngles {
    pub left_knee: f64,
    pub right_knee: f64,
    pub hip: f64,
    pub trunk: f64,
}

/// Deterministic (per seed) stream of synthetic frames
#[derive(Debug)]
pub struct MovementGenerator {
    config: GeneratorConfig,
    rng: StdRng,
    frame: u64,
}

impl MovementGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        MovementGenerator {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            frame: 0,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Depth fraction at `t_ms`: 0 standing, `depth` at the bottom
    pub fn depth_at(&self, t_ms: f64) -> f64 {
        let phase = 2.0 * PI * t_ms / self.config.period_ms.max(1) as f64;
        0.5 * (1.0 - phase.cos()) * self.config.depth.clamp(0.0, 1.0)
    }

    /// Exact angles at `t_ms`
    pub fn angles_at(&self, t_ms: f64) -> TrueAngles {
        let (knee, hip, _) = self.config.profile.amplitudes();
        let d = self.depth_at(t_ms);
        let left_flexion = BASE_KNEE_FLEXION + knee * d;
        let right_flexion = BASE_KNEE_FLEXION + knee * d * (1.0 - self.config.knee_asymmetry);
        let (_, _, trunk) = self.tilts(d, left_flexion);
        TrueAngles {
            left_knee: 180.0 - left_flexion,
            right_knee: 180.0 - right_flexion,
            hip: 180.0 - (BASE_HIP_FLEXION + hip * d),
            trunk,
        }
    }

    /// (shank, thigh, trunk) tilts from vertical in degrees
    fn tilts(&self, d: f64, knee_flexion: f64) -> (f64, f64, f64) {
        let (_, hip, trunk_share) = self.config.profile.amplitudes();
        let hip_flexion = BASE_HIP_FLEXION + hip * d;
        let trunk = BASE_TRUNK_LEAN + trunk_share * hip * d;
        let thigh = hip_flexion - trunk;
        let shank = (knee_flexion - thigh).max(0.0);
        (shank, thigh, trunk)
    }

    /// Noise-free keypoints at `t_ms`
    pub fn pose_at(&self, t_ms: f64) -> KeypointSet {
        let angles = self.angles_at(t_ms);
        let d = self.depth_at(t_ms);
        let confidence = self.config.confidence;

        let mut keypoints = KeypointSet::new();
        for (side, knee_flexion, offset) in [
            (Side::Left, 180.0 - angles.left_knee, -HALF_STANCE),
            (Side::Right, 180.0 - angles.right_knee, HALF_STANCE),
        ] {
            let (shank, thigh, trunk) = self.tilts(d, knee_flexion);
            let ankle = Position3D::planar(ANKLE.0 + offset, ANKLE.1);
            let knee = step(ankle, SHANK, shank, 1.0);
            let hip = step(knee, THIGH, thigh, -1.0);
            let shoulder = step(hip, TORSO, trunk, 1.0);
            // Arms held forward at a fixed bend
            let elbow = Position3D::planar(
                shoulder.x + UPPER_ARM * 60f64.to_radians().sin(),
                shoulder.y + UPPER_ARM * 60f64.to_radians().cos(),
            );
            let wrist = Position3D::planar(elbow.x + 90.0, elbow.y - 20.0);

            for (joint, position) in side.joints().into_iter().zip([
                ankle, knee, hip, shoulder, elbow, wrist,
            ]) {
                keypoints.set(joint, Keypoint::new(position, confidence));
            }
        }
        keypoints
    }

    /// Next frame, with jitter and dropout applied
    pub fn next_frame(&mut self) -> FrameInput {
        let t_ms = self.frame * self.config.frame_interval_ms as u64;
        self.frame += 1;

        let clean = self.pose_at(t_ms as f64);
        let mut keypoints = KeypointSet::new();
        for (joint, keypoint) in clean.iter() {
            if self.config.dropout > 0.0 && self.rng.gen::<f64>() < self.config.dropout {
                continue;
            }
            let mut position = keypoint.position;
            if self.config.jitter_px > 0.0 {
                let j = self.config.jitter_px;
                position.x += self.rng.gen_range(-j..=j);
                position.y += self.rng.gen_range(-j..=j);
            }
            keypoints.set(joint, Keypoint::new(position, keypoint.confidence));
        }

        FrameInput::new(FrameTime::from_millis(t_ms as i64), keypoints)
    }

    /// Frames produced so far
    pub fn frames(&self) -> u64 {
        self.frame
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn joints(self) -> [Joint; 6] {
        match self {
            Side::Left => [
                Joint::LeftAnkle,
                Joint::LeftKnee,
                Joint::LeftHip,
                Joint::LeftShoulder,
                Joint::LeftElbow,
                Joint::LeftWrist,
            ],
            Side::Right => [
                Joint::RightAnkle,
                Joint::RightKnee,
                Joint::RightHip,
                Joint::RightShoulder,
                Joint::RightElbow,
                Joint::RightWrist,
            ],
        }
    }
}

/// Move `length` up from `from`, tilted `tilt_deg` from vertical toward
/// `direction` (+1 forward, -1 backward). Image y grows downward.
fn step(from: Position3D, length: f64, tilt_deg: f64, direction: f64) -> Position3D {
    let tilt = tilt_deg.to_radians();
    Position3D::planar(
        from.x + direction * length * tilt.sin(),
        from.y - length * tilt.cos(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use motus_core::{angle_from_keypoints, AngleId};

    #[test]
    fn test_geometry_matches_true_angles() {
        let generator = MovementGenerator::new(GeneratorConfig::default());
        for t in [0.0, 400.0, 1500.0, 2200.0] {
            let pose = generator.pose_at(t);
            let truth = generator.angles_at(t);

            let knee = angle_from_keypoints(&pose, AngleId::LeftKnee, 0.5).unwrap();
            let hip = angle_from_keypoints(&pose, AngleId::LeftHip, 0.5).unwrap();
            let trunk = angle_from_keypoints(&pose, AngleId::Torso, 0.5).unwrap();

            assert!((knee - truth.left_knee).abs() < 1e-6, "knee at {t}");
            assert!((hip - truth.hip).abs() < 1e-6, "hip at {t}");
            assert!((trunk - truth.trunk).abs() < 1e-6, "trunk at {t}");
        }
    }

    #[test]
    fn test_depth_cycle() {
        let generator = MovementGenerator::new(GeneratorConfig::default());
        assert_eq!(generator.depth_at(0.0), 0.0);
        assert!((generator.depth_at(1500.0) - 1.0).abs() < 1e-12);
        assert!(generator.depth_at(3000.0) < 1e-12);
    }

    #[test]
    fn test_same_seed_same_frames() {
        let config = GeneratorConfig {
            jitter_px: 3.0,
            dropout: 0.1,
            ..GeneratorConfig::default()
        };
        let mut a = MovementGenerator::new(config.clone());
        let mut b = MovementGenerator::new(config);
        for _ in 0..20 {
            assert_eq!(a.next_frame().keypoints, b.next_frame().keypoints);
        }
        assert_eq!(a.frames(), 20);
    }

    #[test]
    fn test_dropout_removes_keypoints() {
        let mut generator = MovementGenerator::new(GeneratorConfig {
            dropout: 1.0,
            ..GeneratorConfig::default()
        });
        assert!(generator.next_frame().keypoints.is_empty());
    }
}
