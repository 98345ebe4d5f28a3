//! Motion Pipeline
//!
//! One instance per tracked person. The caller owns the frame loop and
//! hands every frame to `process`; nothing here spawns work or blocks.

use motus_coord::{CoordinationAnalyzer, CoordinationResult};
use motus_core::{joint_angles, AngleId, FrameTime, Joint, KeypointSet, MotusResult, Position3D};
use motus_motion::{JointVelocityData, PhaseAnalyzer, PhaseSnapshot, VelocityTracker};
use motus_predict::{AnglePredictionEngine, MessageCatalog, PredictionFrame, PredictiveWarning};
use motus_time::{MonotonicClock, SystemClock};
use serde::Serialize;
use tracing::debug;

use crate::MotusConfig;

/// One frame from the pose provider
#[derive(Debug, Clone, Default)]
pub struct FrameInput {
    pub timestamp: FrameTime,
    pub keypoints: KeypointSet,
    /// Precomputed angles in degrees; derived from keypoints when empty
    pub angles: Vec<(AngleId, f64)>,
}

impl FrameInput {
    pub fn new(timestamp: FrameTime, keypoints: KeypointSet) -> Self {
        Self {
            timestamp,
            keypoints,
            angles: Vec::new(),
        }
    }

    pub fn with_angles(mut self, angles: Vec<(AngleId, f64)>) -> Self {
        self.angles = angles;
        self
    }
}

/// Everything the analyzers produced for one frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub timestamp: FrameTime,
    /// One entry per keypoint present in the input
    pub velocities: Vec<JointVelocityData>,
    pub phase: PhaseSnapshot,
    pub prediction: PredictionFrame,
    pub coordination: CoordinationResult,
}

impl FrameReport {
    /// Velocity result for the given joint, if it was in the input
    pub fn velocity(&self, joint: Joint) -> Option<&JointVelocityData> {
        self.velocities.iter().find(|v| v.joint == joint)
    }
}

/// Per-frame driver for the full analysis stack
#[derive(Debug)]
pub struct MotionPipeline<C: MonotonicClock + Clone = SystemClock> {
    config: MotusConfig,
    clock: C,
    velocity: VelocityTracker,
    phase: PhaseAnalyzer<C>,
    prediction: AnglePredictionEngine<C>,
    coordination: CoordinationAnalyzer<C>,
    frames: u64,
}

impl MotionPipeline<SystemClock> {
    pub fn new(config: MotusConfig) -> MotusResult<Self> {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: MonotonicClock + Clone> MotionPipeline<C> {
    pub fn with_clock(config: MotusConfig, clock: C) -> MotusResult<Self> {
        config.validate()?;
        Ok(Self {
            velocity: VelocityTracker::new(config.velocity.clone())?,
            phase: PhaseAnalyzer::with_clock(config.phase.clone(), clock.clone())?,
            prediction: AnglePredictionEngine::with_clock(config.predict.clone(), clock.clone())?,
            coordination: CoordinationAnalyzer::with_clock(config.coord.clone(), clock.clone())?,
            config,
            clock,
            frames: 0,
        })
    }

    /// Replace the warning text catalog
    pub fn set_message_catalog(&mut self, catalog: MessageCatalog) {
        self.prediction.set_message_catalog(catalog);
    }

    /// Run every analyzer on one frame
    pub fn process(&mut self, input: &FrameInput) -> FrameReport {
        let timestamp = input.timestamp;
        let scale = self.config.pipeline.position_scale;
        let phase_joint = self.config.pipeline.phase_joint;

        let previous_phase_sample = self.velocity.latest(phase_joint);

        let velocities: Vec<JointVelocityData> = input
            .keypoints
            .iter()
            .map(|(joint, keypoint)| {
                let position = scaled(keypoint.position, scale);
                self.velocity
                    .update_position(joint, position, timestamp, keypoint.confidence)
            })
            .collect();

        let phase_velocity = velocities.iter().find(|v| v.joint == phase_joint);
        if let (Some(velocity), Some(previous)) = (phase_velocity, previous_phase_sample) {
            if let Some(current) = self.velocity.latest(phase_joint) {
                self.phase
                    .analyze_phase(velocity, previous.position.y, current.position.y);
            }
        }

        let prediction = if input.angles.is_empty() {
            let derived = joint_angles(&input.keypoints, self.config.pipeline.angle_min_confidence);
            self.prediction.predict(&derived, timestamp)
        } else {
            self.prediction.predict(&input.angles, timestamp)
        };

        let coordination = self.coordination.analyze(&input.keypoints, timestamp);

        self.frames += 1;

        FrameReport {
            timestamp,
            velocities,
            phase: self.phase.snapshot(),
            prediction,
            coordination,
        }
    }

    /// Warnings that have not expired yet
    pub fn active_warnings(&self) -> Vec<PredictiveWarning> {
        self.prediction.active_warnings()
    }

    /// Frames processed since construction or the last reset
    pub fn frames_processed(&self) -> u64 {
        self.frames
    }

    pub fn velocity_tracker(&self) -> &VelocityTracker {
        &self.velocity
    }

    pub fn phase_analyzer(&self) -> &PhaseAnalyzer<C> {
        &self.phase
    }

    pub fn prediction_engine(&self) -> &AnglePredictionEngine<C> {
        &self.prediction
    }

    pub fn coordination_analyzer(&self) -> &CoordinationAnalyzer<C> {
        &self.coordination
    }

    pub fn config(&self) -> &MotusConfig {
        &self.config
    }

    /// Return every analyzer to its freshly constructed state.
    ///
    /// The coordination analyzer has no reset of its own and is rebuilt.
    pub fn reset(&mut self) -> MotusResult<()> {
        self.coordination =
            CoordinationAnalyzer::with_clock(self.config.coord.clone(), self.clock.clone())?;
        self.velocity.reset();
        self.phase.reset();
        self.prediction.reset();
        self.frames = 0;
        debug!("motion pipeline reset");
        Ok(())
    }
}

fn scaled(position: Position3D, scale: f64) -> Position3D {
    Position3D::new(position.x * scale, position.y * scale, position.z * scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use motus_core::Keypoint;
    use motus_motion::MovementPhase;
    use motus_time::ManualClock;

    fn pipeline() -> MotionPipeline<ManualClock> {
        MotionPipeline::with_clock(MotusConfig::default(), ManualClock::default()).unwrap()
    }

    /// Pixel-space body with the hips `drop` pixels below standing
    fn body(drop: f64, confidence: f64) -> KeypointSet {
        let kp = |x: f64, y: f64| Keypoint::new(Position3D::planar(x, y), confidence);
        KeypointSet::new()
            .with(Joint::LeftShoulder, kp(280.0, 100.0 + drop))
            .with(Joint::RightShoulder, kp(360.0, 100.0 + drop))
            .with(Joint::LeftHip, kp(290.0, 250.0 + drop))
            .with(Joint::RightHip, kp(350.0, 250.0 + drop))
            .with(Joint::LeftKnee, kp(300.0 - drop * 0.5, 380.0))
            .with(Joint::RightKnee, kp(340.0 + drop * 0.5, 380.0))
            .with(Joint::LeftAnkle, kp(295.0, 500.0))
            .with(Joint::RightAnkle, kp(345.0, 500.0))
    }

    #[test]
    fn test_single_frame() {
        let mut pipeline = pipeline();
        let report = pipeline.process(&FrameInput::new(FrameTime::ZERO, body(0.0, 0.9)));

        assert_eq!(report.velocities.len(), 8);
        assert!(report.velocities.iter().all(|v| !v.is_valid));
        assert_eq!(report.phase.phase, MovementPhase::Isometric);
        // Knees, hips and torso; elbow and shoulder angles need elbows
        assert_eq!(report.prediction.predictions.len(), 5);
        assert!(report.coordination.is_valid);
        assert_eq!(pipeline.frames_processed(), 1);
    }

    #[test]
    fn test_descent_turns_eccentric() {
        let mut pipeline = pipeline();
        for i in 0..8 {
            let t = FrameTime::from_millis(i * 33);
            let report = pipeline.process(&FrameInput::new(t, body(i as f64 * 5.0, 0.9)));
            if i > 0 {
                let hip = report.velocity(Joint::LeftHip).unwrap();
                assert!(hip.is_valid);
            }
        }
        assert_eq!(
            pipeline.phase_analyzer().current_phase(),
            MovementPhase::Eccentric
        );
    }

    #[test]
    fn test_provided_angles_take_precedence() {
        let mut pipeline = pipeline();
        let input = FrameInput::new(FrameTime::ZERO, KeypointSet::new())
            .with_angles(vec![(AngleId::LeftElbow, 90.0)]);
        let report = pipeline.process(&input);

        assert_eq!(report.prediction.predictions.len(), 1);
        assert_eq!(report.prediction.predictions[0].angle, AngleId::LeftElbow);
        assert!(report.velocities.is_empty());
        assert!(!report.coordination.is_valid);
    }

    #[test]
    fn test_low_confidence_frame() {
        let mut pipeline = pipeline();
        let report = pipeline.process(&FrameInput::new(FrameTime::ZERO, body(0.0, 0.2)));

        assert!(report.velocities.iter().all(|v| !v.is_valid));
        assert!(report.prediction.predictions.is_empty());
        assert!(!report.coordination.is_valid);
        assert_eq!(pipeline.velocity_tracker().history_len(Joint::LeftHip), 0);
    }

    #[test]
    fn test_reset_matches_fresh() {
        let mut pipeline = pipeline();
        for i in 0..10 {
            pipeline.process(&FrameInput::new(
                FrameTime::from_millis(i * 33),
                body(i as f64 * 5.0, 0.9),
            ));
        }
        pipeline.reset().unwrap();

        assert_eq!(pipeline.frames_processed(), 0);
        assert_eq!(pipeline.velocity_tracker().history_len(Joint::LeftHip), 0);
        assert_eq!(
            pipeline.phase_analyzer().current_phase(),
            MovementPhase::Isometric
        );
        assert_eq!(pipeline.prediction_engine().history_len(AngleId::LeftKnee), 0);
        assert_eq!(pipeline.coordination_analyzer().history_len(), 0);
        assert!(pipeline.active_warnings().is_empty());
    }

    #[test]
    fn test_report_serializes() {
        let mut pipeline = pipeline();
        let report = pipeline.process(&FrameInput::new(FrameTime::ZERO, body(0.0, 0.9)));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["phase"]["phase"], "isometric");
        assert_eq!(json["coordination"]["is_valid"], true);
    }
}
