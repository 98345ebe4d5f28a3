//! Coordination Analyzer
//!
//! One call per frame. Angles are computed from the keypoints, differentiated
//! against the previous frame, and scored. Histories are pushed only after
//! scoring so derivatives never see the current frame twice.

use std::time::Duration;

use motus_core::{
    agreement, three_point_angle, trunk_inclination, FrameTime, Joint, KeypointSet, MotusResult,
    Position3D, RingBuffer,
};
use motus_time::{BudgetStats, FrameBudget, MonotonicClock, SystemClock};
use serde::Serialize;
use tracing::{debug, trace};

use crate::{
    classify_pattern, coordination_score, flexion_ratio, ratio_deviation, side_score,
    timing_mismatch, CoordinationConfig, CoordinationPattern, RatioRange, TimingMismatch,
};

/// Keypoints a frame must carry to be analyzed, in left/right pairs from
/// the shoulders down
pub const REQUIRED_JOINTS: [Joint; 8] = [
    Joint::LeftShoulder,
    Joint::RightShoulder,
    Joint::LeftHip,
    Joint::RightHip,
    Joint::LeftKnee,
    Joint::RightKnee,
    Joint::LeftAnkle,
    Joint::RightAnkle,
];

/// One angle measured on both sides
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SidePair {
    pub left: f64,
    pub right: f64,
}

impl SidePair {
    pub fn new(left: f64, right: f64) -> Self {
        Self { left, right }
    }

    pub fn average(&self) -> f64 {
        (self.left + self.right) / 2.0
    }
}

/// The angles coordination is computed from (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CoordinationAngles {
    /// Knee angle (hip-knee-ankle)
    pub primary: SidePair,
    /// Hip angle (shoulder-hip-knee)
    pub secondary: SidePair,
    /// Trunk inclination from vertical
    pub trunk: f64,
}

impl CoordinationAngles {
    /// Angles from a keypoint set, or `None` if a required keypoint is
    /// missing or below `min_confidence`
    pub fn from_keypoints(keypoints: &KeypointSet, min_confidence: f64) -> Option<Self> {
        let mut points = [Position3D::zero(); REQUIRED_JOINTS.len()];
        for (point, joint) in points.iter_mut().zip(REQUIRED_JOINTS) {
            *point = keypoints.confident(joint, min_confidence)?;
        }
        let [ls, rs, lh, rh, lk, rk, la, ra] = points;

        Some(Self {
            primary: SidePair::new(three_point_angle(lh, lk, la), three_point_angle(rh, rk, ra)),
            secondary: SidePair::new(three_point_angle(ls, lh, lk), three_point_angle(rs, rh, rk)),
            trunk: trunk_inclination(ls.midpoint(&rs), lh.midpoint(&rh)),
        })
    }
}

/// Per-side scores
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BilateralScores {
    pub left_score: f64,
    pub right_score: f64,
    /// |left − right|
    pub asymmetry: f64,
}

/// Angular velocities derived for this frame (deg/s)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CoordinationVelocities {
    pub primary: f64,
    pub secondary: f64,
    pub trunk: f64,
}

/// Coordination assessment for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoordinationResult {
    pub timestamp: FrameTime,
    pub angles: CoordinationAngles,
    pub velocities: CoordinationVelocities,
    pub ratio: f64,
    pub optimal_ratio_range: RatioRange,
    /// Normalized distance outside the optimal range, in [0, 1]
    pub ratio_deviation: f64,
    pub timing: TimingMismatch,
    pub pattern: CoordinationPattern,
    pub pattern_confidence: f64,
    /// Share of recent pattern votes agreeing with this frame's pattern
    pub pattern_consistency: f64,
    /// Composite score in [0, 100]
    pub coordination_score: f64,
    pub bilateral: BilateralScores,
    pub is_valid: bool,
    pub elapsed_us: u64,
}

impl CoordinationResult {
    /// Neutral result for a frame that could not be analyzed
    pub fn invalid(timestamp: FrameTime, optimal_ratio_range: RatioRange) -> Self {
        Self {
            timestamp,
            angles: CoordinationAngles::default(),
            velocities: CoordinationVelocities::default(),
            ratio: 0.0,
            optimal_ratio_range,
            ratio_deviation: 0.0,
            timing: TimingMismatch::default(),
            pattern: CoordinationPattern::Synchronized,
            pattern_confidence: 0.0,
            pattern_consistency: 0.0,
            coordination_score: 0.0,
            bilateral: BilateralScores::default(),
            is_valid: false,
            elapsed_us: 0,
        }
    }
}

/// Knee/hip coordination analyzer
#[derive(Debug)]
pub struct CoordinationAnalyzer<C: MonotonicClock = SystemClock> {
    config: CoordinationConfig,
    clock: C,
    optimal_ratio: RatioRange,
    primary_angles: RingBuffer<SidePair>,
    secondary_angles: RingBuffer<SidePair>,
    trunk_angles: RingBuffer<f64>,
    primary_velocities: RingBuffer<f64>,
    secondary_velocities: RingBuffer<f64>,
    pattern_votes: RingBuffer<CoordinationPattern>,
    previous_timestamp: Option<FrameTime>,
    budget: FrameBudget,
}

impl CoordinationAnalyzer<SystemClock> {
    pub fn new(config: CoordinationConfig) -> MotusResult<Self> {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: MonotonicClock> CoordinationAnalyzer<C> {
    pub fn with_clock(config: CoordinationConfig, clock: C) -> MotusResult<Self> {
        config.validate()?;
        Ok(Self {
            optimal_ratio: config.optimal_ratio(),
            primary_angles: RingBuffer::new(config.angle_history)?,
            secondary_angles: RingBuffer::new(config.angle_history)?,
            trunk_angles: RingBuffer::new(config.angle_history)?,
            primary_velocities: RingBuffer::new(config.velocity_history)?,
            secondary_velocities: RingBuffer::new(config.velocity_history)?,
            pattern_votes: RingBuffer::new(config.pattern_window)?,
            previous_timestamp: None,
            budget: FrameBudget::new("coordination", Duration::from_micros(config.budget_us)),
            config,
            clock,
        })
    }

    /// Analyze one frame of keypoints.
    ///
    /// A frame missing any required keypoint, or carrying one below the
    /// confidence minimum, yields an invalid result and leaves state as is.
    pub fn analyze(&mut self, keypoints: &KeypointSet, timestamp: FrameTime) -> CoordinationResult {
        match CoordinationAngles::from_keypoints(keypoints, self.config.min_confidence) {
            Some(angles) => self.analyze_angles(angles, timestamp),
            None => {
                debug!(timestamp = ?timestamp, "coordination frame rejected: missing keypoints");
                CoordinationResult::invalid(timestamp, self.optimal_ratio)
            }
        }
    }

    /// Analyze one frame of precomputed angles
    pub fn analyze_angles(
        &mut self,
        angles: CoordinationAngles,
        timestamp: FrameTime,
    ) -> CoordinationResult {
        let finite = [
            angles.primary.left,
            angles.primary.right,
            angles.secondary.left,
            angles.secondary.right,
            angles.trunk,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            debug!(timestamp = ?timestamp, "coordination frame rejected: non-finite angle");
            return CoordinationResult::invalid(timestamp, self.optimal_ratio);
        }

        let started = self.clock.now();
        let config = &self.config;

        let primary = angles.primary.average();
        let secondary = angles.secondary.average();

        let dt = match self.previous_timestamp {
            Some(previous) if timestamp > previous => timestamp.secs_since(previous),
            _ => config.default_dt_secs(),
        };
        let rate = |current: f64, previous: Option<f64>| previous.map_or(0.0, |p| (current - p) / dt);
        let velocities = CoordinationVelocities {
            primary: rate(primary, self.primary_angles.peek().map(SidePair::average)),
            secondary: rate(secondary, self.secondary_angles.peek().map(SidePair::average)),
            trunk: rate(angles.trunk, self.trunk_angles.peek().copied()),
        };

        let ratio = flexion_ratio(primary, secondary, config.ratio_epsilon);
        let deviation = ratio_deviation(ratio, &self.optimal_ratio);
        let timing = timing_mismatch(
            primary,
            secondary,
            velocities.primary,
            velocities.secondary,
            config,
        );
        let pattern = classify_pattern(&timing, ratio, &self.optimal_ratio, velocities.trunk, config);

        self.pattern_votes.push(pattern);
        let consistency = if self.pattern_votes.len() < config.min_pattern_votes {
            1.0
        } else {
            agreement(self.pattern_votes.iter().copied(), pattern).unwrap_or(1.0)
        };

        let score = coordination_score(
            deviation,
            timing.lag_degrees,
            consistency,
            &config.weights,
            config.timing_penalty_per_deg,
        );

        let left_score = side_score(angles.primary.left, angles.secondary.left, consistency, config);
        let right_score = side_score(angles.primary.right, angles.secondary.right, consistency, config);
        let bilateral = BilateralScores {
            left_score,
            right_score,
            asymmetry: (left_score - right_score).abs(),
        };

        self.primary_angles.push(angles.primary);
        self.secondary_angles.push(angles.secondary);
        self.trunk_angles.push(angles.trunk);
        self.primary_velocities.push(velocities.primary);
        self.secondary_velocities.push(velocities.secondary);
        self.previous_timestamp = Some(timestamp);

        trace!(
            ratio,
            deviation,
            lag = timing.lag_degrees,
            pattern = ?pattern,
            score,
            asymmetry = bilateral.asymmetry,
            "coordination frame"
        );

        let elapsed = self.clock.now() - started;
        self.budget.record(elapsed);

        CoordinationResult {
            timestamp,
            angles,
            velocities,
            ratio,
            optimal_ratio_range: self.optimal_ratio,
            ratio_deviation: deviation,
            timing,
            pattern,
            pattern_confidence: pattern.confidence(&self.config.pattern_confidences),
            pattern_consistency: consistency,
            coordination_score: score,
            bilateral,
            is_valid: true,
            elapsed_us: elapsed.as_micros() as u64,
        }
    }

    /// Frames analyzed, up to the angle history capacity
    pub fn history_len(&self) -> usize {
        self.primary_angles.len()
    }

    /// Recent primary and secondary velocities, oldest first
    pub fn recent_velocities(&self) -> (Vec<f64>, Vec<f64>) {
        (
            self.primary_velocities.latest(None),
            self.secondary_velocities.latest(None),
        )
    }

    pub fn optimal_ratio(&self) -> RatioRange {
        self.optimal_ratio
    }

    pub fn budget_stats(&self) -> BudgetStats {
        self.budget.stats()
    }

    pub fn config(&self) -> &CoordinationConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motus_core::{Keypoint, Position3D};
    use motus_time::ManualClock;
    use proptest::prelude::*;

    use crate::{LagDirection, LeadingJoint, MovementType};

    fn analyzer() -> CoordinationAnalyzer<ManualClock> {
        CoordinationAnalyzer::with_clock(CoordinationConfig::default(), ManualClock::default())
            .unwrap()
    }

    fn symmetric(primary: f64, secondary: f64, trunk: f64) -> CoordinationAngles {
        CoordinationAngles {
            primary: SidePair::new(primary, primary),
            secondary: SidePair::new(secondary, secondary),
            trunk,
        }
    }

    fn standing_pose(confidence: f64) -> KeypointSet {
        let kp = |x, y| Keypoint::new(Position3D::planar(x, y), confidence);
        KeypointSet::new()
            .with(Joint::LeftShoulder, kp(0.4, 0.2))
            .with(Joint::RightShoulder, kp(0.6, 0.2))
            .with(Joint::LeftHip, kp(0.4, 0.5))
            .with(Joint::RightHip, kp(0.6, 0.5))
            .with(Joint::LeftKnee, kp(0.45, 0.7))
            .with(Joint::RightKnee, kp(0.55, 0.7))
            .with(Joint::LeftAnkle, kp(0.4, 0.9))
            .with(Joint::RightAnkle, kp(0.6, 0.9))
    }

    #[test]
    fn test_synchronized_in_range() {
        let mut analyzer = analyzer();
        let result = analyzer.analyze_angles(symmetric(100.0, 100.0, 10.0), FrameTime::ZERO);

        assert!(result.is_valid);
        assert!((result.ratio - 1.0).abs() < 1e-12);
        assert_eq!(result.ratio_deviation, 0.0);
        assert_eq!(result.pattern, CoordinationPattern::Synchronized);
        assert_eq!(result.pattern_confidence, 0.95);
        assert!(result.coordination_score >= 80.0);
        assert_eq!(result.bilateral.asymmetry, 0.0);
    }

    #[test]
    fn test_missing_keypoint_leaves_state() {
        let mut analyzer = analyzer();
        let mut pose = standing_pose(0.9);
        pose.remove(Joint::RightAnkle);

        let result = analyzer.analyze(&pose, FrameTime::from_millis(10));
        assert!(!result.is_valid);
        assert_eq!(result.ratio, 0.0);
        assert_eq!(result.coordination_score, 0.0);
        assert_eq!(result.pattern, CoordinationPattern::Synchronized);
        assert_eq!(analyzer.history_len(), 0);
        assert_eq!(analyzer.budget_stats().calls, 0);
    }

    #[test]
    fn test_low_confidence_rejected() {
        let mut analyzer = analyzer();
        for joint in REQUIRED_JOINTS {
            assert!(standing_pose(0.9).confident(joint, 0.5).is_some());
            assert!(standing_pose(0.3).confident(joint, 0.5).is_none());
        }

        let result = analyzer.analyze(&standing_pose(0.3), FrameTime::ZERO);
        assert!(!result.is_valid);

        let result = analyzer.analyze(&standing_pose(0.9), FrameTime::ZERO);
        assert!(result.is_valid);
        assert_eq!(analyzer.history_len(), 1);
    }

    #[test]
    fn test_mirrored_pose_is_symmetric() {
        let mut analyzer = analyzer();
        let result = analyzer.analyze(&standing_pose(0.9), FrameTime::ZERO);

        assert!(result.is_valid);
        assert!((result.angles.primary.left - result.angles.primary.right).abs() < 1e-9);
        assert!(result.bilateral.asymmetry < 1e-9);
        assert!(result.angles.trunk.abs() < 1e-9);
    }

    #[test]
    fn test_velocities_use_previous_frame() {
        let mut analyzer = analyzer();
        let first = analyzer.analyze_angles(symmetric(160.0, 160.0, 5.0), FrameTime::ZERO);
        assert_eq!(first.velocities, CoordinationVelocities::default());

        let second =
            analyzer.analyze_angles(symmetric(150.0, 155.0, 5.0), FrameTime::from_millis(100));
        assert!((second.velocities.primary + 100.0).abs() < 1e-9);
        assert!((second.velocities.secondary + 50.0).abs() < 1e-9);
        assert_eq!(second.velocities.trunk, 0.0);
        assert_eq!(second.timing.leading_joint, LeadingJoint::Primary);
        assert_eq!(second.timing.lag_direction, LagDirection::Synced);

        let (primary, secondary) = analyzer.recent_velocities();
        assert_eq!(primary.len(), 2);
        assert_eq!(secondary.len(), 2);
    }

    #[test]
    fn test_repeated_timestamp_uses_default_dt() {
        let mut analyzer = analyzer();
        analyzer.analyze_angles(symmetric(160.0, 160.0, 5.0), FrameTime::from_millis(100));
        let result =
            analyzer.analyze_angles(symmetric(156.7, 160.0, 5.0), FrameTime::from_millis(100));
        // 3.3 degrees over the default 33 ms
        assert!((result.velocities.primary + 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_compensation() {
        let mut analyzer = analyzer();
        analyzer.analyze_angles(symmetric(140.0, 150.0, 10.0), FrameTime::ZERO);
        let result =
            analyzer.analyze_angles(symmetric(100.0, 140.0, 20.0), FrameTime::from_millis(100));

        assert!(result.timing.is_significant);
        assert_eq!(result.pattern, CoordinationPattern::Compensating);
        assert_eq!(result.pattern_confidence, 0.70);
    }

    #[test]
    fn test_consistency_after_min_votes() {
        let mut analyzer = analyzer();
        for i in 0..4 {
            let r = analyzer.analyze_angles(symmetric(100.0, 100.0, 10.0), FrameTime::from_millis(i * 33));
            assert_eq!(r.pattern_consistency, 1.0);
        }
        // Fifth vote differs from the four before it
        let r = analyzer.analyze_angles(symmetric(100.0, 160.0, 10.0), FrameTime::from_millis(132));
        assert_ne!(r.pattern, CoordinationPattern::Synchronized);
        assert!((r.pattern_consistency - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_asymmetric_sides() {
        let mut analyzer = analyzer();
        let angles = CoordinationAngles {
            primary: SidePair::new(100.0, 130.0),
            secondary: SidePair::new(100.0, 100.0),
            trunk: 10.0,
        };
        let result = analyzer.analyze_angles(angles, FrameTime::ZERO);
        assert!(result.bilateral.left_score > result.bilateral.right_score);
        assert!(result.bilateral.asymmetry > 10.0);
    }

    #[test]
    fn test_movement_preset() {
        let analyzer = CoordinationAnalyzer::with_clock(
            CoordinationConfig::for_movement(MovementType::Deadlift),
            ManualClock::default(),
        )
        .unwrap();
        assert_eq!(analyzer.optimal_ratio(), RatioRange::new(0.3, 0.7));
    }

    #[test]
    fn test_budget_overrun_is_diagnostic() {
        let clock = ManualClock::with_step(FrameTime::ZERO, Duration::from_millis(3));
        let mut analyzer =
            CoordinationAnalyzer::with_clock(CoordinationConfig::default(), clock).unwrap();
        let result = analyzer.analyze_angles(symmetric(100.0, 100.0, 10.0), FrameTime::ZERO);

        assert!(result.is_valid);
        assert_eq!(result.elapsed_us, 3000);
        assert_eq!(analyzer.budget_stats().overruns, 1);
    }

    proptest! {
        #[test]
        fn prop_scores_bounded(
            frames in prop::collection::vec((0.0f64..180.0, 0.0f64..180.0, 0.0f64..90.0, 0i64..50), 1..30)
        ) {
            let mut analyzer = analyzer();
            let mut t = 0i64;
            for (primary, secondary, trunk, dt) in frames {
                t += dt;
                let r = analyzer.analyze_angles(symmetric(primary, secondary, trunk), FrameTime::from_millis(t));
                prop_assert!(r.is_valid);
                prop_assert!((0.0..=100.0).contains(&r.coordination_score));
                prop_assert!((0.0..=1.0).contains(&r.ratio_deviation));
                prop_assert!(r.ratio.is_finite());
                prop_assert!(r.bilateral.asymmetry.abs() < 1e-9);
            }
        }
    }
}
