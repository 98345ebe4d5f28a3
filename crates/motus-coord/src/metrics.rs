//! Pure coordination metrics
//!
//! The primary joint is the knee (hip-knee-ankle angle) and the secondary
//! joint is the hip (shoulder-hip-knee angle). Both read 180° when straight.

use serde::{Deserialize, Serialize};

use crate::{CoordinationConfig, PatternConfidences, RatioRange, ScoreWeights};

/// Which driving joint is moving faster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadingJoint {
    Primary,
    Secondary,
    #[default]
    Synchronized,
}

/// Whether the primary joint is ahead of (moving faster than) or behind
/// the secondary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LagDirection {
    Early,
    Late,
    #[default]
    Synced,
}

/// Qualitative movement pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinationPattern {
    #[default]
    Synchronized,
    PrimaryJointDominant,
    SecondaryJointDominant,
    /// Trunk movement is making up for a timing problem
    Compensating,
}

impl CoordinationPattern {
    pub fn confidence(self, confidences: &PatternConfidences) -> f64 {
        match self {
            CoordinationPattern::Synchronized => confidences.synchronized,
            CoordinationPattern::PrimaryJointDominant => confidences.primary_dominant,
            CoordinationPattern::SecondaryJointDominant => confidences.secondary_dominant,
            CoordinationPattern::Compensating => confidences.compensating,
        }
    }
}

/// Timing relationship between the two driving joints
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimingMismatch {
    pub leading_joint: LeadingJoint,
    /// |primary angle − secondary angle| in degrees
    pub lag_degrees: f64,
    pub lag_direction: LagDirection,
    pub is_significant: bool,
    pub is_severe: bool,
}

/// Flexion ratio (180 − primary) / (180 − secondary).
///
/// Returns 0 when the secondary joint is within `epsilon` of straight.
pub fn flexion_ratio(primary: f64, secondary: f64, epsilon: f64) -> f64 {
    let denominator = 180.0 - secondary;
    if denominator.abs() < epsilon {
        return 0.0;
    }
    (180.0 - primary) / denominator
}

/// Normalized distance of `ratio` outside `range`, in [0, 1]; 0 inside
pub fn ratio_deviation(ratio: f64, range: &RatioRange) -> f64 {
    let deviation = if ratio < range.min {
        (range.min - ratio) / range.min
    } else if ratio > range.max {
        (ratio - range.max) / range.max
    } else {
        0.0
    };
    if deviation.is_finite() {
        deviation.clamp(0.0, 1.0)
    } else {
        1.0
    }
}

/// Compare the driving joints' angles and angular velocities
pub fn timing_mismatch(
    primary_angle: f64,
    secondary_angle: f64,
    primary_velocity: f64,
    secondary_velocity: f64,
    config: &CoordinationConfig,
) -> TimingMismatch {
    let speed_gap = primary_velocity.abs() - secondary_velocity.abs();
    let leading_joint = if speed_gap > config.leading_velocity_gap {
        LeadingJoint::Primary
    } else if -speed_gap > config.leading_velocity_gap {
        LeadingJoint::Secondary
    } else {
        LeadingJoint::Synchronized
    };

    let lag_degrees = (primary_angle - secondary_angle).abs();
    let lag_direction = if lag_degrees <= config.synced_lag_deg {
        LagDirection::Synced
    } else if speed_gap > 0.0 {
        LagDirection::Early
    } else {
        LagDirection::Late
    };

    TimingMismatch {
        leading_joint,
        lag_degrees,
        lag_direction,
        is_significant: lag_degrees > config.significant_lag_deg,
        is_severe: lag_degrees > config.severe_lag_deg,
    }
}

/// Classify the frame's movement pattern
pub fn classify_pattern(
    timing: &TimingMismatch,
    ratio: f64,
    range: &RatioRange,
    trunk_velocity: f64,
    config: &CoordinationConfig,
) -> CoordinationPattern {
    if trunk_velocity.abs() > config.compensation_velocity && timing.is_significant {
        return CoordinationPattern::Compensating;
    }
    if !timing.is_significant && range.contains(ratio) {
        return CoordinationPattern::Synchronized;
    }
    match timing.leading_joint {
        LeadingJoint::Primary => CoordinationPattern::PrimaryJointDominant,
        LeadingJoint::Secondary => CoordinationPattern::SecondaryJointDominant,
        // No clear leader: a high ratio means the primary joint flexed more
        LeadingJoint::Synchronized if ratio > range.max => {
            CoordinationPattern::PrimaryJointDominant
        }
        LeadingJoint::Synchronized => CoordinationPattern::SecondaryJointDominant,
    }
}

/// Composite score in [0, 100]
pub fn coordination_score(
    deviation: f64,
    lag_degrees: f64,
    consistency: f64,
    weights: &ScoreWeights,
    penalty_per_deg: f64,
) -> f64 {
    let ratio_score = (100.0 - deviation * 100.0).max(0.0);
    let timing_score = (100.0 - lag_degrees * penalty_per_deg).max(0.0);

    let score = 100.0
        * (ratio_score / 100.0 * weights.ratio
            + timing_score / 100.0 * weights.timing
            + consistency * weights.consistency);
    score.clamp(0.0, 100.0)
}

/// Score for one side from that side's primary and secondary angles
pub fn side_score(primary: f64, secondary: f64, consistency: f64, config: &CoordinationConfig) -> f64 {
    let ratio = flexion_ratio(primary, secondary, config.ratio_epsilon);
    let deviation = ratio_deviation(ratio, &config.optimal_ratio());
    coordination_score(
        deviation,
        (primary - secondary).abs(),
        consistency,
        &config.weights,
        config.timing_penalty_per_deg,
    )
}
