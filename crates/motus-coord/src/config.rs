//! Coordination analyzer configuration and movement presets

use motus_core::{ensure_positive, ensure_range, MotusError, MotusResult};
use serde::{Deserialize, Serialize};

/// Movement being performed; selects the optimal ratio preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    #[default]
    Squat,
    Deadlift,
    Lunge,
    Generic,
}

impl MovementType {
    /// Optimal knee-to-hip flexion ratio for this movement
    pub fn optimal_ratio(self) -> RatioRange {
        match self {
            // Knee and hip flex roughly together
            MovementType::Squat => RatioRange::new(0.8, 1.5),
            // Hip hinge dominates
            MovementType::Deadlift => RatioRange::new(0.3, 0.7),
            MovementType::Lunge => RatioRange::new(0.9, 1.6),
            MovementType::Generic => RatioRange::new(0.5, 2.0),
        }
    }
}

/// Closed range of acceptable flexion ratios
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioRange {
    pub min: f64,
    pub max: f64,
}

impl RatioRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, ratio: f64) -> bool {
        ratio >= self.min && ratio <= self.max
    }
}

/// Fixed confidence reported with each pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfidences {
    pub synchronized: f64,
    pub primary_dominant: f64,
    pub secondary_dominant: f64,
    pub compensating: f64,
}

impl Default for PatternConfidences {
    fn default() -> Self {
        Self {
            synchronized: 0.95,
            primary_dominant: 0.85,
            secondary_dominant: 0.80,
            compensating: 0.70,
        }
    }
}

/// Weights of the composite score components; they sum to 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub ratio: f64,
    pub timing: f64,
    pub consistency: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            ratio: 0.40,
            timing: 0.35,
            consistency: 0.25,
        }
    }
}

/// Coordination analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// Selects the optimal ratio preset
    pub movement_type: MovementType,

    /// Replaces the preset ratio range when set
    pub ratio_override: Option<RatioRange>,

    /// Minimum keypoint confidence for a frame to be analyzed
    pub min_confidence: f64,

    /// Frame interval assumed when there is no previous frame (ms)
    pub default_dt_ms: u32,

    /// Velocity magnitude advantage (deg/s) that makes a joint the leader
    pub leading_velocity_gap: f64,

    /// Angle gap (degrees) at or below which the joints count as synced
    pub synced_lag_deg: f64,

    /// Angle gap (degrees) above which the timing mismatch is significant
    pub significant_lag_deg: f64,

    /// Angle gap (degrees) above which the timing mismatch is severe
    pub severe_lag_deg: f64,

    /// Trunk angular speed (deg/s) that indicates compensation
    pub compensation_velocity: f64,

    /// Timing score lost per degree of lag
    pub timing_penalty_per_deg: f64,

    pub pattern_confidences: PatternConfidences,

    pub weights: ScoreWeights,

    /// Pattern votes kept for the consistency measure
    pub pattern_window: usize,

    /// Votes required before consistency is measured instead of assumed
    pub min_pattern_votes: usize,

    /// Angle samples kept per joint
    pub angle_history: usize,

    /// Velocity samples kept per driving joint
    pub velocity_history: usize,

    /// Distance of the secondary angle from 180° below which the ratio is 0
    pub ratio_epsilon: f64,

    /// Advisory per-call budget in microseconds
    pub budget_us: u64,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            movement_type: MovementType::default(),
            ratio_override: None,
            min_confidence: 0.5,
            default_dt_ms: 33,
            leading_velocity_gap: 20.0,
            synced_lag_deg: 10.0,
            significant_lag_deg: 15.0,
            severe_lag_deg: 25.0,
            compensation_velocity: 30.0,
            timing_penalty_per_deg: 2.0,
            pattern_confidences: PatternConfidences::default(),
            weights: ScoreWeights::default(),
            pattern_window: 10,
            min_pattern_votes: 5,
            angle_history: 30,
            velocity_history: 5,
            ratio_epsilon: 1e-6,
            budget_us: 2000,
        }
    }
}

impl CoordinationConfig {
    /// Config for a movement with its preset ratio range
    pub fn for_movement(movement_type: MovementType) -> Self {
        Self {
            movement_type,
            ..Self::default()
        }
    }

    /// Ratio range in effect: the override if set, else the preset
    pub fn optimal_ratio(&self) -> RatioRange {
        self.ratio_override
            .unwrap_or_else(|| self.movement_type.optimal_ratio())
    }

    pub fn default_dt_secs(&self) -> f64 {
        self.default_dt_ms as f64 / 1000.0
    }

    pub fn validate(&self) -> MotusResult<()> {
        let range = self.optimal_ratio();
        if !(range.min > 0.0 && range.min <= range.max && range.max.is_finite()) {
            return Err(MotusError::config(format!(
                "coord.optimal_ratio must satisfy 0 < min <= max: {range:?}"
            )));
        }
        ensure_range("coord.min_confidence", self.min_confidence, 0.0, 1.0)?;
        if self.default_dt_ms == 0 {
            return Err(MotusError::config("coord.default_dt_ms must be > 0"));
        }
        ensure_positive("coord.leading_velocity_gap", self.leading_velocity_gap)?;
        ensure_positive("coord.synced_lag_deg", self.synced_lag_deg)?;
        if !(self.synced_lag_deg <= self.significant_lag_deg
            && self.significant_lag_deg <= self.severe_lag_deg)
        {
            return Err(MotusError::config(
                "coord lag thresholds must be ordered synced <= significant <= severe",
            ));
        }
        ensure_positive("coord.compensation_velocity", self.compensation_velocity)?;
        ensure_positive("coord.timing_penalty_per_deg", self.timing_penalty_per_deg)?;

        let c = &self.pattern_confidences;
        for (field, value) in [
            ("coord.pattern_confidences.synchronized", c.synchronized),
            ("coord.pattern_confidences.primary_dominant", c.primary_dominant),
            ("coord.pattern_confidences.secondary_dominant", c.secondary_dominant),
            ("coord.pattern_confidences.compensating", c.compensating),
        ] {
            ensure_range(field, value, 0.0, 1.0)?;
        }

        let w = &self.weights;
        for (field, value) in [
            ("coord.weights.ratio", w.ratio),
            ("coord.weights.timing", w.timing),
            ("coord.weights.consistency", w.consistency),
        ] {
            ensure_range(field, value, 0.0, 1.0)?;
        }
        if ((w.ratio + w.timing + w.consistency) - 1.0).abs() > 1e-6 {
            return Err(MotusError::config("coord.weights must sum to 1"));
        }

        if self.pattern_window == 0 || self.angle_history == 0 || self.velocity_history == 0 {
            return Err(MotusError::config(
                "coord history capacities must be >= 1",
            ));
        }
        if self.min_pattern_votes > self.pattern_window {
            return Err(MotusError::config(
                "coord.min_pattern_votes must not exceed pattern_window",
            ));
        }
        ensure_positive("coord.ratio_epsilon", self.ratio_epsilon)?;
        Ok(())
    }
}
