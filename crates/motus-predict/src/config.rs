//! Prediction engine configuration

use std::collections::BTreeMap;

use motus_core::{ensure_positive, ensure_range, AngleId, MotusError, MotusResult};
use serde::{Deserialize, Serialize};

/// Closed interval in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Ideal and acceptable ranges for one angle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleRange {
    pub ideal: Bounds,
    pub acceptable: Bounds,
}

impl AngleRange {
    pub const fn new(ideal: Bounds, acceptable: Bounds) -> Self {
        Self { ideal, acceptable }
    }

    pub fn validate(&self, angle: AngleId) -> MotusResult<()> {
        let ok = [self.ideal, self.acceptable]
            .iter()
            .all(|b| b.min.is_finite() && b.max.is_finite() && b.min <= b.max)
            && self.acceptable.min <= self.ideal.min
            && self.ideal.max <= self.acceptable.max;
        if ok {
            Ok(())
        } else {
            Err(MotusError::config(format!(
                "range for {angle} must be ordered with ideal inside acceptable: {self:?}"
            )))
        }
    }
}

/// Default ranges (degrees) for a general lower/upper body exercise
pub fn default_ranges() -> BTreeMap<AngleId, AngleRange> {
    let knee = AngleRange::new(Bounds::new(70.0, 170.0), Bounds::new(60.0, 180.0));
    let hip = AngleRange::new(Bounds::new(70.0, 170.0), Bounds::new(50.0, 180.0));
    let elbow = AngleRange::new(Bounds::new(40.0, 170.0), Bounds::new(30.0, 180.0));
    let shoulder = AngleRange::new(Bounds::new(20.0, 160.0), Bounds::new(0.0, 175.0));
    let torso = AngleRange::new(Bounds::new(0.0, 30.0), Bounds::new(0.0, 45.0));

    BTreeMap::from([
        (AngleId::LeftKnee, knee),
        (AngleId::RightKnee, knee),
        (AngleId::LeftHip, hip),
        (AngleId::RightHip, hip),
        (AngleId::LeftElbow, elbow),
        (AngleId::RightElbow, elbow),
        (AngleId::LeftShoulder, shoulder),
        (AngleId::RightShoulder, shoulder),
        (AngleId::Torso, torso),
    ])
}

/// Prediction engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    /// Extrapolation horizon in milliseconds
    pub look_ahead_ms: u32,

    /// Minimum prediction confidence before thresholds are checked
    pub min_confidence: f64,

    /// Minimum gap between two warnings for the same angle and kind
    pub hysteresis_ms: u32,

    /// Samples required before a prediction is trusted (at least 2)
    pub min_samples: usize,

    /// Samples kept per angle
    pub history_capacity: usize,

    /// EMA weight of the newest angular velocity, in (0, 1]
    pub smoothing_alpha: f64,

    /// History length at which the history factor of confidence saturates
    pub confidence_saturation_samples: usize,

    /// Velocity change (deg/s) that maps to the full volatility penalty
    pub volatility_scale: f64,

    /// Largest confidence penalty for volatile velocity, in [0, 1]
    pub max_volatility_penalty: f64,

    /// Angle whose far-out crossings are errors rather than warnings
    pub error_angle: Option<AngleId>,

    /// Degrees beyond the acceptable bound that make a crossing an error
    pub error_margin_deg: f64,

    /// Warnings live this long after creation
    pub warning_ttl_ms: u32,

    /// Width of the time bucket used in warning ids
    pub warning_bucket_ms: u32,

    /// Time-to-threshold below which urgency is high
    pub urgency_high_ms: f64,

    /// Time-to-threshold below which urgency is medium
    pub urgency_medium_ms: f64,

    /// Advisory per-call budget in microseconds
    pub budget_us: u64,

    /// Ranges per angle; angles without a range are predicted but never warned
    pub ranges: BTreeMap<AngleId, AngleRange>,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            look_ahead_ms: 200,
            min_confidence: 0.5,
            hysteresis_ms: 1000,
            min_samples: 2,
            history_capacity: 30,
            smoothing_alpha: 0.3,
            confidence_saturation_samples: 10,
            volatility_scale: 100.0,
            max_volatility_penalty: 0.5,
            error_angle: Some(AngleId::Torso),
            error_margin_deg: 15.0,
            warning_ttl_ms: 1000,
            warning_bucket_ms: 500,
            urgency_high_ms: 150.0,
            urgency_medium_ms: 250.0,
            budget_us: 1000,
            ranges: default_ranges(),
        }
    }
}

impl PredictionConfig {
    pub fn look_ahead_secs(&self) -> f64 {
        self.look_ahead_ms as f64 / 1000.0
    }

    pub fn validate(&self) -> MotusResult<()> {
        if self.look_ahead_ms == 0 {
            return Err(MotusError::config("predict.look_ahead_ms must be > 0"));
        }
        ensure_range("predict.min_confidence", self.min_confidence, 0.0, 1.0)?;
        if self.min_samples < 2 || self.min_samples > self.history_capacity {
            return Err(MotusError::config(format!(
                "predict.min_samples = {} must be in [2, history_capacity = {}]",
                self.min_samples, self.history_capacity
            )));
        }
        ensure_positive("predict.smoothing_alpha", self.smoothing_alpha)?;
        ensure_range("predict.smoothing_alpha", self.smoothing_alpha, 0.0, 1.0)?;
        if self.confidence_saturation_samples == 0 {
            return Err(MotusError::config(
                "predict.confidence_saturation_samples must be > 0",
            ));
        }
        ensure_positive("predict.volatility_scale", self.volatility_scale)?;
        ensure_range(
            "predict.max_volatility_penalty",
            self.max_volatility_penalty,
            0.0,
            1.0,
        )?;
        ensure_range("predict.error_margin_deg", self.error_margin_deg, 0.0, 360.0)?;
        if self.warning_bucket_ms == 0 {
            return Err(MotusError::config("predict.warning_bucket_ms must be > 0"));
        }
        if !(self.urgency_high_ms <= self.urgency_medium_ms) {
            return Err(MotusError::config(
                "predict.urgency_high_ms must not exceed urgency_medium_ms",
            ));
        }
        for (angle, range) in &self.ranges {
            range.validate(*angle)?;
        }
        Ok(())
    }
}
