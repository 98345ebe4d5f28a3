//! Threshold crossing detection
//!
//! A crossing is reported only while the current value is still inside the
//! acceptable range and the predicted value is already outside it.

use std::fmt;

use motus_core::AngleId;
use serde::{Deserialize, Serialize};

use crate::{AngleRange, AnglePredictionData};

/// Severity of a crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    Warning,
    Error,
}

impl ThresholdKind {
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThresholdKind::Warning => "warning",
            ThresholdKind::Error => "error",
        }
    }
}

impl fmt::Display for ThresholdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which bound is being crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossingDirection {
    BelowMin,
    AboveMax,
}

/// Per-frame risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Good,
    Warning,
    Error,
}

impl From<ThresholdKind> for RiskLevel {
    fn from(kind: ThresholdKind) -> Self {
        match kind {
            ThresholdKind::Warning => RiskLevel::Warning,
            ThresholdKind::Error => RiskLevel::Error,
        }
    }
}

/// A predicted exit from an acceptable range
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdCrossing {
    pub angle: AngleId,
    pub direction: CrossingDirection,
    pub current_value: f64,
    pub predicted_value: f64,
    pub kind: ThresholdKind,
    pub threshold_value: f64,
    /// Milliseconds until the current trend reaches the threshold; +∞ when
    /// the angle is not moving toward it
    pub time_to_threshold_ms: f64,
    pub confidence: f64,
    pub risk_level: RiskLevel,
}

/// Time for `current` to reach `threshold` at `velocity` (deg/s), in ms.
///
/// Returns +∞ for near-zero velocity or when moving away from the threshold.
pub fn time_to_threshold_ms(threshold: f64, current: f64, velocity: f64) -> f64 {
    if velocity.abs() < 0.001 {
        return f64::INFINITY;
    }
    let ms = (threshold - current) / velocity * 1000.0;
    if ms < 0.0 || !ms.is_finite() {
        f64::INFINITY
    } else {
        ms
    }
}

/// Crossings of `range` implied by one prediction.
///
/// `error_margin` is set only for the designated error angle: a prediction
/// that overshoots the acceptable bound by more than the margin is an
/// error-kind crossing against the widened bound.
pub fn detect_crossings(
    prediction: &AnglePredictionData,
    range: &AngleRange,
    error_margin: Option<f64>,
) -> Vec<ThresholdCrossing> {
    let current = prediction.current_value;
    let predicted = prediction.predicted_value;
    let bounds = range.acceptable;
    let mut crossings = Vec::new();

    if current >= bounds.min && predicted < bounds.min {
        let (kind, threshold) = match error_margin {
            Some(margin) if predicted < bounds.min - margin => {
                (ThresholdKind::Error, bounds.min - margin)
            }
            _ => (ThresholdKind::Warning, bounds.min),
        };
        crossings.push(crossing(prediction, CrossingDirection::BelowMin, kind, threshold));
    }

    if current <= bounds.max && predicted > bounds.max {
        let (kind, threshold) = match error_margin {
            Some(margin) if predicted > bounds.max + margin => {
                (ThresholdKind::Error, bounds.max + margin)
            }
            _ => (ThresholdKind::Warning, bounds.max),
        };
        crossings.push(crossing(prediction, CrossingDirection::AboveMax, kind, threshold));
    }

    crossings
}

fn crossing(
    prediction: &AnglePredictionData,
    direction: CrossingDirection,
    kind: ThresholdKind,
    threshold_value: f64,
) -> ThresholdCrossing {
    ThresholdCrossing {
        angle: prediction.angle,
        direction,
        current_value: prediction.current_value,
        predicted_value: prediction.predicted_value,
        kind,
        threshold_value,
        time_to_threshold_ms: time_to_threshold_ms(
            threshold_value,
            prediction.current_value,
            prediction.angular_velocity,
        ),
        confidence: prediction.confidence,
        risk_level: kind.into(),
    }
}

/// Worst risk across a frame's crossings
pub fn overall_risk(crossings: &[ThresholdCrossing]) -> RiskLevel {
    crossings
        .iter()
        .map(|c| c.risk_level)
        .max()
        .unwrap_or(RiskLevel::Good)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bounds;

    fn prediction(angle: AngleId, current: f64, velocity: f64, predicted: f64) -> AnglePredictionData {
        AnglePredictionData {
            angle,
            current_value: current,
            angular_velocity: velocity,
            angular_acceleration: 0.0,
            predicted_value: predicted,
            confidence: 0.9,
            is_valid: true,
        }
    }

    fn knee_range() -> AngleRange {
        AngleRange::new(Bounds::new(70.0, 170.0), Bounds::new(60.0, 180.0))
    }

    #[test]
    fn test_entering_lower_zone() {
        let p = prediction(AngleId::LeftKnee, 65.0, -40.0, 57.0);
        let crossings = detect_crossings(&p, &knee_range(), None);

        assert_eq!(crossings.len(), 1);
        let c = crossings[0];
        assert_eq!(c.direction, CrossingDirection::BelowMin);
        assert_eq!(c.kind, ThresholdKind::Warning);
        assert_eq!(c.threshold_value, 60.0);
        assert!((c.time_to_threshold_ms - 125.0).abs() < 1e-9);
        assert_eq!(c.risk_level, RiskLevel::Warning);
    }

    #[test]
    fn test_already_outside_not_reported() {
        let p = prediction(AngleId::LeftKnee, 55.0, -40.0, 47.0);
        assert!(detect_crossings(&p, &knee_range(), None).is_empty());
    }

    #[test]
    fn test_inside_stays_inside() {
        let p = prediction(AngleId::LeftKnee, 120.0, 10.0, 122.0);
        assert!(detect_crossings(&p, &knee_range(), None).is_empty());
    }

    #[test]
    fn test_error_margin() {
        let range = AngleRange::new(Bounds::new(0.0, 30.0), Bounds::new(0.0, 45.0));

        let mild = prediction(AngleId::Torso, 42.0, 40.0, 50.0);
        let crossings = detect_crossings(&mild, &range, Some(15.0));
        assert_eq!(crossings[0].kind, ThresholdKind::Warning);

        let severe = prediction(AngleId::Torso, 42.0, 100.0, 62.0);
        let crossings = detect_crossings(&severe, &range, Some(15.0));
        assert_eq!(crossings[0].kind, ThresholdKind::Error);
        assert_eq!(crossings[0].threshold_value, 60.0);
        assert!((crossings[0].time_to_threshold_ms - 180.0).abs() < 1e-9);
        assert_eq!(overall_risk(&crossings), RiskLevel::Error);
    }

    #[test]
    fn test_time_to_threshold_sentinels() {
        assert_eq!(time_to_threshold_ms(60.0, 65.0, 0.0005), f64::INFINITY);
        // Moving away from the threshold
        assert_eq!(time_to_threshold_ms(60.0, 65.0, 10.0), f64::INFINITY);
        assert!((time_to_threshold_ms(60.0, 65.0, -50.0) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_overall_risk_empty() {
        assert_eq!(overall_risk(&[]), RiskLevel::Good);
    }
}
