//! Angle Prediction Engine
//!
//! For every tracked angle: buffer the sample, differentiate, smooth,
//! extrapolate over the look-ahead window, then check the prediction
//! against the configured ranges and raise warnings ahead of time.

use std::time::Duration;

use motus_core::{AngleId, FrameTime, MotusResult, RingBuffer};
use motus_time::{BudgetStats, FrameBudget, MonotonicClock, SystemClock};
use serde::Serialize;
use tracing::trace;

use crate::{
    detect_crossings, overall_risk, AngleRange, MessageCatalog, PredictionConfig,
    PredictiveWarning, RiskLevel, ThresholdCrossing, WarningPolicy, WarningRegistry,
};

/// Prediction for one angle on one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnglePredictionData {
    pub angle: AngleId,
    /// Latest measured value (degrees)
    pub current_value: f64,
    /// Smoothed angular velocity (deg/s)
    pub angular_velocity: f64,
    /// Change of smoothed velocity (deg/s²)
    pub angular_acceleration: f64,
    /// Extrapolated value at the end of the look-ahead window
    pub predicted_value: f64,
    /// Trust in the prediction, in [0, 1]
    pub confidence: f64,
    pub is_valid: bool,
}

impl AnglePredictionData {
    /// Neutral result that echoes the current value as the prediction
    pub fn invalid(angle: AngleId, current_value: f64) -> Self {
        Self {
            angle,
            current_value,
            angular_velocity: 0.0,
            angular_acceleration: 0.0,
            predicted_value: current_value,
            confidence: 0.0,
            is_valid: false,
        }
    }
}

/// Everything one `predict` call produced
#[derive(Debug, Clone, Serialize)]
pub struct PredictionFrame {
    pub timestamp: FrameTime,
    pub predictions: Vec<AnglePredictionData>,
    pub crossings: Vec<ThresholdCrossing>,
    /// Warnings newly emitted on this frame
    pub warnings: Vec<PredictiveWarning>,
    pub risk: RiskLevel,
    pub elapsed_us: u64,
}

#[derive(Debug, Clone, Copy)]
struct AngleSample {
    value: f64,
    timestamp: FrameTime,
}

#[derive(Debug, Clone)]
struct AngleTrack {
    history: RingBuffer<AngleSample>,
    /// Smoothed velocity from the previous valid update
    smoothed_velocity: Option<f64>,
}

impl AngleTrack {
    fn clear(&mut self) {
        self.history.clear();
        self.smoothed_velocity = None;
    }
}

/// Kinematic angle predictor with pre-emptive warnings
#[derive(Debug)]
pub struct AnglePredictionEngine<C: MonotonicClock = SystemClock> {
    config: PredictionConfig,
    clock: C,
    /// Acceptable ranges indexed by `AngleId::index`
    ranges: [Option<AngleRange>; AngleId::COUNT],
    tracks: Vec<AngleTrack>,
    warnings: WarningRegistry,
    catalog: MessageCatalog,
    budget: FrameBudget,
}

impl AnglePredictionEngine<SystemClock> {
    pub fn new(config: PredictionConfig) -> MotusResult<Self> {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: MonotonicClock> AnglePredictionEngine<C> {
    pub fn with_clock(config: PredictionConfig, clock: C) -> MotusResult<Self> {
        config.validate()?;

        let mut ranges = [None; AngleId::COUNT];
        for (angle, range) in &config.ranges {
            ranges[angle.index()] = Some(*range);
        }

        let tracks = AngleId::ALL
            .iter()
            .map(|_| {
                Ok(AngleTrack {
                    history: RingBuffer::new(config.history_capacity)?,
                    smoothed_velocity: None,
                })
            })
            .collect::<MotusResult<Vec<_>>>()?;

        let warnings = WarningRegistry::new(WarningPolicy {
            hysteresis_ms: config.hysteresis_ms,
            ttl_ms: config.warning_ttl_ms,
            bucket_ms: config.warning_bucket_ms,
            urgency_high_ms: config.urgency_high_ms,
            urgency_medium_ms: config.urgency_medium_ms,
        });
        let budget = FrameBudget::new("angle_prediction", Duration::from_micros(config.budget_us));

        Ok(Self {
            config,
            clock,
            ranges,
            tracks,
            warnings,
            catalog: MessageCatalog::default(),
            budget,
        })
    }

    /// Replace the warning text catalog
    pub fn set_message_catalog(&mut self, catalog: MessageCatalog) {
        self.catalog = catalog;
    }

    /// Process one frame of angle measurements (degrees)
    pub fn predict(&mut self, angles: &[(AngleId, f64)], timestamp: FrameTime) -> PredictionFrame {
        let started = self.clock.now();

        self.warnings.expire(timestamp);

        let mut predictions = Vec::with_capacity(angles.len());
        let mut crossings = Vec::new();

        for &(angle, value) in angles {
            let prediction = self.predict_angle(angle, value, timestamp);

            if prediction.is_valid && prediction.confidence >= self.config.min_confidence {
                if let Some(range) = &self.ranges[angle.index()] {
                    let margin = (self.config.error_angle == Some(angle))
                        .then_some(self.config.error_margin_deg);
                    crossings.extend(detect_crossings(&prediction, range, margin));
                }
            }

            predictions.push(prediction);
        }

        let warnings = crossings
            .iter()
            .filter_map(|crossing| self.warnings.offer(crossing, timestamp, &self.catalog))
            .collect();

        let risk = overall_risk(&crossings);

        let elapsed = self.clock.now() - started;
        self.budget.record(elapsed);

        PredictionFrame {
            timestamp,
            predictions,
            crossings,
            warnings,
            risk,
            elapsed_us: elapsed.as_micros() as u64,
        }
    }

    fn predict_angle(&mut self, angle: AngleId, value: f64, timestamp: FrameTime) -> AnglePredictionData {
        if !value.is_finite() {
            return AnglePredictionData::invalid(angle, 0.0);
        }

        let config = &self.config;
        let track = &mut self.tracks[angle.index()];
        track.history.push(AngleSample { value, timestamp });

        if track.history.len() < config.min_samples {
            return AnglePredictionData::invalid(angle, value);
        }

        let previous = match track.history.peek_previous() {
            Some(previous) => *previous,
            None => return AnglePredictionData::invalid(angle, value),
        };

        let dt = timestamp.secs_since(previous.timestamp);
        if dt <= 0.0 {
            return AnglePredictionData::invalid(angle, value);
        }

        let raw_velocity = (value - previous.value) / dt;
        let alpha = config.smoothing_alpha;
        let (smoothed, delta_velocity) = match track.smoothed_velocity {
            Some(prev) => {
                let smoothed = alpha * raw_velocity + (1.0 - alpha) * prev;
                (smoothed, smoothed - prev)
            }
            None => (raw_velocity, 0.0),
        };
        // Acceleration comes from smoothed, not raw, velocity deltas
        let acceleration = delta_velocity / dt;
        track.smoothed_velocity = Some(smoothed);

        let t = config.look_ahead_secs();
        let predicted_value = value + smoothed * t + 0.5 * acceleration * t * t;

        let history_factor =
            (track.history.len() as f64 / config.confidence_saturation_samples as f64).min(1.0);
        let volatility_penalty =
            (delta_velocity.abs() / config.volatility_scale).min(config.max_volatility_penalty);
        let confidence = history_factor * (1.0 - volatility_penalty);

        trace!(
            angle = %angle,
            value,
            velocity = smoothed,
            acceleration,
            predicted_value,
            confidence,
            "angle prediction"
        );

        AnglePredictionData {
            angle,
            current_value: value,
            angular_velocity: smoothed,
            angular_acceleration: acceleration,
            predicted_value,
            confidence,
            is_valid: true,
        }
    }

    /// Copies of the warnings that have not expired yet
    pub fn active_warnings(&self) -> Vec<PredictiveWarning> {
        self.warnings.active().to_vec()
    }

    pub fn has_active_warning(&self, angle: AngleId) -> bool {
        self.warnings.active().iter().any(|w| w.angle == angle)
    }

    /// Number of buffered samples for `angle`
    pub fn history_len(&self, angle: AngleId) -> usize {
        self.tracks[angle.index()].history.len()
    }

    pub fn budget_stats(&self) -> BudgetStats {
        self.budget.stats()
    }

    pub fn config(&self) -> &PredictionConfig {
        &self.config
    }

    /// Clear all histories, velocities and active warnings
    pub fn reset(&mut self) {
        for track in &mut self.tracks {
            track.clear();
        }
        self.warnings.clear();
        self.budget.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motus_time::ManualClock;
    use proptest::prelude::*;

    use crate::{CrossingDirection, ThresholdKind, Urgency};

    fn engine(config: PredictionConfig) -> AnglePredictionEngine<ManualClock> {
        AnglePredictionEngine::with_clock(config, ManualClock::default()).unwrap()
    }

    #[test]
    fn test_first_sample_invalid() {
        let mut engine = engine(PredictionConfig::default());
        let frame = engine.predict(&[(AngleId::LeftKnee, 150.0)], FrameTime::ZERO);

        let p = frame.predictions[0];
        assert!(!p.is_valid);
        assert_eq!(p.predicted_value, 150.0);
        assert_eq!(p.angular_velocity, 0.0);
        assert_eq!(frame.risk, RiskLevel::Good);
    }

    #[test]
    fn test_constant_velocity_is_linear() {
        let mut engine = engine(PredictionConfig::default());
        let velocity = 30.0; // deg/s
        let mut last = None;
        for i in 0..8 {
            let t = FrameTime::from_millis(i * 100);
            let value = 100.0 + velocity * i as f64 * 0.1;
            last = Some(engine.predict(&[(AngleId::LeftHip, value)], t));
        }

        let p = last.unwrap().predictions[0];
        assert!(p.is_valid);
        assert!((p.angular_velocity - velocity).abs() < 1e-6);
        assert!(p.angular_acceleration.abs() < 1e-6);
        let expected = p.current_value + velocity * 0.2;
        assert!((p.predicted_value - expected).abs() < 1e-6);
    }

    #[test]
    fn test_confidence_grows_with_history() {
        let mut engine = engine(PredictionConfig::default());
        let mut confidences = Vec::new();
        for i in 0..12 {
            let frame = engine.predict(
                &[(AngleId::RightElbow, 90.0)],
                FrameTime::from_millis(i * 33),
            );
            confidences.push(frame.predictions[0].confidence);
        }

        assert_eq!(confidences[0], 0.0);
        assert!((confidences[1] - 0.2).abs() < 1e-9);
        assert!((confidences[4] - 0.5).abs() < 1e-9);
        assert_eq!(confidences[11], 1.0);
    }

    #[test]
    fn test_volatility_penalty() {
        let mut engine = engine(PredictionConfig::default());
        for i in 0..10 {
            engine.predict(&[(AngleId::LeftKnee, 120.0)], FrameTime::from_millis(i * 100));
        }
        // Sudden jump: raw 100 deg/s, smoothed 30, penalty 0.3
        let frame = engine.predict(&[(AngleId::LeftKnee, 130.0)], FrameTime::from_millis(1000));
        let p = frame.predictions[0];
        assert!((p.angular_velocity - 30.0).abs() < 1e-9);
        assert!((p.confidence - 0.7).abs() < 1e-9);

        // A larger jump is capped at the maximum penalty
        let frame = engine.predict(&[(AngleId::LeftKnee, 180.0)], FrameTime::from_millis(1100));
        assert!((frame.predictions[0].confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_dt_invalid() {
        let mut engine = engine(PredictionConfig::default());
        engine.predict(&[(AngleId::Torso, 10.0)], FrameTime::from_millis(100));
        let frame = engine.predict(&[(AngleId::Torso, 12.0)], FrameTime::from_millis(100));
        assert!(!frame.predictions[0].is_valid);
        assert_eq!(frame.predictions[0].predicted_value, 12.0);
    }

    #[test]
    fn test_single_warning_on_crossing() {
        let mut engine = engine(PredictionConfig::default());
        let mut emitted = Vec::new();
        let mut crossing_frames = 0;

        // Knee closes at 40 deg/s, sampled every 100 ms
        for i in 0..20 {
            let value = 121.0 - 4.0 * i as f64;
            let frame = engine.predict(
                &[(AngleId::LeftKnee, value)],
                FrameTime::from_millis(i * 100),
            );
            if !frame.crossings.is_empty() {
                crossing_frames += 1;
                assert_eq!(frame.risk, RiskLevel::Warning);
            }
            for warning in frame.warnings {
                emitted.push((i, warning));
            }
        }

        assert_eq!(crossing_frames, 2);
        assert_eq!(emitted.len(), 1);

        let (frame_index, warning) = &emitted[0];
        assert_eq!(*frame_index, 14);
        assert_eq!(warning.id.kind, ThresholdKind::Warning);
        assert_eq!(warning.direction, CrossingDirection::BelowMin);
        assert_eq!(warning.urgency, Urgency::High);
        assert_eq!(warning.id.to_string(), "left_knee_warning_2");
    }

    #[test]
    fn test_low_confidence_skips_thresholds() {
        // Second sample already heads past the knee minimum, but the history
        // factor holds confidence at 0.2
        let series = [(0, 70.0), (100, 66.0)];
        let run = |min_confidence: f64| {
            let mut engine = engine(PredictionConfig {
                min_confidence,
                ..PredictionConfig::default()
            });
            let mut last = None;
            for (t, value) in series {
                last = Some(engine.predict(&[(AngleId::LeftKnee, value)], FrameTime::from_millis(t)));
            }
            (last.unwrap(), engine.active_warnings().len())
        };

        let (frame, active) = run(0.5);
        let p = frame.predictions[0];
        assert!(p.is_valid);
        assert!((p.confidence - 0.2).abs() < 1e-9);
        assert!(p.predicted_value < 60.0);
        assert!(frame.crossings.is_empty());
        assert!(frame.warnings.is_empty());
        assert_eq!(frame.risk, RiskLevel::Good);
        assert_eq!(active, 0);

        let (frame, active) = run(0.1);
        assert_eq!(frame.crossings.len(), 1);
        assert_eq!(frame.warnings.len(), 1);
        assert_eq!(frame.risk, RiskLevel::Warning);
        assert_eq!(active, 1);
    }

    #[test]
    fn test_volatile_velocity_skips_thresholds() {
        // Long steady hold, then a 30 deg drop in one frame: full history,
        // confidence halved by the volatility penalty
        let run = |min_confidence: f64| {
            let mut engine = engine(PredictionConfig {
                min_confidence,
                ..PredictionConfig::default()
            });
            for i in 0..12 {
                engine.predict(&[(AngleId::LeftKnee, 120.0)], FrameTime::from_millis(i * 100));
            }
            engine.predict(&[(AngleId::LeftKnee, 90.0)], FrameTime::from_millis(1200))
        };

        let frame = run(0.6);
        let p = frame.predictions[0];
        assert!((p.confidence - 0.5).abs() < 1e-9);
        assert!(p.predicted_value < 60.0);
        assert!(frame.crossings.is_empty());
        assert!(frame.warnings.is_empty());
        assert_eq!(frame.risk, RiskLevel::Good);

        let frame = run(0.5);
        assert_eq!(frame.crossings.len(), 1);
        assert_eq!(frame.risk, RiskLevel::Warning);
    }

    #[test]
    fn test_torso_error_crossing() {
        let mut engine = engine(PredictionConfig::default());
        let mut last = None;
        // Trunk pitching forward at 100 deg/s
        for i in 0..7 {
            let value = 12.0 + 10.0 * i as f64;
            last = Some(engine.predict(&[(AngleId::Torso, value)], FrameTime::from_millis(i * 100)));
        }

        let frame = last.unwrap();
        // current 72 is already past 45, so the crossing happened earlier
        assert!(frame.crossings.is_empty());

        let mut engine = self::engine(PredictionConfig::default());
        let mut error_seen = false;
        for i in 0..6 {
            let value = 2.0 + 10.0 * i as f64;
            let frame =
                engine.predict(&[(AngleId::Torso, value)], FrameTime::from_millis(i * 100));
            if frame.risk == RiskLevel::Error {
                error_seen = true;
                assert_eq!(frame.warnings[0].urgency, Urgency::High);
                assert_eq!(frame.crossings[0].threshold_value, 60.0);
            }
        }
        assert!(error_seen);
    }

    #[test]
    fn test_warnings_expire() {
        let mut engine = engine(PredictionConfig::default());
        for i in 0..16 {
            engine.predict(
                &[(AngleId::LeftKnee, 121.0 - 4.0 * i as f64)],
                FrameTime::from_millis(i * 100),
            );
        }
        assert!(engine.has_active_warning(AngleId::LeftKnee));
        assert_eq!(engine.active_warnings().len(), 1);

        engine.predict(&[(AngleId::LeftKnee, 55.0)], FrameTime::from_millis(2400));
        assert!(engine.active_warnings().is_empty());
    }

    #[test]
    fn test_budget_overrun_is_diagnostic() {
        let clock = ManualClock::with_step(FrameTime::ZERO, Duration::from_millis(2));
        let mut engine =
            AnglePredictionEngine::with_clock(PredictionConfig::default(), clock).unwrap();

        let frame = engine.predict(&[(AngleId::LeftKnee, 90.0)], FrameTime::ZERO);
        assert_eq!(frame.predictions.len(), 1);
        assert_eq!(frame.elapsed_us, 2000);
        assert_eq!(engine.budget_stats().overruns, 1);
    }

    #[test]
    fn test_reset_matches_fresh() {
        let mut engine = engine(PredictionConfig::default());
        for i in 0..16 {
            engine.predict(
                &[(AngleId::LeftKnee, 121.0 - 4.0 * i as f64)],
                FrameTime::from_millis(i * 100),
            );
        }
        engine.reset();

        assert_eq!(engine.history_len(AngleId::LeftKnee), 0);
        assert!(engine.active_warnings().is_empty());
        assert_eq!(engine.budget_stats(), BudgetStats::default());

        let frame = engine.predict(&[(AngleId::LeftKnee, 64.0)], FrameTime::from_millis(5000));
        assert!(!frame.predictions[0].is_valid);
    }

    #[test]
    fn test_non_finite_input() {
        let mut engine = engine(PredictionConfig::default());
        let frame = engine.predict(&[(AngleId::LeftHip, f64::NAN)], FrameTime::ZERO);
        assert!(!frame.predictions[0].is_valid);
        assert_eq!(frame.predictions[0].predicted_value, 0.0);
        assert_eq!(engine.history_len(AngleId::LeftHip), 0);
    }

    proptest! {
        #[test]
        fn prop_predictions_are_finite(samples in prop::collection::vec((0.0f64..180.0, 0i64..60), 1..40)) {
            let mut engine = engine(PredictionConfig::default());
            let mut t = 0i64;
            for (value, dt) in samples {
                t += dt;
                let frame = engine.predict(&[(AngleId::RightKnee, value)], FrameTime::from_millis(t));
                let p = frame.predictions[0];
                prop_assert!(p.predicted_value.is_finite());
                prop_assert!(p.angular_velocity.is_finite());
                prop_assert!((0.0..=1.0).contains(&p.confidence));
                for c in &frame.crossings {
                    prop_assert!(!c.time_to_threshold_ms.is_nan());
                }
            }
        }
    }
}
