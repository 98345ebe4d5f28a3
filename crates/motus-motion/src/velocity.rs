//! Velocity tracking per joint
//!
//! Each joint owns an independent position history. There is no
//! cross-joint coupling: updating one joint never touches another.

use motus_core::{
    ensure_positive, ensure_range, FrameTime, Joint, MotusError, MotusResult, Position3D,
    RingBuffer,
};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Coarse speed classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedCategory {
    TooSlow,
    Slow,
    Optimal,
    Fast,
    TooFast,
}

impl SpeedCategory {
    /// Slow, optimal and fast are all acceptable working speeds
    pub fn is_in_optimal_band(self) -> bool {
        matches!(
            self,
            SpeedCategory::Slow | SpeedCategory::Optimal | SpeedCategory::Fast
        )
    }
}

/// Speed class upper bounds, in position units (or degrees) per second.
/// A speed below `too_slow` is TooSlow, below `slow` is Slow, and so on;
/// anything at or above `fast` is TooFast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedThresholds {
    pub too_slow: f64,
    pub slow: f64,
    pub optimal: f64,
    pub fast: f64,
}

impl Default for SpeedThresholds {
    fn default() -> Self {
        Self {
            too_slow: 20.0,
            slow: 50.0,
            optimal: 200.0,
            fast: 300.0,
        }
    }
}

impl SpeedThresholds {
    pub fn classify(&self, speed: f64) -> SpeedCategory {
        let speed = speed.abs();
        if speed < self.too_slow {
            SpeedCategory::TooSlow
        } else if speed < self.slow {
            SpeedCategory::Slow
        } else if speed < self.optimal {
            SpeedCategory::Optimal
        } else if speed < self.fast {
            SpeedCategory::Fast
        } else {
            SpeedCategory::TooFast
        }
    }

    pub fn validate(&self) -> MotusResult<()> {
        let bounds = [self.too_slow, self.slow, self.optimal, self.fast];
        if bounds.iter().any(|b| !b.is_finite() || *b < 0.0)
            || bounds.windows(2).any(|w| w[0] > w[1])
        {
            return Err(MotusError::config(format!(
                "speed thresholds must be non-negative and ascending: {bounds:?}"
            )));
        }
        Ok(())
    }
}

/// Velocity tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityConfig {
    /// Samples kept per joint (30 ≈ 1 s at 30 fps)
    pub history_capacity: usize,

    /// Samples below this confidence are rejected and not recorded
    pub min_confidence: f64,

    /// EMA weight of the newest raw velocity, in (0, 1]
    pub smoothing_alpha: f64,

    /// Speed classification bounds
    pub speed: SpeedThresholds,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            history_capacity: 30,
            min_confidence: 0.5,
            smoothing_alpha: 0.3,
            speed: SpeedThresholds::default(),
        }
    }
}

impl VelocityConfig {
    pub fn validate(&self) -> MotusResult<()> {
        if self.history_capacity < 2 {
            return Err(MotusError::config(
                "velocity history_capacity must hold at least 2 samples",
            ));
        }
        ensure_range("velocity.min_confidence", self.min_confidence, 0.0, 1.0)?;
        ensure_positive("velocity.smoothing_alpha", self.smoothing_alpha)?;
        ensure_range("velocity.smoothing_alpha", self.smoothing_alpha, 0.0, 1.0)?;
        self.speed.validate()
    }
}

/// A recorded position measurement
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PositionSnapshot {
    pub position: Position3D,
    pub timestamp: FrameTime,
    pub confidence: f64,
}

/// Velocity result for one joint update
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JointVelocityData {
    pub joint: Joint,
    /// Instantaneous speed between the last two samples (units/s)
    pub raw_velocity: f64,
    /// EMA-smoothed speed (units/s)
    pub smoothed_velocity: f64,
    /// Change of raw speed (units/s²)
    pub acceleration: f64,
    pub speed_category: SpeedCategory,
    pub is_valid: bool,
}

impl JointVelocityData {
    /// Zeroed result for a rejected or under-sampled update
    pub fn invalid(joint: Joint) -> Self {
        Self {
            joint,
            raw_velocity: 0.0,
            smoothed_velocity: 0.0,
            acceleration: 0.0,
            speed_category: SpeedCategory::TooSlow,
            is_valid: false,
        }
    }
}

#[derive(Debug, Clone)]
struct JointTrack {
    history: RingBuffer<PositionSnapshot>,
    /// Running EMA, seeded by the first raw velocity
    smoothed: Option<f64>,
    /// Raw velocity of the previous update
    previous_raw: Option<f64>,
}

impl JointTrack {
    fn new(capacity: usize) -> MotusResult<Self> {
        Ok(Self {
            history: RingBuffer::new(capacity)?,
            smoothed: None,
            previous_raw: None,
        })
    }

    fn clear(&mut self) {
        self.history.clear();
        self.smoothed = None;
        self.previous_raw = None;
    }
}

/// Per-joint velocity tracker
#[derive(Debug, Clone)]
pub struct VelocityTracker {
    config: VelocityConfig,
    /// One track per joint, indexed by `Joint::index`
    tracks: Vec<JointTrack>,
}

impl VelocityTracker {
    pub fn new(config: VelocityConfig) -> MotusResult<Self> {
        config.validate()?;
        let tracks = Joint::ALL
            .iter()
            .map(|_| JointTrack::new(config.history_capacity))
            .collect::<MotusResult<Vec<_>>>()?;
        Ok(Self { config, tracks })
    }

    /// Record a new position for `joint` and derive its velocity
    pub fn update_position(
        &mut self,
        joint: Joint,
        position: Position3D,
        timestamp: FrameTime,
        confidence: f64,
    ) -> JointVelocityData {
        // NaN confidence is rejected too
        if !(confidence >= self.config.min_confidence) {
            return JointVelocityData::invalid(joint);
        }
        if !position.is_finite() {
            trace!(joint = %joint, "non-finite position dropped");
            return JointVelocityData::invalid(joint);
        }

        let alpha = self.config.smoothing_alpha;
        let track = &mut self.tracks[joint.index()];
        track.history.push(PositionSnapshot {
            position,
            timestamp,
            confidence,
        });

        let (current, previous) = match (track.history.peek(), track.history.peek_previous()) {
            (Some(current), Some(previous)) => (*current, *previous),
            _ => return JointVelocityData::invalid(joint),
        };

        let dt = current.timestamp.secs_since(previous.timestamp);
        let raw_velocity = if dt > 0.0 {
            current.position.distance(&previous.position) / dt
        } else {
            0.0
        };

        let smoothed_velocity = match track.smoothed {
            Some(smoothed) => alpha * raw_velocity + (1.0 - alpha) * smoothed,
            None => raw_velocity,
        };
        track.smoothed = Some(smoothed_velocity);

        // Acceleration comes from raw, not smoothed, velocity deltas
        let acceleration = match track.previous_raw {
            Some(previous_raw) if dt > 0.0 => (raw_velocity - previous_raw) / dt,
            _ => 0.0,
        };
        track.previous_raw = Some(raw_velocity);

        trace!(
            joint = %joint,
            raw_velocity,
            smoothed_velocity,
            acceleration,
            "joint velocity"
        );

        JointVelocityData {
            joint,
            raw_velocity,
            smoothed_velocity,
            acceleration,
            speed_category: self.config.speed.classify(smoothed_velocity),
            is_valid: true,
        }
    }

    /// Most recent raw velocity of `joint` (0 until two samples exist)
    pub fn current_velocity(&self, joint: Joint) -> f64 {
        self.tracks[joint.index()].previous_raw.unwrap_or(0.0)
    }

    /// Most recent smoothed velocity of `joint`
    pub fn smoothed_velocity(&self, joint: Joint) -> f64 {
        self.tracks[joint.index()].smoothed.unwrap_or(0.0)
    }

    /// Number of buffered samples for `joint`
    pub fn history_len(&self, joint: Joint) -> usize {
        self.tracks[joint.index()].history.len()
    }

    /// Most recent accepted sample for `joint`
    pub fn latest(&self, joint: Joint) -> Option<PositionSnapshot> {
        self.tracks[joint.index()].history.peek().copied()
    }

    pub fn config(&self) -> &VelocityConfig {
        &self.config
    }

    /// Forget all history
    pub fn reset(&mut self) {
        for track in &mut self.tracks {
            track.clear();
        }
    }
}
