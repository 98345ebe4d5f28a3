//! Aggregate configuration
//!
//! Every tunable threshold of every analyzer in one object. Missing
//! sections and fields keep their defaults, so a host can load a partial
//! document and override only what an exercise needs.

use motus_coord::CoordinationConfig;
use motus_core::{ensure_positive, ensure_range, Joint, MotusResult};
use motus_motion::{PhaseConfig, VelocityConfig};
use motus_predict::PredictionConfig;
use serde::{Deserialize, Serialize};

/// Logging setup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub default_directive: String,

    /// Emit JSON lines instead of human-readable text
    pub json: bool,

    /// Include the event target in each line
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_directive: "info".to_string(),
            json: false,
            with_target: true,
        }
    }
}

/// Pipeline wiring options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Joint whose vertical motion drives phase analysis
    pub phase_joint: Joint,

    /// Multiplier from provider coordinates to tracker units
    /// (1.0 for pixel coordinates)
    pub position_scale: f64,

    /// Keypoint confidence required to derive angles from keypoints
    pub angle_min_confidence: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            phase_joint: Joint::LeftHip,
            position_scale: 1.0,
            angle_min_confidence: 0.5,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> MotusResult<()> {
        ensure_positive("pipeline.position_scale", self.position_scale)?;
        ensure_range("pipeline.angle_min_confidence", self.angle_min_confidence, 0.0, 1.0)
    }
}

/// Configuration of the whole analysis stack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotusConfig {
    pub velocity: VelocityConfig,
    pub phase: PhaseConfig,
    pub predict: PredictionConfig,
    pub coord: CoordinationConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

impl MotusConfig {
    pub fn validate(&self) -> MotusResult<()> {
        self.velocity.validate()?;
        self.phase.validate()?;
        self.predict.validate()?;
        self.coord.validate()?;
        self.pipeline.validate()
    }
}
