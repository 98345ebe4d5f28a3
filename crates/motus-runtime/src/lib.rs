//! MOTUS Runtime - Frame pipeline
//!
//! Wires the analyzers together behind a single `process` call per frame:
//! 1. Velocity tracking for every confident keypoint
//! 2. Phase analysis for one reference joint
//! 3. Angle prediction from provided or keypoint-derived angles
//! 4. Knee/hip coordination analysis
//!
//! Also hosts the aggregate configuration and logging setup.

pub mod config;
pub mod pipeline;
pub mod telemetry;

pub use config::*;
pub use pipeline::*;
pub use telemetry::*;
