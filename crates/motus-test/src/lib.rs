//! MOTUS Test Harness - Synthetic movement and end-to-end validation
//!
//! This crate provides:
//! - Seeded squat / hip-hinge keypoint generators with jitter and dropout
//! - End-to-end scenarios driving the full pipeline on a manual clock
//! - Criterion benchmarks for the per-frame real-time budgets

pub mod movement;
pub mod scenario;

pub use movement::*;
pub use scenario::*;
