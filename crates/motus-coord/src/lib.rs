//! MOTUS Coord - How well two driving joints move together
//!
//! For hinge-and-bend movements (squat, deadlift, lunge) the knee and hip
//! should flex in a movement-specific proportion and at roughly the same
//! time. This crate measures:
//! - The flexion ratio against a per-movement optimal range
//! - Timing mismatch between the joints
//! - A qualitative coordination pattern with consensus-based consistency
//! - A weighted composite score, per side and overall

pub mod analyzer;
pub mod config;
pub mod metrics;

pub use analyzer::*;
pub use config::*;
pub use metrics::*;
