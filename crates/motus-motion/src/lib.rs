//! MOTUS Motion - Joint velocity and movement phase
//!
//! Raw per-frame joint positions are noisy. This crate turns them into:
//! - Raw and EMA-smoothed velocity, acceleration and a coarse speed class
//! - A movement phase (eccentric / concentric / isometric / transition)
//!   with consensus-buffered hysteresis

pub mod phase;
pub mod velocity;

pub use phase::*;
pub use velocity::*;
