//! MOTUS Predict - Seeing form problems before they happen
//!
//! Per-angle history is differentiated into an EMA-smoothed angular
//! velocity and acceleration, extrapolated over a short look-ahead window,
//! and checked against acceptable ranges. A predicted value leaving its
//! range raises a deduplicated, self-expiring warning while the current
//! value is still fine.

pub mod config;
pub mod engine;
pub mod messages;
pub mod threshold;
pub mod warning;

pub use config::*;
pub use engine::*;
pub use messages::*;
pub use threshold::*;
pub use warning::*;
