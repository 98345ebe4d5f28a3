//! MOTUS Core - Fundamental types and primitives
//!
//! This crate defines the core types used throughout MOTUS:
//! - Fixed-capacity history (RingBuffer)
//! - Frame timestamps (FrameTime)
//! - Skeleton and angle identifiers, keypoint sets
//! - Geometric joint-angle helpers
//! - Consensus voting helpers
//! - Error types

pub mod angles;
pub mod error;
pub mod joint;
pub mod ring;
pub mod time;
pub mod vote;

pub use angles::*;
pub use error::*;
pub use joint::*;
pub use ring::*;
pub use time::*;
pub use vote::*;
