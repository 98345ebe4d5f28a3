//! MOTUS Time - Clock sources and real-time budgets
//!
//! This crate provides:
//! - A monotonic clock abstraction, so analyzers never read a global clock
//! - A system clock for production and a manual clock for deterministic tests
//! - Soft per-call budgets whose overruns are logged, never enforced

pub mod budget;
pub mod clock;

pub use budget::*;
pub use clock::*;
