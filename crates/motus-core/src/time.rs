//! Time primitives for MOTUS
//!
//! Frame timestamps come from the external frame loop and are monotonic.
//! They are stored as integer microseconds so that bucketing and
//! ordering stay exact.

use std::ops::{Add, Sub};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Frame time - monotonic timestamp of a measurement
/// Represented as microseconds since an arbitrary session origin
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct FrameTime(pub i64);

impl FrameTime {
    pub const ZERO: FrameTime = FrameTime(0);

    #[inline]
    pub fn from_micros(micros: i64) -> Self {
        FrameTime(micros)
    }

    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        FrameTime(millis * 1000)
    }

    /// From fractional milliseconds (e.g. a `performance.now()` style reading)
    #[inline]
    pub fn from_millis_f64(millis: f64) -> Self {
        FrameTime((millis * 1000.0).round() as i64)
    }

    #[inline]
    pub fn as_micros(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn as_millis(self) -> i64 {
        self.0.div_euclid(1000)
    }

    #[inline]
    pub fn as_millis_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// Signed seconds elapsed since `earlier` (negative if `earlier` is later)
    #[inline]
    pub fn secs_since(self, earlier: FrameTime) -> f64 {
        (self.0 - earlier.0) as f64 / 1_000_000.0
    }

    /// Signed milliseconds elapsed since `earlier`
    #[inline]
    pub fn millis_since(self, earlier: FrameTime) -> f64 {
        (self.0 - earlier.0) as f64 / 1000.0
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        FrameTime(self.0.saturating_add(duration.as_micros() as i64))
    }
}

impl Add<Duration> for FrameTime {
    type Output = FrameTime;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        FrameTime(self.0 + rhs.as_micros() as i64)
    }
}

impl Sub<FrameTime> for FrameTime {
    type Output = Duration;

    /// Saturates at zero when `rhs` is later than `self`
    #[inline]
    fn sub(self, rhs: FrameTime) -> Self::Output {
        let diff = self.0 - rhs.0;
        if diff >= 0 {
            Duration::from_micros(diff as u64)
        } else {
            Duration::ZERO
        }
    }
}

impl std::fmt::Debug for FrameTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t({:.3}ms)", self.as_millis_f64())
    }
}
