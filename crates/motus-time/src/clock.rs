//! Clock implementations for MOTUS
//!
//! INVARIANT: every clock is monotonic. Readings never go backwards.

use std::sync::Arc;
use std::time::{Duration, Instant};

use motus_core::FrameTime;
use parking_lot::Mutex;

/// Monotonic time source injected into analyzers
pub trait MonotonicClock {
    /// Current time
    fn now(&self) -> FrameTime;
}

impl<C: MonotonicClock + ?Sized> MonotonicClock for &C {
    fn now(&self) -> FrameTime {
        (**self).now()
    }
}

impl<C: MonotonicClock + ?Sized> MonotonicClock for Arc<C> {
    fn now(&self) -> FrameTime {
        (**self).now()
    }
}

/// OS monotonic clock, zeroed at construction
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    /// Reference to monotonic OS clock
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock for SystemClock {
    fn now(&self) -> FrameTime {
        let elapsed = self.origin.elapsed();
        FrameTime::from_micros(elapsed.as_micros().min(i64::MAX as u128) as i64)
    }
}

#[derive(Debug)]
struct ManualState {
    now: FrameTime,
    /// Applied after every read
    step: Duration,
}

/// Test clock driven explicitly by the caller.
///
/// Clones share the same underlying time, so a test can keep one handle
/// and hand another to the analyzer under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    state: Arc<Mutex<ManualState>>,
}

impl ManualClock {
    /// Create a clock starting at `start`
    pub fn new(start: FrameTime) -> Self {
        Self::with_step(start, Duration::ZERO)
    }

    /// Create a clock that advances by `step` after every read.
    /// Useful to simulate compute time inside a measured call.
    pub fn with_step(start: FrameTime, step: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(ManualState { now: start, step })),
        }
    }

    /// Jump to `time`. Only moves forward.
    pub fn set(&self, time: FrameTime) {
        let mut state = self.state.lock();
        if time > state.now {
            state.now = time;
        }
    }

    /// Advance by `dt`
    pub fn advance(&self, dt: Duration) {
        let mut state = self.state.lock();
        state.now = state.now.saturating_add(dt);
    }

    /// Change the per-read auto step
    pub fn set_step(&self, step: Duration) {
        self.state.lock().step = step;
    }

    /// Current time without triggering the auto step
    pub fn peek(&self) -> FrameTime {
        self.state.lock().now
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(FrameTime::ZERO)
    }
}

impl MonotonicClock for ManualClock {
    fn now(&self) -> FrameTime {
        let mut state = self.state.lock();
        let now = state.now;
        let step = state.step;
        state.now = now.saturating_add(step);
        now
    }
}
