//! Movement phase classification
//!
//! Consumes one joint's smoothed velocity plus its vertical displacement
//! and classifies the current phase of a repetition. A 3-slot vote buffer
//! keeps single-frame noise from flipping the phase.

use std::time::Duration;

use motus_core::{consensus, ensure_positive, quorum, FrameTime, MotusError, MotusResult, RingBuffer};
use motus_time::{MonotonicClock, SystemClock};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::JointVelocityData;

/// Movement phase of a repetition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementPhase {
    /// Lowering under control (moving down)
    Eccentric,
    /// Lifting (moving up)
    Concentric,
    /// Holding still
    Isometric,
    /// Moving without a clear vertical direction
    Transition,
}

/// Expected duration of each phase, in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseDurations {
    pub eccentric_ms: u32,
    pub concentric_ms: u32,
    pub isometric_ms: u32,
    pub transition_ms: u32,
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            eccentric_ms: 2000,
            concentric_ms: 1500,
            isometric_ms: 1000,
            transition_ms: 500,
        }
    }
}

impl PhaseDurations {
    pub fn expected(&self, phase: MovementPhase) -> Duration {
        let ms = match phase {
            MovementPhase::Eccentric => self.eccentric_ms,
            MovementPhase::Concentric => self.concentric_ms,
            MovementPhase::Isometric => self.isometric_ms,
            MovementPhase::Transition => self.transition_ms,
        };
        Duration::from_millis(ms as u64)
    }
}

/// Phase analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Smoothed speed below which the joint counts as still (units/s)
    pub isometric_velocity: f64,

    /// Phase-average speed above which a phase counts as fast (units/s)
    pub fast_velocity: f64,

    /// Vertical delta that must be exceeded to count as moving up or down
    /// (position units per frame)
    pub direction_band: f64,

    /// Number of recent detections that vote on a phase change
    pub vote_window: usize,

    /// Velocity samples kept for the phase average
    pub velocity_window: usize,

    /// Expected phase durations for progress reporting
    pub expected_durations: PhaseDurations,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            isometric_velocity: 5.0,
            fast_velocity: 50.0,
            direction_band: 0.1,
            vote_window: 3,
            velocity_window: 300,
            expected_durations: PhaseDurations::default(),
        }
    }
}

impl PhaseConfig {
    pub fn validate(&self) -> MotusResult<()> {
        ensure_positive("phase.isometric_velocity", self.isometric_velocity)?;
        ensure_positive("phase.fast_velocity", self.fast_velocity)?;
        if !(self.direction_band.is_finite() && self.direction_band >= 0.0) {
            return Err(MotusError::config("phase.direction_band must be >= 0"));
        }
        if self.vote_window == 0 || self.velocity_window == 0 {
            return Err(MotusError::config(
                "phase.vote_window and phase.velocity_window must be >= 1",
            ));
        }
        Ok(())
    }
}

/// Point-in-time view of the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseSnapshot {
    pub phase: MovementPhase,
    pub duration_ms: f64,
    /// Elapsed / expected duration, capped at 1.0
    pub progress: f64,
    pub average_velocity: f64,
    pub is_fast: bool,
}

/// Movement phase analyzer for a single joint
#[derive(Debug)]
pub struct PhaseAnalyzer<C: MonotonicClock = SystemClock> {
    config: PhaseConfig,
    clock: C,
    phase: MovementPhase,
    phase_start: FrameTime,
    /// Smoothed velocities observed during the current phase
    phase_velocities: RingBuffer<f64>,
    /// Most recent detections
    votes: RingBuffer<MovementPhase>,
}

impl PhaseAnalyzer<SystemClock> {
    pub fn new(config: PhaseConfig) -> MotusResult<Self> {
        Self::with_clock(config, SystemClock::new())
    }
}

impl<C: MonotonicClock> PhaseAnalyzer<C> {
    pub fn with_clock(config: PhaseConfig, clock: C) -> MotusResult<Self> {
        config.validate()?;
        let phase_start = clock.now();
        Ok(Self {
            phase_velocities: RingBuffer::new(config.velocity_window)?,
            votes: RingBuffer::new(config.vote_window)?,
            config,
            clock,
            phase: MovementPhase::Isometric,
            phase_start,
        })
    }

    /// Classify the phase from one velocity update and the joint's
    /// vertical position before and after it. Returns the active phase.
    pub fn analyze_phase(
        &mut self,
        velocity: &JointVelocityData,
        previous_y: f64,
        current_y: f64,
    ) -> MovementPhase {
        if !velocity.is_valid {
            return self.phase;
        }

        let detected = self.detect(velocity.smoothed_velocity, current_y - previous_y);
        self.votes.push(detected);

        let candidate = if self.votes.is_full() {
            consensus(self.votes.iter().copied(), quorum(self.votes.capacity()))
        } else {
            // Not enough history to vote yet
            Some(detected)
        };

        if let Some(next) = candidate.filter(|&p| p != self.phase) {
            self.transition_to(next);
        }

        self.phase_velocities.push(velocity.smoothed_velocity);
        self.phase
    }

    fn detect(&self, smoothed_velocity: f64, delta_y: f64) -> MovementPhase {
        if smoothed_velocity.abs() < self.config.isometric_velocity {
            return MovementPhase::Isometric;
        }

        // Image y grows downward
        let band = self.config.direction_band;
        if delta_y > band {
            MovementPhase::Eccentric
        } else if delta_y < -band {
            MovementPhase::Concentric
        } else {
            MovementPhase::Transition
        }
    }

    fn transition_to(&mut self, next: MovementPhase) {
        let now = self.clock.now();
        debug!(
            from = ?self.phase,
            to = ?next,
            held_ms = now.millis_since(self.phase_start),
            "phase transition"
        );
        self.phase = next;
        self.phase_start = now;
        self.phase_velocities.clear();
        self.votes.clear();
    }

    pub fn current_phase(&self) -> MovementPhase {
        self.phase
    }

    /// Time spent in the current phase
    pub fn phase_duration(&self) -> Duration {
        self.clock.now() - self.phase_start
    }

    /// Mean smoothed velocity during the current phase, 0 when empty
    pub fn phase_average_velocity(&self) -> f64 {
        if self.phase_velocities.is_empty() {
            return 0.0;
        }
        self.phase_velocities.iter().sum::<f64>() / self.phase_velocities.len() as f64
    }

    /// Elapsed / expected duration of the current phase, capped at 1.0
    pub fn phase_progress(&self) -> f64 {
        let expected = self.config.expected_durations.expected(self.phase);
        if expected.is_zero() {
            return 1.0;
        }
        (self.phase_duration().as_secs_f64() / expected.as_secs_f64()).min(1.0)
    }

    pub fn snapshot(&self) -> PhaseSnapshot {
        let average_velocity = self.phase_average_velocity();
        PhaseSnapshot {
            phase: self.phase,
            duration_ms: self.phase_duration().as_secs_f64() * 1000.0,
            progress: self.phase_progress(),
            average_velocity,
            is_fast: average_velocity > self.config.fast_velocity,
        }
    }

    /// Number of votes currently buffered
    pub fn pending_votes(&self) -> usize {
        self.votes.len()
    }

    pub fn config(&self) -> &PhaseConfig {
        &self.config
    }

    /// Back to isometric with empty state
    pub fn reset(&mut self) {
        self.phase = MovementPhase::Isometric;
        self.phase_start = self.clock.now();
        self.phase_velocities.clear();
        self.votes.clear();
    }
}
