//! Soft real-time budgets
//!
//! Analyzers measure each update call against an advisory deadline.
//! An overrun is logged and counted. It never changes the computed result
//! and never drops a frame.

use std::time::Duration;

use tracing::warn;

/// Accumulated timing statistics for one component
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BudgetStats {
    /// Measured calls
    pub calls: u64,
    /// Calls that exceeded the budget
    pub overruns: u64,
    /// Duration of the most recent call
    pub last: Duration,
    /// Slowest call seen
    pub worst: Duration,
}

impl BudgetStats {
    /// Fraction of calls that overran, 0 when nothing was measured
    pub fn overrun_ratio(&self) -> f64 {
        if self.calls == 0 {
            0.0
        } else {
            self.overruns as f64 / self.calls as f64
        }
    }
}

/// Advisory per-call deadline for a named component
#[derive(Debug, Clone)]
pub struct FrameBudget {
    component: &'static str,
    limit: Duration,
    stats: BudgetStats,
}

impl FrameBudget {
    pub fn new(component: &'static str, limit: Duration) -> Self {
        Self {
            component,
            limit,
            stats: BudgetStats::default(),
        }
    }

    /// Record one measured call. Returns true if it overran.
    pub fn record(&mut self, elapsed: Duration) -> bool {
        self.stats.calls += 1;
        self.stats.last = elapsed;
        self.stats.worst = self.stats.worst.max(elapsed);

        if elapsed <= self.limit {
            return false;
        }

        self.stats.overruns += 1;
        warn!(
            target: "motus::budget",
            component = self.component,
            elapsed_us = elapsed.as_micros() as u64,
            budget_us = self.limit.as_micros() as u64,
            overruns = self.stats.overruns,
            "frame budget exceeded"
        );
        true
    }

    pub fn component(&self) -> &'static str {
        self.component
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn stats(&self) -> BudgetStats {
        self.stats
    }

    /// Forget accumulated statistics
    pub fn reset(&mut self) {
        self.stats = BudgetStats::default();
    }
}
