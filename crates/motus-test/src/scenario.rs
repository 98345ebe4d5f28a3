//! End-to-end scenarios
//!
//! Drives a full `MotionPipeline` with synthetic frames on a manual clock
//! and condenses the reports into a summary that tests can assert on.

use motus_core::MotusResult;
use motus_motion::MovementPhase;
use motus_predict::PredictiveWarning;
use motus_runtime::{MotionPipeline, MotusConfig};
use motus_time::ManualClock;

use crate::{GeneratorConfig, MovementGenerator};

/// What a scenario run produced
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScenarioSummary {
    pub frames: u64,
    /// Every warning emitted, in order
    pub warnings: Vec<PredictiveWarning>,
    /// Active phase after each change, starting with the initial phase
    pub phases: Vec<MovementPhase>,
    pub valid_coordination_frames: u64,
    pub invalid_coordination_frames: u64,
    /// Mean coordination score over valid frames
    pub mean_score: f64,
    pub max_asymmetry: f64,
    pub prediction_overruns: u64,
    pub coordination_overruns: u64,
}

impl ScenarioSummary {
    pub fn saw_phase(&self, phase: MovementPhase) -> bool {
        self.phases.contains(&phase)
    }
}

/// A pipeline fed by a movement generator
pub struct Scenario {
    clock: ManualClock,
    pipeline: MotionPipeline<ManualClock>,
    generator: MovementGenerator,
}

impl Scenario {
    pub fn new(config: MotusConfig, generator: GeneratorConfig) -> MotusResult<Self> {
        let clock = ManualClock::default();
        Ok(Scenario {
            pipeline: MotionPipeline::with_clock(config, clock.clone())?,
            generator: MovementGenerator::new(generator),
            clock,
        })
    }

    pub fn pipeline(&self) -> &MotionPipeline<ManualClock> {
        &self.pipeline
    }

    /// Process `frames` frames, keeping the clock in step with frame time
    pub fn run(&mut self, frames: u64) -> ScenarioSummary {
        let mut summary = ScenarioSummary {
            phases: vec![self.pipeline.phase_analyzer().current_phase()],
            ..ScenarioSummary::default()
        };
        let mut score_total = 0.0;

        for _ in 0..frames {
            let input = self.generator.next_frame();
            self.clock.set(input.timestamp);

            let report = self.pipeline.process(&input);
            summary.frames += 1;

            if summary.phases.last() != Some(&report.phase.phase) {
                summary.phases.push(report.phase.phase);
            }

            summary.warnings.extend(report.prediction.warnings);

            let coordination = report.coordination;
            if coordination.is_valid {
                summary.valid_coordination_frames += 1;
                score_total += coordination.coordination_score;
                summary.max_asymmetry = summary.max_asymmetry.max(coordination.bilateral.asymmetry);
            } else {
                summary.invalid_coordination_frames += 1;
            }
        }

        if summary.valid_coordination_frames > 0 {
            summary.mean_score = score_total / summary.valid_coordination_frames as f64;
        }
        summary.prediction_overruns = self.pipeline.prediction_engine().budget_stats().overruns;
        summary.coordination_overruns = self.pipeline.coordination_analyzer().budget_stats().overruns;
        summary
    }
}
