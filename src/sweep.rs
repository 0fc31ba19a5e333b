use rayon::prelude::*;
use serde::Serialize;

use crate::accuracy::{DirectionSummary, summarize};
use crate::breakout::BreakoutCondition;
use crate::candle::Resolution;
use crate::pipeline::{BreakoutStage, PipelineConfig, StageKind};
use crate::records::Direction;
use crate::session::Session;
use crate::window::WindowPolicy;

/// Highest 30-minute candle number tried on its own.
pub const MAX_COARSE_CANDLE: usize = 13;

/// One confirmation-stage variant to evaluate on top of the base filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepJob {
    pub kind: StageKind,
    pub stage: BreakoutStage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepResult {
    pub job: SweepJob,
    pub passed: usize,
    pub missing_data: usize,
    /// Split of the days' own direction.
    pub day_direction: DirectionSummary,
    /// Split of the stage's move direction.
    pub stage_direction: DirectionSummary,
}

fn fine_windows() -> Vec<WindowPolicy> {
    vec![
        WindowPolicy::fine_default(),
        WindowPolicy::fine_extended(),
        WindowPolicy::after_opening(),
    ]
}

fn coarse_windows() -> Vec<WindowPolicy> {
    let mut windows = vec![WindowPolicy::FullSession];
    windows.extend((2..=MAX_COARSE_CANDLE).map(|n| WindowPolicy::CandleNumbers(vec![n])));
    windows
}

/// Every applicable condition crossed with every window, 5-min jobs first.
pub fn generate_sweep_jobs() -> Vec<SweepJob> {
    let mut jobs = Vec::new();
    for (kind, windows) in [
        (StageKind::Fine, fine_windows()),
        (StageKind::Coarse, coarse_windows()),
    ] {
        let resolution: Resolution = kind.resolution();
        for condition in BreakoutCondition::for_resolution(resolution) {
            for window in &windows {
                jobs.push(SweepJob {
                    kind,
                    stage: BreakoutStage::new(condition, window.clone()),
                });
            }
        }
    }
    jobs
}

fn job_config(base: &PipelineConfig, job: &SweepJob) -> PipelineConfig {
    let mut config = PipelineConfig {
        filter: base.filter.clone(),
        ..PipelineConfig::default()
    };
    match job.kind {
        StageKind::Fine => config.fine = Some(job.stage.clone()),
        _ => config.coarse = Some(job.stage.clone()),
    }
    config
}

fn evaluate_job(session: &Session, base: &PipelineConfig, job: &SweepJob) -> SweepResult {
    let output = session.run(&job_config(base, job));
    let report = output.reports.first().copied();
    let stage_moves = output.days.iter().filter_map(|d| match job.kind {
        StageKind::Fine => d.derived.fine_move,
        _ => d.derived.coarse_move,
    });

    SweepResult {
        job: job.clone(),
        passed: report.map(|r| r.passed).unwrap_or_default(),
        missing_data: report.map(|r| r.missing_data).unwrap_or_default(),
        day_direction: summarize(&output.days).direction,
        stage_direction: DirectionSummary::from_directions(stage_moves.map(Direction::from_move)),
    }
}

/// Jobs are independent passes over the shared session; results keep job order.
pub fn run_sweep(session: &Session, base: &PipelineConfig, jobs: &[SweepJob]) -> Vec<SweepResult> {
    jobs.par_iter()
        .map(|job| evaluate_job(session, base, job))
        .collect()
}
