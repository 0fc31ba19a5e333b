//! Day-set filter pipeline.
//!
//! `AllDays -> categorical filter -> 5-min -> 30-min -> flag -> untouched`.
//! Each stage is a pure `(days, stage) -> (days', report)` function over the
//! day set it receives; a disabled stage is simply skipped.

mod stage;
mod touch;

pub use stage::{
    BreakoutStage, DayOutcome, StageKind, StageReport, TouchStage, classify_breakout_day,
};
pub use touch::{classify_touch_day, find_touch};

use serde::Serialize;

use crate::records::{CategoryFilter, DailyRecord, DailyTable};
use crate::series::IntradayStore;

/// Complete, host-independent description of one analysis pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineConfig {
    pub filter: CategoryFilter,
    pub fine: Option<BreakoutStage>,
    pub coarse: Option<BreakoutStage>,
    pub flag: Option<TouchStage>,
    pub untouched: Option<TouchStage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    /// Days left after the categorical filter, before any stage ran.
    pub category_matches: usize,
    pub days: Vec<DailyRecord>,
    pub reports: Vec<StageReport>,
}

/// Keep the days `classify` matches, attaching the stage's result to each.
fn filter_days<T>(
    days: Vec<DailyRecord>,
    kind: StageKind,
    classify: impl Fn(&DailyRecord) -> DayOutcome<T>,
    attach: impl Fn(&mut DailyRecord, T),
) -> (Vec<DailyRecord>, StageReport) {
    let mut report = StageReport {
        stage: kind,
        passed: 0,
        missing_data: 0,
    };
    let mut kept = Vec::with_capacity(days.len());

    for mut day in days {
        match classify(&day) {
            DayOutcome::Matched(value) => {
                attach(&mut day, value);
                report.passed += 1;
                kept.push(day);
            }
            DayOutcome::MissingData => {
                log::debug!("{kind}: no intraday data for {}", day.date);
                report.missing_data += 1;
            }
            DayOutcome::NoMatch => {}
        }
    }

    log::info!(
        "{kind}: {} passed, {} missing data",
        report.passed,
        report.missing_data
    );
    (kept, report)
}

/// 5-minute or 30-minute breakout confirmation.
pub fn apply_breakout_stage(
    days: Vec<DailyRecord>,
    store: &IntradayStore,
    kind: StageKind,
    stage: &BreakoutStage,
) -> (Vec<DailyRecord>, StageReport) {
    let resolution = kind.resolution();
    filter_days(
        days,
        kind,
        |day| classify_breakout_day(store, day.date, resolution, stage),
        |day, mv| match kind {
            StageKind::Fine => day.derived.set_fine(mv.points, mv.annotation),
            _ => day.derived.set_coarse(mv.points, mv.annotation),
        },
    )
}

/// Flag or untouched-flag confirmation.
pub fn apply_touch_stage(
    days: Vec<DailyRecord>,
    store: &IntradayStore,
    kind: StageKind,
    stage: &TouchStage,
) -> (Vec<DailyRecord>, StageReport) {
    filter_days(
        days,
        kind,
        |day| classify_touch_day(store, day.date, stage),
        |day, info| match kind {
            StageKind::Untouched => day.derived.untouched_info = Some(info),
            _ => day.derived.flag_info = Some(info),
        },
    )
}

/// Run the whole pass. The table and store are only read.
pub fn run(table: &DailyTable, store: &IntradayStore, config: &PipelineConfig) -> PipelineOutput {
    let mut days = table.filter(&config.filter);
    let category_matches = days.len();
    log::info!(
        "categorical filter kept {} of {} days",
        category_matches,
        table.len()
    );

    let mut reports = Vec::new();

    if let Some(stage) = &config.fine {
        let (kept, report) = apply_breakout_stage(days, store, StageKind::Fine, stage);
        days = kept;
        reports.push(report);
    }
    if let Some(stage) = &config.coarse {
        let (kept, report) = apply_breakout_stage(days, store, StageKind::Coarse, stage);
        days = kept;
        reports.push(report);
    }
    if let Some(stage) = &config.flag {
        let (kept, report) = apply_touch_stage(days, store, StageKind::Flag, stage);
        days = kept;
        reports.push(report);
    }
    if let Some(stage) = &config.untouched {
        let (kept, report) = apply_touch_stage(days, store, StageKind::Untouched, stage);
        days = kept;
        reports.push(report);
    }

    PipelineOutput {
        category_matches,
        days,
        reports,
    }
}
