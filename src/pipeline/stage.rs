use chrono::NaiveDate;
use serde::Serialize;

use std::fmt;

use crate::breakout::{BreakoutCondition, evaluate};
use crate::candle::{Resolution, TouchLabel, TouchLevel};
use crate::moves::{CandleNumbering, StageMove, compute_move};
use crate::series::IntradayStore;
use crate::window::{WindowPolicy, select};

/// The confirmation stages, in the order the pipeline runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StageKind {
    Fine,
    Coarse,
    Flag,
    Untouched,
}

impl StageKind {
    pub fn resolution(&self) -> Resolution {
        match self {
            StageKind::Fine => Resolution::Fine,
            StageKind::Coarse | StageKind::Flag | StageKind::Untouched => Resolution::Coarse,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Fine => write!(f, "5-min confirmation"),
            StageKind::Coarse => write!(f, "30-min confirmation"),
            StageKind::Flag => write!(f, "30M above/below flag"),
            StageKind::Untouched => write!(f, "untouched level flag"),
        }
    }
}

/// Verdict for one day in one stage. Every day gets exactly one.
#[derive(Debug, Clone, PartialEq)]
pub enum DayOutcome<T> {
    Matched(T),
    /// No candles at the stage's resolution (or no opening range).
    MissingData,
    /// Evaluated, including empty windows, without a hit.
    NoMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: StageKind,
    pub passed: usize,
    pub missing_data: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakoutStage {
    pub condition: BreakoutCondition,
    pub window: WindowPolicy,
    pub numbering: CandleNumbering,
}

impl BreakoutStage {
    pub fn new(condition: BreakoutCondition, window: WindowPolicy) -> Self {
        Self {
            condition,
            window,
            numbering: CandleNumbering::Window,
        }
    }

    pub fn describe(&self) -> String {
        format!("{} [{}]", self.condition, self.window.describe())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TouchStage {
    pub level: TouchLevel,
    pub label: TouchLabel,
    pub window: WindowPolicy,
    pub numbering: CandleNumbering,
}

impl TouchStage {
    pub fn new(level: TouchLevel, label: TouchLabel, window: WindowPolicy) -> Self {
        Self {
            level,
            label,
            window,
            numbering: CandleNumbering::Window,
        }
    }

    pub fn describe(&self) -> String {
        format!("{} = {} [{}]", self.level, self.label, self.window.describe())
    }
}

/// Evaluate one day against a breakout stage at `resolution`.
pub fn classify_breakout_day(
    store: &IntradayStore,
    date: NaiveDate,
    resolution: Resolution,
    stage: &BreakoutStage,
) -> DayOutcome<StageMove> {
    let Some(day) = store.day(date, resolution) else {
        return DayOutcome::MissingData;
    };
    let Some(range) = store.opening_range(date) else {
        return DayOutcome::MissingData;
    };
    let Some(window) = select(store, date, resolution, &stage.window) else {
        return DayOutcome::MissingData;
    };

    let found = evaluate(&window, range, stage.condition);
    match compute_move(day, found.as_ref(), stage.numbering) {
        Some(mv) => DayOutcome::Matched(mv),
        None => DayOutcome::NoMatch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candle::Candle;
    use crate::series::DaySeries;
    use chrono::NaiveDateTime;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 8, d).expect("valid date")
    }

    fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
        date(d).and_hms_opt(h, m, 0).expect("valid time")
    }

    fn fine(d: u32, closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let ts = at(d, 9, 15) + chrono::Duration::minutes(5 * i as i64);
                Candle::new(ts, c, c, c, c)
            })
            .collect()
    }

    fn opening(d: u32) -> Candle {
        Candle::new(at(d, 9, 15), 97.0, 100.0, 95.0, 97.0)
    }

    #[test]
    fn test_classify_matched_day_carries_move() {
        let mut closes = vec![97.0; 6];
        closes.extend([98.0, 99.0, 101.0, 97.0, 96.0, 94.0, 105.0]);
        let store = IntradayStore::new(
            DaySeries::from_candles(fine(1, &closes)),
            DaySeries::from_candles(vec![opening(1)]),
        );
        let stage = BreakoutStage::new(
            BreakoutCondition::CloseAboveHigh,
            WindowPolicy::fine_default(),
        );

        let out = classify_breakout_day(&store, date(1), Resolution::Fine, &stage);
        assert_eq!(
            out,
            DayOutcome::Matched(StageMove {
                points: 4.0,
                annotation: "#3 (09:55)".to_string(),
            })
        );
    }

    #[test]
    fn test_classify_missing_fine_data() {
        let store = IntradayStore::new(
            DaySeries::default(),
            DaySeries::from_candles(vec![opening(1)]),
        );
        let stage = BreakoutStage::new(BreakoutCondition::NoBreakout, WindowPolicy::fine_default());
        assert_eq!(
            classify_breakout_day(&store, date(1), Resolution::Fine, &stage),
            DayOutcome::MissingData
        );
    }

    #[test]
    fn test_classify_missing_opening_range() {
        let store = IntradayStore::new(
            DaySeries::from_candles(fine(1, &[97.0; 12])),
            DaySeries::default(),
        );
        let stage = BreakoutStage::new(BreakoutCondition::NoBreakout, WindowPolicy::fine_default());
        assert_eq!(
            classify_breakout_day(&store, date(1), Resolution::Fine, &stage),
            DayOutcome::MissingData
        );
    }

    #[test]
    fn test_classify_empty_window_is_no_match() {
        let store = IntradayStore::new(
            DaySeries::from_candles(fine(1, &[97.0; 3])),
            DaySeries::from_candles(vec![opening(1)]),
        );
        let stage = BreakoutStage::new(BreakoutCondition::NoBreakout, WindowPolicy::fine_default());
        assert_eq!(
            classify_breakout_day(&store, date(1), Resolution::Fine, &stage),
            DayOutcome::NoMatch
        );
    }
}
