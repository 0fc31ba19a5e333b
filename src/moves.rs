use serde::{Deserialize, Serialize};

use crate::breakout::BreakoutMatch;
use crate::candle::Candle;
use crate::records::Direction;

/// Which count the `#N` of an annotation uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandleNumbering {
    /// Position inside the evaluated window.
    #[default]
    Window,
    /// Position inside the whole day at that resolution.
    Session,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageMove {
    pub points: f64,
    pub annotation: String,
}

impl StageMove {
    pub fn direction(&self) -> Direction {
        Direction::from_move(self.points)
    }
}

/// Two decimals, exact halves to the even digit.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// `#N (HH:MM)` for the matched candle.
pub fn annotate(found: &BreakoutMatch<'_>, numbering: CandleNumbering) -> String {
    annotate_candle(
        found.candle,
        found.index_in_window,
        found.session_index,
        numbering,
    )
}

pub fn annotate_candle(
    candle: &Candle,
    index_in_window: usize,
    session_index: usize,
    numbering: CandleNumbering,
) -> String {
    let number = match numbering {
        CandleNumbering::Window => index_in_window + 1,
        CandleNumbering::Session => session_index + 1,
    };
    format!("#{} ({})", number, candle.clock())
}

/// Points from the matched candle's close to the session close.
///
/// `day` must be the full chronological series at the window's resolution;
/// its last candle is the session close, whatever the window covered.
pub fn compute_move(
    day: &[Candle],
    found: Option<&BreakoutMatch<'_>>,
    numbering: CandleNumbering,
) -> Option<StageMove> {
    let found = found?;
    let last = day.last()?;
    Some(StageMove {
        points: round2(last.close - found.candle.close),
        annotation: annotate(found, numbering),
    })
}
