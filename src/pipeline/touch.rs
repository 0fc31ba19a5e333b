use chrono::NaiveDate;

use crate::candle::{Resolution, TouchLabel};
use crate::moves::annotate_candle;
use crate::series::IntradayStore;
use crate::window::{WindowCandle, select};

use super::stage::{DayOutcome, TouchStage};

/// First window candle whose flag at `stage.level` equals `stage.label`,
/// with its index in the window.
pub fn find_touch<'a, 'w>(
    window: &'w [WindowCandle<'a>],
    stage: &TouchStage,
) -> Option<(usize, &'w WindowCandle<'a>)> {
    if stage.label == TouchLabel::Other {
        return None;
    }
    window
        .iter()
        .enumerate()
        .find(|(_, wc)| wc.candle.touches.get(stage.level) == Some(stage.label))
}

/// Level-touch stages read the precomputed 30-minute flags; the outcome
/// carries the annotation of the first flagged candle.
pub fn classify_touch_day(
    store: &IntradayStore,
    date: NaiveDate,
    stage: &TouchStage,
) -> DayOutcome<String> {
    let Some(window) = select(store, date, Resolution::Coarse, &stage.window) else {
        return DayOutcome::MissingData;
    };
    match find_touch(&window, stage) {
        Some((idx, wc)) => DayOutcome::Matched(annotate_candle(
            wc.candle,
            idx,
            wc.session_index,
            stage.numbering,
        )),
        None => DayOutcome::NoMatch,
    }
}
