use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;

use crate::candle::{Candle, Resolution};
use crate::series::IntradayStore;

/// Default 5-minute search window (09:45-10:10).
pub const FINE_WINDOW_START: (u32, u32) = (9, 45);
pub const FINE_WINDOW_END: (u32, u32) = (10, 10);
/// End of the 5-minute window when searching beyond 10:10.
pub const FINE_WINDOW_EXTENDED_END: (u32, u32) = (15, 30);
/// Bounds of the "all candles" session window.
pub const SESSION_START: (u32, u32) = (9, 15);
pub const SESSION_END: (u32, u32) = (15, 15);

/// Opening candles skipped by the index-offset policy, and how many follow.
pub const OPENING_CANDLES: usize = 6;
pub const OFFSET_WINDOW_LEN: usize = 6;

fn hm((h, m): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

/// How the candles of one day are picked for evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum WindowPolicy {
    /// Candles with `start <= time <= end`, chronological.
    TimeRange { start: NaiveTime, end: NaiveTime },
    /// Day positions `skip .. skip + len` (0-based), chronological.
    IndexOffset { skip: usize, len: usize },
    /// 1-based candle numbers, in the caller's order.
    CandleNumbers(Vec<usize>),
    /// Every candle between 09:15 and 15:15.
    FullSession,
}

impl WindowPolicy {
    pub fn fine_default() -> Self {
        WindowPolicy::TimeRange {
            start: hm(FINE_WINDOW_START),
            end: hm(FINE_WINDOW_END),
        }
    }

    pub fn fine_extended() -> Self {
        WindowPolicy::TimeRange {
            start: hm(FINE_WINDOW_START),
            end: hm(FINE_WINDOW_EXTENDED_END),
        }
    }

    pub fn after_opening() -> Self {
        WindowPolicy::IndexOffset {
            skip: OPENING_CANDLES,
            len: OFFSET_WINDOW_LEN,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            WindowPolicy::TimeRange { start, end } => {
                format!("{}-{}", start.format("%H:%M"), end.format("%H:%M"))
            }
            WindowPolicy::IndexOffset { skip, len } => {
                format!("positions {}..{}", skip, skip.saturating_add(*len))
            }
            WindowPolicy::CandleNumbers(numbers) => format!("candles {:?}", numbers),
            WindowPolicy::FullSession => "auto (09:15-15:15)".to_string(),
        }
    }
}

/// A window element together with its 0-based position in the full day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowCandle<'a> {
    pub session_index: usize,
    pub candle: &'a Candle,
}

fn time_range<'a>(day: &'a [Candle], start: NaiveTime, end: NaiveTime) -> Vec<WindowCandle<'a>> {
    day.iter()
        .enumerate()
        .filter(|(_, c)| {
            let t = c.time();
            t >= start && t <= end
        })
        .map(|(session_index, candle)| WindowCandle {
            session_index,
            candle,
        })
        .collect()
}

/// Pick the window out of one day's chronologically ordered candles.
pub fn select_from_day<'a>(day: &'a [Candle], policy: &WindowPolicy) -> Vec<WindowCandle<'a>> {
    match policy {
        WindowPolicy::TimeRange { start, end } => time_range(day, *start, *end),
        WindowPolicy::FullSession => time_range(day, hm(SESSION_START), hm(SESSION_END)),
        WindowPolicy::IndexOffset { skip, len } => day
            .iter()
            .enumerate()
            .skip(*skip)
            .take(*len)
            .map(|(session_index, candle)| WindowCandle {
                session_index,
                candle,
            })
            .collect(),
        WindowPolicy::CandleNumbers(numbers) => numbers
            .iter()
            .filter_map(|&n| {
                let session_index = n.checked_sub(1)?;
                day.get(session_index).map(|candle| WindowCandle {
                    session_index,
                    candle,
                })
            })
            .collect(),
    }
}

/// Window of `date` at `resolution`.
///
/// Returns None when the day has no candles at that resolution, which callers
/// report as missing data. `Some(vec![])` is a present day whose window is
/// empty and counts as an ordinary non-match.
pub fn select<'a>(
    store: &'a IntradayStore,
    date: NaiveDate,
    resolution: Resolution,
    policy: &WindowPolicy,
) -> Option<Vec<WindowCandle<'a>>> {
    let day = store.day(date, resolution)?;
    Some(select_from_day(day, policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::DaySeries;
    use chrono::NaiveDateTime;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).expect("valid date")
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        date().and_hms_opt(h, m, 0).expect("valid time")
    }

    /// 5-minute session from 09:15, `n` candles, close = position.
    fn fine_day(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let ts = at(9, 15) + chrono::Duration::minutes(5 * i as i64);
                Candle::new(ts, i as f64, i as f64, i as f64, i as f64)
            })
            .collect()
    }

    fn positions(w: &[WindowCandle<'_>]) -> Vec<usize> {
        w.iter().map(|c| c.session_index).collect()
    }

    #[test]
    fn test_fine_default_window_is_inclusive_0945_to_1010() {
        let day = fine_day(75);
        let w = select_from_day(&day, &WindowPolicy::fine_default());

        assert_eq!(w.first().map(|c| c.candle.ts), Some(at(9, 45)));
        assert_eq!(w.last().map(|c| c.candle.ts), Some(at(10, 10)));
        assert_eq!(w.len(), 6);
    }

    #[test]
    fn test_fine_extended_window_runs_to_1530() {
        let day = fine_day(75);
        let w = select_from_day(&day, &WindowPolicy::fine_extended());

        assert_eq!(w.first().map(|c| c.candle.ts), Some(at(9, 45)));
        assert_eq!(w.last().map(|c| c.candle.ts), Some(at(15, 25)));
    }

    #[test]
    fn test_index_offset_takes_positions_6_to_11() {
        let day = fine_day(75);
        let w = select_from_day(&day, &WindowPolicy::after_opening());
        assert_eq!(positions(&w), vec![6, 7, 8, 9, 10, 11]);
    }

    #[test]
    fn test_index_offset_and_time_range_differ_on_gappy_session() {
        // 09:20 is missing, so position 6 is 09:50 rather than 09:45
        let day: Vec<Candle> = fine_day(20)
            .into_iter()
            .filter(|c| c.ts != at(9, 20))
            .collect();

        let by_time = select_from_day(&day, &WindowPolicy::fine_default());
        let by_index = select_from_day(&day, &WindowPolicy::after_opening());

        assert_eq!(by_time[0].candle.ts, at(9, 45));
        assert_eq!(by_index[0].candle.ts, at(9, 50));
    }

    #[test]
    fn test_index_offset_truncates_short_day() {
        let day = fine_day(8);
        let w = select_from_day(&day, &WindowPolicy::after_opening());
        assert_eq!(positions(&w), vec![6, 7]);
    }

    #[test]
    fn test_candle_numbers_drop_out_of_range() {
        let day = fine_day(3);
        let w = select_from_day(&day, &WindowPolicy::CandleNumbers(vec![2, 4]));
        assert_eq!(positions(&w), vec![1]);
    }

    #[test]
    fn test_candle_numbers_drop_zero_and_keep_caller_order() {
        let day = fine_day(10);
        let w = select_from_day(&day, &WindowPolicy::CandleNumbers(vec![5, 0, 2, 5]));
        assert_eq!(positions(&w), vec![4, 1, 4]);
    }

    #[test]
    fn test_full_session_excludes_candles_after_1515() {
        let day = fine_day(75);
        let w = select_from_day(&day, &WindowPolicy::FullSession);

        assert_eq!(w.first().map(|c| c.candle.ts), Some(at(9, 15)));
        assert_eq!(w.last().map(|c| c.candle.ts), Some(at(15, 15)));
    }

    #[test]
    fn test_describe_index_offset_with_huge_len() {
        let policy = WindowPolicy::IndexOffset {
            skip: 6,
            len: usize::MAX,
        };
        assert_eq!(policy.describe(), format!("positions 6..{}", usize::MAX));
        assert_eq!(WindowPolicy::after_opening().describe(), "positions 6..12");
    }

    #[test]
    fn test_select_distinguishes_missing_day_from_empty_window() {
        let store = IntradayStore::new(DaySeries::from_candles(fine_day(3)), DaySeries::default());

        let missing = select(&store, date(), Resolution::Coarse, &WindowPolicy::FullSession);
        assert!(missing.is_none());

        let empty = select(
            &store,
            date(),
            Resolution::Fine,
            &WindowPolicy::CandleNumbers(vec![7]),
        );
        assert_eq!(empty.map(|w| w.len()), Some(0));
    }
}
