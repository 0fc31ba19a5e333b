use serde::{Deserialize, Serialize};

use std::fmt;

use crate::candle::{Candle, Resolution};
use crate::series::OpeningRange;
use crate::window::WindowCandle;

/// Breakout test applied to a window against the opening range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BreakoutCondition {
    #[serde(rename = "Close Above First 30-min High", alias = "close-above-high")]
    CloseAboveHigh,
    #[serde(rename = "Close Below First 30-min Low", alias = "close-below-low")]
    CloseBelowLow,
    #[serde(rename = "No Breakout (Neither)", alias = "no-breakout")]
    NoBreakout,
    #[serde(rename = "Goes Above Close Below", alias = "goes-above-close-below")]
    GoesAboveCloseBelow,
    #[serde(rename = "Goes Below Close Above", alias = "goes-below-close-above")]
    GoesBelowCloseAbove,
}

impl BreakoutCondition {
    pub const ALL: [BreakoutCondition; 5] = [
        BreakoutCondition::CloseAboveHigh,
        BreakoutCondition::CloseBelowLow,
        BreakoutCondition::NoBreakout,
        BreakoutCondition::GoesAboveCloseBelow,
        BreakoutCondition::GoesBelowCloseAbove,
    ];

    /// The wick-rejection conditions are only offered on 30-minute windows.
    pub fn applies_to(&self, resolution: Resolution) -> bool {
        match self {
            BreakoutCondition::CloseAboveHigh
            | BreakoutCondition::CloseBelowLow
            | BreakoutCondition::NoBreakout => true,
            BreakoutCondition::GoesAboveCloseBelow | BreakoutCondition::GoesBelowCloseAbove => {
                resolution == Resolution::Coarse
            }
        }
    }

    pub fn for_resolution(resolution: Resolution) -> Vec<BreakoutCondition> {
        Self::ALL
            .into_iter()
            .filter(|c| c.applies_to(resolution))
            .collect()
    }

    pub fn label(&self) -> &'static str {
        match self {
            BreakoutCondition::CloseAboveHigh => "Close Above First 30-min High",
            BreakoutCondition::CloseBelowLow => "Close Below First 30-min Low",
            BreakoutCondition::NoBreakout => "No Breakout (Neither)",
            BreakoutCondition::GoesAboveCloseBelow => "Goes Above Close Below",
            BreakoutCondition::GoesBelowCloseAbove => "Goes Below Close Above",
        }
    }

    /// Per-candle rule. `NoBreakout` is a whole-window property and never
    /// matches a single candle on its own.
    fn candle_matches(&self, candle: &Candle, range: OpeningRange) -> bool {
        match self {
            BreakoutCondition::CloseAboveHigh => candle.close > range.high,
            BreakoutCondition::CloseBelowLow => candle.close < range.low,
            BreakoutCondition::GoesAboveCloseBelow => {
                candle.high > range.high && candle.close < range.high
            }
            BreakoutCondition::GoesBelowCloseAbove => {
                candle.low < range.low && candle.close > range.low
            }
            BreakoutCondition::NoBreakout => false,
        }
    }
}

impl fmt::Display for BreakoutCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The candle that satisfied a condition. `None` from [`evaluate`] is the
/// unmatched result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakoutMatch<'a> {
    pub candle: &'a Candle,
    pub index_in_window: usize,
    pub session_index: usize,
}

impl<'a> BreakoutMatch<'a> {
    fn at(window: &[WindowCandle<'a>], index_in_window: usize) -> Option<Self> {
        let wc = window.get(index_in_window)?;
        Some(Self {
            candle: wc.candle,
            index_in_window,
            session_index: wc.session_index,
        })
    }
}

/// True when every close of the window stays inside `[low, high]`.
pub fn window_stays_inside(window: &[WindowCandle<'_>], range: OpeningRange) -> bool {
    window
        .iter()
        .all(|wc| wc.candle.close <= range.high && wc.candle.close >= range.low)
}

/// Scan `window` in its given order and return the first candle that
/// satisfies `condition`. An empty window never matches.
pub fn evaluate<'a>(
    window: &[WindowCandle<'a>],
    range: OpeningRange,
    condition: BreakoutCondition,
) -> Option<BreakoutMatch<'a>> {
    if window.is_empty() {
        return None;
    }

    if condition == BreakoutCondition::NoBreakout {
        // Reported against the window's first element; no candle caused it.
        return if window_stays_inside(window, range) {
            BreakoutMatch::at(window, 0)
        } else {
            None
        };
    }

    window
        .iter()
        .position(|wc| condition.candle_matches(wc.candle, range))
        .and_then(|idx| BreakoutMatch::at(window, idx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use proptest::prelude::*;

    fn at(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 8, 1)
            .and_then(|d| d.and_hms_opt(9, 45, 0))
            .expect("valid datetime")
            + chrono::Duration::minutes(5 * i as i64)
    }

    fn closes(values: &[f64]) -> Vec<Candle> {
        values
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(at(i), c, c, c, c))
            .collect()
    }

    fn window(candles: &[Candle]) -> Vec<WindowCandle<'_>> {
        candles
            .iter()
            .enumerate()
            .map(|(i, candle)| WindowCandle {
                session_index: i + 6,
                candle,
            })
            .collect()
    }

    const RANGE: OpeningRange = OpeningRange {
        high: 100.0,
        low: 95.0,
    };

    #[test]
    fn test_close_above_high_first_match_wins() {
        let candles = closes(&[98.0, 99.0, 101.0, 97.0, 96.0, 94.0]);
        let w = window(&candles);

        let m = evaluate(&w, RANGE, BreakoutCondition::CloseAboveHigh).expect("match");
        assert_eq!(m.index_in_window, 2);
        assert_eq!(m.session_index, 8);
        assert_eq!(m.candle.close, 101.0);
    }

    #[test]
    fn test_no_breakout_fails_when_any_close_leaves_range() {
        let candles = closes(&[98.0, 99.0, 101.0, 97.0, 96.0, 94.0]);
        let w = window(&candles);
        assert!(evaluate(&w, RANGE, BreakoutCondition::NoBreakout).is_none());
    }

    #[test]
    fn test_no_breakout_reports_first_window_element() {
        let candles = closes(&[98.0, 100.0, 95.0, 97.0]);
        let w = window(&candles);

        let m = evaluate(&w, RANGE, BreakoutCondition::NoBreakout).expect("match");
        assert_eq!(m.index_in_window, 0);
        assert_eq!(m.candle.close, 98.0);
    }

    #[test]
    fn test_close_below_low_is_strict() {
        let candles = closes(&[95.0, 94.99]);
        let w = window(&candles);

        let m = evaluate(&w, RANGE, BreakoutCondition::CloseBelowLow).expect("match");
        assert_eq!(m.index_in_window, 1);
    }

    #[test]
    fn test_goes_above_close_below_needs_wick_and_close() {
        let ts = at(0);
        let candles = vec![
            Candle::new(ts, 99.0, 100.0, 98.0, 99.5),  // wick only touches
            Candle::new(ts, 99.0, 102.0, 98.0, 101.0), // closes above
            Candle::new(ts, 99.0, 102.0, 98.0, 99.0),  // rejection
        ];
        let w = window(&candles);

        let m = evaluate(&w, RANGE, BreakoutCondition::GoesAboveCloseBelow).expect("match");
        assert_eq!(m.index_in_window, 2);
    }

    #[test]
    fn test_goes_below_close_above_needs_wick_and_close() {
        let ts = at(0);
        let candles = vec![
            Candle::new(ts, 96.0, 97.0, 93.0, 94.0),
            Candle::new(ts, 96.0, 97.0, 94.0, 96.0),
        ];
        let w = window(&candles);

        let m = evaluate(&w, RANGE, BreakoutCondition::GoesBelowCloseAbove).expect("match");
        assert_eq!(m.index_in_window, 1);
    }

    #[test]
    fn test_empty_window_never_matches() {
        for condition in BreakoutCondition::ALL {
            assert!(evaluate(&[], RANGE, condition).is_none());
        }
    }

    #[test]
    fn test_scan_follows_window_order() {
        let candles = closes(&[101.0, 102.0]);
        let w = vec![
            WindowCandle {
                session_index: 1,
                candle: &candles[1],
            },
            WindowCandle {
                session_index: 0,
                candle: &candles[0],
            },
        ];

        let m = evaluate(&w, RANGE, BreakoutCondition::CloseAboveHigh).expect("match");
        assert_eq!(m.candle.close, 102.0);
        assert_eq!(m.session_index, 1);
    }

    #[test]
    fn test_fine_resolution_only_offers_close_conditions() {
        assert_eq!(
            BreakoutCondition::for_resolution(Resolution::Fine),
            vec![
                BreakoutCondition::CloseAboveHigh,
                BreakoutCondition::CloseBelowLow,
                BreakoutCondition::NoBreakout,
            ]
        );
        assert_eq!(BreakoutCondition::for_resolution(Resolution::Coarse).len(), 5);
    }

    proptest! {
        #[test]
        fn prop_no_breakout_ignores_window_order(
            (values, order) in prop::collection::vec(90.0f64..105.0, 1..20).prop_flat_map(|v| {
                let positions: Vec<usize> = (0..v.len()).collect();
                (Just(v), Just(positions).prop_shuffle())
            }),
        ) {
            let candles = closes(&values);
            let w = window(&candles);
            let shuffled: Vec<WindowCandle<'_>> = order.iter().map(|&i| w[i]).collect();

            let a = evaluate(&w, RANGE, BreakoutCondition::NoBreakout).is_some();
            let b = evaluate(&shuffled, RANGE, BreakoutCondition::NoBreakout).is_some();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_close_above_and_below_never_share_a_candle(
            close in 80.0f64..120.0,
            low in 80.0f64..120.0,
            spread in 0.0f64..20.0,
        ) {
            let range = OpeningRange { high: low + spread, low };
            let candles = closes(&[close]);
            let w = window(&candles);

            let above = evaluate(&w, range, BreakoutCondition::CloseAboveHigh).is_some();
            let below = evaluate(&w, range, BreakoutCondition::CloseBelowLow).is_some();
            prop_assert!(!(above && below));
        }
    }
}
