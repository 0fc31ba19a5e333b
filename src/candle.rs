use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use std::fmt;

/// Bar size of an intraday series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    /// 5-minute candles
    Fine,
    /// 30-minute candles
    Coarse,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Fine => write!(f, "5-min"),
            Resolution::Coarse => write!(f, "30-min"),
        }
    }
}

/// Precomputed per-candle label describing how price interacted with a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TouchLabel {
    #[serde(rename = "Touch & Close Above")]
    TouchCloseAbove,
    #[serde(rename = "Touch & Close Below")]
    TouchCloseBelow,
    #[serde(rename = "No Touch")]
    NoTouch,
    /// Anything we do not recognise. Never equal to a requested label.
    #[serde(other)]
    Other,
}

impl TouchLabel {
    pub const ALL: [TouchLabel; 3] = [
        TouchLabel::TouchCloseAbove,
        TouchLabel::TouchCloseBelow,
        TouchLabel::NoTouch,
    ];

    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "Touch & Close Above" => TouchLabel::TouchCloseAbove,
            "Touch & Close Below" => TouchLabel::TouchCloseBelow,
            "No Touch" => TouchLabel::NoTouch,
            _ => TouchLabel::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TouchLabel::TouchCloseAbove => "Touch & Close Above",
            TouchLabel::TouchCloseBelow => "Touch & Close Below",
            TouchLabel::NoTouch => "No Touch",
            TouchLabel::Other => "Other",
        }
    }
}

impl fmt::Display for TouchLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Reference level a touch flag refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TouchLevel {
    High,
    Mid,
    Low,
    #[serde(rename = "Untouched High")]
    UntouchedHigh,
    #[serde(rename = "Untouched Mid")]
    UntouchedMid,
    #[serde(rename = "Untouched Low")]
    UntouchedLow,
}

impl TouchLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "High" => Some(TouchLevel::High),
            "Mid" => Some(TouchLevel::Mid),
            "Low" => Some(TouchLevel::Low),
            "Untouched High" => Some(TouchLevel::UntouchedHigh),
            "Untouched Mid" => Some(TouchLevel::UntouchedMid),
            "Untouched Low" => Some(TouchLevel::UntouchedLow),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TouchLevel::High => "High",
            TouchLevel::Mid => "Mid",
            TouchLevel::Low => "Low",
            TouchLevel::UntouchedHigh => "Untouched High",
            TouchLevel::UntouchedMid => "Untouched Mid",
            TouchLevel::UntouchedLow => "Untouched Low",
        }
    }

    pub fn is_untouched(&self) -> bool {
        matches!(
            self,
            TouchLevel::UntouchedHigh | TouchLevel::UntouchedMid | TouchLevel::UntouchedLow
        )
    }
}

impl fmt::Display for TouchLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchFlags {
    pub high: Option<TouchLabel>,
    pub mid: Option<TouchLabel>,
    pub low: Option<TouchLabel>,
    pub untouched_high: Option<TouchLabel>,
    pub untouched_mid: Option<TouchLabel>,
    pub untouched_low: Option<TouchLabel>,
}

impl TouchFlags {
    pub fn get(&self, level: TouchLevel) -> Option<TouchLabel> {
        match level {
            TouchLevel::High => self.high,
            TouchLevel::Mid => self.mid,
            TouchLevel::Low => self.low,
            TouchLevel::UntouchedHigh => self.untouched_high,
            TouchLevel::UntouchedMid => self.untouched_mid,
            TouchLevel::UntouchedLow => self.untouched_low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub ts: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub touches: TouchFlags,
}

impl Candle {
    pub fn new(ts: NaiveDateTime, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            ts,
            open,
            high,
            low,
            close,
            touches: TouchFlags::default(),
        }
    }

    pub fn with_touches(mut self, touches: TouchFlags) -> Self {
        self.touches = touches;
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.ts.date()
    }

    pub fn time(&self) -> NaiveTime {
        self.ts.time()
    }

    /// `HH:MM` of the candle's timestamp.
    pub fn clock(&self) -> String {
        self.ts.format("%H:%M").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_label_parse_known_labels() {
        for label in TouchLabel::ALL {
            assert_eq!(TouchLabel::parse(label.label()), label);
        }
    }

    #[test]
    fn test_touch_label_parse_unknown_is_other() {
        assert_eq!(TouchLabel::parse("touch and close above"), TouchLabel::Other);
        assert_eq!(TouchLabel::parse(""), TouchLabel::Other);
    }

    #[test]
    fn test_touch_label_parse_trims_whitespace() {
        assert_eq!(TouchLabel::parse("  No Touch "), TouchLabel::NoTouch);
    }

    #[test]
    fn test_touch_level_roundtrips_labels() {
        for level in [
            TouchLevel::High,
            TouchLevel::Mid,
            TouchLevel::Low,
            TouchLevel::UntouchedHigh,
            TouchLevel::UntouchedMid,
            TouchLevel::UntouchedLow,
        ] {
            assert_eq!(TouchLevel::parse(level.label()), Some(level));
        }
        assert_eq!(TouchLevel::parse("Any"), None);
    }

    #[test]
    fn test_touch_flags_get_returns_flag_for_level() {
        let flags = TouchFlags {
            mid: Some(TouchLabel::NoTouch),
            untouched_low: Some(TouchLabel::TouchCloseBelow),
            ..TouchFlags::default()
        };
        assert_eq!(flags.get(TouchLevel::Mid), Some(TouchLabel::NoTouch));
        assert_eq!(
            flags.get(TouchLevel::UntouchedLow),
            Some(TouchLabel::TouchCloseBelow)
        );
        assert_eq!(flags.get(TouchLevel::High), None);
    }

    #[test]
    fn test_candle_clock_formats_hours_and_minutes() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(9, 5, 59))
            .expect("valid datetime");
        let c = Candle::new(ts, 1.0, 2.0, 0.5, 1.5);
        assert_eq!(c.clock(), "09:05");
    }
}
