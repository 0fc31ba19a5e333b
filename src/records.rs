use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use std::collections::BTreeSet;
use std::fmt;

/// Directional call of a day or of a confirmation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
    /// Zero move; rendered as an empty cell.
    Flat,
}

impl Direction {
    pub fn from_move(value: f64) -> Self {
        if value > 0.0 {
            Direction::Long
        } else if value < 0.0 {
            Direction::Short
        } else {
            Direction::Flat
        }
    }

    /// Parses the summary sheet's direction column. Unknown text is None.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Long" => Some(Direction::Long),
            "Short" => Some(Direction::Short),
            "" => Some(Direction::Flat),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Long => "Long",
            Direction::Short => "Short",
            Direction::Flat => "",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bucket of the previous session's percentage move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrevMoveBucket {
    VeryStrongLong,
    ModerateLong,
    LongSideways,
    ShortSideways,
    ModerateShort,
    VeryStrongShort,
    /// Exactly zero move (labelled "None" in the sheet).
    Unchanged,
    Other,
}

impl PrevMoveBucket {
    /// Buckets offered by the filter selector, in display order.
    pub const SELECTABLE: [PrevMoveBucket; 7] = [
        PrevMoveBucket::VeryStrongLong,
        PrevMoveBucket::ModerateLong,
        PrevMoveBucket::LongSideways,
        PrevMoveBucket::ShortSideways,
        PrevMoveBucket::ModerateShort,
        PrevMoveBucket::VeryStrongShort,
        PrevMoveBucket::Unchanged,
    ];

    /// Classify a percentage move. The branch order matters: zero is only
    /// reached after both open intervals around it were rejected, and NaN
    /// falls through to `Other`.
    pub fn categorize(m: f64) -> Self {
        if m >= 1.0 {
            PrevMoveBucket::VeryStrongLong
        } else if 0.4 < m && m < 1.0 {
            PrevMoveBucket::ModerateLong
        } else if 0.0 < m && m <= 0.4 {
            PrevMoveBucket::LongSideways
        } else if -0.4 <= m && m < 0.0 {
            PrevMoveBucket::ShortSideways
        } else if -1.0 < m && m < -0.4 {
            PrevMoveBucket::ModerateShort
        } else if m <= -1.0 {
            PrevMoveBucket::VeryStrongShort
        } else if m == 0.0 {
            PrevMoveBucket::Unchanged
        } else {
            PrevMoveBucket::Other
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PrevMoveBucket::VeryStrongLong => "Very Strong Long",
            PrevMoveBucket::ModerateLong => "Moderate Long",
            PrevMoveBucket::LongSideways => "Long Sideways",
            PrevMoveBucket::ShortSideways => "Short Sideways",
            PrevMoveBucket::ModerateShort => "Moderate Short",
            PrevMoveBucket::VeryStrongShort => "Very Strong Short",
            PrevMoveBucket::Unchanged => "None",
            PrevMoveBucket::Other => "Other",
        }
    }

    pub fn display_label(&self) -> &'static str {
        match self {
            PrevMoveBucket::VeryStrongLong => "Very Strong Long (>= 1.00%)",
            PrevMoveBucket::ModerateLong => "Moderate Long (0.40% to 1.00%)",
            PrevMoveBucket::LongSideways => "Long Sideways (0% to +0.40%)",
            PrevMoveBucket::ShortSideways => "Short Sideways (0% to -0.40%)",
            PrevMoveBucket::ModerateShort => "Moderate Short (-0.40% to -1.00%)",
            PrevMoveBucket::VeryStrongShort => "Very Strong Short (<= -1.00%)",
            PrevMoveBucket::Unchanged => "None (0%)",
            PrevMoveBucket::Other => "Other",
        }
    }

    /// Accepts either the sheet label or the selector's display label.
    /// Unknown text maps to `Other`.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        PrevMoveBucket::SELECTABLE
            .into_iter()
            .find(|b| b.label() == s || b.display_label() == s)
            .unwrap_or(PrevMoveBucket::Other)
    }
}

impl fmt::Display for PrevMoveBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Columns appended by the confirmation stages. A column stays None unless
/// the stage that owns it ran and matched the day.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageColumns {
    #[serde(rename = "5_move", skip_serializing_if = "Option::is_none")]
    pub fine_move: Option<f64>,
    #[serde(rename = "5_candle_info", skip_serializing_if = "Option::is_none")]
    pub fine_info: Option<String>,
    #[serde(rename = "5_direction", skip_serializing_if = "Option::is_none")]
    pub fine_direction: Option<Direction>,
    #[serde(rename = "30_move", skip_serializing_if = "Option::is_none")]
    pub coarse_move: Option<f64>,
    #[serde(rename = "candle_info", skip_serializing_if = "Option::is_none")]
    pub coarse_info: Option<String>,
    #[serde(rename = "flag_candle_info", skip_serializing_if = "Option::is_none")]
    pub flag_info: Option<String>,
    #[serde(rename = "untouched_candle_info", skip_serializing_if = "Option::is_none")]
    pub untouched_info: Option<String>,
}

impl StageColumns {
    /// Record the 5-minute stage result; the direction always follows the move.
    pub fn set_fine(&mut self, points: f64, info: String) {
        self.fine_move = Some(points);
        self.fine_info = Some(info);
        self.fine_direction = Some(Direction::from_move(points));
    }

    pub fn set_coarse(&mut self, points: f64, info: String) {
        self.coarse_move = Some(points);
        self.coarse_info = Some(info);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub signal: Option<String>,
    pub candle_shape: Option<String>,
    pub prev_move: Option<PrevMoveBucket>,
    #[serde(rename = "move")]
    pub day_move: f64,
    pub direction: Option<Direction>,
    #[serde(flatten)]
    pub derived: StageColumns,
}

impl DailyRecord {
    pub fn new(date: NaiveDate, day_move: f64) -> Self {
        Self {
            date,
            signal: None,
            candle_shape: None,
            prev_move: None,
            day_move,
            direction: Some(Direction::from_move(day_move)),
            derived: StageColumns::default(),
        }
    }

    /// The 5-minute stage's own directional call (`5_direction`).
    pub fn fine_direction(&self) -> Option<Direction> {
        self.derived.fine_direction
    }
}

/// Categorical selection; `None` means "Any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryFilter {
    pub signal: Option<String>,
    pub candle_shape: Option<String>,
    pub prev_move: Option<PrevMoveBucket>,
}

impl CategoryFilter {
    pub fn matches(&self, record: &DailyRecord) -> bool {
        let signal_ok = match &self.signal {
            Some(wanted) => record.signal.as_deref() == Some(wanted.as_str()),
            None => true,
        };
        let shape_ok = match &self.candle_shape {
            Some(wanted) => record.candle_shape.as_deref() == Some(wanted.as_str()),
            None => true,
        };
        let prev_ok = match self.prev_move {
            Some(wanted) => record.prev_move == Some(wanted),
            None => true,
        };
        signal_ok && shape_ok && prev_ok
    }
}

/// The universe of days a filter session starts from.
#[derive(Debug, Clone, Default)]
pub struct DailyTable {
    records: Vec<DailyRecord>,
}

impl DailyTable {
    /// Buckets are filled from each day's own move only when the input
    /// carried no bucket column at all.
    pub fn new(mut records: Vec<DailyRecord>) -> Self {
        if records.iter().all(|r| r.prev_move.is_none()) {
            for r in &mut records {
                r.prev_move = Some(PrevMoveBucket::categorize(r.day_move));
            }
        }
        Self { records }
    }

    pub fn records(&self) -> &[DailyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fresh copy of the matching rows; the table itself is never mutated.
    pub fn filter(&self, filter: &CategoryFilter) -> Vec<DailyRecord> {
        self.records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect()
    }

    pub fn signal_options(&self) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|r| r.signal.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn candle_options(&self) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|r| r.candle_shape.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
