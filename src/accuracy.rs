use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;
use std::fmt;

use crate::moves::round2;
use crate::records::{DailyRecord, Direction};

/// Percentage gap under which neither side is considered dominant.
pub const BIAS_THRESHOLD_PCT: f64 = 15.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Granularity {
    Month,
    Quarter,
    #[default]
    Year,
}

impl Granularity {
    /// `2023-04`, `2023Q2` or `2023`.
    pub fn period_key(&self, date: NaiveDate) -> String {
        match self {
            Granularity::Month => format!("{:04}-{:02}", date.year(), date.month()),
            Granularity::Quarter => format!("{:04}Q{}", date.year(), (date.month() - 1) / 3 + 1),
            Granularity::Year => format!("{:04}", date.year()),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Month => write!(f, "Month"),
            Granularity::Quarter => write!(f, "Quarter"),
            Granularity::Year => write!(f, "Year"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodAccuracy {
    pub period: String,
    pub long: usize,
    pub short: usize,
    pub total: usize,
    pub long_pct: f64,
    pub short_pct: f64,
}

fn pct(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(count as f64 / total as f64 * 100.0)
}

/// Long/Short accuracy per calendar period, ascending by period.
/// Days without a Long or Short direction are not counted.
pub fn aggregate(days: &[DailyRecord], granularity: Granularity) -> Vec<PeriodAccuracy> {
    let mut buckets: BTreeMap<String, (usize, usize)> = BTreeMap::new();

    for day in days {
        let slot = match day.direction {
            Some(Direction::Long) => 0,
            Some(Direction::Short) => 1,
            _ => continue,
        };
        let entry = buckets.entry(granularity.period_key(day.date)).or_default();
        if slot == 0 {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(period, (long, short))| {
            let total = long + short;
            PeriodAccuracy {
                period,
                long,
                short,
                total,
                long_pct: pct(long, total),
                short_pct: pct(short, total),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Bias {
    Balanced,
    Long,
    Short,
}

/// Overall Long/Short split of some directional column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DirectionSummary {
    pub long: usize,
    pub short: usize,
    pub long_pct: f64,
    pub short_pct: f64,
}

impl DirectionSummary {
    pub fn from_directions(directions: impl IntoIterator<Item = Direction>) -> Self {
        let (mut long, mut short) = (0, 0);
        for d in directions {
            match d {
                Direction::Long => long += 1,
                Direction::Short => short += 1,
                Direction::Flat => {}
            }
        }
        let total = long + short;
        Self {
            long,
            short,
            long_pct: pct(long, total),
            short_pct: pct(short, total),
        }
    }

    pub fn bias(&self) -> Bias {
        if (self.long_pct - self.short_pct).abs() < BIAS_THRESHOLD_PCT {
            Bias::Balanced
        } else if self.long_pct > self.short_pct {
            Bias::Long
        } else {
            Bias::Short
        }
    }
}

/// Average of the positive and of the negative values; None when a side is empty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MoveStats {
    pub avg_long: Option<f64>,
    pub avg_short: Option<f64>,
}

impl MoveStats {
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        let (mut long_sum, mut long_n, mut short_sum, mut short_n) = (0.0, 0usize, 0.0, 0usize);
        for v in values {
            if v > 0.0 {
                long_sum += v;
                long_n += 1;
            } else if v < 0.0 {
                short_sum += v;
                short_n += 1;
            }
        }
        Self {
            avg_long: (long_n > 0).then(|| long_sum / long_n as f64),
            avg_short: (short_n > 0).then(|| short_sum / short_n as f64),
        }
    }
}

/// Headline numbers shown above the result table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResultSummary {
    pub days: usize,
    pub direction: DirectionSummary,
    pub moves: MoveStats,
    /// Present only when the 5-minute stage ran.
    pub fine_direction: Option<DirectionSummary>,
    pub fine_moves: Option<MoveStats>,
}

pub fn summarize(days: &[DailyRecord]) -> ResultSummary {
    let fine_ran = days.iter().any(|d| d.derived.fine_move.is_some());
    ResultSummary {
        days: days.len(),
        direction: DirectionSummary::from_directions(days.iter().filter_map(|d| d.direction)),
        moves: MoveStats::from_values(
            days.iter().map(|d| d.day_move).filter(|v| !v.is_nan()),
        ),
        fine_direction: fine_ran.then(|| {
            DirectionSummary::from_directions(days.iter().filter_map(|d| d.fine_direction()))
        }),
        fine_moves: fine_ran
            .then(|| MoveStats::from_values(days.iter().filter_map(|d| d.derived.fine_move))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32, direction: Direction) -> DailyRecord {
        let mut r = DailyRecord::new(
            NaiveDate::from_ymd_opt(y, m, d).expect("valid date"),
            0.0,
        );
        r.direction = Some(direction);
        r
    }

    #[test]
    fn test_aggregate_year_three_long_one_short() {
        let days = vec![
            day(2023, 1, 2, Direction::Long),
            day(2023, 3, 2, Direction::Long),
            day(2023, 7, 2, Direction::Short),
            day(2023, 12, 2, Direction::Long),
        ];

        let table = aggregate(&days, Granularity::Year);
        assert_eq!(
            table,
            vec![PeriodAccuracy {
                period: "2023".to_string(),
                long: 3,
                short: 1,
                total: 4,
                long_pct: 75.0,
                short_pct: 25.0,
            }]
        );
    }

    #[test]
    fn test_aggregate_month_and_quarter_keys_sorted() {
        let days = vec![
            day(2024, 11, 5, Direction::Short),
            day(2023, 2, 1, Direction::Long),
            day(2023, 4, 1, Direction::Short),
        ];

        let months: Vec<String> = aggregate(&days, Granularity::Month)
            .into_iter()
            .map(|p| p.period)
            .collect();
        assert_eq!(months, vec!["2023-02", "2023-04", "2024-11"]);

        let quarters: Vec<String> = aggregate(&days, Granularity::Quarter)
            .into_iter()
            .map(|p| p.period)
            .collect();
        assert_eq!(quarters, vec!["2023Q1", "2023Q2", "2024Q4"]);
    }

    #[test]
    fn test_aggregate_skips_periods_without_directional_days() {
        let mut no_direction = day(2022, 5, 5, Direction::Long);
        no_direction.direction = None;
        let days = vec![
            no_direction,
            day(2022, 6, 1, Direction::Flat),
            day(2023, 1, 1, Direction::Short),
        ];

        let table = aggregate(&days, Granularity::Year);
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].period, "2023");
        assert_eq!(table[0].short_pct, 100.0);
    }

    #[test]
    fn test_aggregate_rounds_percentages() {
        let days = vec![
            day(2023, 1, 1, Direction::Long),
            day(2023, 1, 2, Direction::Short),
            day(2023, 1, 3, Direction::Short),
        ];
        let table = aggregate(&days, Granularity::Year);
        assert_eq!(table[0].long_pct, 33.33);
        assert_eq!(table[0].short_pct, 66.67);
    }

    #[test]
    fn test_aggregate_ties_round_to_even() {
        let mut days = vec![day(2023, 1, 1, Direction::Long)];
        days.extend((1..=31).map(|d| day(2023, 2, d.min(28), Direction::Short)));

        let table = aggregate(&days, Granularity::Year);
        assert_eq!(table[0].total, 32);
        assert_eq!(table[0].long_pct, 3.12);
        assert_eq!(table[0].short_pct, 96.88);
    }

    #[test]
    fn test_aggregate_empty_input() {
        assert!(aggregate(&[], Granularity::Month).is_empty());
    }

    #[test]
    fn test_direction_summary_bias() {
        let balanced = DirectionSummary::from_directions([Direction::Long, Direction::Short]);
        assert_eq!(balanced.bias(), Bias::Balanced);

        let long = DirectionSummary::from_directions([
            Direction::Long,
            Direction::Long,
            Direction::Short,
        ]);
        assert_eq!(long.bias(), Bias::Long);

        let empty = DirectionSummary::from_directions([Direction::Flat]);
        assert_eq!(empty.long_pct, 0.0);
        assert_eq!(empty.bias(), Bias::Balanced);
    }

    #[test]
    fn test_move_stats_split_by_sign() {
        let stats = MoveStats::from_values([10.0, 20.0, -5.0, 0.0]);
        assert_eq!(stats.avg_long, Some(15.0));
        assert_eq!(stats.avg_short, Some(-5.0));

        let none = MoveStats::from_values(Vec::<f64>::new());
        assert_eq!(none.avg_long, None);
        assert_eq!(none.avg_short, None);
    }

    #[test]
    fn test_summarize_reports_fine_stats_only_when_fine_stage_ran() {
        let mut a = day(2023, 1, 1, Direction::Long);
        a.day_move = 40.0;
        let mut b = day(2023, 1, 2, Direction::Short);
        b.day_move = -20.0;

        let plain = summarize(&[a.clone(), b.clone()]);
        assert_eq!(plain.days, 2);
        assert_eq!(plain.direction.long, 1);
        assert!(plain.fine_direction.is_none());

        a.derived.set_fine(-3.0, "#1 (09:45)".to_string());
        let with_fine = summarize(&[a, b]);
        let fine = with_fine.fine_direction.expect("fine summary");
        assert_eq!(fine.short, 1);
        assert_eq!(fine.long, 0);
        assert_eq!(with_fine.fine_moves.and_then(|m| m.avg_short), Some(-3.0));
    }
}
