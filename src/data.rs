use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::candle::{Candle, TouchFlags, TouchLabel};
use crate::error::LoadError;
use crate::records::{DailyRecord, Direction, PrevMoveBucket, StageColumns};
use crate::series::DaySeries;

/// Row of the daily summary sheet (exported to CSV).
#[derive(Debug, Deserialize)]
pub struct SummaryRow {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Signal", default)]
    pub signal: Option<String>,
    #[serde(rename = "Candles", default)]
    pub candles: Option<String>,
    #[serde(rename = "Prev_Move", default)]
    pub prev_move: Option<String>,
    #[serde(rename = "Move", default)]
    pub day_move: Option<f64>,
    #[serde(rename = "Move.1", default)]
    pub direction: Option<String>,
}

/// Row of a 5-minute or 30-minute series export.
#[derive(Debug, Deserialize)]
pub struct IntradayRow {
    pub time: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(rename = "High", default)]
    pub high_flag: Option<String>,
    #[serde(rename = "Mid", default)]
    pub mid_flag: Option<String>,
    #[serde(rename = "Low", default)]
    pub low_flag: Option<String>,
    #[serde(rename = "Untouched High", default)]
    pub untouched_high_flag: Option<String>,
    #[serde(rename = "Untouched Mid", default)]
    pub untouched_mid_flag: Option<String>,
    #[serde(rename = "Untouched Low", default)]
    pub untouched_low_flag: Option<String>,
}

const DATE_FORMATS: [&str; 5] = ["%d-%m-%Y", "%d/%m/%Y", "%d.%m.%Y", "%Y-%m-%d", "%d %b %Y"];

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];

/// Summary dates are day-first; a trailing time part is ignored.
pub fn parse_summary_date(raw: &str) -> Result<NaiveDate, LoadError> {
    let s = raw.trim();
    let day_part = s.split_whitespace().next().unwrap_or(s);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(day_part, fmt).ok())
        })
        .ok_or_else(|| LoadError::InvalidDate(raw.to_string()))
}

/// Exchange-local timestamp. Offsets in RFC 3339 input are dropped, not
/// converted, so 09:15+05:30 stays 09:15.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, LoadError> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| LoadError::InvalidTimestamp(raw.to_string()))
}

fn flag(raw: &Option<String>) -> Option<TouchLabel> {
    raw.as_deref().map(TouchLabel::parse)
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl IntradayRow {
    pub fn into_candle(self) -> Result<Candle, LoadError> {
        let ts = parse_timestamp(&self.time)?;
        let touches = TouchFlags {
            high: flag(&self.high_flag),
            mid: flag(&self.mid_flag),
            low: flag(&self.low_flag),
            untouched_high: flag(&self.untouched_high_flag),
            untouched_mid: flag(&self.untouched_mid_flag),
            untouched_low: flag(&self.untouched_low_flag),
        };
        Ok(Candle::new(ts, self.open, self.high, self.low, self.close).with_touches(touches))
    }
}

impl SummaryRow {
    pub fn into_record(self) -> Result<DailyRecord, LoadError> {
        let date = parse_summary_date(&self.date)?;
        let day_move = self.day_move.unwrap_or(f64::NAN);
        let direction = match non_empty(self.direction) {
            Some(label) => Direction::parse(&label),
            None if day_move.is_nan() => None,
            None => Some(Direction::from_move(day_move)),
        };
        Ok(DailyRecord {
            date,
            signal: non_empty(self.signal),
            candle_shape: non_empty(self.candles),
            prev_move: non_empty(self.prev_move).map(|s| PrevMoveBucket::parse(&s)),
            day_move,
            direction,
            derived: StageColumns::default(),
        })
    }
}

fn reader<R: Read>(input: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(input)
}

/// Read candles, skipping rows that do not parse.
pub fn read_candles<R: Read>(input: R) -> Result<Vec<Candle>> {
    let mut rdr = reader(input);
    let mut candles = Vec::new();
    let mut skipped = 0usize;

    for (line, result) in rdr.deserialize::<IntradayRow>().enumerate() {
        let parsed = result
            .map_err(|err| err.to_string())
            .and_then(|row| row.into_candle().map_err(|err| err.to_string()));
        match parsed {
            Ok(candle) => candles.push(candle),
            Err(err) => {
                skipped += 1;
                log::debug!("skipping intraday row {}: {}", line + 2, err);
            }
        }
    }

    if skipped > 0 {
        log::warn!("skipped {} malformed intraday rows", skipped);
    }
    Ok(candles)
}

/// Read the daily summary, skipping rows that do not parse.
pub fn read_daily_records<R: Read>(input: R) -> Result<Vec<DailyRecord>> {
    let mut rdr = reader(input);
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (line, result) in rdr.deserialize::<SummaryRow>().enumerate() {
        let parsed = result
            .map_err(|err| err.to_string())
            .and_then(|row| row.into_record().map_err(|err| err.to_string()));
        match parsed {
            Ok(record) => records.push(record),
            Err(err) => {
                skipped += 1;
                log::debug!("skipping summary row {}: {}", line + 2, err);
            }
        }
    }

    if skipped > 0 {
        log::warn!("skipped {} malformed summary rows", skipped);
    }
    Ok(records)
}

pub fn load_daily_records(input: &Path) -> Result<Vec<DailyRecord>> {
    let file =
        File::open(input).with_context(|| format!("failed to open summary file: {:?}", input))?;
    read_daily_records(file)
}

pub fn load_series(input: &Path) -> Result<DaySeries> {
    let file =
        File::open(input).with_context(|| format!("failed to open series file: {:?}", input))?;
    let candles = read_candles(file)?;
    Ok(DaySeries::from_candles(candles))
}
