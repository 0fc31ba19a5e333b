use chrono::NaiveDate;
use serde::Serialize;

use std::collections::BTreeMap;

use crate::candle::{Candle, Resolution};

/// Reference level for every breakout comparison: high and low of the
/// day's first 30-minute candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OpeningRange {
    pub high: f64,
    pub low: f64,
}

/// One resolution's candles grouped by trading day, each day in ascending time order.
#[derive(Debug, Clone, Default)]
pub struct DaySeries {
    days: BTreeMap<NaiveDate, Vec<Candle>>,
}

impl DaySeries {
    pub fn from_candles(candles: Vec<Candle>) -> Self {
        let mut days: BTreeMap<NaiveDate, Vec<Candle>> = BTreeMap::new();
        for candle in candles {
            days.entry(candle.date()).or_default().push(candle);
        }
        for day in days.values_mut() {
            // stable: equal timestamps keep file order
            day.sort_by_key(|c| c.ts);
        }
        Self { days }
    }

    /// Candles of `date`, or None when the day has no candles at all.
    pub fn day(&self, date: NaiveDate) -> Option<&[Candle]> {
        self.days
            .get(&date)
            .map(Vec::as_slice)
            .filter(|day| !day.is_empty())
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn candle_count(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Read-only intraday data shared by every evaluation pass.
#[derive(Debug, Clone, Default)]
pub struct IntradayStore {
    fine: DaySeries,
    coarse: DaySeries,
}

impl IntradayStore {
    pub fn new(fine: DaySeries, coarse: DaySeries) -> Self {
        Self { fine, coarse }
    }

    pub fn series(&self, resolution: Resolution) -> &DaySeries {
        match resolution {
            Resolution::Fine => &self.fine,
            Resolution::Coarse => &self.coarse,
        }
    }

    pub fn day(&self, date: NaiveDate, resolution: Resolution) -> Option<&[Candle]> {
        self.series(resolution).day(date)
    }

    /// Recomputed on every call; never cached across days.
    pub fn opening_range(&self, date: NaiveDate) -> Option<OpeningRange> {
        let first = self.coarse.day(date)?.first()?;
        Some(OpeningRange {
            high: first.high,
            low: first.low,
        })
    }
}
