use anyhow::{Context, Result};
use serde::Serialize;

use std::path::Path;

use crate::accuracy::{Granularity, PeriodAccuracy, ResultSummary, aggregate, summarize};
use crate::config::AnalyzerConfig;
use crate::data::{load_daily_records, load_series};
use crate::pipeline::{self, PipelineConfig, PipelineOutput};
use crate::records::DailyTable;
use crate::rules::{RuleBook, load_rules};
use crate::series::{DaySeries, IntradayStore};

/// Inputs loaded once per process and shared read-only by every pass.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub table: DailyTable,
    pub store: IntradayStore,
    pub rules: Option<RuleBook>,
}

/// Everything one pass produces for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub config: PipelineConfig,
    pub output: PipelineOutput,
    pub summary: ResultSummary,
    pub granularity: Granularity,
    pub periods: Vec<PeriodAccuracy>,
}

fn series_or_empty(path: &Path, what: &str) -> DaySeries {
    match load_series(path) {
        Ok(series) => {
            log::info!(
                "loaded {} {} candles over {} days",
                series.candle_count(),
                what,
                series.day_count()
            );
            series
        }
        Err(err) => {
            log::warn!("could not load {} data, continuing without it: {:#}", what, err);
            DaySeries::default()
        }
    }
}

impl Session {
    pub fn new(table: DailyTable, store: IntradayStore) -> Self {
        Self {
            table,
            store,
            rules: None,
        }
    }

    /// The summary table is required; intraday series and rules are optional
    /// and only produce a warning when they cannot be read.
    pub fn load(config: &AnalyzerConfig) -> Result<Self> {
        let records = load_daily_records(&config.summary)
            .with_context(|| format!("failed to load summary from {:?}", config.summary))?;
        let table = DailyTable::new(records);
        log::info!("loaded {} daily records", table.len());

        let fine = series_or_empty(&config.fine_series, "5-min");
        let coarse = series_or_empty(&config.coarse_series, "30-min");

        let rules = config.rules.as_deref().and_then(|path| match load_rules(path) {
            Ok(book) => Some(book),
            Err(err) => {
                log::warn!("could not load rules: {:#}", err);
                None
            }
        });

        Ok(Self {
            table,
            store: IntradayStore::new(fine, coarse),
            rules,
        })
    }

    pub fn run(&self, config: &PipelineConfig) -> PipelineOutput {
        pipeline::run(&self.table, &self.store, config)
    }

    pub fn analyze(&self, config: &PipelineConfig, granularity: Granularity) -> Report {
        let output = self.run(config);
        let summary = summarize(&output.days);
        let periods = aggregate(&output.days, granularity);
        Report {
            config: config.clone(),
            output,
            summary,
            granularity,
            periods,
        }
    }
}
