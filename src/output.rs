use anyhow::{Context, Result};

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::accuracy::{Bias, DirectionSummary, MoveStats, PeriodAccuracy, ResultSummary};
use crate::pipeline::{PipelineConfig, StageReport};
use crate::records::{DailyRecord, DailyTable, PrevMoveBucket};
use crate::rules::ViewRules;
use crate::session::Report;

fn fmt_opt<T: std::fmt::Display>(v: &Option<T>) -> String {
    v.as_ref().map(|v| v.to_string()).unwrap_or_default()
}

fn fmt_avg(v: Option<f64>) -> String {
    v.map(|v| format!("{:.2} pts", v))
        .unwrap_or_else(|| "N/A".to_string())
}

fn bias_marker(bias: Bias) -> &'static str {
    match bias {
        Bias::Balanced => "balanced",
        Bias::Long => "long bias",
        Bias::Short => "short bias",
    }
}

pub fn print_options(table: &DailyTable) {
    println!("Signals:");
    for s in table.signal_options() {
        println!("  {}", s);
    }
    println!("Candle types:");
    for c in table.candle_options() {
        println!("  {}", c);
    }
    println!("Previous day move:");
    for b in PrevMoveBucket::SELECTABLE {
        println!("  {}", b.display_label());
    }
}

pub fn print_config(config: &PipelineConfig) {
    let f = &config.filter;
    println!(
        "Filter:              signal={} candles={} prev_move={}",
        f.signal.as_deref().unwrap_or("Any"),
        f.candle_shape.as_deref().unwrap_or("Any"),
        f.prev_move.map(|b| b.label()).unwrap_or("Any"),
    );
    if let Some(s) = &config.fine {
        println!("5-min confirmation:  {}", s.describe());
    }
    if let Some(s) = &config.coarse {
        println!("30-min confirmation: {}", s.describe());
    }
    if let Some(s) = &config.flag {
        println!("Flag filter:         {}", s.describe());
    }
    if let Some(s) = &config.untouched {
        println!("Untouched filter:    {}", s.describe());
    }
}

pub fn print_rules(signal: &str, views: &[ViewRules]) {
    if views.is_empty() {
        return;
    }
    println!("=== Entry & Exit Rules: {} ===", signal);
    for v in views {
        println!("{} view", v.view);
        println!("  Entry:");
        for e in &v.entries {
            println!("    - {}", e);
        }
        println!("  Exit:");
        for e in &v.exits {
            println!("    - {}", e);
        }
    }
    println!();
}

pub fn print_stage_reports(category_matches: usize, reports: &[StageReport]) {
    println!("Category filter:     {} days", category_matches);
    for r in reports {
        println!(
            "{:<20} {} passed, {} missing data",
            format!("{}:", r.stage),
            r.passed,
            r.missing_data
        );
    }
}

fn print_direction(label: &str, d: &DirectionSummary) {
    println!(
        "{:<20} Long: {} ({:.2}%) | Short: {} ({:.2}%) [{}]",
        label,
        d.long,
        d.long_pct,
        d.short,
        d.short_pct,
        bias_marker(d.bias())
    );
}

fn print_moves(label: &str, m: &MoveStats) {
    println!("{:<20} avg long {} | avg short {}", label, fmt_avg(m.avg_long), fmt_avg(m.avg_short));
}

pub fn print_summary(summary: &ResultSummary) {
    println!("=== Filtered Results: {} Days ===", summary.days);
    if summary.days == 0 {
        println!("No matching data found.");
        return;
    }
    print_direction("Accuracy:", &summary.direction);
    print_moves("30M move:", &summary.moves);
    if let Some(d) = &summary.fine_direction {
        print_direction("5-min accuracy:", d);
    }
    if let Some(m) = &summary.fine_moves {
        print_moves("5-min move:", m);
    }
}

/// Result table, most recent day first. Stage columns only appear when at
/// least one row carries them.
pub fn print_days(days: &[DailyRecord]) {
    if days.is_empty() {
        return;
    }
    let mut rows: Vec<&DailyRecord> = days.iter().collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date));

    let has = |f: fn(&DailyRecord) -> bool| days.iter().any(f);
    let fine = has(|d| d.derived.fine_move.is_some());
    let coarse = has(|d| d.derived.coarse_move.is_some());
    let flag = has(|d| d.derived.flag_info.is_some());
    let untouched = has(|d| d.derived.untouched_info.is_some());

    let mut header = format!("{:<11} {:<18} {:<6} {:>9}", "Date", "Candles", "Dir", "Move");
    if fine {
        header.push_str(&format!(" {:>9} {:<6} {:<13}", "5_Move", "5_Dir", "5_Candle"));
    }
    if coarse {
        header.push_str(&format!(" {:>9} {:<13}", "30_Move", "Candle"));
    }
    if flag {
        header.push_str(&format!(" {:<13}", "Flag_Candle"));
    }
    if untouched {
        header.push_str(&format!(" {:<13}", "Untouched"));
    }
    println!("{}", header);

    for d in rows {
        let mut line = format!(
            "{:<11} {:<18} {:<6} {:>9.2}",
            d.date.format("%d %b, %y"),
            d.candle_shape.as_deref().unwrap_or(""),
            fmt_opt(&d.direction),
            d.day_move
        );
        if fine {
            line.push_str(&format!(
                " {:>9} {:<6} {:<13}",
                d.derived
                    .fine_move
                    .map(|v| format!("{:.2}", v))
                    .unwrap_or_default(),
                fmt_opt(&d.fine_direction()),
                fmt_opt(&d.derived.fine_info)
            ));
        }
        if coarse {
            line.push_str(&format!(
                " {:>9} {:<13}",
                d.derived
                    .coarse_move
                    .map(|v| format!("{:.2}", v))
                    .unwrap_or_default(),
                fmt_opt(&d.derived.coarse_info)
            ));
        }
        if flag {
            line.push_str(&format!(" {:<13}", fmt_opt(&d.derived.flag_info)));
        }
        if untouched {
            line.push_str(&format!(" {:<13}", fmt_opt(&d.derived.untouched_info)));
        }
        println!("{}", line);
    }
}

pub fn print_accuracy(granularity: impl std::fmt::Display, periods: &[PeriodAccuracy]) {
    println!("=== {} Accuracy ===", granularity);
    if periods.is_empty() {
        println!("Not enough data to display period breakdown.");
        return;
    }
    println!(
        "{:<9} {:>6} {:>6} {:>6} {:>8} {:>8}",
        "Period", "Long", "Short", "Total", "Long %", "Short %"
    );
    for p in periods {
        println!(
            "{:<9} {:>6} {:>6} {:>6} {:>8.2} {:>8.2}",
            p.period, p.long, p.short, p.total, p.long_pct, p.short_pct
        );
    }
}

pub fn print_report(report: &Report) {
    print_config(&report.config);
    println!();
    print_stage_reports(report.output.category_matches, &report.output.reports);
    println!();
    print_summary(&report.summary);
    println!();
    print_days(&report.output.days);
    println!();
    print_accuracy(report.granularity, &report.periods);
}

pub fn write_json_report(path: &Path, report: &Report) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create report file: {:?}", path))?;
    serde_json::to_writer_pretty(file, report)
        .with_context(|| format!("failed to write report to {:?}", path))?;
    Ok(())
}

/// Destination for filtered rows.
pub trait RowSink {
    fn write(&self, row: &DailyRecord) -> Result<(), String>;
}

/// Appends one JSON object per row.
pub struct NdjsonSink {
    pub path: PathBuf,
}

impl NdjsonSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl RowSink for NdjsonSink {
    fn write(&self, row: &DailyRecord) -> Result<(), String> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| err.to_string())?;
        let line = serde_json::to_string(row).map_err(|err| err.to_string())?;
        writeln!(f, "{line}").map_err(|err| err.to_string())?;
        Ok(())
    }
}

pub struct NoopSink;

impl RowSink for NoopSink {
    fn write(&self, _row: &DailyRecord) -> Result<(), String> {
        Ok(())
    }
}

/// Send every row to `sink`; returns how many were written.
pub fn export_rows(sink: &dyn RowSink, days: &[DailyRecord]) -> Result<usize, String> {
    for d in days {
        sink.write(d)?;
    }
    Ok(days.len())
}
