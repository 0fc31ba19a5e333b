use anyhow::Result;
use clap::Parser;

use std::path::PathBuf;

use signal_analyzer::config::AnalyzerConfig;
use signal_analyzer::session::Session;
use signal_analyzer::sweep::{generate_sweep_jobs, run_sweep};

/// Sweep every breakout condition and candle window of the 5-min and 30-min
/// stages on top of the configured categorical filter.
#[derive(Debug, Parser)]
struct Args {
    /// config-file path
    #[arg(long)]
    config: PathBuf,

    /// Hide combinations that kept fewer days than this
    #[arg(long, default_value_t = 1)]
    min_days: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let config = AnalyzerConfig::load(args.config)?;
    let base = config.pipeline()?;
    let session = Session::load(&config)?;

    let jobs = generate_sweep_jobs();
    println!(
        "Running {} combinations over {} days...",
        jobs.len(),
        session.table.filter(&base.filter).len()
    );

    let results = run_sweep(&session, &base, &jobs);

    println!(
        "{:<8} {:<31} {:<22} {:>6} {:>7} {:>7} {:>7} {:>7} {:>7}",
        "stage", "condition", "window", "days", "missing", "long%", "short%", "sLong%", "sShort%"
    );
    for r in results.iter().filter(|r| r.passed >= args.min_days) {
        println!(
            "{:<8} {:<31} {:<22} {:>6} {:>7} {:>7.2} {:>7.2} {:>7.2} {:>7.2}",
            r.job.kind.resolution().to_string(),
            r.job.stage.condition.label(),
            r.job.stage.window.describe(),
            r.passed,
            r.missing_data,
            r.day_direction.long_pct,
            r.day_direction.short_pct,
            r.stage_direction.long_pct,
            r.stage_direction.short_pct,
        );
    }

    Ok(())
}
