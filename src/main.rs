use anyhow::Result;
use clap::Parser;

use std::path::PathBuf;

use signal_analyzer::config::AnalyzerConfig;
use signal_analyzer::output::{
    NdjsonSink, export_rows, print_options, print_report, print_rules, write_json_report,
};
use signal_analyzer::session::Session;

#[derive(Debug, Parser)]
struct Args {
    /// config-file path
    #[arg(long)]
    config: PathBuf,

    /// Write the full report as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,

    /// Append the filtered days as NDJSON to this path
    #[arg(long)]
    export: Option<PathBuf>,

    /// Print the available signals, candle types and move buckets, then exit
    #[arg(long, default_value_t = false)]
    list_options: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = AnalyzerConfig::load(args.config)?;
    let pipeline = config.pipeline()?;
    let session = Session::load(&config)?;

    if session.table.is_empty() {
        println!("No data found in summary.");
        return Ok(());
    }

    if args.list_options {
        print_options(&session.table);
        return Ok(());
    }

    if let (Some(rules), Some(signal)) = (&session.rules, &pipeline.filter.signal) {
        print_rules(signal, &rules.for_signal(signal));
    }

    let report = session.analyze(&pipeline, config.group_by);
    print_report(&report);

    if let Some(path) = &args.json {
        write_json_report(path, &report)?;
        log::info!("report written to {:?}", path);
    }

    if let Some(path) = args.export {
        let sink = NdjsonSink::new(path.clone());
        let written = export_rows(&sink, &report.output.days).map_err(anyhow::Error::msg)?;
        log::info!("exported {} rows to {:?}", written, path);
    }

    Ok(())
}
