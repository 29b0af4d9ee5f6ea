//! Full drought-risk run from input files to the risk report.

use anyhow::Context;
use gdr_core::config::RunConfig;
use gdr_data::pipeline;
use gdr_io::{
    loader::{load_config, load_inputs, InputPaths},
    report::{build_report, write_report, write_trends_file},
};
use log::info;
use std::path::Path;

/// File arguments of a run.
#[derive(Debug, Clone)]
pub struct AnalysisArgs<'a> {
    pub stations: &'a str,
    pub readings: &'a str,
    pub plants: &'a str,
    pub municipalities: &'a str,
    pub config: Option<&'a str>,
    pub output: &'a str,
    pub trends_csv: Option<&'a str>,
}

/// Read the configuration file, or fall back to the defaults.
pub(crate) fn resolve_config(path: Option<&str>) -> anyhow::Result<RunConfig> {
    match path {
        Some(path) => load_config(Path::new(path))
            .with_context(|| format!("Failed to load configuration from {}", path)),
        None => {
            info!("No configuration given, using defaults");
            Ok(RunConfig::default())
        }
    }
}

/// Load all inputs, run the pipeline and write the report (and optionally
/// the trend table).
pub fn run_analysis(args: &AnalysisArgs<'_>) -> anyhow::Result<()> {
    let config = resolve_config(args.config)?;
    let input = load_inputs(&InputPaths {
        stations: Path::new(args.stations),
        readings: Path::new(args.readings),
        plants: Some(Path::new(args.plants)),
        municipalities: Some(Path::new(args.municipalities)),
    })
    .context("Failed to load run inputs")?;

    let output = pipeline::run(&input, &config).context("Run configuration rejected")?;

    let report = build_report(&output, &input.municipalities);
    write_report(Path::new(args.output), &report)
        .with_context(|| format!("Failed to write report to {}", args.output))?;

    if let Some(trends_csv) = args.trends_csv {
        write_trends_file(Path::new(trends_csv), &output.stations)
            .with_context(|| format!("Failed to write trend table to {}", trends_csv))?;
    }

    let summary = &output.summary;
    info!(
        "Run complete: {} of {} stations usable, {} municipalities scored, {} excluded, {} at risk",
        summary.stations_usable,
        summary.stations_total,
        summary.municipalities_scored,
        summary.municipalities_excluded,
        summary.at_risk
    );
    for (category, count) in &summary.by_category {
        info!("  {}: {}", category, count);
    }
    info!("Report: {}", args.output);
    Ok(())
}

/// Write the default configuration so it can be edited and passed back in.
pub fn write_default_config(output: &str) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&RunConfig::default())?;
    std::fs::write(output, json + "\n")
        .with_context(|| format!("Failed to write configuration to {}", output))?;
    info!("Default configuration written to {}", output);
    Ok(())
}
