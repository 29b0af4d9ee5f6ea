//! Trend-only pass: estimate every station's long-term trend and write the
//! trend table, without plants or municipalities.

use crate::analyze::resolve_config;
use anyhow::Context;
use gdr_data::pipeline::estimate_trends;
use gdr_io::{
    loader::{load_inputs, InputPaths},
    report::write_trends_file,
};
use log::info;
use std::path::Path;

pub fn run_trends(
    stations: &str,
    readings: &str,
    config: Option<&str>,
    output: &str,
) -> anyhow::Result<()> {
    let config = resolve_config(config)?;
    config.validate().context("Run configuration rejected")?;
    let input = load_inputs(&InputPaths {
        stations: Path::new(stations),
        readings: Path::new(readings),
        plants: None,
        municipalities: None,
    })
    .context("Failed to load station inputs")?;

    let catalog = estimate_trends(&input.stations, &config.trend);
    write_trends_file(Path::new(output), &catalog)
        .with_context(|| format!("Failed to write trend table to {}", output))?;

    info!(
        "Trends complete: {} usable, {} unusable. Output: {}",
        catalog.usable_count(),
        catalog.unusable_count(),
        output
    );
    for (reason, count) in catalog.unusable_by_reason() {
        info!("  {}: {}", reason, count);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_trends_on_fixtures() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("trends.csv");
        let fixtures = format!("{}/../fixtures", env!("CARGO_MANIFEST_DIR"));
        run_trends(
            &format!("{}/stations.csv", fixtures),
            &format!("{}/readings.csv", fixtures),
            None,
            &output.to_string_lossy(),
        )
        .unwrap();

        let mut rdr = csv::Reader::from_path(&output).unwrap();
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 9);
        let graz = rows.iter().find(|r| &r[0] == "GW-301").unwrap();
        assert_eq!(&graz[4], "true");
        assert_eq!(&graz[6], "declining");
        let magnitude: f64 = graz[5].parse().unwrap();
        assert!((magnitude + 0.25).abs() < 0.02);
    }
}
