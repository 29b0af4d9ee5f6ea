//! Run outputs: the risk report JSON for the map front end and the station
//! trend table CSV.
//!
//! Everything serialized here is ordered (ranked vectors, `BTreeMap`s), so two
//! runs over the same inputs write byte-identical files.
use crate::records::{boundary_positions, RingPositions, TrendRow};
use gdr_core::{
    config::RunConfig, coordinate::Coordinate, error::Result, municipality::Municipality,
    risk::RiskScore,
};
use gdr_data::{
    catalog::{RunSummary, StationTrendCatalog},
    pipeline::RunOutput,
};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One scored municipality as the map front end draws it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportEntry<'a> {
    pub rank: usize,
    pub id: &'a str,
    pub name: &'a str,
    /// GeoJSON MultiPolygon coordinates
    pub boundary: Vec<Vec<RingPositions>>,
    pub centroid: Coordinate,
    pub risk: &'a RiskScore,
}

/// The risk report of one run.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RiskReport<'a> {
    pub parameters: &'a RunConfig,
    pub summary: &'a RunSummary,
    pub at_risk: Vec<String>,
    /// In rank order
    pub municipalities: Vec<ReportEntry<'a>>,
}

/// Join ranked scores with the municipality geometry they belong to.
pub fn build_report<'a>(output: &'a RunOutput, municipalities: &'a [Municipality]) -> RiskReport<'a> {
    let by_id: HashMap<&str, &Municipality> =
        municipalities.iter().map(|m| (m.id(), m)).collect();
    let entries = output
        .risks
        .iter()
        .filter_map(|ranked| {
            let municipality: &'a Municipality =
                by_id.get(ranked.score.municipality_id.as_str()).copied()?;
            Some(ReportEntry {
                rank: ranked.rank,
                id: municipality.id(),
                name: municipality.name(),
                boundary: boundary_positions(municipality),
                centroid: municipality.centroid(),
                risk: &ranked.score,
            })
        })
        .collect();
    RiskReport {
        parameters: &output.config,
        summary: &output.summary,
        at_risk: output.at_risk_ids(),
        municipalities: entries,
    }
}

/// Pretty-printed report JSON.
pub fn report_to_string(report: &RiskReport<'_>) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write the report JSON to `path`.
pub fn write_report(path: &Path, report: &RiskReport<'_>) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    log::info!(
        "[GDR Debug] report: Wrote {} municipalities to {}",
        report.municipalities.len(),
        path.display()
    );
    Ok(())
}

/// Write one CSV row per station trend, in station id order.
pub fn write_trends_csv<W: Write>(writer: W, stations: &StationTrendCatalog) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for result in stations.iter() {
        wtr.serialize(TrendRow::from(result))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the trend table CSV to `path`.
pub fn write_trends_file(path: &Path, stations: &StationTrendCatalog) -> Result<()> {
    write_trends_csv(BufWriter::new(File::create(path)?), stations)?;
    log::info!(
        "[GDR Debug] report: Wrote {} station trends to {}",
        stations.len(),
        path.display()
    );
    Ok(())
}
