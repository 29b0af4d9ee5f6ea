//! One batch run from loaded inputs to ranked municipality risks.
//!
//! Station trends and per-municipality raw influence are computed on the
//! rayon pool. Influence normalisation needs the maximum over all
//! municipalities, so composition only starts once every raw sum exists.
use crate::{
    catalog::{MunicipalityRiskCatalog, RunSummary, StationTrendCatalog},
    compose::{categorize, compose, groundwater_trend_risk, nearest_groundwater},
    context::context_indicator,
    influence::{normalize, raw_influence, PlantIndex, RawInfluence},
    spatial::KdTree,
    trend::estimate,
};
use gdr_core::{
    config::{RunConfig, TrendConfig},
    error::{ConfigurationError, MissingCoverageError},
    municipality::Municipality,
    plant::PowerPlant,
    risk::{ContextIndicator, RiskScore},
    station::{StationCategory, StationSeries},
    trend::TrendResult,
};
use log::{info, warn};
use rayon::prelude::*;

/// Everything a run reads. Shared read-only across worker threads.
#[derive(Debug, Default)]
pub struct PipelineInput {
    pub stations: Vec<StationSeries>,
    pub plants: Vec<PowerPlant>,
    pub municipalities: Vec<Municipality>,
}

/// Everything a run produces.
#[derive(Debug)]
pub struct RunOutput {
    pub config: RunConfig,
    pub stations: StationTrendCatalog,
    pub risks: MunicipalityRiskCatalog,
    /// Municipalities left out for lack of groundwater coverage, in input order
    pub excluded: Vec<MissingCoverageError>,
    pub summary: RunSummary,
}

impl RunOutput {
    /// Ids of municipalities at or above the configured at-risk threshold.
    pub fn at_risk_ids(&self) -> Vec<String> {
        self.risks
            .at_risk(self.config.composite.at_risk_threshold)
            .map(|s| s.municipality_id.clone())
            .collect()
    }
}

/// Estimate every station's trend in parallel.
pub fn estimate_trends(stations: &[StationSeries], config: &TrendConfig) -> StationTrendCatalog {
    let results: Vec<TrendResult> = stations
        .par_iter()
        .map(|series| estimate(series, config))
        .collect();
    StationTrendCatalog::new(results)
}

/// Per-municipality state between the parallel phase and composition.
struct Pairing<'r> {
    station: Result<(&'r TrendResult, f64), MissingCoverageError>,
    influence: RawInfluence,
    precipitation: Option<ContextIndicator>,
    discharge: Option<ContextIndicator>,
}

fn category_index(stations: &StationTrendCatalog, category: StationCategory) -> KdTree<&TrendResult> {
    KdTree::new(stations.usable(category).collect())
}

/// Run the full analysis. Only a malformed configuration is an error; data
/// problems are recorded in the output.
pub fn run(input: &PipelineInput, config: &RunConfig) -> Result<RunOutput, ConfigurationError> {
    config.validate()?;
    info!(
        "[GDR Debug] pipeline: {} stations, {} plants, {} municipalities",
        input.stations.len(),
        input.plants.len(),
        input.municipalities.len()
    );

    let stations = estimate_trends(&input.stations, &config.trend);
    info!(
        "[GDR Debug] pipeline: {} usable stations, {} unusable",
        stations.usable_count(),
        stations.unusable_count()
    );

    let (scores, excluded) = {
        let groundwater = category_index(&stations, StationCategory::Groundwater);
        let precipitation = category_index(&stations, StationCategory::Precipitation);
        let discharge = category_index(&stations, StationCategory::Discharge);
        let plants = PlantIndex::new(&input.plants);

        let pairings: Vec<Pairing<'_>> = input
            .municipalities
            .par_iter()
            .map(|municipality| {
                let centroid = municipality.centroid();
                let station = nearest_groundwater(
                    municipality.id(),
                    centroid,
                    &groundwater,
                    config.composite.max_search_radius_km,
                )
                .map(|hit| (*hit.item, hit.distance_km));
                Pairing {
                    station,
                    influence: raw_influence(centroid, &plants, &config.influence),
                    precipitation: context_indicator(
                        centroid,
                        &precipitation,
                        StationCategory::Precipitation,
                        &config.context,
                    ),
                    discharge: context_indicator(
                        centroid,
                        &discharge,
                        StationCategory::Discharge,
                        &config.context,
                    ),
                }
            })
            .collect();

        // barrier: every raw sum is known from here on
        let raw_sums: Vec<f64> = pairings.iter().map(|p| p.influence.total).collect();
        let hydro_risks = normalize(&raw_sums);

        let mut scores = Vec::with_capacity(pairings.len());
        let mut excluded = Vec::new();
        for ((municipality, pairing), hydro_risk) in
            input.municipalities.iter().zip(pairings).zip(hydro_risks)
        {
            let (station, distance_km) = match pairing.station {
                Ok(found) => found,
                Err(missing) => {
                    warn!("pipeline: {}", missing);
                    excluded.push(missing);
                    continue;
                }
            };
            let gw_trend_risk = groundwater_trend_risk(station, config.composite.worst_case_decline);
            let composite = compose(gw_trend_risk, hydro_risk, &config.composite.weights);
            scores.push(RiskScore {
                municipality_id: municipality.id().to_string(),
                gw_trend_risk,
                hydro_risk,
                composite,
                category: categorize(composite, &config.composite.category_thresholds),
                contributing_station_ids: vec![station.station_id.clone()],
                contributing_plant_ids: pairing.influence.plant_ids(),
                station_distance_km: distance_km,
                gw_trend_per_decade: station.magnitude_per_decade.unwrap_or(0.0),
                precipitation: pairing.precipitation,
                discharge: pairing.discharge,
            });
        }
        (scores, excluded)
    };

    let risks = MunicipalityRiskCatalog::new(scores);
    let summary = RunSummary::new(
        &stations,
        &risks,
        &excluded,
        input.municipalities.len(),
        config.composite.at_risk_threshold,
    );
    info!(
        "[GDR Debug] pipeline: scored {} municipalities, excluded {}, {} at risk",
        summary.municipalities_scored, summary.municipalities_excluded, summary.at_risk
    );

    Ok(RunOutput {
        config: config.clone(),
        stations,
        risks,
        excluded,
        summary,
    })
}
