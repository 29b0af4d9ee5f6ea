//! Risk composition.
//!
//! Pairs a municipality with its nearest usable groundwater station, turns
//! that station's trend into a bounded risk component and blends it with the
//! normalised hydropower influence.
use crate::spatial::{KdTree, Neighbor};
use gdr_core::{
    config::{CategoryThresholds, CompositeWeights},
    coordinate::Coordinate,
    error::MissingCoverageError,
    risk::RiskCategory,
    trend::{TrendDirection, TrendResult},
};

/// Groundwater risk component of one trend.
///
/// Declining trends scale linearly up to `worst_case_decline` (per decade) and
/// saturate at 1. Rising, stable and unusable trends carry no risk.
pub fn groundwater_trend_risk(trend: &TrendResult, worst_case_decline: f64) -> f64 {
    match (trend.usable, trend.direction, trend.magnitude_per_decade) {
        (true, Some(TrendDirection::Declining), Some(magnitude)) => {
            (-magnitude / worst_case_decline).clamp(0.0, 1.0)
        }
        _ => 0.0,
    }
}

/// Convex combination of the two components.
pub fn compose(gw_trend_risk: f64, hydro_risk: f64, weights: &CompositeWeights) -> f64 {
    (weights.groundwater * gw_trend_risk + weights.hydro * hydro_risk).clamp(0.0, 1.0)
}

/// Band a composite score; thresholds are inclusive lower bounds.
pub fn categorize(composite: f64, thresholds: &CategoryThresholds) -> RiskCategory {
    if composite >= thresholds.high {
        RiskCategory::High
    } else if composite >= thresholds.medium {
        RiskCategory::Medium
    } else {
        RiskCategory::Low
    }
}

/// Nearest usable groundwater station of a municipality, or the reason it has
/// none within `max_search_radius_km`.
///
/// `stations` must only hold usable groundwater results.
pub fn nearest_groundwater<'t, 'r>(
    municipality_id: &str,
    centroid: Coordinate,
    stations: &'t KdTree<&'r TrendResult>,
    max_search_radius_km: f64,
) -> Result<Neighbor<'t, &'r TrendResult>, MissingCoverageError> {
    match stations.nearest(centroid) {
        Some(hit) if hit.distance_km <= max_search_radius_km => Ok(hit),
        other => Err(MissingCoverageError {
            municipality_id: municipality_id.to_string(),
            max_search_radius_km,
            nearest_station_km: other.map(|hit| hit.distance_km),
        }),
    }
}
