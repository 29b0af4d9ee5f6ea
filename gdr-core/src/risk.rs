use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse banding of the composite score.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskCategory::Low => "low",
            RiskCategory::Medium => "medium",
            RiskCategory::High => "high",
        };
        f.write_str(label)
    }
}

/// Inverse-distance-weighted trend of nearby stations of one category.
///
/// Informational only; never part of the composite.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ContextIndicator {
    /// Weighted mean change per decade
    pub weighted_trend_per_decade: f64,
    /// Weighted mean of the stations' annual values (mm per year for
    /// precipitation, m³/s for discharge)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weighted_mean_level: Option<f64>,
    /// Weighted change per decade relative to each station's mean, in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weighted_trend_pct_per_decade: Option<f64>,
    /// Risk in [0, 1] read off the trend; 0.5 for no change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<f64>,
    pub station_ids: Vec<String>,
    /// True when no station was inside the context radius and the nearest
    /// stations were used instead
    pub estimated: bool,
}

/// Derived drought-risk record for one municipality.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct RiskScore {
    pub municipality_id: String,
    /// Groundwater-trend component in [0, 1]
    pub gw_trend_risk: f64,
    /// Hydropower-influence component in [0, 1]
    pub hydro_risk: f64,
    /// Convex combination of the two components
    pub composite: f64,
    pub category: RiskCategory,
    /// Station(s) that drove the groundwater component
    pub contributing_station_ids: Vec<String>,
    /// Plants in range, strongest contribution first
    pub contributing_plant_ids: Vec<String>,
    pub station_distance_km: f64,
    pub gw_trend_per_decade: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precipitation: Option<ContextIndicator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discharge: Option<ContextIndicator>,
}
