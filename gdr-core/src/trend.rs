use crate::{coordinate::Coordinate, error::DataQualityError, station::StationCategory};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sign of a long-term trend after applying the stability threshold.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Declining,
    Stable,
    Rising,
}

impl TrendDirection {
    /// Classify a per-decade magnitude against the near-zero threshold `epsilon`.
    pub fn classify(magnitude: f64, epsilon: f64) -> Self {
        if magnitude < -epsilon {
            TrendDirection::Declining
        } else if magnitude > epsilon {
            TrendDirection::Rising
        } else {
            TrendDirection::Stable
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendDirection::Declining => "declining",
            TrendDirection::Stable => "stable",
            TrendDirection::Rising => "rising",
        };
        f.write_str(label)
    }
}

/// Goodness-of-fit figures for a usable trend.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FitStatistics {
    /// Coefficient of determination of the annual regression
    pub r_squared: f64,
    /// Standard error of the slope, per decade
    pub slope_std_error_per_decade: f64,
    /// Mean of the annual values
    pub mean_level: f64,
    /// Annual value of the most recent year
    pub latest_level: f64,
    /// Percent change of the last ten annual values against the first ten.
    /// Only present with at least 20 annual values.
    pub recent_change_pct: Option<f64>,
}

/// Outcome of trend estimation for one station.
///
/// Never mutated; re-estimation produces a new value.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct TrendResult {
    pub station_id: String,
    pub category: StationCategory,
    pub location: Coordinate,
    pub usable: bool,
    /// Signed change per decade in the series' native unit
    pub magnitude_per_decade: Option<f64>,
    pub direction: Option<TrendDirection>,
    /// Years from the first to the last annual value, inclusive
    pub span_years: u32,
    /// Number of calendar years with an annual value
    pub distinct_years: u32,
    /// Annual variance within the acceptance bound
    pub variance_ok: bool,
    pub fit: Option<FitStatistics>,
    /// Why the series was rejected
    pub reason: Option<DataQualityError>,
}

impl TrendResult {
    /// A rejected series.
    pub fn unusable(
        station_id: impl Into<String>,
        category: StationCategory,
        location: Coordinate,
        span_years: u32,
        distinct_years: u32,
        variance_ok: bool,
        reason: DataQualityError,
    ) -> Self {
        TrendResult {
            station_id: station_id.into(),
            category,
            location,
            usable: false,
            magnitude_per_decade: None,
            direction: None,
            span_years,
            distinct_years,
            variance_ok,
            fit: None,
            reason: Some(reason),
        }
    }
}
