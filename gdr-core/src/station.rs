use crate::{coordinate::Coordinate, error::DataQualityError};
use chrono::{Datelike, NaiveDateTime};
use gdr_utils::dates::format_timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// What a monitoring station measures.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationCategory {
    /// Groundwater level (m above sea level)
    Groundwater,
    /// River discharge (m³/s)
    Discharge,
    /// Precipitation (mm)
    Precipitation,
    /// Spring discharge (l/s)
    Spring,
}

/// Where the trend estimator looks for outliers.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum OutlierScreen {
    /// Interquartile screen over the raw readings
    Readings,
    /// Standard-deviation screen over the annual values
    AnnualValues,
}

/// How readings within one calendar year collapse to a single annual value.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AnnualAggregate {
    Mean,
    Sum,
}

impl StationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StationCategory::Groundwater => "groundwater",
            StationCategory::Discharge => "discharge",
            StationCategory::Precipitation => "precipitation",
            StationCategory::Spring => "spring",
        }
    }

    /// Precipitation is a flux accumulated over the year; every other
    /// category is a level or rate and is averaged.
    pub fn annual_aggregate(&self) -> AnnualAggregate {
        match self {
            StationCategory::Precipitation => AnnualAggregate::Sum,
            _ => AnnualAggregate::Mean,
        }
    }

    /// Levels are screened reading by reading. Precipitation and discharge
    /// are heavily skewed day to day, so only whole years are screened.
    pub fn outlier_screen(&self) -> OutlierScreen {
        match self {
            StationCategory::Precipitation | StationCategory::Discharge => {
                OutlierScreen::AnnualValues
            }
            StationCategory::Groundwater | StationCategory::Spring => OutlierScreen::Readings,
        }
    }
}

impl fmt::Display for StationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StationCategory {
    type Err = DataQualityError;

    /// Accepts the English names and the eHYD dataset prefixes
    /// (`gw`, `owf`, `nlv`, `qu`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groundwater" | "gw" => Ok(StationCategory::Groundwater),
            "discharge" | "owf" => Ok(StationCategory::Discharge),
            "precipitation" | "nlv" => Ok(StationCategory::Precipitation),
            "spring" | "qu" => Ok(StationCategory::Spring),
            _ => Err(DataQualityError::UnknownCategory {
                label: s.trim().to_string(),
            }),
        }
    }
}

/// A single (timestamp, value) measurement.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl Reading {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Reading { timestamp, value }
    }
}

/// One station's complete, time-ordered record.
///
/// Immutable once constructed: readings are strictly increasing in time.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct StationSeries {
    station_id: String,
    name: Option<String>,
    category: StationCategory,
    location: Coordinate,
    readings: Vec<Reading>,
}

impl StationSeries {
    /// Build a series, rejecting empty ids, invalid coordinates, and
    /// readings that are unsorted or share a timestamp.
    pub fn new(
        station_id: impl Into<String>,
        name: Option<String>,
        category: StationCategory,
        location: Coordinate,
        readings: Vec<Reading>,
    ) -> Result<Self, DataQualityError> {
        let station_id = station_id.into();
        if station_id.trim().is_empty() {
            return Err(DataQualityError::EmptyIdentifier);
        }
        location.validate(&station_id)?;
        for pair in readings.windows(2) {
            if pair[1].timestamp == pair[0].timestamp {
                return Err(DataQualityError::DuplicateTimestamp {
                    timestamp: format_timestamp(&pair[1].timestamp),
                });
            }
            if pair[1].timestamp < pair[0].timestamp {
                return Err(DataQualityError::Unsorted {
                    timestamp: format_timestamp(&pair[1].timestamp),
                });
            }
        }
        Ok(StationSeries {
            station_id,
            name,
            category,
            location,
            readings,
        })
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn category(&self) -> StationCategory {
        self.category
    }

    pub fn location(&self) -> Coordinate {
        self.location
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    /// Calendar years with at least one reading.
    pub fn distinct_years(&self) -> BTreeSet<i32> {
        self.readings.iter().map(|r| r.timestamp.year()).collect()
    }
}
