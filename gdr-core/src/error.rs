/// Error types for the GDR library
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A station series or reference record failed a data-quality check.
///
/// Series-level variants are recorded on the station's `TrendResult` rather
/// than raised, so the enum is serializable and carries only plain data.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityError {
    /// The series has no readings left to analyse
    #[error("series has no readings")]
    NoReadings,

    /// A reading value is NaN or infinite
    #[error("non-finite reading value at {timestamp}")]
    NonFiniteValue { timestamp: String },

    /// Only one annual value survived resampling
    #[error("only one annual value after resampling")]
    SingleAnnualPoint,

    /// Not enough distinct years to estimate a long-term trend
    #[error("too few distinct years (needed: {required}, found: {found})")]
    TooFewYears { required: u32, found: u32 },

    /// Annual values never change (flat or stuck sensor)
    #[error("annual values have zero variance")]
    ZeroVariance,

    /// Annual variance is implausibly large relative to the mean level
    #[error("annual variance ratio {ratio:.3} exceeds maximum {max:.3}")]
    ExcessiveVariance { ratio: f64, max: f64 },

    /// Readings are not strictly increasing in time
    #[error("readings out of order at {timestamp}")]
    Unsorted { timestamp: String },

    /// Two readings share a timestamp
    #[error("duplicate reading timestamp {timestamp}")]
    DuplicateTimestamp { timestamp: String },

    /// A record has an empty identifier
    #[error("record has an empty identifier")]
    EmptyIdentifier,

    /// An identifier occurs more than once in a collection
    #[error("duplicate identifier {id}")]
    DuplicateIdentifier { id: String },

    /// Latitude/longitude outside the valid range or non-finite
    #[error("invalid coordinate for {id}: ({latitude}, {longitude})")]
    InvalidCoordinate { id: String, latitude: f64, longitude: f64 },

    /// Installed capacity negative or non-finite
    #[error("invalid capacity for plant {id}: {capacity_mw}")]
    InvalidCapacity { id: String, capacity_mw: f64 },

    /// Municipality boundary has no usable ring
    #[error("municipality {id} has an empty boundary")]
    EmptyBoundary { id: String },

    /// Station category label not recognised
    #[error("unknown station category '{label}'")]
    UnknownCategory { label: String },
}

impl DataQualityError {
    /// Stable snake_case label, matching the serialized `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            DataQualityError::NoReadings => "no_readings",
            DataQualityError::NonFiniteValue { .. } => "non_finite_value",
            DataQualityError::SingleAnnualPoint => "single_annual_point",
            DataQualityError::TooFewYears { .. } => "too_few_years",
            DataQualityError::ZeroVariance => "zero_variance",
            DataQualityError::ExcessiveVariance { .. } => "excessive_variance",
            DataQualityError::Unsorted { .. } => "unsorted",
            DataQualityError::DuplicateTimestamp { .. } => "duplicate_timestamp",
            DataQualityError::EmptyIdentifier => "empty_identifier",
            DataQualityError::DuplicateIdentifier { .. } => "duplicate_identifier",
            DataQualityError::InvalidCoordinate { .. } => "invalid_coordinate",
            DataQualityError::InvalidCapacity { .. } => "invalid_capacity",
            DataQualityError::EmptyBoundary { .. } => "empty_boundary",
            DataQualityError::UnknownCategory { .. } => "unknown_category",
        }
    }
}

/// Global run configuration is malformed. Always fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A numeric parameter is outside its allowed range
    #[error("{name} must be {expected} (got {value})")]
    OutOfRange {
        name: &'static str,
        expected: &'static str,
        value: f64,
    },

    /// Composite weights must form a convex combination
    #[error("composite weights must sum to 1 (got gw {gw}, hydro {hydro})")]
    WeightsDoNotSumToOne { gw: f64, hydro: f64 },

    /// Plant-type weights must follow pump-storage >= storage >= run-of-river
    #[error("plant weights must satisfy pump_storage >= storage >= run_of_river (got {pump_storage}, {storage}, {run_of_river})")]
    PlantWeightOrdering {
        pump_storage: f64,
        storage: f64,
        run_of_river: f64,
    },

    /// Medium category threshold above the high threshold
    #[error("medium category threshold {medium} exceeds high threshold {high}")]
    CategoryThresholdOrdering { medium: f64, high: f64 },
}

/// A municipality has no usable groundwater station within the search radius.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("no usable groundwater station within {max_search_radius_km} km of municipality {municipality_id}")]
pub struct MissingCoverageError {
    pub municipality_id: String,
    pub max_search_radius_km: f64,
    /// Distance to the nearest usable station, if one exists at all
    pub nearest_station_km: Option<f64>,
}

/// Main error type for GDR operations
#[derive(Error, Debug)]
pub enum GdrError {
    /// Record or series failed validation
    #[error("Data quality error: {0}")]
    DataQuality(#[from] DataQualityError),

    /// Run configuration rejected
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Failed to read or write a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse CSV data
    #[error("Failed to parse CSV: {0}")]
    CsvParse(#[from] csv::Error),

    /// Failed to parse or write JSON data
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Date parsing failed
    #[error("Failed to parse date: {0}")]
    DateParse(#[from] gdr_utils::error::DateError),
}

/// Type alias for Results using GdrError
pub type Result<T> = std::result::Result<T, GdrError>;
