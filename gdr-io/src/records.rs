//! Serde schemas of the input and output files.
//!
//! Records mirror the file layout one to one; conversion into the validated
//! model types happens in the loader.
use gdr_core::{
    coordinate::Coordinate,
    error::DataQualityError,
    municipality::Municipality,
    station::StationCategory,
    trend::TrendResult,
};
use geo::{LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

/// Row of the stations CSV: `station_id,category,latitude,longitude[,name]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StationRecord {
    pub station_id: String,
    pub category: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub name: Option<String>,
}

impl StationRecord {
    pub fn category(&self) -> Result<StationCategory, DataQualityError> {
        self.category.parse()
    }

    pub fn location(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Display name, with blank names treated as absent.
    pub fn name(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }
}

/// Ring of `[lon, lat]` positions.
pub type RingPositions = Vec<[f64; 2]>;

/// GeoJSON geometry coordinates of a municipality boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoundaryRecord {
    /// Exterior ring followed by its holes
    Polygon(Vec<RingPositions>),
    /// One `Polygon` per part
    MultiPolygon(Vec<Vec<RingPositions>>),
}

fn line_string(ring: &[[f64; 2]]) -> LineString<f64> {
    LineString::from(ring.iter().map(|&[lon, lat]| (lon, lat)).collect::<Vec<_>>())
}

fn polygon(rings: &[RingPositions]) -> Option<Polygon<f64>> {
    let (exterior, holes) = rings.split_first()?;
    Some(Polygon::new(
        line_string(exterior),
        holes.iter().map(|hole| line_string(hole)).collect(),
    ))
}

impl From<&BoundaryRecord> for MultiPolygon<f64> {
    fn from(record: &BoundaryRecord) -> Self {
        let parts: Vec<Polygon<f64>> = match record {
            BoundaryRecord::Polygon(rings) => polygon(rings).into_iter().collect(),
            BoundaryRecord::MultiPolygon(parts) => parts.iter().filter_map(|p| polygon(p)).collect(),
        };
        MultiPolygon::new(parts)
    }
}

/// Entry of the municipalities JSON. Boundary positions are `[lon, lat]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MunicipalityRecord {
    pub id: String,
    pub name: String,
    pub boundary: BoundaryRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub centroid: Option<Coordinate>,
}

impl TryFrom<MunicipalityRecord> for Municipality {
    type Error = DataQualityError;

    fn try_from(record: MunicipalityRecord) -> Result<Self, Self::Error> {
        let boundary = MultiPolygon::from(&record.boundary);
        Municipality::new(record.id, record.name, boundary, record.centroid)
    }
}

/// Boundary as GeoJSON MultiPolygon coordinates for the report. Rings come
/// back closed.
pub fn boundary_positions(municipality: &Municipality) -> Vec<Vec<RingPositions>> {
    municipality
        .boundary()
        .iter()
        .map(|polygon| {
            std::iter::once(polygon.exterior())
                .chain(polygon.interiors())
                .map(|ring| ring.coords().map(|c| [c.x, c.y]).collect())
                .collect()
        })
        .collect()
}

/// Flat row of the trend table CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRow {
    pub station_id: String,
    pub category: String,
    pub latitude: f64,
    pub longitude: f64,
    pub usable: bool,
    pub magnitude_per_decade: Option<f64>,
    pub direction: Option<String>,
    pub span_years: u32,
    pub distinct_years: u32,
    pub variance_ok: bool,
    pub r_squared: Option<f64>,
    pub slope_std_error_per_decade: Option<f64>,
    pub mean_level: Option<f64>,
    pub latest_level: Option<f64>,
    pub recent_change_pct: Option<f64>,
    pub reason: Option<String>,
    pub detail: Option<String>,
}

impl From<&TrendResult> for TrendRow {
    fn from(result: &TrendResult) -> Self {
        let fit = result.fit.as_ref();
        TrendRow {
            station_id: result.station_id.clone(),
            category: result.category.to_string(),
            latitude: result.location.latitude,
            longitude: result.location.longitude,
            usable: result.usable,
            magnitude_per_decade: result.magnitude_per_decade,
            direction: result.direction.map(|d| d.to_string()),
            span_years: result.span_years,
            distinct_years: result.distinct_years,
            variance_ok: result.variance_ok,
            r_squared: fit.map(|f| f.r_squared),
            slope_std_error_per_decade: fit.map(|f| f.slope_std_error_per_decade),
            mean_level: fit.map(|f| f.mean_level),
            latest_level: fit.map(|f| f.latest_level),
            recent_change_pct: fit.and_then(|f| f.recent_change_pct),
            reason: result.reason.as_ref().map(|r| r.kind().to_string()),
            detail: result.reason.as_ref().map(|r| r.to_string()),
        }
    }
}
