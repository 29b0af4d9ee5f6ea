//! Input loading and load-time validation.
//!
//! Each `load_*` method parses one input from a string slice, so callers can
//! feed files, decompressed streams or `include_str!` fixtures alike. Station
//! metadata has to be loaded before readings; readings of unknown stations
//! are skipped.
//!
//! # Formats
//!
//! - **Stations** (CSV, has headers): `station_id,category,latitude,longitude[,name]`
//! - **Readings** (CSV, no headers): `station_id,timestamp,value`
//! - **Plants** (JSON): `[{id, type, capacity_mw, latitude, longitude, name?, river?}]`
//! - **Municipalities** (JSON): `[{id, name, boundary, centroid?}]`, where
//!   `boundary` holds GeoJSON Polygon (`[[[lon, lat], ...], ...]`, holes
//!   after the exterior) or MultiPolygon coordinates
use crate::records::{MunicipalityRecord, StationRecord};
use flate2::read::GzDecoder;
use gdr_core::{
    config::RunConfig,
    coordinate::Coordinate,
    error::{DataQualityError, Result},
    municipality::Municipality,
    plant::PowerPlant,
    station::{Reading, StationCategory, StationSeries},
};
use gdr_data::pipeline::PipelineInput;
use chrono::NaiveDateTime;
use gdr_utils::dates::parse_timestamp;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read a whole input file, gunzipping it when the name ends in `.gz`.
pub fn read_input(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut contents = String::new();
    if path.extension().is_some_and(|ext| ext == "gz") {
        GzDecoder::new(file).read_to_string(&mut contents)?;
    } else {
        let mut file = file;
        file.read_to_string(&mut contents)?;
    }
    Ok(contents)
}

/// Read a run configuration file. Fields not present take their defaults.
pub fn load_config(path: &Path) -> Result<RunConfig> {
    let config: RunConfig = serde_json::from_str(&read_input(path)?)?;
    config.validate()?;
    Ok(config)
}

/// What the readings loader dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadingStats {
    pub loaded: usize,
    /// Gap markers and other non-numeric values
    pub non_numeric: usize,
    /// Later readings sharing a timestamp with an earlier one
    pub duplicates: usize,
    pub unknown_station: usize,
}

#[derive(Debug)]
struct StationMeta {
    name: Option<String>,
    category: StationCategory,
    location: Coordinate,
}

/// Accumulates validated inputs for one pipeline run.
#[derive(Debug, Default)]
pub struct Loader {
    stations: BTreeMap<String, StationMeta>,
    readings: BTreeMap<String, BTreeMap<NaiveDateTime, f64>>,
    plants: Vec<PowerPlant>,
    municipalities: Vec<Municipality>,
    stats: ReadingStats,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reading_stats(&self) -> ReadingStats {
        self.stats
    }

    /// Load station metadata from CSV string.
    ///
    /// Expected format (with headers): `station_id,category,latitude,longitude[,name]`
    ///
    /// # Example CSV
    /// ```text
    /// station_id,category,latitude,longitude,name
    /// GW-301,groundwater,47.03,15.43,Graz-Puntigam
    /// ```
    pub fn load_stations(&mut self, csv_data: &str) -> Result<usize> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(csv_data.as_bytes());

        let mut count = 0;
        for result in rdr.deserialize() {
            let record: StationRecord = result?;
            let id = record.station_id.trim().to_string();
            if id.is_empty() {
                return Err(DataQualityError::EmptyIdentifier.into());
            }
            if self.stations.contains_key(&id) {
                return Err(DataQualityError::DuplicateIdentifier { id }.into());
            }
            let location = record.location();
            location.validate(&id)?;
            let meta = StationMeta {
                name: record.name(),
                category: record.category()?,
                location,
            };
            self.stations.insert(id, meta);
            count += 1;
        }
        log::info!("[GDR Debug] loader: Loaded {} stations", count);
        Ok(count)
    }

    /// Load readings from CSV string.
    ///
    /// Expected format (no headers): `station_id,timestamp,value`
    ///
    /// Rows with non-numeric or non-finite values (`Lücke`, `---`, `NaN`,
    /// `inf`) are skipped and counted. Rows may come in any order; when two
    /// rows share a station and timestamp the first one wins and the later
    /// one is counted as a duplicate.
    ///
    /// # Example CSV
    /// ```text
    /// GW-301,1985-02-15 00:00:00,340.050
    /// GW-302,15.02.1985 00:00:00,270.050
    /// ```
    pub fn load_readings(&mut self, csv_data: &str) -> Result<usize> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        let mut count = 0;
        let mut non_numeric = 0;
        let mut unknown: BTreeSet<String> = BTreeSet::new();
        let mut unknown_rows = 0;
        let mut duplicates = 0;
        for result in rdr.records() {
            let r = result?;
            let station_id = r.get(0).unwrap_or("").trim();
            let timestamp = r.get(1).unwrap_or("").trim();
            let value_str = r.get(2).unwrap_or("").trim();

            if station_id.is_empty() && timestamp.is_empty() {
                continue;
            }
            // NaN and infinity parse fine but are no measurement
            let value: f64 = match value_str.parse::<f64>() {
                Ok(v) if v.is_finite() => v,
                _ => {
                    non_numeric += 1;
                    continue;
                }
            };
            if !self.stations.contains_key(station_id) {
                unknown_rows += 1;
                unknown.insert(station_id.to_string());
                continue;
            }
            let timestamp = parse_timestamp(timestamp)?;
            let series = self.readings.entry(station_id.to_string()).or_default();
            if series.contains_key(&timestamp) {
                duplicates += 1;
                continue;
            }
            series.insert(timestamp, value);
            count += 1;
        }
        for station_id in &unknown {
            log::warn!("loader: skipped readings for unknown station {}", station_id);
        }
        self.stats.loaded += count;
        self.stats.non_numeric += non_numeric;
        self.stats.unknown_station += unknown_rows;
        self.stats.duplicates += duplicates;
        log::info!(
            "[GDR Debug] loader: Loaded {} readings, skipped {} non-numeric, {} duplicate, {} for unknown stations",
            count,
            non_numeric,
            duplicates,
            unknown_rows
        );
        Ok(count)
    }

    /// Load the plant registry from a JSON array.
    pub fn load_plants(&mut self, json_data: &str) -> Result<usize> {
        let plants: Vec<PowerPlant> = serde_json::from_str(json_data)?;
        let mut seen: BTreeSet<String> = self.plants.iter().map(|p| p.id.clone()).collect();
        for plant in &plants {
            plant.validate()?;
            if !seen.insert(plant.id.clone()) {
                return Err(DataQualityError::DuplicateIdentifier {
                    id: plant.id.clone(),
                }
                .into());
            }
        }
        let count = plants.len();
        self.plants.extend(plants);
        log::info!("[GDR Debug] loader: Loaded {} plants", count);
        Ok(count)
    }

    /// Load municipality boundaries from a JSON array.
    pub fn load_municipalities(&mut self, json_data: &str) -> Result<usize> {
        let records: Vec<MunicipalityRecord> = serde_json::from_str(json_data)?;
        let mut seen: BTreeSet<String> = self
            .municipalities
            .iter()
            .map(|m| m.id().to_string())
            .collect();
        let count = records.len();
        for record in records {
            if !seen.insert(record.id.clone()) {
                return Err(DataQualityError::DuplicateIdentifier { id: record.id }.into());
            }
            self.municipalities.push(Municipality::try_from(record)?);
        }
        log::info!("[GDR Debug] loader: Loaded {} municipalities", count);
        Ok(count)
    }

    /// Assemble station series and hand everything over to the pipeline.
    ///
    /// Stations without any readings are kept; the trend estimator reports
    /// them as unusable.
    pub fn finish(mut self) -> Result<PipelineInput> {
        let mut stations = Vec::with_capacity(self.stations.len());
        for (id, meta) in self.stations {
            let readings = self
                .readings
                .remove(&id)
                .unwrap_or_default()
                .into_iter()
                .map(|(timestamp, value)| Reading::new(timestamp, value))
                .collect();
            stations.push(StationSeries::new(
                id,
                meta.name,
                meta.category,
                meta.location,
                readings,
            )?);
        }
        Ok(PipelineInput {
            stations,
            plants: self.plants,
            municipalities: self.municipalities,
        })
    }
}

/// Paths of one run's input files.
#[derive(Debug, Clone)]
pub struct InputPaths<'a> {
    pub stations: &'a Path,
    pub readings: &'a Path,
    pub plants: Option<&'a Path>,
    pub municipalities: Option<&'a Path>,
}

/// Load and validate every input file of a run.
pub fn load_inputs(paths: &InputPaths<'_>) -> Result<PipelineInput> {
    let mut loader = Loader::new();
    loader.load_stations(&read_input(paths.stations)?)?;
    loader.load_readings(&read_input(paths.readings)?)?;
    if let Some(path) = paths.plants {
        loader.load_plants(&read_input(path)?)?;
    }
    if let Some(path) = paths.municipalities {
        loader.load_municipalities(&read_input(path)?)?;
    }
    loader.finish()
}
