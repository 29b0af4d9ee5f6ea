//! File inputs and outputs for groundwater drought-risk runs.
//!
//! This crate turns the raw input files into a validated
//! [`gdr_data::pipeline::PipelineInput`] and writes a run's results back out
//! for the map front end.
//!
//! # Usage
//!
//! ```no_run
//! use gdr_io::loader::Loader;
//! use gdr_io::report::{build_report, report_to_string};
//! use gdr_core::config::RunConfig;
//!
//! let mut loader = Loader::new();
//! loader.load_stations("station_id,category,latitude,longitude\nGW-301,groundwater,47.03,15.43\n").unwrap();
//! loader.load_readings("GW-301,1985-02-15 00:00:00,340.05\n").unwrap();
//! let input = loader.finish().unwrap();
//!
//! let output = gdr_data::pipeline::run(&input, &RunConfig::default()).unwrap();
//! let json = report_to_string(&build_report(&output, &input.municipalities)).unwrap();
//! ```
//!
//! # Modules
//!
//! - [`records`] - serde schemas of the file formats
//! - [`loader`] - parsing and load-time validation, gzip-aware file reading
//! - [`report`] - risk report JSON and trend table CSV

pub mod loader;
pub mod records;
pub mod report;
