//! Core data model for the groundwater drought-risk toolkit.
//!
//! Station series, hydropower plants, municipalities, the derived trend and
//! risk records, run configuration and the error taxonomy shared by all
//! other crates.
pub mod config;
pub mod coordinate;
pub mod error;
pub mod municipality;
pub mod plant;
pub mod risk;
pub mod station;
pub mod trend;

pub use error::{GdrError, Result};
