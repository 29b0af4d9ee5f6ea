//! Trend estimation and spatial risk composition.
//!
//! This crate turns loaded station series, the plant registry and the
//! municipality boundaries into per-station trends and ranked
//! per-municipality drought-risk scores.
pub mod catalog;
pub mod compose;
pub mod context;
pub mod influence;
pub mod pipeline;
pub mod spatial;
pub mod trend;
