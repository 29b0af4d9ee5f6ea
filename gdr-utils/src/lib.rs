//! Shared utility functions for GDR crates.

/// Date utility functions
pub mod dates {
    use crate::error::DateError;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

    /// Timestamp formats accepted by the readings loader, tried in order.
    const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d.%m.%Y %H:%M:%S"];

    /// Date-only formats accepted by the readings loader, tried in order.
    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y%m%d", "%d.%m.%Y"];

    /// Format a NaiveDateTime as "YYYY-MM-DD HH:MM:SS"
    pub fn format_timestamp(timestamp: &NaiveDateTime) -> String {
        timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Parse a reading timestamp.
    ///
    /// Accepts ISO dates (`2021-03-01`), compact dates (`20210301`), ISO
    /// date-times with a space or `T` separator, and the day-first dotted
    /// format used by eHYD exports (`01.03.2021 00:00:00` or `01.03.2021`).
    /// Date-only values are placed at midnight.
    pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, DateError> {
        let s = s.trim();
        for format in DATETIME_FORMATS {
            if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(ts);
            }
        }
        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, format) {
                return Ok(date.and_time(NaiveTime::MIN));
            }
        }
        Err(DateError(format!("unrecognised timestamp '{}'", s)))
    }

}

/// Great-circle geometry on a spherical earth.
pub mod geo {
    /// Mean earth radius in kilometres.
    pub const EARTH_RADIUS_KM: f64 = 6371.0;

    /// Haversine distance in kilometres between two (lat, lon) pairs in degrees.
    pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
        let dlat = (lat2 - lat1).to_radians();
        let dlon = (lon2 - lon1).to_radians();
        let a = (dlat / 2.0).sin().powi(2)
            + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
        EARTH_RADIUS_KM * 2.0 * a.sqrt().min(1.0).asin()
    }

    /// Position on the unit sphere for a (lat, lon) pair in degrees.
    pub fn unit_vector(lat: f64, lon: f64) -> [f64; 3] {
        let (lat, lon) = (lat.to_radians(), lon.to_radians());
        [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
    }

    /// Straight-line distance through the unit sphere corresponding to a
    /// surface distance in kilometres. Monotonic in `km` up to half the
    /// circumference.
    pub fn km_to_chord(km: f64) -> f64 {
        let angle = (km / EARTH_RADIUS_KM).min(std::f64::consts::PI);
        2.0 * (angle / 2.0).sin()
    }

}

/// Error types
pub mod error {
    use std::fmt;

    #[derive(Debug)]
    pub struct DateError(pub String);

    impl fmt::Display for DateError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Date error: {}", self.0)
        }
    }

    impl std::error::Error for DateError {}
}
