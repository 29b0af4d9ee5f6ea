use crate::error::DataQualityError;
use gdr_utils::geo::{haversine_km, unit_vector};
use serde::{Deserialize, Serialize};

/// A WGS84 position in decimal degrees.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinate {
            latitude,
            longitude,
        }
    }

    /// True when both components are finite and within their ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Validate the coordinate of the record identified by `id`.
    pub fn validate(&self, id: &str) -> Result<(), DataQualityError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(DataQualityError::InvalidCoordinate {
                id: id.to_string(),
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }

    /// Great-circle distance in kilometres.
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        haversine_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }

    /// Position on the unit sphere, used by the spatial index.
    pub fn unit_vector(&self) -> [f64; 3] {
        unit_vector(self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::Coordinate;

    #[test]
    fn test_validate_ranges() {
        assert!(Coordinate::new(47.5, 13.0).validate("A").is_ok());
        assert!(Coordinate::new(90.0, -180.0).validate("B").is_ok());
        assert!(Coordinate::new(91.0, 13.0).validate("C").is_err());
        assert!(Coordinate::new(47.5, 181.0).validate("D").is_err());
        assert!(Coordinate::new(f64::NAN, 13.0).validate("E").is_err());
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let graz = Coordinate::new(47.07, 15.44);
        assert_eq!(graz.distance_km(&graz), 0.0);
    }
}
