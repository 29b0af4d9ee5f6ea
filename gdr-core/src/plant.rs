use crate::{coordinate::Coordinate, error::DataQualityError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hydropower plant operating mode.
///
/// The German labels are the ones used by the Austrian plant registry.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantType {
    #[serde(alias = "Pumpspeicherkraftwerk", alias = "pump-storage")]
    PumpStorage,
    #[serde(alias = "Speicherkraftwerk")]
    Storage,
    #[serde(alias = "Laufkraftwerk", alias = "run-of-river")]
    RunOfRiver,
}

impl fmt::Display for PlantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlantType::PumpStorage => "pump_storage",
            PlantType::Storage => "storage",
            PlantType::RunOfRiver => "run_of_river",
        };
        f.write_str(label)
    }
}

/// A hydropower plant from the registry.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PowerPlant {
    pub id: String,
    #[serde(rename = "type")]
    pub plant_type: PlantType,
    /// Installed capacity in megawatts
    pub capacity_mw: f64,
    #[serde(flatten)]
    pub location: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub river: Option<String>,
}

impl PowerPlant {
    pub fn new(
        id: impl Into<String>,
        plant_type: PlantType,
        capacity_mw: f64,
        location: Coordinate,
    ) -> Self {
        PowerPlant {
            id: id.into(),
            plant_type,
            capacity_mw,
            location,
            name: None,
            river: None,
        }
    }

    pub fn validate(&self) -> Result<(), DataQualityError> {
        if self.id.trim().is_empty() {
            return Err(DataQualityError::EmptyIdentifier);
        }
        self.location.validate(&self.id)?;
        if !self.capacity_mw.is_finite() || self.capacity_mw < 0.0 {
            return Err(DataQualityError::InvalidCapacity {
                id: self.id.clone(),
                capacity_mw: self.capacity_mw,
            });
        }
        Ok(())
    }
}
