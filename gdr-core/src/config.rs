//! Run configuration.
//!
//! Every component receives the part of [`RunConfig`] it needs as an explicit
//! argument. All fields have defaults so a configuration file only has to
//! name what it changes.
use crate::{error::ConfigurationError, plant::PlantType, station::StationCategory};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

fn positive(name: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::OutOfRange {
            name,
            expected: "finite and > 0",
            value,
        })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigurationError::OutOfRange {
            name,
            expected: "finite and >= 0",
            value,
        })
    }
}

fn unit_interval(name: &'static str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::OutOfRange {
            name,
            expected: "within [0, 1]",
            value,
        })
    }
}

/// Complete parameter set of one pipeline run.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub trend: TrendConfig,
    pub influence: InfluenceConfig,
    pub composite: CompositeConfig,
    pub context: ContextConfig,
}

impl RunConfig {
    /// Reject malformed parameters before any processing starts.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.trend.validate()?;
        self.influence.validate()?;
        self.composite.validate()?;
        self.context.validate()
    }
}

/// Usability gates and resampling rules of the trend estimator.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Minimum number of distinct calendar years
    pub min_years: u32,
    /// Maximum annual variance divided by the absolute annual mean
    pub max_variance_ratio: f64,
    /// Replaces `max_variance_ratio` for the listed categories
    pub max_variance_ratio_by_category: BTreeMap<StationCategory, f64>,
    /// Per-decade magnitudes within ±epsilon count as stable
    pub stability_epsilon: f64,
    /// Interquartile-range multiplier for the reading screen of groundwater
    /// and spring stations; `None` disables it
    pub outlier_iqr_factor: Option<f64>,
    /// Annual values this many standard deviations from the mean are dropped
    /// for precipitation and discharge stations; `None` disables it
    pub annual_sigma_factor: Option<f64>,
    /// Years with fewer readings are dropped before regression
    pub min_readings_per_year: u32,
}

impl Default for TrendConfig {
    fn default() -> Self {
        TrendConfig {
            min_years: 10,
            max_variance_ratio: 10.0,
            // annual totals in mm vary by hundreds of millimetres
            max_variance_ratio_by_category: BTreeMap::from([(StationCategory::Precipitation, 250.0)]),
            stability_epsilon: 0.01,
            outlier_iqr_factor: Some(3.0),
            annual_sigma_factor: Some(2.0),
            min_readings_per_year: 1,
        }
    }
}

impl TrendConfig {
    /// Variance ratio limit that applies to `category`.
    pub fn max_variance_ratio_for(&self, category: StationCategory) -> f64 {
        self.max_variance_ratio_by_category
            .get(&category)
            .copied()
            .unwrap_or(self.max_variance_ratio)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.min_years < 2 {
            return Err(ConfigurationError::OutOfRange {
                name: "trend.min_years",
                expected: ">= 2",
                value: self.min_years as f64,
            });
        }
        positive("trend.max_variance_ratio", self.max_variance_ratio)?;
        for ratio in self.max_variance_ratio_by_category.values() {
            positive("trend.max_variance_ratio_by_category", *ratio)?;
        }
        non_negative("trend.stability_epsilon", self.stability_epsilon)?;
        if let Some(k) = self.outlier_iqr_factor {
            positive("trend.outlier_iqr_factor", k)?;
        }
        if let Some(k) = self.annual_sigma_factor {
            positive("trend.annual_sigma_factor", k)?;
        }
        if self.min_readings_per_year == 0 {
            return Err(ConfigurationError::OutOfRange {
                name: "trend.min_readings_per_year",
                expected: ">= 1",
                value: 0.0,
            });
        }
        Ok(())
    }
}

/// How a plant's contribution falls off with distance.
#[derive(Debug, PartialEq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum DecayModel {
    /// `1 - d/R`
    #[default]
    Linear,
    /// `1 / (1 + (d/h)^2)`, shifted and rescaled to reach 0 at the radius
    InverseSquare { half_distance_km: f64 },
}

/// Relative importance of each plant type.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantTypeWeights {
    pub pump_storage: f64,
    pub storage: f64,
    pub run_of_river: f64,
}

impl Default for PlantTypeWeights {
    fn default() -> Self {
        PlantTypeWeights {
            pump_storage: 1.0,
            storage: 0.7,
            run_of_river: 0.3,
        }
    }
}

impl PlantTypeWeights {
    pub fn weight(&self, plant_type: PlantType) -> f64 {
        match plant_type {
            PlantType::PumpStorage => self.pump_storage,
            PlantType::Storage => self.storage,
            PlantType::RunOfRiver => self.run_of_river,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        non_negative("influence.plant_weights.pump_storage", self.pump_storage)?;
        non_negative("influence.plant_weights.storage", self.storage)?;
        non_negative("influence.plant_weights.run_of_river", self.run_of_river)?;
        if self.pump_storage < self.storage || self.storage < self.run_of_river {
            return Err(ConfigurationError::PlantWeightOrdering {
                pump_storage: self.pump_storage,
                storage: self.storage,
                run_of_river: self.run_of_river,
            });
        }
        Ok(())
    }
}

/// Hydropower proximity influence parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InfluenceConfig {
    /// Hard cutoff; plants further away contribute nothing
    pub radius_km: f64,
    pub decay: DecayModel,
    pub plant_weights: PlantTypeWeights,
}

impl Default for InfluenceConfig {
    fn default() -> Self {
        InfluenceConfig {
            radius_km: 30.0,
            decay: DecayModel::Linear,
            plant_weights: PlantTypeWeights::default(),
        }
    }
}

impl InfluenceConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        positive("influence.radius_km", self.radius_km)?;
        if let DecayModel::InverseSquare { half_distance_km } = self.decay {
            positive("influence.decay.half_distance_km", half_distance_km)?;
        }
        self.plant_weights.validate()
    }
}

/// Convex weights of the two risk components.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    pub groundwater: f64,
    pub hydro: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        CompositeWeights {
            groundwater: 0.5,
            hydro: 0.5,
        }
    }
}

impl CompositeWeights {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        unit_interval("composite.weights.groundwater", self.groundwater)?;
        unit_interval("composite.weights.hydro", self.hydro)?;
        if ((self.groundwater + self.hydro) - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigurationError::WeightsDoNotSumToOne {
                gw: self.groundwater,
                hydro: self.hydro,
            });
        }
        Ok(())
    }
}

/// Lower bounds (inclusive) of the medium and high risk categories.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryThresholds {
    pub medium: f64,
    pub high: f64,
}

impl Default for CategoryThresholds {
    fn default() -> Self {
        CategoryThresholds {
            medium: 0.4,
            high: 0.6,
        }
    }
}

impl CategoryThresholds {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        unit_interval("composite.category_thresholds.medium", self.medium)?;
        unit_interval("composite.category_thresholds.high", self.high)?;
        if self.medium > self.high {
            return Err(ConfigurationError::CategoryThresholdOrdering {
                medium: self.medium,
                high: self.high,
            });
        }
        Ok(())
    }
}

/// Risk composition parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeConfig {
    pub weights: CompositeWeights,
    /// Decline per decade (native unit, metres for groundwater) that maps to full risk
    pub worst_case_decline: f64,
    /// Municipalities without a usable groundwater station this close are excluded
    pub max_search_radius_km: f64,
    /// Composite scores at or above this are reported as at risk
    pub at_risk_threshold: f64,
    pub category_thresholds: CategoryThresholds,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        CompositeConfig {
            weights: CompositeWeights::default(),
            worst_case_decline: 0.3,
            max_search_radius_km: 25.0,
            at_risk_threshold: 0.5,
            category_thresholds: CategoryThresholds::default(),
        }
    }
}

impl CompositeConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.weights.validate()?;
        positive("composite.worst_case_decline", self.worst_case_decline)?;
        positive("composite.max_search_radius_km", self.max_search_radius_km)?;
        unit_interval("composite.at_risk_threshold", self.at_risk_threshold)?;
        self.category_thresholds.validate()
    }
}

/// Precipitation and discharge context indicator parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub radius_km: f64,
    /// Number of nearest stations used when none is inside the radius
    pub fallback_nearest: usize,
    /// Precipitation trend (mm per decade) at which the context risk
    /// saturates at 0 or 1
    pub precipitation_risk_span_mm: f64,
    /// Discharge trend (percent per decade) at which the context risk
    /// saturates at 0 or 1
    pub discharge_risk_span_pct: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfig {
            radius_km: 30.0,
            fallback_nearest: 3,
            precipitation_risk_span_mm: 100.0,
            discharge_risk_span_pct: 20.0,
        }
    }
}

impl ContextConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        positive("context.radius_km", self.radius_km)?;
        positive("context.precipitation_risk_span_mm", self.precipitation_risk_span_mm)?;
        positive("context.discharge_risk_span_pct", self.discharge_risk_span_pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.trend.min_years, 10);
        assert_eq!(config.influence.decay, DecayModel::Linear);
        assert_eq!(config.influence.plant_weights.weight(PlantType::Storage), 0.7);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RunConfig =
            serde_json::from_str(r#"{"trend":{"min_years":20},"influence":{"decay":{"model":"inverse_square","half_distance_km":10.0}}}"#)
                .unwrap();
        assert_eq!(config.trend.min_years, 20);
        assert_eq!(config.trend.max_variance_ratio, 10.0);
        assert_eq!(config.influence.radius_km, 30.0);
        assert_eq!(
            config.influence.decay,
            DecayModel::InverseSquare { half_distance_km: 10.0 }
        );
        assert_eq!(config.composite, CompositeConfig::default());
    }

    #[test]
    fn test_rejects_each_malformed_field() {
        let cases: Vec<(&str, Box<dyn Fn(&mut RunConfig)>)> = vec![
            ("min_years", Box::new(|c: &mut RunConfig| c.trend.min_years = 1)),
            ("variance ratio", Box::new(|c: &mut RunConfig| c.trend.max_variance_ratio = 0.0)),
            ("nan ratio", Box::new(|c: &mut RunConfig| c.trend.max_variance_ratio = f64::NAN)),
            ("epsilon", Box::new(|c: &mut RunConfig| c.trend.stability_epsilon = -0.1)),
            ("iqr", Box::new(|c: &mut RunConfig| c.trend.outlier_iqr_factor = Some(0.0))),
            ("sigma", Box::new(|c: &mut RunConfig| c.trend.annual_sigma_factor = Some(-2.0))),
            ("precipitation span", Box::new(|c: &mut RunConfig| c.context.precipitation_risk_span_mm = 0.0)),
            ("discharge span", Box::new(|c: &mut RunConfig| c.context.discharge_risk_span_pct = f64::NAN)),
            (
                "category ratio",
                Box::new(|c: &mut RunConfig| {
                    c.trend.max_variance_ratio_by_category.insert(StationCategory::Discharge, 0.0);
                }),
            ),
            ("readings per year", Box::new(|c: &mut RunConfig| c.trend.min_readings_per_year = 0)),
            ("radius", Box::new(|c: &mut RunConfig| c.influence.radius_km = -5.0)),
            (
                "half distance",
                Box::new(|c: &mut RunConfig| {
                    c.influence.decay = DecayModel::InverseSquare { half_distance_km: 0.0 }
                }),
            ),
            ("plant order", Box::new(|c: &mut RunConfig| c.influence.plant_weights.storage = 1.5)),
            ("negative plant weight", Box::new(|c: &mut RunConfig| c.influence.plant_weights.run_of_river = -0.1)),
            ("weight sum", Box::new(|c: &mut RunConfig| c.composite.weights.hydro = 0.6)),
            (
                "weight range",
                Box::new(|c: &mut RunConfig| {
                    c.composite.weights = CompositeWeights { groundwater: 1.5, hydro: -0.5 }
                }),
            ),
            ("worst case", Box::new(|c: &mut RunConfig| c.composite.worst_case_decline = 0.0)),
            ("search radius", Box::new(|c: &mut RunConfig| c.composite.max_search_radius_km = f64::INFINITY)),
            ("at risk", Box::new(|c: &mut RunConfig| c.composite.at_risk_threshold = 1.2)),
            ("threshold order", Box::new(|c: &mut RunConfig| c.composite.category_thresholds.medium = 0.7)),
            ("context radius", Box::new(|c: &mut RunConfig| c.context.radius_km = 0.0)),
        ];
        for (label, mutate) in cases {
            let mut config = RunConfig::default();
            mutate(&mut config);
            assert!(config.validate().is_err(), "{} should be rejected", label);
        }
    }

    #[test]
    fn test_variance_ratio_per_category() {
        let config = TrendConfig::default();
        assert_eq!(config.max_variance_ratio_for(StationCategory::Precipitation), 250.0);
        assert_eq!(config.max_variance_ratio_for(StationCategory::Groundwater), 10.0);

        let json = r#"{"max_variance_ratio_by_category":{"discharge":40.0}}"#;
        let config: TrendConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_variance_ratio_for(StationCategory::Discharge), 40.0);
        // an explicit map replaces the default one
        assert_eq!(config.max_variance_ratio_for(StationCategory::Precipitation), 10.0);
        assert_eq!(config.annual_sigma_factor, Some(2.0));
    }

    #[test]
    fn test_weight_sum_tolerance() {
        let weights = CompositeWeights {
            groundwater: 0.7,
            hydro: 0.3 + 1e-12,
        };
        assert!(weights.validate().is_ok());
        let err = CompositeWeights { groundwater: 0.7, hydro: 0.2 }.validate();
        assert!(matches!(err, Err(ConfigurationError::WeightsDoNotSumToOne { .. })));
    }
}
