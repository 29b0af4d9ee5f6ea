//! Hydropower proximity influence.
//!
//! Each plant within the influence radius contributes
//! `capacity_mw * weight(type) * decay(distance)`. Raw sums are normalised by
//! the largest raw sum of the run, so the score is only meaningful once every
//! municipality's raw sum is known.
use crate::spatial::KdTree;
use gdr_core::{
    config::{DecayModel, InfluenceConfig},
    coordinate::Coordinate,
    plant::PowerPlant,
};
use serde::Serialize;

/// Distance weighting in [0, 1]: 1 at the plant, 0 at and beyond `radius_km`,
/// strictly decreasing in between.
///
/// `InverseSquare` uses `f(d) = 1 / (1 + (d/h)^2)` rescaled as
/// `(f(d) - f(R)) / (1 - f(R))` so that it meets the hard cutoff continuously.
pub fn decay(distance_km: f64, radius_km: f64, model: DecayModel) -> f64 {
    if distance_km >= radius_km {
        return 0.0;
    }
    let d = distance_km.max(0.0);
    match model {
        DecayModel::Linear => 1.0 - d / radius_km,
        DecayModel::InverseSquare { half_distance_km } => {
            let f = |x: f64| 1.0 / (1.0 + (x / half_distance_km).powi(2));
            let edge = f(radius_km);
            ((f(d) - edge) / (1.0 - edge)).clamp(0.0, 1.0)
        }
    }
}

/// Read-only spatial index over the plant registry.
#[derive(Debug)]
pub struct PlantIndex<'a> {
    tree: KdTree<&'a PowerPlant>,
}

impl<'a> PlantIndex<'a> {
    pub fn new(plants: &'a [PowerPlant]) -> Self {
        PlantIndex {
            tree: KdTree::new(plants.iter().collect()),
        }
    }
}

/// One plant's share of a raw influence sum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlantContribution {
    pub plant_id: String,
    pub distance_km: f64,
    pub contribution: f64,
}

/// Unnormalised influence at a point.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RawInfluence {
    pub total: f64,
    /// Strongest contribution first, plant id ascending on ties
    pub contributions: Vec<PlantContribution>,
}

impl RawInfluence {
    pub fn plant_ids(&self) -> Vec<String> {
        self.contributions.iter().map(|c| c.plant_id.clone()).collect()
    }
}

/// Sum the contributions of all plants in range of `point`.
///
/// Plants exactly at the radius decay to zero and are not listed.
pub fn raw_influence(point: Coordinate, index: &PlantIndex<'_>, config: &InfluenceConfig) -> RawInfluence {
    let mut contributions: Vec<PlantContribution> = index
        .tree
        .within_radius(point, config.radius_km)
        .into_iter()
        .filter_map(|hit| {
            let plant = *hit.item;
            let contribution = plant.capacity_mw
                * config.plant_weights.weight(plant.plant_type)
                * decay(hit.distance_km, config.radius_km, config.decay);
            (contribution > 0.0).then(|| PlantContribution {
                plant_id: plant.id.clone(),
                distance_km: hit.distance_km,
                contribution,
            })
        })
        .collect();
    contributions.sort_by(|a, b| {
        b.contribution
            .total_cmp(&a.contribution)
            .then_with(|| a.plant_id.cmp(&b.plant_id))
    });
    RawInfluence {
        total: contributions.iter().map(|c| c.contribution).sum(),
        contributions,
    }
}

/// Largest raw sum, or 0 for an empty run.
pub fn run_maximum(raw_sums: &[f64]) -> f64 {
    raw_sums.iter().copied().fold(0.0, f64::max)
}

/// Scale a raw sum by the run maximum into [0, 1].
pub fn normalize_one(raw: f64, run_max: f64) -> f64 {
    if run_max > 0.0 {
        (raw / run_max).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Normalise every raw sum of a run by the run's maximum.
pub fn normalize(raw_sums: &[f64]) -> Vec<f64> {
    let run_max = run_maximum(raw_sums);
    raw_sums.iter().map(|&raw| normalize_one(raw, run_max)).collect()
}

/// Normalised influence at `point` for an already known run maximum.
pub fn influence(point: Coordinate, index: &PlantIndex<'_>, config: &InfluenceConfig, run_max: f64) -> f64 {
    normalize_one(raw_influence(point, index, config).total, run_max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdr_core::plant::PlantType;
    use gdr_utils::geo::EARTH_RADIUS_KM;

    /// Point `km` kilometres due north of `origin`.
    fn north_of(origin: Coordinate, km: f64) -> Coordinate {
        Coordinate::new(origin.latitude + (km / EARTH_RADIUS_KM).to_degrees(), origin.longitude)
    }

    #[test]
    fn test_linear_decay_endpoints() {
        assert_eq!(decay(0.0, 30.0, DecayModel::Linear), 1.0);
        assert!((decay(15.0, 30.0, DecayModel::Linear) - 0.5).abs() < 1e-12);
        assert_eq!(decay(30.0, 30.0, DecayModel::Linear), 0.0);
        assert_eq!(decay(45.0, 30.0, DecayModel::Linear), 0.0);
    }

    #[test]
    fn test_inverse_square_decay_endpoints() {
        let model = DecayModel::InverseSquare { half_distance_km: 10.0 };
        assert!((decay(0.0, 30.0, model) - 1.0).abs() < 1e-12);
        assert_eq!(decay(30.0, 30.0, model), 0.0);
        // falls faster than linear near the plant
        assert!(decay(10.0, 30.0, model) < decay(10.0, 30.0, DecayModel::Linear));
    }

    #[test]
    fn test_decay_is_monotonic() {
        for model in [DecayModel::Linear, DecayModel::InverseSquare { half_distance_km: 7.5 }] {
            let mut previous = f64::INFINITY;
            for step in 0..=400 {
                let d = step as f64 * 0.1;
                let value = decay(d, 30.0, model);
                assert!((0.0..=1.0).contains(&value));
                assert!(value <= previous, "{:?} increases at {} km", model, d);
                if d >= 30.0 {
                    assert_eq!(value, 0.0);
                }
                previous = value;
            }
        }
    }

    #[test]
    fn test_single_pump_storage_at_zero_distance_is_full_influence() {
        let site = Coordinate::new(47.3, 13.8);
        let plants = vec![PowerPlant::new("PS-1", PlantType::PumpStorage, 120.0, site)];
        let index = PlantIndex::new(&plants);
        let config = InfluenceConfig::default();
        let raw = raw_influence(site, &index, &config);
        assert!((raw.total - 120.0).abs() < 1e-9);
        assert!((influence(site, &index, &config, raw.total) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_plants_beyond_radius_contribute_nothing() {
        let site = Coordinate::new(47.3, 13.8);
        let plants = vec![
            PowerPlant::new("FAR", PlantType::PumpStorage, 1000.0, north_of(site, 31.0)),
            PowerPlant::new("EDGE", PlantType::Storage, 1000.0, north_of(site, 45.0)),
        ];
        let index = PlantIndex::new(&plants);
        let raw = raw_influence(site, &index, &InfluenceConfig::default());
        assert_eq!(raw.total, 0.0);
        assert!(raw.contributions.is_empty());
        assert_eq!(influence(site, &index, &InfluenceConfig::default(), 0.0), 0.0);
    }

    #[test]
    fn test_influence_non_increasing_with_distance() {
        let site = Coordinate::new(47.3, 13.8);
        let config = InfluenceConfig::default();
        let mut previous = f64::INFINITY;
        for km in [0.0, 1.0, 5.0, 12.0, 20.0, 29.0, 29.9, 30.5, 60.0] {
            let plants = vec![PowerPlant::new("RR-1", PlantType::RunOfRiver, 50.0, north_of(site, km))];
            let index = PlantIndex::new(&plants);
            let total = raw_influence(site, &index, &config).total;
            assert!(total <= previous);
            previous = total;
        }
        assert_eq!(previous, 0.0);
    }

    #[test]
    fn test_contributions_ordered_and_weighted() {
        let site = Coordinate::new(47.3, 13.8);
        let plants = vec![
            PowerPlant::new("B-RR", PlantType::RunOfRiver, 100.0, site),
            PowerPlant::new("A-RR", PlantType::RunOfRiver, 100.0, site),
            PowerPlant::new("C-PS", PlantType::PumpStorage, 100.0, north_of(site, 15.0)),
            PowerPlant::new("D-S", PlantType::Storage, 100.0, site),
        ];
        let index = PlantIndex::new(&plants);
        let raw = raw_influence(site, &index, &InfluenceConfig::default());
        // storage 70, pump storage 100 * 0.5 = 50, run-of-river 30 each
        assert_eq!(raw.plant_ids(), vec!["D-S", "C-PS", "A-RR", "B-RR"]);
        assert!((raw.total - 180.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_by_run_maximum() {
        assert_eq!(normalize(&[0.0, 50.0, 200.0]), vec![0.0, 0.25, 1.0]);
        assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
        assert!(normalize(&[]).is_empty());
    }
}
