//! Precipitation and discharge context for a municipality.
//!
//! Context indicators describe how nearby precipitation and river flow have
//! developed. They are reported next to the risk score but never enter it.
use crate::spatial::{KdTree, Neighbor};
use gdr_core::{
    config::ContextConfig, coordinate::Coordinate, risk::ContextIndicator,
    station::StationCategory, trend::TrendResult,
};

/// Running inverse-distance-weighted mean.
#[derive(Debug, Default, Clone, Copy)]
struct WeightedMean {
    weight: f64,
    sum: f64,
}

impl WeightedMean {
    fn add(&mut self, weight: f64, value: f64) {
        self.weight += weight;
        self.sum += weight * value;
    }

    fn value(&self) -> Option<f64> {
        (self.weight > 0.0).then(|| self.sum / self.weight)
    }
}

/// Map a trend onto [0, 1]: `-span` or worse is 1, no change is 0.5,
/// `+span` or better is 0.
pub fn trend_risk(trend: f64, span: f64) -> f64 {
    (span - trend.clamp(-span, span)) / (2.0 * span)
}

/// Inverse-distance-weighted indicator over the usable stations in `index`.
///
/// Uses every station within `config.radius_km`; when there is none, falls
/// back to the `config.fallback_nearest` closest stations and marks the
/// indicator as estimated. Returns `None` for an empty index.
///
/// Precipitation risk is read off the trend in mm per decade, discharge risk
/// off the percent trend.
pub fn context_indicator(
    point: Coordinate,
    index: &KdTree<&TrendResult>,
    category: StationCategory,
    config: &ContextConfig,
) -> Option<ContextIndicator> {
    let mut hits = index.within_radius(point, config.radius_km);
    let estimated = hits.is_empty();
    if estimated {
        hits = index.k_nearest(point, config.fallback_nearest);
    }

    let (trend, level, pct) = weighted(&hits);
    let weighted_trend_per_decade = trend.value()?;
    let weighted_trend_pct_per_decade = pct.value();
    let risk = match category {
        StationCategory::Precipitation => {
            Some(trend_risk(weighted_trend_per_decade, config.precipitation_risk_span_mm))
        }
        StationCategory::Discharge => weighted_trend_pct_per_decade
            .map(|pct| trend_risk(pct, config.discharge_risk_span_pct)),
        StationCategory::Groundwater | StationCategory::Spring => None,
    };
    Some(ContextIndicator {
        weighted_trend_per_decade,
        weighted_mean_level: level.value(),
        weighted_trend_pct_per_decade,
        risk,
        station_ids: hits.iter().map(|n| n.item.station_id.clone()).collect(),
        estimated,
    })
}

/// Trend, mean level and percent trend, each weighted by `1 / (1 + d_km)`.
/// A station with a non-positive mean counts as 0 % change.
fn weighted(hits: &[Neighbor<'_, &TrendResult>]) -> (WeightedMean, WeightedMean, WeightedMean) {
    let mut trend = WeightedMean::default();
    let mut level = WeightedMean::default();
    let mut pct = WeightedMean::default();
    for hit in hits {
        let Some(magnitude) = hit.item.magnitude_per_decade else {
            continue;
        };
        let weight = 1.0 / (1.0 + hit.distance_km);
        trend.add(weight, magnitude);
        if let Some(fit) = &hit.item.fit {
            level.add(weight, fit.mean_level);
            let relative = if fit.mean_level > 0.0 {
                magnitude / fit.mean_level * 100.0
            } else {
                0.0
            };
            pct.add(weight, relative);
        }
    }
    (trend, level, pct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdr_core::trend::{FitStatistics, TrendDirection};

    fn usable(id: &str, location: Coordinate, magnitude: f64, mean_level: f64) -> TrendResult {
        TrendResult {
            station_id: id.to_string(),
            category: StationCategory::Precipitation,
            location,
            usable: true,
            magnitude_per_decade: Some(magnitude),
            direction: Some(TrendDirection::classify(magnitude, 0.01)),
            span_years: 40,
            distinct_years: 40,
            variance_ok: true,
            fit: Some(FitStatistics {
                r_squared: 0.5,
                slope_std_error_per_decade: 1.0,
                mean_level,
                latest_level: mean_level,
                recent_change_pct: None,
            }),
            reason: None,
        }
    }

    #[test]
    fn test_weighted_mean_within_radius() {
        let point = Coordinate::new(47.0, 15.0);
        let results = vec![
            usable("N1", point, -20.0, 1000.0),
            usable("N2", Coordinate::new(47.1, 15.0), 10.0, 800.0),
            usable("FAR", Coordinate::new(49.0, 15.0), 500.0, 2000.0),
        ];
        let index = KdTree::new(results.iter().collect());
        let indicator =
            context_indicator(point, &index, StationCategory::Precipitation, &ContextConfig::default())
                .unwrap();
        assert!(!indicator.estimated);
        assert_eq!(indicator.station_ids, vec!["N1", "N2"]);

        let d2 = point.distance_km(&Coordinate::new(47.1, 15.0));
        let w2 = 1.0 / (1.0 + d2);
        let expected = (-20.0 + w2 * 10.0) / (1.0 + w2);
        assert!((indicator.weighted_trend_per_decade - expected).abs() < 1e-9);
        let level = (1000.0 + w2 * 800.0) / (1.0 + w2);
        assert!((indicator.weighted_mean_level.unwrap() - level).abs() < 1e-9);
        let pct = (-2.0 + w2 * 1.25) / (1.0 + w2);
        assert!((indicator.weighted_trend_pct_per_decade.unwrap() - pct).abs() < 1e-9);
        let risk = (100.0 - expected) / 200.0;
        assert!((indicator.risk.unwrap() - risk).abs() < 1e-12);
    }

    #[test]
    fn test_falls_back_to_nearest_when_none_in_radius() {
        let point = Coordinate::new(47.0, 15.0);
        let results = vec![
            usable("A", Coordinate::new(48.0, 15.0), 5.0, 900.0),
            usable("B", Coordinate::new(48.5, 15.0), 5.0, 900.0),
            usable("C", Coordinate::new(49.0, 15.0), 5.0, 900.0),
            usable("D", Coordinate::new(49.5, 15.0), 5.0, 900.0),
        ];
        let index = KdTree::new(results.iter().collect());
        let indicator =
            context_indicator(point, &index, StationCategory::Precipitation, &ContextConfig::default())
                .unwrap();
        assert!(indicator.estimated);
        assert_eq!(indicator.station_ids, vec!["A", "B", "C"]);
        assert!((indicator.weighted_trend_per_decade - 5.0).abs() < 1e-9);
        assert!((indicator.weighted_mean_level.unwrap() - 900.0).abs() < 1e-9);
    }

    #[test]
    fn test_discharge_risk_uses_percent_trend() {
        let point = Coordinate::new(47.0, 15.0);
        // -3 m³/s per decade on a 20 m³/s river is -15 %
        let results = vec![usable("OWF", point, -3.0, 20.0)];
        let index = KdTree::new(results.iter().collect());
        let indicator =
            context_indicator(point, &index, StationCategory::Discharge, &ContextConfig::default())
                .unwrap();
        assert!((indicator.weighted_trend_pct_per_decade.unwrap() + 15.0).abs() < 1e-9);
        assert!((indicator.risk.unwrap() - 35.0 / 40.0).abs() < 1e-12);

        let dry = vec![usable("DRY", point, -1.0, 0.0)];
        let index = KdTree::new(dry.iter().collect());
        let indicator =
            context_indicator(point, &index, StationCategory::Discharge, &ContextConfig::default())
                .unwrap();
        assert_eq!(indicator.weighted_trend_pct_per_decade, Some(0.0));
        assert_eq!(indicator.risk, Some(0.5));
    }

    #[test]
    fn test_trend_risk_saturates() {
        assert_eq!(trend_risk(-250.0, 100.0), 1.0);
        assert_eq!(trend_risk(0.0, 100.0), 0.5);
        assert_eq!(trend_risk(40.0, 20.0), 0.0);
        assert!((trend_risk(-10.0, 20.0) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_absent_without_stations() {
        let index: KdTree<&TrendResult> = KdTree::new(vec![]);
        let point = Coordinate::new(47.0, 15.0);
        assert!(context_indicator(point, &index, StationCategory::Discharge, &ContextConfig::default()).is_none());
    }
}
