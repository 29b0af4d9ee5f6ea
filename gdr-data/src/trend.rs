//! Long-term trend estimation for a single station series.
//!
//! Readings are screened for outliers, collapsed to one value per calendar
//! year, checked against the usability gates and fitted with an ordinary
//! least-squares line. The slope is reported per decade.
//!
//! Level stations (groundwater, springs) are screened reading by reading with
//! an interquartile fence. Precipitation and discharge are skewed day to day,
//! so their screen runs over the annual values instead.
use chrono::Datelike;
use gdr_core::{
    config::TrendConfig,
    error::DataQualityError,
    station::{AnnualAggregate, OutlierScreen, Reading, StationSeries},
    trend::{FitStatistics, TrendDirection, TrendResult},
};
use gdr_utils::dates::format_timestamp;
use log::debug;
use std::collections::BTreeMap;

/// Number of leading/trailing annual values compared for the recent change.
const CHANGE_WINDOW_YEARS: usize = 10;

/// One value per calendar year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnualValue {
    pub year: i32,
    pub value: f64,
}

/// Quantile with linear interpolation between order statistics.
/// `sorted` must be ascending and non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// First and third quartile of `values`, or `None` when empty.
pub fn quartiles(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some((quantile(&sorted, 0.25), quantile(&sorted, 0.75)))
}

/// Drop readings outside `[Q1 - k*IQR, Q3 + k*IQR]`.
///
/// Leaves the readings untouched when the interquartile range is zero.
pub fn screen_outliers(readings: &[Reading], k: f64) -> Vec<Reading> {
    let values: Vec<f64> = readings.iter().map(|r| r.value).collect();
    let Some((q1, q3)) = quartiles(&values) else {
        return Vec::new();
    };
    let iqr = q3 - q1;
    if iqr <= 0.0 {
        return readings.to_vec();
    }
    let (low, high) = (q1 - k * iqr, q3 + k * iqr);
    readings
        .iter()
        .filter(|r| r.value >= low && r.value <= high)
        .copied()
        .collect()
}

/// Collapse readings to one value per calendar year, dropping years with
/// fewer than `min_readings` readings.
pub fn annual_values(
    readings: &[Reading],
    aggregate: AnnualAggregate,
    min_readings: u32,
) -> Vec<AnnualValue> {
    let mut years: BTreeMap<i32, (f64, u32)> = BTreeMap::new();
    for reading in readings {
        let entry = years.entry(reading.timestamp.year()).or_insert((0.0, 0));
        entry.0 += reading.value;
        entry.1 += 1;
    }
    years
        .into_iter()
        .filter(|(_, (_, count))| *count >= min_readings)
        .map(|(year, (sum, count))| AnnualValue {
            year,
            value: match aggregate {
                AnnualAggregate::Mean => sum / count as f64,
                AnnualAggregate::Sum => sum,
            },
        })
        .collect()
}

/// Keep annual values strictly within `k` population standard deviations of
/// their mean. Leaves the values untouched when the deviation is zero.
pub fn screen_annual_outliers(points: &[AnnualValue], k: f64) -> Vec<AnnualValue> {
    if points.is_empty() {
        return Vec::new();
    }
    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    let m = mean(&values);
    let sd = variance(&values, m).sqrt();
    if sd.is_nan() || sd <= 0.0 {
        return points.to_vec();
    }
    points
        .iter()
        .filter(|p| (p.value - m).abs() < k * sd)
        .copied()
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance.
fn variance(values: &[f64], mean: f64) -> f64 {
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

/// Least-squares line through annual values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    /// Change per year
    pub slope: f64,
    pub r_squared: f64,
    /// Standard error of the slope, per year
    pub slope_std_error: f64,
}

/// Ordinary least squares of value against year, with years centred on their
/// mean. Needs at least two distinct years.
pub fn fit_line(points: &[AnnualValue]) -> Option<LinearFit> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_year = points.iter().map(|p| p.year as f64).sum::<f64>() / n;
    let mean_value = points.iter().map(|p| p.value).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for p in points {
        let dx = p.year as f64 - mean_year;
        let dy = p.value - mean_value;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    if sxx <= 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    let residual: f64 = points
        .iter()
        .map(|p| {
            let predicted = mean_value + slope * (p.year as f64 - mean_year);
            (p.value - predicted).powi(2)
        })
        .sum();
    let r_squared = if syy > 0.0 { 1.0 - residual / syy } else { 1.0 };
    let slope_std_error = if points.len() > 2 {
        (residual / (n - 2.0) / sxx).sqrt()
    } else {
        0.0
    };
    Some(LinearFit {
        slope,
        r_squared,
        slope_std_error,
    })
}

/// Percent change of the mean of the last ten annual values against the
/// first ten. Needs at least twenty values and a non-zero historic mean.
pub fn recent_change_pct(points: &[AnnualValue]) -> Option<f64> {
    if points.len() < 2 * CHANGE_WINDOW_YEARS {
        return None;
    }
    let head: Vec<f64> = points[..CHANGE_WINDOW_YEARS].iter().map(|p| p.value).collect();
    let tail: Vec<f64> = points[points.len() - CHANGE_WINDOW_YEARS..]
        .iter()
        .map(|p| p.value)
        .collect();
    let historic = mean(&head);
    if historic == 0.0 {
        return None;
    }
    Some((mean(&tail) - historic) / historic.abs() * 100.0)
}

fn span_of(points: &[AnnualValue]) -> u32 {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) => (last.year - first.year + 1) as u32,
        _ => 0,
    }
}

/// Estimate the long-term trend of one station.
///
/// Never fails: rejected series come back with `usable == false` and the
/// reason attached.
pub fn estimate(series: &StationSeries, config: &TrendConfig) -> TrendResult {
    let id = series.station_id();
    let category = series.category();
    let location = series.location();
    let reject = |span: u32, distinct: u32, variance_ok: bool, reason: DataQualityError| {
        debug!("[GDR Debug] trend: station {} unusable: {}", id, reason);
        TrendResult::unusable(id, category, location, span, distinct, variance_ok, reason)
    };

    let readings = series.readings();
    if let Some(bad) = readings.iter().find(|r| !r.value.is_finite()) {
        let years = series.distinct_years();
        let span = match (years.first(), years.last()) {
            (Some(first), Some(last)) => (last - first + 1) as u32,
            _ => 0,
        };
        return reject(
            span,
            years.len() as u32,
            false,
            DataQualityError::NonFiniteValue {
                timestamp: format_timestamp(&bad.timestamp),
            },
        );
    }

    let screen = category.outlier_screen();
    let screened = match (screen, config.outlier_iqr_factor) {
        (OutlierScreen::Readings, Some(k)) => screen_outliers(readings, k),
        _ => readings.to_vec(),
    };
    if screened.len() < readings.len() {
        debug!(
            "[GDR Debug] trend: station {} dropped {} outlier readings",
            id,
            readings.len() - screened.len()
        );
    }

    let mut annual = annual_values(
        &screened,
        category.annual_aggregate(),
        config.min_readings_per_year,
    );
    if let (OutlierScreen::AnnualValues, Some(k)) = (screen, config.annual_sigma_factor) {
        let kept = screen_annual_outliers(&annual, k);
        if kept.len() < annual.len() {
            debug!(
                "[GDR Debug] trend: station {} dropped {} outlier years",
                id,
                annual.len() - kept.len()
            );
        }
        annual = kept;
    }
    let span = span_of(&annual);
    let distinct = annual.len() as u32;

    match annual.len() {
        0 => return reject(span, distinct, false, DataQualityError::NoReadings),
        1 => return reject(span, distinct, false, DataQualityError::SingleAnnualPoint),
        _ => {}
    }
    if distinct < config.min_years {
        return reject(
            span,
            distinct,
            false,
            DataQualityError::TooFewYears {
                required: config.min_years,
                found: distinct,
            },
        );
    }

    let values: Vec<f64> = annual.iter().map(|a| a.value).collect();
    let mean_level = mean(&values);
    let var = variance(&values, mean_level);
    if var == 0.0 {
        return reject(span, distinct, false, DataQualityError::ZeroVariance);
    }
    let max_ratio = config.max_variance_ratio_for(category);
    // overflowing sums leave NaN or infinity behind, which no limit admits
    let ratio = if mean_level == 0.0 || !mean_level.is_finite() || !var.is_finite() {
        f64::INFINITY
    } else {
        var / mean_level.abs()
    };
    if ratio > max_ratio {
        return reject(
            span,
            distinct,
            false,
            DataQualityError::ExcessiveVariance {
                ratio,
                max: max_ratio,
            },
        );
    }

    let fit = match fit_line(&annual) {
        Some(fit) if fit.slope.is_finite() => fit,
        Some(_) => {
            return reject(
                span,
                distinct,
                false,
                DataQualityError::ExcessiveVariance {
                    ratio: f64::INFINITY,
                    max: max_ratio,
                },
            )
        }
        None => return reject(span, distinct, true, DataQualityError::SingleAnnualPoint),
    };
    let magnitude = fit.slope * 10.0;
    let direction = TrendDirection::classify(magnitude, config.stability_epsilon);
    let latest_level = values.last().copied().unwrap_or(mean_level);

    debug!(
        "[GDR Debug] trend: station {} {} {:.4}/decade over {} years (r2 {:.3})",
        id, direction, magnitude, distinct, fit.r_squared
    );

    TrendResult {
        station_id: id.to_string(),
        category,
        location,
        usable: true,
        magnitude_per_decade: Some(magnitude),
        direction: Some(direction),
        span_years: span,
        distinct_years: distinct,
        variance_ok: true,
        fit: Some(FitStatistics {
            r_squared: fit.r_squared,
            slope_std_error_per_decade: fit.slope_std_error * 10.0,
            mean_level,
            latest_level,
            recent_change_pct: recent_change_pct(&annual),
        }),
        reason: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use gdr_core::{coordinate::Coordinate, station::StationCategory};

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn series(category: StationCategory, readings: Vec<Reading>) -> StationSeries {
        StationSeries::new("S1", None, category, Coordinate::new(47.0, 15.0), readings).unwrap()
    }

    /// Quarterly readings following `level(year)` exactly.
    fn quarterly(first: i32, years: i32, level: impl Fn(f64) -> f64) -> Vec<Reading> {
        let mut readings = Vec::new();
        for y in first..first + years {
            for m in [1, 4, 7, 10] {
                readings.push(Reading::new(ts(y, m, 1), level(y as f64)));
            }
        }
        readings
    }

    #[test]
    fn test_exact_linear_slope_per_decade() {
        // -0.02 m per year => -0.2 m per decade
        let readings = quarterly(1970, 40, |y| 350.0 - 0.02 * (y - 1970.0));
        let result = estimate(&series(StationCategory::Groundwater, readings), &TrendConfig::default());
        assert!(result.usable);
        assert!((result.magnitude_per_decade.unwrap() + 0.2).abs() < 1e-9);
        assert_eq!(result.direction, Some(TrendDirection::Declining));
        assert_eq!(result.span_years, 40);
        assert_eq!(result.distinct_years, 40);
        let fit = result.fit.unwrap();
        assert!((fit.r_squared - 1.0).abs() < 1e-9);
        assert!(fit.slope_std_error_per_decade < 1e-6);
        assert!((fit.latest_level - (350.0 - 0.02 * 39.0)).abs() < 1e-9);
        assert!(fit.recent_change_pct.unwrap() < 0.0);
    }

    #[test]
    fn test_rising_and_stable() {
        let rising = quarterly(1980, 20, |y| 200.0 + 0.05 * (y - 1980.0));
        let result = estimate(&series(StationCategory::Groundwater, rising), &TrendConfig::default());
        assert_eq!(result.direction, Some(TrendDirection::Rising));

        // symmetric dip and recovery has no net slope
        let stable = quarterly(1980, 20, |y| 200.0 + 0.01 * (y - 1989.5).abs());
        let result = estimate(&series(StationCategory::Groundwater, stable), &TrendConfig::default());
        assert!(result.usable);
        assert!(result.magnitude_per_decade.unwrap().abs() <= 0.01);
        assert_eq!(result.direction, Some(TrendDirection::Stable));
    }

    #[test]
    fn test_too_few_years_is_unusable() {
        let config = TrendConfig::default();
        for years in 2..config.min_years as i32 {
            let readings = quarterly(2000, years, |y| 100.0 - 0.1 * (y - 2000.0));
            let result = estimate(&series(StationCategory::Groundwater, readings), &config);
            assert!(!result.usable, "{} years accepted", years);
            assert!(matches!(result.reason, Some(DataQualityError::TooFewYears { .. })));
            assert!(result.magnitude_per_decade.is_none());
        }
    }

    #[test]
    fn test_single_annual_point_and_empty() {
        let one_year = vec![Reading::new(ts(2000, 1, 1), 1.0), Reading::new(ts(2000, 6, 1), 2.0)];
        let result = estimate(&series(StationCategory::Groundwater, one_year), &TrendConfig::default());
        assert_eq!(result.reason, Some(DataQualityError::SingleAnnualPoint));

        let result = estimate(&series(StationCategory::Groundwater, vec![]), &TrendConfig::default());
        assert_eq!(result.reason, Some(DataQualityError::NoReadings));
        assert_eq!(result.span_years, 0);
    }

    #[test]
    fn test_zero_variance_is_unusable() {
        let flat = quarterly(1970, 30, |_| 250.0);
        let result = estimate(&series(StationCategory::Groundwater, flat), &TrendConfig::default());
        assert!(!result.usable);
        assert!(!result.variance_ok);
        assert_eq!(result.reason, Some(DataQualityError::ZeroVariance));
    }

    #[test]
    fn test_excessive_variance_is_unusable() {
        // swings of +-50 around a mean of 10
        let wild = quarterly(1970, 30, |y| if y as i64 % 2 == 0 { 60.0 } else { -40.0 });
        let result = estimate(&series(StationCategory::Groundwater, wild), &TrendConfig::default());
        assert!(matches!(result.reason, Some(DataQualityError::ExcessiveVariance { .. })));

        // zero mean counts as an infinite ratio
        let centred = quarterly(1970, 30, |y| if y as i64 % 2 == 0 { 1.0 } else { -1.0 });
        let result = estimate(&series(StationCategory::Groundwater, centred), &TrendConfig::default());
        assert!(matches!(
            result.reason,
            Some(DataQualityError::ExcessiveVariance { ratio, .. }) if ratio.is_infinite()
        ));
    }

    #[test]
    fn test_non_finite_value_is_unusable() {
        let mut readings = quarterly(1970, 30, |y| 300.0 - 0.01 * y);
        readings[5].value = f64::NAN;
        let result = estimate(&series(StationCategory::Groundwater, readings), &TrendConfig::default());
        assert!(matches!(result.reason, Some(DataQualityError::NonFiniteValue { .. })));
        assert_eq!(result.distinct_years, 30);
    }

    #[test]
    fn test_outlier_screen_removes_spike() {
        let mut readings = quarterly(1970, 30, |y| 300.0 - 0.01 * (y - 1970.0));
        // a single logger fault far above the normal range
        readings[60].value = 9000.0;
        let screened = screen_outliers(&readings, 3.0);
        assert_eq!(screened.len(), readings.len() - 1);
        assert!(screened.iter().all(|r| r.value < 1000.0));

        let result = estimate(&series(StationCategory::Groundwater, readings.clone()), &TrendConfig::default());
        assert!((result.magnitude_per_decade.unwrap() + 0.1).abs() < 1e-9);

        let unscreened = TrendConfig {
            outlier_iqr_factor: None,
            ..TrendConfig::default()
        };
        let result = estimate(&series(StationCategory::Groundwater, readings), &unscreened);
        assert!(!result.usable || (result.magnitude_per_decade.unwrap() + 0.1).abs() > 1e-3);
    }

    #[test]
    fn test_quartiles_interpolate() {
        let (q1, q3) = quartiles(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert!((q1 - 1.75).abs() < 1e-12);
        assert!((q3 - 3.25).abs() < 1e-12);
        assert!(quartiles(&[]).is_none());
    }

    #[test]
    fn test_precipitation_uses_annual_totals() {
        let readings = vec![
            Reading::new(ts(2000, 1, 1), 10.0),
            Reading::new(ts(2000, 2, 1), 20.0),
            Reading::new(ts(2001, 1, 1), 5.0),
        ];
        let totals = annual_values(&readings, StationCategory::Precipitation.annual_aggregate(), 1);
        assert_eq!(totals, vec![
            AnnualValue { year: 2000, value: 30.0 },
            AnnualValue { year: 2001, value: 5.0 },
        ]);
        let means = annual_values(&readings, StationCategory::Groundwater.annual_aggregate(), 1);
        assert_eq!(means[0].value, 15.0);
    }

    #[test]
    fn test_min_readings_per_year_drops_sparse_years() {
        let mut readings = quarterly(1990, 12, |y| 500.0 - 0.03 * (y - 1990.0));
        readings.push(Reading::new(ts(2005, 1, 1), 400.0));
        let config = TrendConfig {
            min_readings_per_year: 4,
            ..TrendConfig::default()
        };
        let result = estimate(&series(StationCategory::Groundwater, readings), &config);
        assert!(result.usable);
        assert_eq!(result.distinct_years, 12);
        assert!((result.magnitude_per_decade.unwrap() + 0.3).abs() < 1e-9);
    }

    /// 365 daily totals per year: `40 + i` wet days of 25 mm, 120 showery
    /// days of 3 mm and the rest drizzle, so the annual total rises by
    /// 24.5 mm every year.
    fn skewed_daily_precipitation(first: i32, years: i32) -> Vec<Reading> {
        let mut readings = Vec::new();
        for i in 0..years {
            let year = first + i;
            let wet = 40 + i as u32;
            for day in 1..=365u32 {
                let value = if day <= wet {
                    25.0
                } else if day <= wet + 120 {
                    3.0
                } else {
                    0.5
                };
                let date = NaiveDate::from_yo_opt(year, day).unwrap();
                readings.push(Reading::new(date.and_hms_opt(0, 0, 0).unwrap(), value));
            }
        }
        readings
    }

    #[test]
    fn test_skewed_daily_precipitation_keeps_wet_days() {
        let readings = skewed_daily_precipitation(1980, 30);
        // a reading-level fence would cut every wet day
        assert!(screen_outliers(&readings, 3.0).len() < readings.len());

        let result = estimate(&series(StationCategory::Precipitation, readings), &TrendConfig::default());
        assert!(result.usable, "{:?}", result.reason);
        assert_eq!(result.distinct_years, 30);
        assert!((result.magnitude_per_decade.unwrap() - 245.0).abs() < 1e-6);
        assert_eq!(result.direction, Some(TrendDirection::Rising));
        assert!((result.fit.unwrap().mean_level - 1817.75).abs() < 1e-6);
    }

    #[test]
    fn test_annual_sigma_screen_drops_extreme_year() {
        let mut readings = quarterly(1970, 30, |y| 250.0 + (y - 1970.0));
        for r in readings.iter_mut().filter(|r| r.timestamp.year() == 1985) {
            r.value = 2000.0;
        }
        let result = estimate(&series(StationCategory::Precipitation, readings.clone()), &TrendConfig::default());
        assert!(result.usable, "{:?}", result.reason);
        assert_eq!(result.distinct_years, 29);
        assert!((result.magnitude_per_decade.unwrap() - 40.0).abs() < 1e-9);

        let unscreened = TrendConfig {
            annual_sigma_factor: None,
            ..TrendConfig::default()
        };
        let result = estimate(&series(StationCategory::Precipitation, readings), &unscreened);
        assert!(matches!(result.reason, Some(DataQualityError::ExcessiveVariance { .. })));
    }

    #[test]
    fn test_annual_sigma_screen_keeps_constant_values() {
        let flat = vec![
            AnnualValue { year: 2000, value: 5.0 },
            AnnualValue { year: 2001, value: 5.0 },
        ];
        assert_eq!(screen_annual_outliers(&flat, 2.0), flat);
        assert!(screen_annual_outliers(&[], 2.0).is_empty());
    }

    #[test]
    fn test_overflowing_variance_is_unusable() {
        // quarterly sums overflow to infinity, leaving a NaN variance
        let huge = quarterly(1970, 30, |y| 1.0e308 * (1.0 + 0.001 * (y - 1970.0)));
        let result = estimate(&series(StationCategory::Groundwater, huge), &TrendConfig::default());
        assert!(!result.usable);
        assert!(matches!(
            result.reason,
            Some(DataQualityError::ExcessiveVariance { ratio, .. }) if ratio.is_infinite()
        ));
    }

    #[test]
    fn test_deterministic() {
        let readings = quarterly(1960, 50, |y| 180.0 + (y * 0.7).sin() - 0.004 * y);
        let s = series(StationCategory::Groundwater, readings);
        let config = TrendConfig::default();
        assert_eq!(estimate(&s, &config), estimate(&s, &config));
    }
}
