//! Result catalogs of a pipeline run.
use gdr_core::{
    error::MissingCoverageError,
    risk::{RiskCategory, RiskScore},
    station::StationCategory,
    trend::TrendResult,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every station's trend result, keyed by station id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationTrendCatalog {
    results: BTreeMap<String, TrendResult>,
}

impl StationTrendCatalog {
    pub fn new(results: Vec<TrendResult>) -> Self {
        StationTrendCatalog {
            results: results
                .into_iter()
                .map(|r| (r.station_id.clone(), r))
                .collect(),
        }
    }

    pub fn get(&self, station_id: &str) -> Option<&TrendResult> {
        self.results.get(station_id)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// All results in station id order.
    pub fn iter(&self) -> impl Iterator<Item = &TrendResult> {
        self.results.values()
    }

    /// Usable results of one category, in station id order.
    pub fn usable(&self, category: StationCategory) -> impl Iterator<Item = &TrendResult> {
        self.iter()
            .filter(move |r| r.usable && r.category == category)
    }

    pub fn usable_count(&self) -> usize {
        self.iter().filter(|r| r.usable).count()
    }

    pub fn unusable_count(&self) -> usize {
        self.len() - self.usable_count()
    }

    /// Unusable stations per rejection reason.
    pub fn unusable_by_reason(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for reason in self.iter().filter_map(|r| r.reason.as_ref()) {
            *counts.entry(reason.kind().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Usable stations per category; categories without any are omitted.
    pub fn usable_by_category(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for result in self.iter().filter(|r| r.usable) {
            *counts.entry(result.category.as_str().to_string()).or_insert(0) += 1;
        }
        counts
    }
}

/// A scored municipality with its position in the ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRisk {
    /// 1-based, highest composite first
    pub rank: usize,
    pub score: RiskScore,
}

/// Municipality risk scores ranked by composite descending, id ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MunicipalityRiskCatalog {
    ranked: Vec<RankedRisk>,
}

impl MunicipalityRiskCatalog {
    pub fn new(mut scores: Vec<RiskScore>) -> Self {
        scores.sort_by(|a, b| {
            b.composite
                .total_cmp(&a.composite)
                .then_with(|| a.municipality_id.cmp(&b.municipality_id))
        });
        let ranked = scores
            .into_iter()
            .enumerate()
            .map(|(i, score)| RankedRisk { rank: i + 1, score })
            .collect();
        MunicipalityRiskCatalog { ranked }
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RankedRisk> {
        self.ranked.iter()
    }

    pub fn get(&self, municipality_id: &str) -> Option<&RankedRisk> {
        self.ranked
            .iter()
            .find(|r| r.score.municipality_id == municipality_id)
    }

    /// Scores with a composite at or above `threshold`, in rank order.
    pub fn at_risk(&self, threshold: f64) -> impl Iterator<Item = &RiskScore> {
        self.ranked
            .iter()
            .map(|r| &r.score)
            .filter(move |s| s.composite >= threshold)
    }

    /// Municipalities per risk category.
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for category in [RiskCategory::High, RiskCategory::Medium, RiskCategory::Low] {
            counts.insert(category.to_string(), 0);
        }
        for ranked in &self.ranked {
            *counts.entry(ranked.score.category.to_string()).or_insert(0) += 1;
        }
        counts
    }
}

/// Counts describing one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub stations_total: usize,
    pub stations_usable: usize,
    pub stations_unusable: usize,
    pub unusable_by_reason: BTreeMap<String, usize>,
    pub usable_by_category: BTreeMap<String, usize>,
    pub municipalities_input: usize,
    pub municipalities_scored: usize,
    pub municipalities_excluded: usize,
    pub excluded_municipality_ids: Vec<String>,
    pub at_risk: usize,
    pub by_category: BTreeMap<String, usize>,
}

impl RunSummary {
    pub fn new(
        stations: &StationTrendCatalog,
        risks: &MunicipalityRiskCatalog,
        excluded: &[MissingCoverageError],
        municipalities_input: usize,
        at_risk_threshold: f64,
    ) -> Self {
        let mut excluded_municipality_ids: Vec<String> =
            excluded.iter().map(|e| e.municipality_id.clone()).collect();
        excluded_municipality_ids.sort();
        RunSummary {
            stations_total: stations.len(),
            stations_usable: stations.usable_count(),
            stations_unusable: stations.unusable_count(),
            unusable_by_reason: stations.unusable_by_reason(),
            usable_by_category: stations.usable_by_category(),
            municipalities_input,
            municipalities_scored: risks.len(),
            municipalities_excluded: excluded.len(),
            excluded_municipality_ids,
            at_risk: risks.at_risk(at_risk_threshold).count(),
            by_category: risks.category_counts(),
        }
    }
}
