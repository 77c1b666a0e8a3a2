//! Cross-relationship comparison
//!
//! Ranks relationships by composite score and energy impact, averages their
//! supporting metrics and summarizes growth from supplied trend labels.
//!
//! Ties in every ranking go to the relationship that appears first in the
//! input. Callers that want a different tie-break must order the input.
//! Relationships without records in the window are counted, never ranked.

use crate::config::{ComparisonThresholds, EngineConfig};
use crate::types::{
    ComparisonEntry, ComparisonReport, GrowthMetrics, RankedRelationship, RiskTier, TrendLabel,
};

/// Comparison engine over per-relationship snapshots
#[derive(Debug, Clone, Default)]
pub struct RelationshipComparator {
    thresholds: ComparisonThresholds,
}

impl RelationshipComparator {
    pub fn new(thresholds: ComparisonThresholds) -> Self {
        Self { thresholds }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.comparison.clone())
    }

    /// Compare relationships; an empty input yields the "no data" report.
    ///
    /// Entries with an `Unknown` tier had no records in the window. They are
    /// left out of rankings, averages, counts and growth, and reported only
    /// through `insufficient_data`.
    pub fn compare(&self, entries: &[ComparisonEntry]) -> ComparisonReport {
        let scored: Vec<&ComparisonEntry> = entries
            .iter()
            .filter(|e| e.snapshot.risk_tier != RiskTier::Unknown)
            .collect();
        let insufficient_data = entries.len() - scored.len();

        if scored.is_empty() {
            tracing::debug!(insufficient_data, "no relationships with data to compare");
            return ComparisonReport {
                insufficient_data,
                ..ComparisonReport::no_data()
            };
        }

        let count = scored.len() as f64;
        let score_of = |e: &ComparisonEntry| f64::from(e.snapshot.score);
        let energy_of = |e: &ComparisonEntry| e.metrics.energy_delta;

        let report = ComparisonReport {
            has_data: true,
            relationship_count: scored.len(),
            insufficient_data,
            healthiest: pick(&scored, score_of, |candidate, best| candidate > best),
            most_problematic: pick(&scored, score_of, |candidate, best| candidate < best),
            most_energizing: pick(&scored, energy_of, |candidate, best| candidate > best),
            most_draining: pick(&scored, energy_of, |candidate, best| candidate < best),
            avg_health_score: scored.iter().map(|e| score_of(*e)).sum::<f64>() / count,
            avg_energy_delta: scored.iter().map(|e| energy_of(*e)).sum::<f64>() / count,
            avg_boundary_respect_rate: mean_present(
                scored.iter().map(|e| e.metrics.boundary_respect_rate),
            ),
            healthy_count: scored
                .iter()
                .filter(|e| e.snapshot.score >= self.thresholds.healthy)
                .count(),
            concerning_count: scored
                .iter()
                .filter(|e| e.snapshot.score < self.thresholds.concerning)
                .count(),
            growth: compute_growth(&scored),
        };

        tracing::debug!(
            relationships = report.relationship_count,
            insufficient_data,
            avg_health_score = report.avg_health_score,
            growth_score = report.growth.growth_score,
            "compared relationships"
        );

        report
    }
}

/// Compare with default thresholds
pub fn compare_relationships(entries: &[ComparisonEntry]) -> ComparisonReport {
    RelationshipComparator::default().compare(entries)
}

/// Select the entry whose key beats every earlier one; the first wins ties
fn pick(
    entries: &[&ComparisonEntry],
    key: impl Fn(&ComparisonEntry) -> f64,
    beats: impl Fn(f64, f64) -> bool,
) -> Option<RankedRelationship> {
    let mut iter = entries.iter().copied();
    let first = iter.next()?;
    let mut best = (first, key(first));

    for entry in iter {
        let value = key(entry);
        if beats(value, best.1) {
            best = (entry, value);
        }
    }

    Some(RankedRelationship {
        relationship_id: best.0.relationship_id.clone(),
        score: best.0.snapshot.score,
        energy_delta: best.0.metrics.energy_delta,
    })
}

fn mean_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let present: Vec<f64> = values.flatten().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// Growth score = (mean boundary growth + improving fraction × 100) / 2
fn compute_growth(entries: &[&ComparisonEntry]) -> GrowthMetrics {
    let improving = count_trend(entries, TrendLabel::Improving);
    let declining = count_trend(entries, TrendLabel::Declining);
    let stable = count_trend(entries, TrendLabel::Stable);

    let avg_boundary_growth = mean_present(
        entries
            .iter()
            .map(|e| e.boundary_growth.or(e.metrics.boundary_respect_rate)),
    )
    .unwrap_or(0.0);

    let improving_fraction = if entries.is_empty() {
        0.0
    } else {
        improving as f64 / entries.len() as f64
    };

    GrowthMetrics {
        improving,
        declining,
        stable,
        avg_boundary_growth,
        improving_fraction,
        growth_score: (avg_boundary_growth + improving_fraction * 100.0) / 2.0,
    }
}

fn count_trend(entries: &[&ComparisonEntry], label: TrendLabel) -> usize {
    entries.iter().filter(|e| e.trend == label).count()
}
