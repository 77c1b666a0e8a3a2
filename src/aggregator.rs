//! Metric aggregation
//!
//! This module reduces a relationship's interaction records into summary
//! statistics:
//! - Mean pre/post deltas for energy, anxiety and self-worth
//! - Recovery time and coping effectiveness
//! - Symptom, boundary-testing and support-engagement rates
//! - Compatibility averages and boundary respect
//!
//! Every statistic only counts the records that observed its field. A missing
//! slot is left out of both numerator and denominator.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::config::{EngineConfig, DEFAULT_SYMPTOM_TOP_N};
use crate::error::ComputeError;
use crate::types::{AggregateMetrics, InteractionRecord, SymptomFrequency};
use crate::window::{TimeWindow, WindowFilter};

/// Aggregator for computing summary metrics over interaction records
#[derive(Debug, Clone)]
pub struct MetricAggregator {
    symptom_top_n: usize,
}

impl Default for MetricAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_SYMPTOM_TOP_N)
    }
}

impl MetricAggregator {
    /// Create an aggregator that reports the `symptom_top_n` most frequent symptoms
    pub fn new(symptom_top_n: usize) -> Self {
        Self { symptom_top_n }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.symptom_top_n)
    }

    /// Aggregate records, optionally keeping only those inside `window`
    pub fn aggregate(
        &self,
        records: &[InteractionRecord],
        window: Option<WindowFilter>,
    ) -> Result<AggregateMetrics, ComputeError> {
        let selected: Vec<&InteractionRecord> = match window {
            Some(filter) => {
                let keep = filter.predicate()?;
                records.iter().filter(|r| keep(&r.created_at)).collect()
            }
            None => records.iter().collect(),
        };

        self.aggregate_selected(&selected, window.map(|f| f.window))
    }

    /// Aggregate records whose timestamps fall in the half-open range `[start, end)`
    pub fn aggregate_range(
        &self,
        records: &[InteractionRecord],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        window: Option<TimeWindow>,
    ) -> Result<AggregateMetrics, ComputeError> {
        let selected: Vec<&InteractionRecord> = records
            .iter()
            .filter(|r| r.created_at >= start && r.created_at < end)
            .collect();

        self.aggregate_selected(&selected, window)
    }

    fn aggregate_selected(
        &self,
        records: &[&InteractionRecord],
        window: Option<TimeWindow>,
    ) -> Result<AggregateMetrics, ComputeError> {
        if records.is_empty() {
            tracing::debug!(window = ?window, "no interactions in window, returning neutral metrics");
            return Ok(AggregateMetrics::empty(window));
        }

        for record in records {
            if let Err(e) = record.validate() {
                tracing::warn!(record_id = %record.id, error = %e, "rejecting invalid interaction record");
                return Err(e.into());
            }
        }

        let avg_recovery_time = mean(records.iter().filter_map(|r| r.recovery_time_minutes.map(|m| m as f64)));

        let metrics = AggregateMetrics {
            window,
            total_records: records.len(),
            energy_delta: mean(records.iter().filter_map(|r| r.energy_delta())).unwrap_or(0.0),
            anxiety_delta: mean(records.iter().filter_map(|r| r.anxiety_delta())).unwrap_or(0.0),
            self_worth_delta: mean(records.iter().filter_map(|r| r.self_worth_delta()))
                .unwrap_or(0.0),
            avg_recovery_time: avg_recovery_time.unwrap_or(0.0),
            physical_symptom_rate: percentage(
                records
                    .iter()
                    .filter_map(|r| r.physical_symptoms.as_ref().map(|s| !s.is_empty())),
            )
            .unwrap_or(0.0),
            boundary_test_rate: percentage(records.iter().filter_map(|r| r.boundary_testing))
                .unwrap_or(0.0),
            support_engagement_rate: percentage(
                records.iter().filter_map(|r| r.support_system_engaged),
            )
            .unwrap_or(0.0),
            coping_effectiveness_rate: compute_coping_effectiveness(
                records,
                avg_recovery_time.unwrap_or(0.0),
            ),
            comm_quality_avg: mean(records.iter().filter_map(|r| {
                r.compatibility
                    .as_ref()
                    .and_then(|c| c.communication_quality)
                    .map(f64::from)
            })),
            emotional_needs_avg: mean(records.iter().filter_map(|r| {
                r.compatibility
                    .as_ref()
                    .and_then(|c| c.emotional_needs_met)
                    .map(f64::from)
            })),
            values_alignment_avg: mean(records.iter().filter_map(|r| {
                r.compatibility
                    .as_ref()
                    .and_then(|c| c.values_alignment)
                    .map(f64::from)
            })),
            boundary_respect_rate: compute_boundary_respect_rate(records),
            symptom_frequency: compute_symptom_frequency(records, self.symptom_top_n),
        };

        tracing::debug!(
            window = ?window,
            records = metrics.total_records,
            energy_delta = metrics.energy_delta,
            anxiety_delta = metrics.anxiety_delta,
            "aggregated interaction metrics"
        );

        Ok(metrics)
    }
}

/// Aggregate with default settings
pub fn aggregate(
    records: &[InteractionRecord],
    window: Option<WindowFilter>,
) -> Result<AggregateMetrics, ComputeError> {
    MetricAggregator::default().aggregate(records, window)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Share of `true` observations, as a percentage
fn percentage(flags: impl Iterator<Item = bool>) -> Option<f64> {
    let (hits, count) = flags.fold((0usize, 0usize), |(hits, count), flag| {
        (hits + usize::from(flag), count + 1)
    });
    if count == 0 {
        None
    } else {
        Some(hits as f64 / count as f64 * 100.0)
    }
}

/// Share of records observing both coping skills and recovery time where
/// skills were used and recovery took no longer than the window's average
///
/// `avg_recovery_time` must be the value already computed for the same window.
fn compute_coping_effectiveness(records: &[&InteractionRecord], avg_recovery_time: f64) -> f64 {
    percentage(records.iter().filter_map(|r| {
        let skills = r.coping_skills_used.as_ref()?;
        let minutes = r.recovery_time_minutes?;
        Some(!skills.is_empty() && (minutes as f64) <= avg_recovery_time)
    }))
    .unwrap_or(0.0)
}

/// Boundaries met over all boundary observations, as a percentage
fn compute_boundary_respect_rate(records: &[&InteractionRecord]) -> Option<f64> {
    let (met, violated) = records
        .iter()
        .filter_map(|r| r.compatibility.as_ref())
        .fold((0usize, 0usize), |(met, violated), c| {
            (met + c.boundaries_met.len(), violated + c.boundaries_violated.len())
        });

    let total = met + violated;
    if total == 0 {
        None
    } else {
        Some(met as f64 / total as f64 * 100.0)
    }
}

/// Count symptom occurrences across records that observed symptoms, most
/// frequent first (ties ordered by name), truncated to `top_n`
fn compute_symptom_frequency(records: &[&InteractionRecord], top_n: usize) -> Vec<SymptomFrequency> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut observed = 0usize;

    for symptoms in records.iter().filter_map(|r| r.physical_symptoms.as_ref()) {
        observed += 1;
        for symptom in symptoms {
            *counts.entry(symptom.as_str()).or_insert(0) += 1;
        }
    }

    if observed == 0 {
        return Vec::new();
    }

    let mut frequency: Vec<SymptomFrequency> = counts
        .into_iter()
        .map(|(symptom, count)| SymptomFrequency {
            symptom: symptom.to_string(),
            count,
            percentage: count as f64 / observed as f64 * 100.0,
        })
        .collect();

    frequency.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.symptom.cmp(&b.symptom)));
    frequency.truncate(top_n);
    frequency
}
