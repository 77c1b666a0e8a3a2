//! Composite health scoring
//!
//! score = 50 + energyΔ×10 − anxietyΔ×8 + selfWorthΔ×12 − (recovery/60)×5
//!         − symptomRate×0.8 − boundaryTestRate×1.2
//!         + min(supportRate×0.3, 15) + copingRate×0.4
//!
//! The total is clamped to [0, 100] and rounded. Metrics with no records
//! score the neutral value with an `Unknown` tier.

use crate::config::{EngineConfig, RiskThresholds, ScoringWeights};
use crate::types::{AggregateMetrics, HealthSnapshot, RiskTier, ScoreFactors};

/// Pure scorer over aggregate metrics
#[derive(Debug, Clone, Default)]
pub struct HealthScorer {
    weights: ScoringWeights,
    thresholds: RiskThresholds,
}

impl HealthScorer {
    pub fn new(weights: ScoringWeights, thresholds: RiskThresholds) -> Self {
        Self {
            weights,
            thresholds,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.scoring.clone(), config.risk.clone())
    }

    /// Score one relationship/window
    pub fn score(&self, metrics: &AggregateMetrics) -> HealthSnapshot {
        if metrics.is_empty() {
            let neutral = self.weights.neutral_score;
            return HealthSnapshot {
                score: neutral,
                risk_tier: RiskTier::Unknown,
                raw_score: f64::from(neutral),
                factors: ScoreFactors::default(),
                record_count: 0,
            };
        }

        let factors = self.factors(metrics);
        let raw_score = self.weights.base_score + factors.total();
        let score = clamp_score(raw_score);
        let risk_tier = self.risk_tier(score);

        tracing::debug!(
            records = metrics.total_records,
            raw_score,
            score,
            risk_tier = risk_tier.as_str(),
            "scored relationship health"
        );

        HealthSnapshot {
            score,
            risk_tier,
            raw_score,
            factors,
            record_count: metrics.total_records,
        }
    }

    /// Map a clamped score onto a risk tier
    pub fn risk_tier(&self, score: u8) -> RiskTier {
        let t = &self.thresholds;
        if score >= t.low {
            RiskTier::Low
        } else if score >= t.medium {
            RiskTier::Medium
        } else if score >= t.high {
            RiskTier::High
        } else {
            RiskTier::Critical
        }
    }

    fn factors(&self, m: &AggregateMetrics) -> ScoreFactors {
        let w = &self.weights;
        ScoreFactors {
            energy: m.energy_delta * w.energy,
            anxiety: -(m.anxiety_delta * w.anxiety),
            self_worth: m.self_worth_delta * w.self_worth,
            recovery_time: -((m.avg_recovery_time / 60.0) * w.recovery_per_hour),
            physical_symptoms: -(m.physical_symptom_rate * w.physical_symptom),
            boundary_testing: -(m.boundary_test_rate * w.boundary_test),
            support_engagement: (m.support_engagement_rate * w.support_engagement)
                .min(w.support_cap),
            coping_effectiveness: m.coping_effectiveness_rate * w.coping_effectiveness,
        }
    }
}

/// Score with the default weights and thresholds
pub fn score(metrics: &AggregateMetrics) -> HealthSnapshot {
    HealthScorer::default().score(metrics)
}

/// Clamp to [0, 100] and round half away from zero
fn clamp_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, 100.0).round() as u8
}
