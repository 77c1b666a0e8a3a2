//! Engine configuration
//!
//! Every tunable constant used by the scorer, comparison engine and goal
//! generator lives here. Defaults reproduce the reference heuristics exactly.

use serde::{Deserialize, Serialize};

use crate::error::ComputeError;

/// Default number of symptoms kept in the frequency report
pub const DEFAULT_SYMPTOM_TOP_N: usize = 8;

/// Weights of the composite health formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Starting point before adjustments
    pub base_score: f64,
    /// Score reported when there is no data
    pub neutral_score: u8,
    pub energy: f64,
    pub anxiety: f64,
    pub self_worth: f64,
    /// Penalty per hour of average recovery time
    pub recovery_per_hour: f64,
    pub physical_symptom: f64,
    pub boundary_test: f64,
    pub support_engagement: f64,
    /// Maximum contribution of support engagement
    pub support_cap: f64,
    pub coping_effectiveness: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base_score: 50.0,
            neutral_score: 50,
            energy: 10.0,
            anxiety: 8.0,
            self_worth: 12.0,
            recovery_per_hour: 5.0,
            physical_symptom: 0.8,
            boundary_test: 1.2,
            support_engagement: 0.3,
            support_cap: 15.0,
            coping_effectiveness: 0.4,
        }
    }
}

/// Lower bounds (inclusive) of each risk tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub low: u8,
    pub medium: u8,
    pub high: u8,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low: 70,
            medium: 50,
            high: 30,
        }
    }
}

/// Score cut-offs used when counting relationships in a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonThresholds {
    /// Scores at or above this count as healthy
    pub healthy: u8,
    /// Scores strictly below this count as concerning
    pub concerning: u8,
}

impl Default for ComparisonThresholds {
    fn default() -> Self {
        Self {
            healthy: 70,
            concerning: 40,
        }
    }
}

/// Default target respect rates for goals derived from a baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalTargets {
    pub non_negotiable: u8,
    pub trigger: u8,
    pub personal_space: u8,
}

impl Default for GoalTargets {
    fn default() -> Self {
        Self {
            non_negotiable: 95,
            trigger: 80,
            personal_space: 85,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scoring: ScoringWeights,
    pub risk: RiskThresholds,
    pub comparison: ComparisonThresholds,
    pub goals: GoalTargets,
    pub symptom_top_n: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringWeights::default(),
            risk: RiskThresholds::default(),
            comparison: ComparisonThresholds::default(),
            goals: GoalTargets::default(),
            symptom_top_n: DEFAULT_SYMPTOM_TOP_N,
        }
    }
}

impl EngineConfig {
    /// Load configuration from JSON; omitted fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Reject configurations that would break score or tier invariants
    pub fn validate(&self) -> Result<(), ComputeError> {
        let risk = &self.risk;
        if !(risk.low > risk.medium && risk.medium > risk.high && risk.low <= 100) {
            return Err(ComputeError::ConfigError(format!(
                "risk thresholds must satisfy 100 >= low > medium > high, got {}/{}/{}",
                risk.low, risk.medium, risk.high
            )));
        }

        if self.scoring.neutral_score > 100 {
            return Err(ComputeError::ConfigError(format!(
                "neutral score must be within 0-100, got {}",
                self.scoring.neutral_score
            )));
        }

        if self.scoring.support_cap < 0.0 {
            return Err(ComputeError::ConfigError(
                "support cap must not be negative".to_string(),
            ));
        }

        if self.comparison.healthy > 100 || self.comparison.concerning > 100 {
            return Err(ComputeError::ConfigError(
                "comparison thresholds must be within 0-100".to_string(),
            ));
        }

        let goals = &self.goals;
        for (name, target) in [
            ("non_negotiable", goals.non_negotiable),
            ("trigger", goals.trigger),
            ("personal_space", goals.personal_space),
        ] {
            if target > 100 {
                return Err(ComputeError::ConfigError(format!(
                    "goal target {name} must be within 0-100, got {target}"
                )));
            }
        }

        if self.symptom_top_n == 0 {
            return Err(ComputeError::ConfigError(
                "symptom_top_n must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"scoring": {"energy": 7.5}}"#).unwrap();
        assert_eq!(config.scoring.energy, 7.5);
        assert_eq!(config.scoring.anxiety, 8.0);
        assert_eq!(config.risk, RiskThresholds::default());
        assert_eq!(config.symptom_top_n, 8);
    }

    #[test]
    fn test_roundtrip_json() {
        let config = EngineConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_rejects_unordered_thresholds() {
        let result = EngineConfig::from_json(r#"{"risk": {"low": 40, "medium": 50, "high": 30}}"#);
        assert!(matches!(result, Err(ComputeError::ConfigError(_))));
    }

    #[test]
    fn test_rejects_goal_target_over_100() {
        let result = EngineConfig::from_json(r#"{"goals": {"trigger": 120}}"#);
        assert!(matches!(result, Err(ComputeError::ConfigError(_))));
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(matches!(
            EngineConfig::from_json("not json"),
            Err(ComputeError::JsonError(_))
        ));
    }
}
