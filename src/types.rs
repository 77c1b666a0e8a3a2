//! Core types for the Synheart Rapport engine
//!
//! This module defines the data structures that flow through the engine:
//! interaction records and baselines coming in, aggregate metrics and health
//! snapshots in the middle, and comparison reports and boundary goals going out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::window::TimeWindow;

/// Five-point mood ordinal captured before an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    VeryLow,
    Low,
    Neutral,
    Good,
    VeryGood,
}

impl Mood {
    /// Ordinal position on the 1-5 scale
    pub fn ordinal(&self) -> u8 {
        match self {
            Mood::VeryLow => 1,
            Mood::Low => 2,
            Mood::Neutral => 3,
            Mood::Good => 4,
            Mood::VeryGood => 5,
        }
    }
}

/// Compatibility assessment attached to the extended form of a record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityAssessment {
    /// Communication quality (1-10)
    pub communication_quality: Option<u8>,
    #[serde(default)]
    pub communication_issues: BTreeSet<String>,
    #[serde(default)]
    pub boundaries_met: BTreeSet<String>,
    #[serde(default)]
    pub boundaries_violated: BTreeSet<String>,
    /// How well emotional needs were met (1-10)
    pub emotional_needs_met: Option<u8>,
    /// Values alignment (1-10)
    pub values_alignment: Option<u8>,
}

/// One logged encounter with a tracked relationship
///
/// Every observation is an optional slot. A `None` means the user did not
/// record that value; it never stands in for zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: String,
    pub user_id: String,
    pub relationship_id: String,
    pub created_at: DateTime<Utc>,

    // Pre-interaction state
    pub energy_before: Option<u8>,
    pub anxiety_before: Option<u8>,
    pub self_worth_before: Option<u8>,
    pub mood: Option<Mood>,
    #[serde(default)]
    pub warning_signs: BTreeSet<String>,

    // Context
    pub interaction_type: Option<String>,
    pub duration_minutes: Option<i64>,
    pub location: Option<String>,
    pub witnesses_present: Option<bool>,
    pub boundary_testing: Option<bool>,

    // Post-interaction state
    pub energy_after: Option<u8>,
    pub anxiety_after: Option<u8>,
    pub self_worth_after: Option<u8>,
    /// Physical symptoms noticed afterwards; `None` when the question was skipped
    pub physical_symptoms: Option<BTreeSet<String>>,
    #[serde(default)]
    pub emotional_states: BTreeSet<String>,

    // Recovery
    pub recovery_time_minutes: Option<i64>,
    /// Coping skills tried; `None` when the question was skipped
    pub coping_skills_used: Option<BTreeSet<String>>,
    pub what_helped: Option<String>,
    pub what_made_worse: Option<String>,
    pub support_system_engaged: Option<bool>,

    /// Present only on the extended form
    pub compatibility: Option<CompatibilityAssessment>,
}

impl InteractionRecord {
    /// Create a record with identity fields set and every observation empty
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        relationship_id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            relationship_id: relationship_id.into(),
            created_at,
            energy_before: None,
            anxiety_before: None,
            self_worth_before: None,
            mood: None,
            warning_signs: BTreeSet::new(),
            interaction_type: None,
            duration_minutes: None,
            location: None,
            witnesses_present: None,
            boundary_testing: None,
            energy_after: None,
            anxiety_after: None,
            self_worth_after: None,
            physical_symptoms: None,
            emotional_states: BTreeSet::new(),
            recovery_time_minutes: None,
            coping_skills_used: None,
            what_helped: None,
            what_made_worse: None,
            support_system_engaged: None,
            compatibility: None,
        }
    }

    /// Post minus pre energy, if both sides were observed
    pub fn energy_delta(&self) -> Option<f64> {
        delta(self.energy_before, self.energy_after)
    }

    /// Post minus pre anxiety, if both sides were observed
    pub fn anxiety_delta(&self) -> Option<f64> {
        delta(self.anxiety_before, self.anxiety_after)
    }

    /// Post minus pre self-worth, if both sides were observed
    pub fn self_worth_delta(&self) -> Option<f64> {
        delta(self.self_worth_before, self.self_worth_after)
    }

    /// Number of distinct physical symptoms (0 when not observed)
    pub fn symptom_count(&self) -> usize {
        self.physical_symptoms.as_ref().map_or(0, BTreeSet::len)
    }
}

fn delta(before: Option<u8>, after: Option<u8>) -> Option<f64> {
    match (before, after) {
        (Some(b), Some(a)) => Some(f64::from(a) - f64::from(b)),
        _ => None,
    }
}

/// One versioned snapshot of a user's preferences and boundaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselinePreferences {
    pub user_id: String,
    /// Monotonically increasing per user; the latest baseline has the max version
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub communication_style: Option<String>,
    pub conflict_resolution_style: Option<String>,
    pub emotional_support_level: Option<String>,
    pub personal_space_needs: Option<String>,
    pub response_time_expectation_hours: Option<f64>,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub non_negotiable_boundaries: Vec<String>,
    #[serde(default)]
    pub flexible_boundaries: Vec<String>,
    #[serde(default)]
    pub deal_breaker_behaviors: Vec<String>,
    #[serde(default)]
    pub relationship_goals: Vec<String>,
}

impl BaselinePreferences {
    /// Create an empty baseline for the given user and version
    pub fn new(user_id: impl Into<String>, version: u32, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            version,
            created_at,
            communication_style: None,
            conflict_resolution_style: None,
            emotional_support_level: None,
            personal_space_needs: None,
            response_time_expectation_hours: None,
            triggers: Vec::new(),
            non_negotiable_boundaries: Vec::new(),
            flexible_boundaries: Vec::new(),
            deal_breaker_behaviors: Vec::new(),
            relationship_goals: Vec::new(),
        }
    }
}

/// Where a boundary goal came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalSource {
    Baseline,
    Manual,
}

/// A tracked target respect rate for a named boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryGoal {
    pub id: Uuid,
    pub user_id: String,
    pub boundary_name: String,
    pub description: String,
    /// Target respect rate (0-100)
    pub target_respect_rate: u8,
    pub source: GoalSource,
    pub is_active: bool,
}

impl BoundaryGoal {
    /// Whether this goal was derived from a baseline
    pub fn is_from_baseline(&self) -> bool {
        self.source == GoalSource::Baseline
    }
}

/// Occurrence statistics for one physical symptom
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomFrequency {
    pub symptom: String,
    pub count: usize,
    /// Share of symptom-observed records reporting this symptom (0-100)
    pub percentage: f64,
}

/// Summary statistics for one relationship over one window
///
/// Rates are percentages (0-100). Every statistic is computed only over the
/// records that observed the underlying field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
    /// Window the records were filtered to, if any
    pub window: Option<TimeWindow>,
    /// Number of records that fell inside the window
    pub total_records: usize,
    pub energy_delta: f64,
    pub anxiety_delta: f64,
    pub self_worth_delta: f64,
    /// Mean recovery time (minutes)
    pub avg_recovery_time: f64,
    pub physical_symptom_rate: f64,
    pub boundary_test_rate: f64,
    pub support_engagement_rate: f64,
    pub coping_effectiveness_rate: f64,
    pub comm_quality_avg: Option<f64>,
    pub emotional_needs_avg: Option<f64>,
    pub values_alignment_avg: Option<f64>,
    /// Boundaries met / (met + violated), as a percentage
    pub boundary_respect_rate: Option<f64>,
    pub symptom_frequency: Vec<SymptomFrequency>,
}

impl AggregateMetrics {
    /// Neutral metrics for a window with no records
    pub fn empty(window: Option<TimeWindow>) -> Self {
        Self {
            window,
            total_records: 0,
            energy_delta: 0.0,
            anxiety_delta: 0.0,
            self_worth_delta: 0.0,
            avg_recovery_time: 0.0,
            physical_symptom_rate: 0.0,
            boundary_test_rate: 0.0,
            support_engagement_rate: 0.0,
            coping_effectiveness_rate: 0.0,
            comm_quality_avg: None,
            emotional_needs_avg: None,
            values_alignment_avg: None,
            boundary_respect_rate: None,
            symptom_frequency: Vec::new(),
        }
    }

    /// True when no records contributed (insufficient data, not perfect health)
    pub fn is_empty(&self) -> bool {
        self.total_records == 0
    }
}

/// Discrete risk classification derived from the composite score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
    Critical,
    /// No records were available to score
    Unknown,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
            RiskTier::Critical => "critical",
            RiskTier::Unknown => "unknown",
        }
    }
}

/// Signed contribution of each factor to the composite score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactors {
    pub energy: f64,
    pub anxiety: f64,
    pub self_worth: f64,
    pub recovery_time: f64,
    pub physical_symptoms: f64,
    pub boundary_testing: f64,
    pub support_engagement: f64,
    pub coping_effectiveness: f64,
}

impl ScoreFactors {
    pub fn total(&self) -> f64 {
        self.energy
            + self.anxiety
            + self.self_worth
            + self.recovery_time
            + self.physical_symptoms
            + self.boundary_testing
            + self.support_engagement
            + self.coping_effectiveness
    }
}

/// Health scorer output for one relationship over one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Composite score (0-100)
    pub score: u8,
    pub risk_tier: RiskTier,
    /// Unclamped weighted sum
    pub raw_score: f64,
    pub factors: ScoreFactors,
    pub record_count: usize,
}

/// One charting point per interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub record_id: String,
    pub timestamp: DateTime<Utc>,
    pub energy_delta: Option<f64>,
    pub anxiety_delta: Option<f64>,
    pub self_worth_delta: Option<f64>,
    pub recovery_time_minutes: Option<i64>,
    pub symptom_count: usize,
}

/// Direction a relationship is heading across consecutive windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    Improving,
    Declining,
    Stable,
}

/// One relationship's input to the comparison engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    pub relationship_id: String,
    pub snapshot: HealthSnapshot,
    pub metrics: AggregateMetrics,
    pub trend: TrendLabel,
    /// Boundary growth value; falls back to the boundary respect rate when absent
    #[serde(default)]
    pub boundary_growth: Option<f64>,
}

/// A relationship named by a ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRelationship {
    pub relationship_id: String,
    pub score: u8,
    pub energy_delta: f64,
}

/// Growth summary across relationships
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrowthMetrics {
    pub improving: usize,
    pub declining: usize,
    pub stable: usize,
    pub avg_boundary_growth: f64,
    /// Fraction of relationships labelled improving (0-1)
    pub improving_fraction: f64,
    pub growth_score: f64,
}

/// Cross-relationship comparison output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// False for the "no data" report produced from an empty comparison set
    pub has_data: bool,
    /// Relationships with records in the window; only these are ranked
    pub relationship_count: usize,
    /// Relationships with no records in the window
    #[serde(default)]
    pub insufficient_data: usize,
    pub healthiest: Option<RankedRelationship>,
    pub most_problematic: Option<RankedRelationship>,
    pub most_energizing: Option<RankedRelationship>,
    pub most_draining: Option<RankedRelationship>,
    pub avg_health_score: f64,
    pub avg_energy_delta: f64,
    pub avg_boundary_respect_rate: Option<f64>,
    pub healthy_count: usize,
    pub concerning_count: usize,
    pub growth: GrowthMetrics,
}

impl ComparisonReport {
    /// Report for an empty comparison set
    pub fn no_data() -> Self {
        Self {
            has_data: false,
            relationship_count: 0,
            insufficient_data: 0,
            healthiest: None,
            most_problematic: None,
            most_energizing: None,
            most_draining: None,
            avg_health_score: 0.0,
            avg_energy_delta: 0.0,
            avg_boundary_respect_rate: None,
            healthy_count: 0,
            concerning_count: 0,
            growth: GrowthMetrics::default(),
        }
    }
}
