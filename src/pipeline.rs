//! Pipeline orchestration
//!
//! This module provides the public API for Synheart Rapport.
//! It wires record retrieval → aggregation → scoring → trend/comparison, and
//! exposes JSON entry points used by the FFI layer and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregator::MetricAggregator;
use crate::comparison::RelationshipComparator;
use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::goals::GoalGenerator;
use crate::scorer::HealthScorer;
use crate::store::{BaselineSource, InMemoryStore, InteractionSource};
use crate::trends::project_time_series;
use crate::types::{
    AggregateMetrics, BaselinePreferences, BoundaryGoal, ComparisonEntry, ComparisonReport,
    HealthSnapshot, InteractionRecord, TimeSeriesPoint, TrendLabel,
};
use crate::window::{TimeWindow, WindowFilter};

/// Everything the engine derives for one relationship over one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipHealth {
    /// Relationship the records belong to; `None` when there were no records
    pub relationship_id: Option<String>,
    pub window: Option<TimeWindow>,
    pub evaluated_at: DateTime<Utc>,
    pub metrics: AggregateMetrics,
    pub snapshot: HealthSnapshot,
    /// Current window versus the window immediately before it
    pub trend: TrendLabel,
    pub timeline: Vec<TimeSeriesPoint>,
}

/// Processor that pulls records from a source and runs them through the engine.
///
/// Holds no mutable state; every call reads its own inputs, so one processor
/// can serve concurrent requests.
pub struct RapportProcessor<S> {
    source: S,
    config: EngineConfig,
    aggregator: MetricAggregator,
    scorer: HealthScorer,
    comparator: RelationshipComparator,
    goals: GoalGenerator,
}

impl<S> RapportProcessor<S>
where
    S: InteractionSource + BaselineSource,
{
    /// Create a processor with default settings
    pub fn new(source: S) -> Self {
        Self::build(source, EngineConfig::default())
    }

    /// Create a processor with a validated configuration
    pub fn with_config(source: S, config: EngineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self::build(source, config))
    }

    fn build(source: S, config: EngineConfig) -> Self {
        Self {
            aggregator: MetricAggregator::from_config(&config),
            scorer: HealthScorer::from_config(&config),
            comparator: RelationshipComparator::from_config(&config),
            goals: GoalGenerator::from_config(&config),
            source,
            config,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Health of one relationship, fetched from the source
    pub fn relationship_health(
        &self,
        relationship_id: &str,
        user_id: &str,
        window: Option<TimeWindow>,
        now: DateTime<Utc>,
    ) -> Result<RelationshipHealth, ComputeError> {
        let records = self.source.get_interactions(relationship_id, user_id)?;
        let mut health = self.analyze(&records, window, now)?;
        health.relationship_id = Some(relationship_id.to_string());
        Ok(health)
    }

    /// Trend of one relationship across the current and preceding window
    pub fn relationship_trend(
        &self,
        relationship_id: &str,
        user_id: &str,
        window: TimeWindow,
        now: DateTime<Utc>,
    ) -> Result<TrendLabel, ComputeError> {
        let records = self.source.get_interactions(relationship_id, user_id)?;
        self.trend(&records, Some(window), now)
    }

    /// Compare every relationship the user has logged interactions for.
    ///
    /// Relationships are compared in order of their first logged interaction,
    /// which fixes the ranking tie-break.
    pub fn compare_user_relationships(
        &self,
        user_id: &str,
        window: Option<TimeWindow>,
        now: DateTime<Utc>,
    ) -> Result<ComparisonReport, ComputeError> {
        let records = self.source.get_all_interactions(user_id)?;
        let entries = self.comparison_entries(&records, window, now)?;
        Ok(self.comparator.compare(&entries))
    }

    /// Goals to persist for a baseline that is about to be saved.
    ///
    /// Must be called before `baseline` is persisted; only a user's first
    /// baseline produces goals.
    pub fn goals_on_baseline_created(
        &self,
        baseline: &BaselinePreferences,
    ) -> Result<Vec<BoundaryGoal>, ComputeError> {
        let previous = self.source.get_latest_baseline(&baseline.user_id)?;
        Ok(self.goals.goals_for_new_baseline(baseline, previous.as_ref()))
    }

    /// Run the engine over one relationship's already materialized records
    ///
    /// Records spanning more than one relationship are rejected with
    /// `ComputeError::MixedRelationships`.
    pub fn analyze(
        &self,
        records: &[InteractionRecord],
        window: Option<TimeWindow>,
        now: DateTime<Utc>,
    ) -> Result<RelationshipHealth, ComputeError> {
        let relationship_id = single_relationship(records)?;
        let filter = window.map(|w| WindowFilter::new(w, now));
        let metrics = self.aggregator.aggregate(records, filter)?;
        let snapshot = self.scorer.score(&metrics);
        let trend = self.trend(records, window, now)?;

        let timeline = match filter {
            Some(f) => {
                let keep = f.predicate()?;
                let windowed: Vec<InteractionRecord> =
                    records.iter().filter(|r| keep(&r.created_at)).cloned().collect();
                project_time_series(&windowed)
            }
            None => project_time_series(records),
        };

        Ok(RelationshipHealth {
            relationship_id: relationship_id.map(str::to_string),
            window,
            evaluated_at: now,
            metrics,
            snapshot,
            trend,
            timeline,
        })
    }

    /// Build comparison entries, one per relationship in first-seen order
    pub fn comparison_entries(
        &self,
        records: &[InteractionRecord],
        window: Option<TimeWindow>,
        now: DateTime<Utc>,
    ) -> Result<Vec<ComparisonEntry>, ComputeError> {
        let mut groups: Vec<(String, Vec<InteractionRecord>)> = Vec::new();
        for record in records {
            match groups.iter_mut().find(|(id, _)| *id == record.relationship_id) {
                Some((_, group)) => group.push(record.clone()),
                None => groups.push((record.relationship_id.clone(), vec![record.clone()])),
            }
        }

        groups
            .into_iter()
            .map(|(relationship_id, group)| {
                let health = self.analyze(&group, window, now)?;
                Ok(ComparisonEntry {
                    relationship_id,
                    snapshot: health.snapshot,
                    metrics: health.metrics,
                    trend: health.trend,
                    boundary_growth: None,
                })
            })
            .collect()
    }

    fn trend(
        &self,
        records: &[InteractionRecord],
        window: Option<TimeWindow>,
        now: DateTime<Utc>,
    ) -> Result<TrendLabel, ComputeError> {
        let Some(window) = window else {
            return Ok(TrendLabel::Stable);
        };

        let current = self
            .aggregator
            .aggregate(records, Some(WindowFilter::new(window, now)))?;
        let (start, end) = window.preceding_range(now)?;
        let previous = self
            .aggregator
            .aggregate_range(records, start, end, Some(window))?;

        Ok(TrendLabel::from_windows(&previous, &current, &self.scorer))
    }
}

/// The relationship every record belongs to, or `None` for no records
pub fn single_relationship(records: &[InteractionRecord]) -> Result<Option<&str>, ComputeError> {
    let mut seen: Vec<&str> = Vec::new();
    for record in records {
        if !seen.contains(&record.relationship_id.as_str()) {
            seen.push(&record.relationship_id);
        }
    }

    match seen.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(*only)),
        _ => Err(ComputeError::MixedRelationships(seen.len())),
    }
}

/// Parse an RFC 3339 evaluation instant
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ComputeError> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ComputeError::DateParseError(format!("{value}: {e}")))
}

/// Parse an optional window name; blank means no window
pub fn parse_window(window: Option<&str>) -> Result<Option<TimeWindow>, ComputeError> {
    window
        .filter(|w| !w.trim().is_empty())
        .map(str::parse)
        .transpose()
}

fn parse_records(records_json: &str) -> Result<Vec<InteractionRecord>, ComputeError> {
    serde_json::from_str(records_json).map_err(|e| ComputeError::ParseError(e.to_string()))
}

/// Score a JSON array of one relationship's records and return health JSON.
///
/// # Arguments
/// * `records_json` - JSON array of interaction records
/// * `window` - Optional window name (`week`, `month`, `quarter`, `year`)
/// * `now` - RFC 3339 evaluation instant
///
/// # Example
/// ```ignore
/// let health_json = records_to_health_json(records, Some("month".into()), "2024-06-01T00:00:00Z".into())?;
/// ```
pub fn records_to_health_json(
    records_json: String,
    window: Option<String>,
    now: String,
) -> Result<String, ComputeError> {
    let records = parse_records(&records_json)?;
    let window = parse_window(window.as_deref())?;
    let now = parse_timestamp(&now)?;

    let processor = RapportProcessor::new(InMemoryStore::new());
    let health = processor.analyze(&records, window, now)?;
    serde_json::to_string_pretty(&health).map_err(|e| ComputeError::EncodingError(e.to_string()))
}

/// Compare every relationship in a JSON array of one user's records.
pub fn records_to_comparison_json(
    records_json: String,
    user_id: String,
    window: Option<String>,
    now: String,
) -> Result<String, ComputeError> {
    let records = parse_records(&records_json)?;
    let window = parse_window(window.as_deref())?;
    let now = parse_timestamp(&now)?;

    let processor = RapportProcessor::new(InMemoryStore::with_interactions(records)?);
    let report = processor.compare_user_relationships(&user_id, window, now)?;
    serde_json::to_string_pretty(&report).map_err(|e| ComputeError::EncodingError(e.to_string()))
}

/// Derive boundary goals from a JSON baseline.
pub fn baseline_to_goals_json(baseline_json: String) -> Result<String, ComputeError> {
    let baseline: BaselinePreferences = serde_json::from_str(&baseline_json)
        .map_err(|e| ComputeError::ParseError(e.to_string()))?;
    let goals = GoalGenerator::default().generate(&baseline);
    serde_json::to_string_pretty(&goals).map_err(|e| ComputeError::EncodingError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RiskTier;
    use chrono::{Duration, TimeZone};
    use std::collections::BTreeSet;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn record(id: &str, rel: &str, days_ago: i64, before: u8, after: u8) -> InteractionRecord {
        let mut r = InteractionRecord::new(id, "u1", rel, now() - Duration::days(days_ago));
        r.energy_before = Some(before);
        r.energy_after = Some(after);
        r
    }

    fn sample_records() -> Vec<InteractionRecord> {
        vec![
            // rel-good: draining last month, energizing this month
            record("g1", "rel-good", 50, 6, 4),
            record("g2", "rel-good", 10, 4, 7),
            record("g3", "rel-good", 2, 5, 7),
            // rel-bad: steadily draining
            record("b1", "rel-bad", 40, 7, 6),
            record("b2", "rel-bad", 5, 8, 3),
        ]
    }

    fn processor() -> RapportProcessor<InMemoryStore> {
        RapportProcessor::new(InMemoryStore::with_interactions(sample_records()).unwrap())
    }

    #[test]
    fn test_relationship_health_with_window() {
        let health = processor()
            .relationship_health("rel-good", "u1", Some(TimeWindow::Month), now())
            .unwrap();

        assert_eq!(health.relationship_id.as_deref(), Some("rel-good"));
        assert_eq!(health.metrics.total_records, 2);
        assert_eq!(health.metrics.energy_delta, 2.5);
        // 50 + 2.5 × 10
        assert_eq!(health.snapshot.score, 75);
        assert_eq!(health.snapshot.risk_tier, RiskTier::Low);
        assert_eq!(health.timeline.len(), 2);
        assert_eq!(health.trend, TrendLabel::Improving);
    }

    #[test]
    fn test_relationship_trend_declining() {
        let trend = processor()
            .relationship_trend("rel-bad", "u1", TimeWindow::Month, now())
            .unwrap();
        assert_eq!(trend, TrendLabel::Declining);
    }

    #[test]
    fn test_unknown_relationship_is_neutral() {
        let health = processor()
            .relationship_health("rel-none", "u1", Some(TimeWindow::Week), now())
            .unwrap();
        assert_eq!(health.snapshot.score, 50);
        assert_eq!(health.snapshot.risk_tier, RiskTier::Unknown);
        assert!(health.timeline.is_empty());
        assert_eq!(health.trend, TrendLabel::Stable);
    }

    #[test]
    fn test_compare_user_relationships() {
        let report = processor()
            .compare_user_relationships("u1", Some(TimeWindow::Month), now())
            .unwrap();

        assert!(report.has_data);
        assert_eq!(report.relationship_count, 2);
        assert_eq!(report.healthiest.unwrap().relationship_id, "rel-good");
        assert_eq!(report.most_problematic.unwrap().relationship_id, "rel-bad");
        assert_eq!(report.most_draining.unwrap().relationship_id, "rel-bad");
        assert_eq!(report.growth.improving, 1);
        assert_eq!(report.growth.declining, 1);
        // 75 and 50 - 5×10 = 0
        assert_eq!(report.avg_health_score, 37.5);
    }

    #[test]
    fn test_compare_unknown_user_is_no_data() {
        let report = processor()
            .compare_user_relationships("nobody", None, now())
            .unwrap();
        assert_eq!(report, ComparisonReport::no_data());
    }

    #[test]
    fn test_comparison_entries_follow_first_seen_order() {
        let p = processor();
        let records = p.source().get_all_interactions("u1").unwrap();
        let ids: Vec<String> = p
            .comparison_entries(&records, None, now())
            .unwrap()
            .into_iter()
            .map(|e| e.relationship_id)
            .collect();
        assert_eq!(ids, vec!["rel-good", "rel-bad"]);
    }

    #[test]
    fn test_goals_only_for_first_baseline() {
        let mut store = InMemoryStore::new();
        let mut first = BaselinePreferences::new("u1", 1, now());
        first.triggers = vec!["Criticism".to_string()];

        let goals = RapportProcessor::new(store.clone())
            .goals_on_baseline_created(&first)
            .unwrap();
        assert_eq!(goals.len(), 1);
        store.add_baseline(first.clone());

        let mut second = first.clone();
        second.version = 2;
        let goals = RapportProcessor::new(store)
            .goals_on_baseline_created(&second)
            .unwrap();
        assert!(goals.is_empty());
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let mut config = EngineConfig::default();
        config.risk.low = 10;
        assert!(RapportProcessor::with_config(InMemoryStore::new(), config).is_err());
    }

    #[test]
    fn test_records_to_health_json_scenario() {
        let records = r#"[{
            "id": "r1",
            "user_id": "u1",
            "relationship_id": "rel-1",
            "created_at": "2024-06-29T12:00:00Z",
            "energy_before": 5, "energy_after": 8,
            "anxiety_before": 6, "anxiety_after": 3,
            "self_worth_before": 5, "self_worth_after": 5,
            "recovery_time_minutes": 30,
            "physical_symptoms": [],
            "boundary_testing": false,
            "support_system_engaged": true,
            "coping_skills_used": ["grounding"]
        }]"#;

        let json = records_to_health_json(
            records.to_string(),
            Some("week".to_string()),
            "2024-06-30T12:00:00Z".to_string(),
        )
        .unwrap();

        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(payload["snapshot"]["score"], 100);
        assert_eq!(payload["snapshot"]["risk_tier"], "low");
        assert_eq!(payload["snapshot"]["raw_score"], 156.5);
        assert_eq!(payload["metrics"]["energy_delta"], 3.0);
        assert_eq!(payload["relationship_id"], "rel-1");
        assert_eq!(payload["window"], "week");
    }

    #[test]
    fn test_records_to_health_json_empty() {
        let json = records_to_health_json(
            "[]".to_string(),
            None,
            "2024-06-30T12:00:00Z".to_string(),
        )
        .unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(payload["snapshot"]["score"], 50);
        assert_eq!(payload["snapshot"]["risk_tier"], "unknown");
        assert!(payload["relationship_id"].is_null());
    }

    #[test]
    fn test_records_to_comparison_json() {
        let records = serde_json::to_string(&sample_records()).unwrap();
        let json = records_to_comparison_json(
            records,
            "u1".to_string(),
            None,
            "2024-06-30T12:00:00Z".to_string(),
        )
        .unwrap();
        let payload: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(payload["relationship_count"], 2);
        assert_eq!(payload["has_data"], true);
    }

    #[test]
    fn test_baseline_to_goals_json() {
        let baseline = r#"{
            "user_id": "u1",
            "version": 1,
            "created_at": "2024-06-01T00:00:00Z",
            "personal_space_needs": "high",
            "non_negotiable_boundaries": ["No yelling"],
            "triggers": ["Being ignored"]
        }"#;
        let json = baseline_to_goals_json(baseline.to_string()).unwrap();
        let goals: Vec<BoundaryGoal> = serde_json::from_str(&json).unwrap();
        assert_eq!(goals.len(), 3);
        assert_eq!(goals[2].boundary_name, "high personal space");
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            records_to_health_json("nope".into(), None, "2024-06-30T12:00:00Z".into()),
            Err(ComputeError::ParseError(_))
        ));
        assert!(matches!(
            records_to_health_json("[]".into(), Some("decade".into()), "2024-06-30T12:00:00Z".into()),
            Err(ComputeError::InvalidWindow(_))
        ));
        assert!(matches!(
            records_to_health_json("[]".into(), None, "yesterday".into()),
            Err(ComputeError::DateParseError(_))
        ));
    }

    #[test]
    fn test_out_of_range_record_fails_loudly() {
        let mut bad = record("x", "rel-1", 1, 5, 5);
        bad.physical_symptoms = Some(BTreeSet::new());
        bad.anxiety_before = Some(0);
        let result = RapportProcessor::new(InMemoryStore::new()).analyze(&[bad], None, now());
        assert!(matches!(result, Err(ComputeError::InvalidRange { .. })));
    }

    #[test]
    fn test_stale_relationship_is_not_ranked() {
        let store = InMemoryStore::with_interactions(vec![
            record("s1", "rel-stale", 200, 5, 9),
            record("b1", "rel-bad", 3, 5, 4),
        ])
        .unwrap();
        let report = RapportProcessor::new(store)
            .compare_user_relationships("u1", Some(TimeWindow::Month), now())
            .unwrap();

        assert_eq!(report.relationship_count, 1);
        assert_eq!(report.insufficient_data, 1);
        assert_eq!(report.healthiest.unwrap().relationship_id, "rel-bad");
        assert_eq!(report.avg_health_score, 40.0);
    }

    #[test]
    fn test_compare_with_only_stale_relationships_is_no_data() {
        let store =
            InMemoryStore::with_interactions(vec![record("s1", "rel-stale", 200, 5, 9)]).unwrap();
        let report = RapportProcessor::new(store)
            .compare_user_relationships("u1", Some(TimeWindow::Month), now())
            .unwrap();
        assert!(!report.has_data);
        assert_eq!(report.insufficient_data, 1);
        assert!(report.healthiest.is_none());
    }

    #[test]
    fn test_mixed_relationships_are_rejected() {
        let records = vec![record("a", "rel-1", 1, 5, 6), record("b", "rel-2", 2, 5, 6)];
        let result = RapportProcessor::new(InMemoryStore::new()).analyze(&records, None, now());
        assert!(matches!(result, Err(ComputeError::MixedRelationships(2))));

        let json = serde_json::to_string(&records).unwrap();
        assert!(matches!(
            records_to_health_json(json, None, "2024-06-30T12:00:00Z".into()),
            Err(ComputeError::MixedRelationships(2))
        ));
    }

    #[test]
    fn test_single_relationship() {
        assert_eq!(single_relationship(&[]).unwrap(), None);
        let records = vec![record("a", "rel-1", 1, 5, 6), record("b", "rel-1", 2, 5, 6)];
        assert_eq!(single_relationship(&records).unwrap(), Some("rel-1"));
    }

    #[test]
    fn test_blank_window_means_no_window() {
        assert_eq!(parse_window(None).unwrap(), None);
        assert_eq!(parse_window(Some("  ")).unwrap(), None);
        assert_eq!(parse_window(Some("Month")).unwrap(), Some(TimeWindow::Month));
    }
}
