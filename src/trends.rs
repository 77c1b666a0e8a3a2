//! Per-interaction time series and trend labels
//!
//! The time series is a pure projection of records into charting points; it
//! does no aggregation. Trend labels compare two consecutive window scores.

use crate::scorer::HealthScorer;
use crate::types::{
    AggregateMetrics, HealthSnapshot, InteractionRecord, RiskTier, TimeSeriesPoint, TrendLabel,
};

/// Project records into charting points ordered by timestamp ascending
///
/// Records sharing a timestamp keep their input order.
pub fn project_time_series(records: &[InteractionRecord]) -> Vec<TimeSeriesPoint> {
    let mut ordered: Vec<&InteractionRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.created_at);

    ordered
        .into_iter()
        .map(|r| TimeSeriesPoint {
            record_id: r.id.clone(),
            timestamp: r.created_at,
            energy_delta: r.energy_delta(),
            anxiety_delta: r.anxiety_delta(),
            self_worth_delta: r.self_worth_delta(),
            recovery_time_minutes: r.recovery_time_minutes,
            symptom_count: r.symptom_count(),
        })
        .collect()
}

impl TrendLabel {
    /// Slope-sign comparison of two scores
    pub fn from_scores(previous: u8, current: u8) -> Self {
        match current.cmp(&previous) {
            std::cmp::Ordering::Greater => TrendLabel::Improving,
            std::cmp::Ordering::Less => TrendLabel::Declining,
            std::cmp::Ordering::Equal => TrendLabel::Stable,
        }
    }

    /// Compare consecutive window snapshots; a window without data is stable
    pub fn from_snapshots(previous: &HealthSnapshot, current: &HealthSnapshot) -> Self {
        if previous.risk_tier == RiskTier::Unknown || current.risk_tier == RiskTier::Unknown {
            return TrendLabel::Stable;
        }
        Self::from_scores(previous.score, current.score)
    }

    /// Score two consecutive windows' metrics and compare them
    pub fn from_windows(
        previous: &AggregateMetrics,
        current: &AggregateMetrics,
        scorer: &HealthScorer,
    ) -> Self {
        Self::from_snapshots(&scorer.score(previous), &scorer.score(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScoreFactors;
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn snapshot(score: u8, tier: RiskTier) -> HealthSnapshot {
        HealthSnapshot {
            score,
            risk_tier: tier,
            raw_score: f64::from(score),
            factors: ScoreFactors::default(),
            record_count: 1,
        }
    }

    #[test]
    fn test_projection_sorts_ascending() {
        let t0 = Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap();
        let mut late = InteractionRecord::new("late", "u1", "rel-1", t0 + Duration::days(2));
        late.energy_before = Some(6);
        late.energy_after = Some(3);
        late.recovery_time_minutes = Some(90);
        late.physical_symptoms = Some(["headache".to_string()].into_iter().collect());

        let mut early = InteractionRecord::new("early", "u1", "rel-1", t0);
        early.anxiety_before = Some(7);
        early.anxiety_after = Some(4);

        let points = project_time_series(&[late, early]);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].record_id, "early");
        assert_eq!(points[0].anxiety_delta, Some(-3.0));
        assert_eq!(points[0].energy_delta, None);
        assert_eq!(points[0].symptom_count, 0);

        assert_eq!(points[1].record_id, "late");
        assert_eq!(points[1].energy_delta, Some(-3.0));
        assert_eq!(points[1].recovery_time_minutes, Some(90));
        assert_eq!(points[1].symptom_count, 1);
    }

    #[test]
    fn test_projection_of_empty_is_empty() {
        assert!(project_time_series(&[]).is_empty());
    }

    #[test]
    fn test_projection_is_stable_for_equal_timestamps() {
        let t0 = Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap();
        let a = InteractionRecord::new("a", "u1", "rel-1", t0);
        let b = InteractionRecord::new("b", "u1", "rel-1", t0);
        let ids: Vec<String> = project_time_series(&[a, b])
            .into_iter()
            .map(|p| p.record_id)
            .collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_trend_from_scores() {
        assert_eq!(TrendLabel::from_scores(40, 55), TrendLabel::Improving);
        assert_eq!(TrendLabel::from_scores(55, 40), TrendLabel::Declining);
        assert_eq!(TrendLabel::from_scores(55, 55), TrendLabel::Stable);
    }

    #[test]
    fn test_trend_with_unknown_window_is_stable() {
        let previous = snapshot(50, RiskTier::Unknown);
        let current = snapshot(80, RiskTier::Low);
        assert_eq!(TrendLabel::from_snapshots(&previous, &current), TrendLabel::Stable);

        let previous = snapshot(60, RiskTier::Medium);
        assert_eq!(
            TrendLabel::from_snapshots(&previous, &current),
            TrendLabel::Improving
        );
    }

    #[test]
    fn test_trend_from_windows() {
        let scorer = HealthScorer::default();
        let mut previous = AggregateMetrics::empty(None);
        previous.total_records = 2;
        previous.energy_delta = -1.0;
        let mut current = AggregateMetrics::empty(None);
        current.total_records = 3;
        current.energy_delta = 2.0;

        assert_eq!(
            TrendLabel::from_windows(&previous, &current, &scorer),
            TrendLabel::Improving
        );
        assert_eq!(
            TrendLabel::from_windows(&current, &previous, &scorer),
            TrendLabel::Declining
        );
        assert_eq!(
            TrendLabel::from_windows(&AggregateMetrics::empty(None), &current, &scorer),
            TrendLabel::Stable
        );
    }
}
