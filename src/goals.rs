//! Boundary goal generation
//!
//! Goals are derived from a baseline exactly once, when the user's first
//! baseline is created. Later baseline versions do not regenerate goals unless
//! `GoalGenerator::generate` is called explicitly.

use uuid::Uuid;

use crate::config::{EngineConfig, GoalTargets};
use crate::error::ComputeError;
use crate::types::{BaselinePreferences, BoundaryGoal, GoalSource};

/// Generator for baseline-derived boundary goals
#[derive(Debug, Clone, Default)]
pub struct GoalGenerator {
    targets: GoalTargets,
}

impl GoalGenerator {
    pub fn new(targets: GoalTargets) -> Self {
        Self { targets }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.goals.clone())
    }

    /// Derive goals from a baseline
    ///
    /// Order: non-negotiable boundaries, then triggers, then personal space.
    /// Blank entries are skipped.
    pub fn generate(&self, baseline: &BaselinePreferences) -> Vec<BoundaryGoal> {
        let mut goals = Vec::new();

        for boundary in non_blank(&baseline.non_negotiable_boundaries) {
            goals.push(derived_goal(
                &baseline.user_id,
                boundary.to_string(),
                format!("Non-negotiable boundary: {boundary}"),
                self.targets.non_negotiable,
            ));
        }

        for trigger in non_blank(&baseline.triggers) {
            goals.push(derived_goal(
                &baseline.user_id,
                format!("Avoid {trigger}"),
                format!("Limit exposure to a known trigger: {trigger}"),
                self.targets.trigger,
            ));
        }

        if let Some(level) = baseline
            .personal_space_needs
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
        {
            goals.push(derived_goal(
                &baseline.user_id,
                format!("{level} personal space"),
                format!("Respect for {level} personal space needs"),
                self.targets.personal_space,
            ));
        }

        tracing::debug!(
            user_id = %baseline.user_id,
            version = baseline.version,
            goals = goals.len(),
            "generated boundary goals from baseline"
        );

        goals
    }

    /// Goals to persist when `new` is saved; empty unless it is the user's first baseline
    pub fn goals_for_new_baseline(
        &self,
        new: &BaselinePreferences,
        previous_latest: Option<&BaselinePreferences>,
    ) -> Vec<BoundaryGoal> {
        match previous_latest {
            Some(previous) => {
                tracing::debug!(
                    user_id = %new.user_id,
                    previous_version = previous.version,
                    version = new.version,
                    "baseline updated, keeping existing goals"
                );
                Vec::new()
            }
            None => self.generate(new),
        }
    }
}

/// Derive goals with the default targets
pub fn generate_goals_from_baseline(baseline: &BaselinePreferences) -> Vec<BoundaryGoal> {
    GoalGenerator::default().generate(baseline)
}

impl BoundaryGoal {
    /// Create a user-defined goal
    pub fn manual(
        user_id: impl Into<String>,
        boundary_name: impl Into<String>,
        description: impl Into<String>,
        target_respect_rate: u8,
    ) -> Result<Self, ComputeError> {
        let goal = BoundaryGoal {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            boundary_name: boundary_name.into(),
            description: description.into(),
            target_respect_rate,
            source: GoalSource::Manual,
            is_active: true,
        };
        goal.validate()?;
        Ok(goal)
    }
}

/// Latest (max version) baseline for a user
pub fn latest_baseline<'a>(
    baselines: &'a [BaselinePreferences],
    user_id: &str,
) -> Option<&'a BaselinePreferences> {
    baselines
        .iter()
        .filter(|b| b.user_id == user_id)
        .max_by_key(|b| b.version)
}

/// Version number the user's next baseline save should receive
pub fn next_version(baselines: &[BaselinePreferences], user_id: &str) -> Result<u32, ComputeError> {
    match latest_baseline(baselines, user_id) {
        Some(latest) => latest
            .version
            .checked_add(1)
            .ok_or_else(|| ComputeError::VersionOverflow(user_id.to_string())),
        None => Ok(1),
    }
}

fn non_blank(entries: &[String]) -> impl Iterator<Item = &str> {
    entries.iter().map(|e| e.trim()).filter(|e| !e.is_empty())
}

fn derived_goal(user_id: &str, name: String, description: String, target: u8) -> BoundaryGoal {
    BoundaryGoal {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        boundary_name: name,
        description,
        target_respect_rate: target,
        source: GoalSource::Baseline,
        is_active: true,
    }
}
