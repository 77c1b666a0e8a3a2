//! Record and baseline sources
//!
//! Persistence lives outside the engine. These traits describe the read-only
//! retrieval services the engine consumes; `InMemoryStore` backs tests and the
//! CLI.

use serde::{Deserialize, Serialize};

use crate::error::ComputeError;
use crate::goals::latest_baseline;
use crate::types::{BaselinePreferences, InteractionRecord};
use crate::validation::validate_records;

/// Ordered retrieval of interaction records
pub trait InteractionSource {
    /// Records for one relationship owned by `user_id`, oldest first
    fn get_interactions(
        &self,
        relationship_id: &str,
        user_id: &str,
    ) -> Result<Vec<InteractionRecord>, ComputeError>;

    /// Every record owned by `user_id`, oldest first
    fn get_all_interactions(&self, user_id: &str) -> Result<Vec<InteractionRecord>, ComputeError>;
}

/// Retrieval of versioned baselines
pub trait BaselineSource {
    fn get_latest_baseline(
        &self,
        user_id: &str,
    ) -> Result<Option<BaselinePreferences>, ComputeError>;
}

/// In-memory source holding already-validated records and baselines
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryStore {
    #[serde(default)]
    interactions: Vec<InteractionRecord>,
    #[serde(default)]
    baselines: Vec<BaselinePreferences>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from records, rejecting any that fail validation
    pub fn with_interactions(interactions: Vec<InteractionRecord>) -> Result<Self, ComputeError> {
        validate_records(&interactions)?;
        Ok(Self {
            interactions,
            baselines: Vec::new(),
        })
    }

    /// Append a record after validating it
    pub fn add_interaction(&mut self, record: InteractionRecord) -> Result<(), ComputeError> {
        record.validate()?;
        self.interactions.push(record);
        Ok(())
    }

    /// Save a baseline, returning the previous latest for that user
    pub fn add_baseline(&mut self, baseline: BaselinePreferences) -> Option<BaselinePreferences> {
        let previous = latest_baseline(&self.baselines, &baseline.user_id).cloned();
        self.baselines.push(baseline);
        previous
    }

    pub fn baselines(&self) -> &[BaselinePreferences] {
        &self.baselines
    }

    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }

    /// Load a store from JSON
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let store: InMemoryStore = serde_json::from_str(json)?;
        validate_records(&store.interactions)?;
        Ok(store)
    }

    fn sorted(&self, keep: impl Fn(&InteractionRecord) -> bool) -> Vec<InteractionRecord> {
        let mut records: Vec<InteractionRecord> =
            self.interactions.iter().filter(|r| keep(r)).cloned().collect();
        records.sort_by_key(|r| r.created_at);
        records
    }
}

impl InteractionSource for InMemoryStore {
    fn get_interactions(
        &self,
        relationship_id: &str,
        user_id: &str,
    ) -> Result<Vec<InteractionRecord>, ComputeError> {
        Ok(self.sorted(|r| r.relationship_id == relationship_id && r.user_id == user_id))
    }

    fn get_all_interactions(&self, user_id: &str) -> Result<Vec<InteractionRecord>, ComputeError> {
        Ok(self.sorted(|r| r.user_id == user_id))
    }
}

impl BaselineSource for InMemoryStore {
    fn get_latest_baseline(
        &self,
        user_id: &str,
    ) -> Result<Option<BaselinePreferences>, ComputeError> {
        Ok(latest_baseline(&self.baselines, user_id).cloned())
    }
}
