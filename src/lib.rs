//! Synheart Rapport - Relationship health analytics engine
//!
//! Rapport turns logged interaction observations into relationship health
//! signals through a deterministic pipeline: windowing → metric aggregation →
//! composite scoring → trend and cross-relationship comparison. Baselines feed
//! a one-shot boundary goal generator.
//!
//! ## Modules
//!
//! - **Aggregator**: Reduce interaction records into summary metrics
//! - **Scorer**: Weighted composite health score and risk tier
//! - **Trends / Comparison**: Charting series, rankings and growth summary
//! - **Goals**: Boundary goals derived from a user's first baseline
//!
//! All computation is pure and synchronous; the clock and the window are
//! always passed in explicitly.

pub mod aggregator;
pub mod comparison;
pub mod config;
pub mod error;
pub mod goals;
pub mod pipeline;
pub mod scorer;
pub mod store;
pub mod trends;
pub mod types;
pub mod validation;
pub mod window;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use aggregator::{aggregate, MetricAggregator};
pub use comparison::{compare_relationships, RelationshipComparator};
pub use config::EngineConfig;
pub use error::ComputeError;
pub use goals::{generate_goals_from_baseline, GoalGenerator};
pub use pipeline::{
    baseline_to_goals_json, records_to_comparison_json, records_to_health_json,
    RapportProcessor, RelationshipHealth,
};
pub use scorer::{score, HealthScorer};
pub use store::{BaselineSource, InMemoryStore, InteractionSource};
pub use trends::project_time_series;
pub use window::{TimeWindow, WindowFilter};

/// Rapport version embedded in CLI and FFI reports
pub const RAPPORT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "synheart-rapport";
