//! Error types for Synheart Rapport

use thiserror::Error;

/// Errors that can occur during computation
///
/// Empty inputs are not errors: an empty window yields neutral metrics and an
/// empty comparison yields a "no data" report.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Value out of range for {field} on record {record_id}: {value}")]
    InvalidRange {
        field: String,
        value: f64,
        record_id: String,
    },

    #[error("Records span {0} relationships; expected exactly one")]
    MixedRelationships(usize),

    #[error("Baseline versions exhausted for user {0}")]
    VersionOverflow(String),

    #[error("Invalid time window: {0}")]
    InvalidWindow(String),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}
