//! Record validation
//!
//! Upstream collaborators are expected to reject bad input before it reaches
//! the engine. These checks surface upstream bugs instead of clamping values.

use thiserror::Error;

use crate::error::ComputeError;
use crate::types::{BoundaryGoal, InteractionRecord};

/// Inclusive bounds of every 1-10 self-report scale
pub const SCALE_MIN: u8 = 1;
pub const SCALE_MAX: u8 = 10;

/// Record-level validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be within 1-10, got {value} (record {record_id})")]
    ScaleOutOfRange {
        record_id: String,
        field: &'static str,
        value: u8,
    },

    #[error("{field} must not be negative, got {value} (record {record_id})")]
    NegativeMinutes {
        record_id: String,
        field: &'static str,
        value: i64,
    },

    #[error("target respect rate must be within 0-100, got {value} (goal {goal})")]
    TargetOutOfRange { goal: String, value: u8 },
}

impl From<ValidationError> for ComputeError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::ScaleOutOfRange {
                record_id,
                field,
                value,
            } => ComputeError::InvalidRange {
                field: field.to_string(),
                value: f64::from(value),
                record_id,
            },
            ValidationError::NegativeMinutes {
                record_id,
                field,
                value,
            } => ComputeError::InvalidRange {
                field: field.to_string(),
                value: value as f64,
                record_id,
            },
            ValidationError::TargetOutOfRange { goal, value } => ComputeError::InvalidRange {
                field: "target_respect_rate".to_string(),
                value: f64::from(value),
                record_id: goal,
            },
        }
    }
}

impl InteractionRecord {
    /// Check every scale slot and minute count that is present
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut scales = vec![
            ("energy_before", self.energy_before),
            ("anxiety_before", self.anxiety_before),
            ("self_worth_before", self.self_worth_before),
            ("energy_after", self.energy_after),
            ("anxiety_after", self.anxiety_after),
            ("self_worth_after", self.self_worth_after),
        ];
        if let Some(compat) = &self.compatibility {
            scales.push(("communication_quality", compat.communication_quality));
            scales.push(("emotional_needs_met", compat.emotional_needs_met));
            scales.push(("values_alignment", compat.values_alignment));
        }

        for (field, value) in scales {
            if let Some(v) = value {
                if !(SCALE_MIN..=SCALE_MAX).contains(&v) {
                    return Err(ValidationError::ScaleOutOfRange {
                        record_id: self.id.clone(),
                        field,
                        value: v,
                    });
                }
            }
        }

        for (field, value) in [
            ("duration_minutes", self.duration_minutes),
            ("recovery_time_minutes", self.recovery_time_minutes),
        ] {
            if let Some(v) = value {
                if v < 0 {
                    return Err(ValidationError::NegativeMinutes {
                        record_id: self.id.clone(),
                        field,
                        value: v,
                    });
                }
            }
        }

        Ok(())
    }
}

impl BoundaryGoal {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.target_respect_rate > 100 {
            return Err(ValidationError::TargetOutOfRange {
                goal: self.boundary_name.clone(),
                value: self.target_respect_rate,
            });
        }
        Ok(())
    }
}

/// Validate a batch, returning the first violation
pub fn validate_records(records: &[InteractionRecord]) -> Result<(), ComputeError> {
    for record in records {
        if let Err(e) = record.validate() {
            tracing::warn!(record_id = %record.id, error = %e, "rejecting invalid interaction record");
            return Err(e.into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CompatibilityAssessment;
    use chrono::Utc;

    fn record() -> InteractionRecord {
        InteractionRecord::new("r1", "u1", "rel-1", Utc::now())
    }

    #[test]
    fn test_empty_record_is_valid() {
        assert!(record().validate().is_ok());
    }

    #[test]
    fn test_scale_bounds_are_inclusive() {
        let mut r = record();
        r.energy_before = Some(1);
        r.energy_after = Some(10);
        assert!(r.validate().is_ok());

        r.anxiety_after = Some(0);
        assert_eq!(
            r.validate(),
            Err(ValidationError::ScaleOutOfRange {
                record_id: "r1".to_string(),
                field: "anxiety_after",
                value: 0,
            })
        );
    }

    #[test]
    fn test_compatibility_scales_checked() {
        let mut r = record();
        r.compatibility = Some(CompatibilityAssessment {
            values_alignment: Some(11),
            ..Default::default()
        });
        let err = r.validate().unwrap_err();
        assert!(err.to_string().contains("values_alignment"));
    }

    #[test]
    fn test_negative_recovery_rejected() {
        let mut r = record();
        r.recovery_time_minutes = Some(-5);
        let err: ComputeError = r.validate().unwrap_err().into();
        match err {
            ComputeError::InvalidRange { field, value, .. } => {
                assert_eq!(field, "recovery_time_minutes");
                assert_eq!(value, -5.0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_records_reports_first_violation() {
        let mut bad = record();
        bad.id = "bad".to_string();
        bad.duration_minutes = Some(-1);
        let result = validate_records(&[record(), bad]);
        assert!(matches!(
            result,
            Err(ComputeError::InvalidRange { record_id, .. }) if record_id == "bad"
        ));
    }
}
