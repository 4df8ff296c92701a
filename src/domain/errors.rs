// src/domain/errors.rs
// ============================================================================
// Module: Domain Errors
// Description: Validation and lifecycle errors raised by entities and validators.
// Purpose: Give the failure classifier a closed, matchable error surface.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every domain-layer failure is a variant of [`DomainError`]. There is no
//! exception hierarchy to walk at runtime (there are no exceptions); instead
//! [`crate::observability::failure_classifier::FailureClassifier`]
//! pattern-matches on this enum directly, which is the static-typing
//! equivalent of `isinstance(err, DomainError)`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Domain Error
// ============================================================================

/// Domain-layer validation and lifecycle errors.
///
/// # Invariants
/// - Every variant's message is safe to surface to callers and log sinks; no
///   variant carries raw event payloads.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    /// Generic domain validation failure not covered by a more specific variant.
    #[error("{0}")]
    Validation(String),
    /// A status transition was attempted outside the canonical transition matrix.
    #[error("invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        /// Source status name.
        from: String,
        /// Requested target status name.
        to: String,
    },
    /// `tenant_id` was empty after trimming whitespace.
    #[error("tenant_id must not be empty")]
    InvalidTenant,
    /// `risk_score` fell outside `[0, 100]`.
    #[error("risk_score must be between {min} and {max}, got {actual}")]
    RiskThresholdViolation {
        /// Lower bound of the accepted range.
        min: f64,
        /// Upper bound of the accepted range.
        max: f64,
        /// The rejected value.
        actual: f64,
    },
    /// `metadata` contained a value that cannot be represented as JSON.
    #[error("metadata must be JSON-serializable: {0}")]
    InvalidMetadata(String),
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "assertions in test code may fail fast via unwrap/expect"
)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_never_embed_raw_payloads() {
        let err = DomainError::InvalidStatusTransition {
            from: "received".to_string(),
            to: "approved".to_string(),
        };
        assert_eq!(err.to_string(), "invalid status transition from received to approved");
    }

    #[test]
    fn risk_threshold_violation_reports_bounds_and_actual() {
        let err = DomainError::RiskThresholdViolation {
            min: 0.0,
            max: 100.0,
            actual: 150.0,
        };
        assert_eq!(
            err.to_string(),
            "risk_score must be between 0 and 100, got 150"
        );
    }

    #[test]
    fn variants_with_equal_fields_compare_equal() {
        assert_eq!(DomainError::InvalidTenant, DomainError::InvalidTenant);
        assert_ne!(
            DomainError::Validation("a".to_string()),
            DomainError::Validation("b".to_string())
        );
    }
}
