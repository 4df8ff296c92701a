// src/observability/failure_classifier.rs
// ============================================================================
// Module: Failure Classifier
// Description: Maps a WorkflowError to a closed-set FailureCategory label.
// Purpose: Bucket failure-count metrics without ever remapping unknown errors.
// Dependencies: crate::workflow::errors
// ============================================================================

//! ## Overview
//! This is a closed mapping with one hard rule: unknown errors are *never*
//! remapped into `VALIDATION_ERROR` or `WORKFLOW_ERROR`.
//! [`FailureClassifier::classify`] pattern-matches on [`WorkflowError`]
//! directly rather than walking a class hierarchy, which is the static-typing
//! equivalent of `isinstance` dispatch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::workflow::errors::WorkflowError;

// ============================================================================
// SECTION: Failure Category
// ============================================================================

/// Closed-set label used to bucket `failure_count` metrics by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FailureCategory {
    /// A domain validation or lifecycle error.
    ValidationError,
    /// An application-level workflow error (e.g. idempotency conflict).
    WorkflowError,
    /// A governance gate rejection (unapproved model or prompt).
    GovernanceError,
    /// Anything not covered by the other categories.
    UnknownError,
}

impl FailureCategory {
    /// Canonical label used as a metrics key component, e.g. `VALIDATION_ERROR`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::WorkflowError => "WORKFLOW_ERROR",
            Self::GovernanceError => "GOVERNANCE_ERROR",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl std::fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Failure Classifier
// ============================================================================

/// Maps a [`WorkflowError`] to its [`FailureCategory`].
///
/// Stateless; kept as a struct (rather than a free function) so it can be
/// injected as an optional workflow collaborator.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailureClassifier;

impl FailureClassifier {
    /// Creates a new failure classifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Classifies a workflow error into its failure category.
    ///
    /// `Store`/`Audit`/`Repository` variants are infra failures outside the
    /// closed domain/application/governance set, so they fall through to
    /// `UNKNOWN_ERROR` -- the spec's catch-all, never remapped into
    /// `VALIDATION_ERROR` or `WORKFLOW_ERROR`.
    #[must_use]
    pub const fn classify(&self, error: &WorkflowError) -> FailureCategory {
        match error {
            WorkflowError::Domain(_) => FailureCategory::ValidationError,
            WorkflowError::IdempotencyConflict(_) => FailureCategory::WorkflowError,
            WorkflowError::ModelNotApproved(_) | WorkflowError::PromptNotApproved(_) => {
                FailureCategory::GovernanceError
            }
            WorkflowError::Store(_) | WorkflowError::Audit(_) | WorkflowError::Repository(_) => {
                FailureCategory::UnknownError
            }
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "assertions in test code may fail fast via unwrap/expect"
)]
mod tests {
    use super::*;
    use crate::domain::DomainError;
    use crate::governance::ModelNotApprovedError;
    use crate::governance::PromptNotApprovedError;
    use crate::interfaces::AuditError;
    use crate::interfaces::RepositoryError;
    use crate::interfaces::StoreError;
    use crate::workflow::IdempotencyConflictError;

    #[test]
    fn classifies_every_variant_into_its_documented_category() {
        let classifier = FailureClassifier::new();
        assert_eq!(
            classifier.classify(&WorkflowError::Domain(DomainError::InvalidTenant)),
            FailureCategory::ValidationError
        );
        assert_eq!(
            classifier.classify(&WorkflowError::IdempotencyConflict(IdempotencyConflictError {
                event_id: "e1".to_string(),
            })),
            FailureCategory::WorkflowError
        );
        assert_eq!(
            classifier.classify(&WorkflowError::ModelNotApproved(ModelNotApprovedError {
                model_name: "m1".to_string(),
            })),
            FailureCategory::GovernanceError
        );
        assert_eq!(
            classifier.classify(&WorkflowError::PromptNotApproved(PromptNotApprovedError {
                prompt_name: "p1".to_string(),
            })),
            FailureCategory::GovernanceError
        );
        assert_eq!(
            classifier.classify(&WorkflowError::Store(StoreError::Store("x".to_string()))),
            FailureCategory::UnknownError
        );
        assert_eq!(
            classifier.classify(&WorkflowError::Audit(AuditError::Sink("x".to_string()))),
            FailureCategory::UnknownError
        );
        assert_eq!(
            classifier.classify(&WorkflowError::Repository(RepositoryError::Backend(
                "x".to_string()
            ))),
            FailureCategory::UnknownError
        );
    }

    #[test]
    fn as_str_matches_the_screaming_snake_case_metric_label() {
        assert_eq!(FailureCategory::ValidationError.as_str(), "VALIDATION_ERROR");
        assert_eq!(FailureCategory::UnknownError.to_string(), "UNKNOWN_ERROR");
    }
}
