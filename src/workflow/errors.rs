// src/workflow/errors.rs
// ============================================================================
// Module: Workflow Errors
// Description: Top-level error sum type returned by RiskWorkflow/ComplianceWorkflow::run.
// Purpose: Give callers and the failure classifier one exhaustive error surface.
// Dependencies: thiserror, crate::{domain, governance, interfaces}
// ============================================================================

//! ## Overview
//! [`WorkflowError`] is the statically typed equivalent of "any exception a
//! stage or the engine can raise". Every fallible collaborator's error type
//! converts into it via `#[from]`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::domain::DomainError;
use crate::governance::ModelNotApprovedError;
use crate::governance::PromptNotApprovedError;
use crate::interfaces::AuditError;
use crate::interfaces::RepositoryError;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Application Errors
// ============================================================================

/// Raised when a cached state-store read conflicts with the invocation that
/// requested it. No current stage chain produces this, but it stays in the
/// error taxonomy for a future idempotency-key collision check.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("idempotency conflict for event {event_id}")]
pub struct IdempotencyConflictError {
    /// Event identifier whose cached and requested states disagree.
    pub event_id: String,
}

// ============================================================================
// SECTION: Workflow Error
// ============================================================================

/// The sum type `RiskWorkflow::run`/`ComplianceWorkflow::run` actually return.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A stage or validator raised a domain error.
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// The governance gate found the declared model unapproved.
    #[error(transparent)]
    ModelNotApproved(#[from] ModelNotApprovedError),
    /// The governance gate found the declared prompt unapproved.
    #[error(transparent)]
    PromptNotApproved(#[from] PromptNotApprovedError),
    /// A cached state-store read conflicted with the current invocation.
    #[error(transparent)]
    IdempotencyConflict(#[from] IdempotencyConflictError),
    /// The state store failed to complete a read or write.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The audit sink failed to record an entry.
    #[error(transparent)]
    Audit(#[from] AuditError),
    /// A registry repository failed to complete a read or write.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
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
    fn idempotency_conflict_error_names_the_event() {
        let err = IdempotencyConflictError {
            event_id: "e1".to_string(),
        };
        assert_eq!(err.to_string(), "idempotency conflict for event e1");
    }

    #[test]
    fn every_collaborator_error_converts_via_from() {
        let err: WorkflowError = DomainError::InvalidTenant.into();
        assert!(matches!(err, WorkflowError::Domain(_)));

        let err: WorkflowError = StoreError::Store("x".to_string()).into();
        assert!(matches!(err, WorkflowError::Store(_)));

        let err: WorkflowError = AuditError::Sink("x".to_string()).into();
        assert!(matches!(err, WorkflowError::Audit(_)));

        let err: WorkflowError = RepositoryError::Backend("x".to_string()).into();
        assert!(matches!(err, WorkflowError::Repository(_)));
    }
}
