// src/governance/errors.rs
// ============================================================================
// Module: Governance Errors
// Description: Errors raised by the model/prompt registries and the gate.
// Purpose: Give the failure classifier a closed, matchable governance error surface.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! These form their own taxonomy kind ("Governance"), distinct from domain
//! validation errors. [`crate::observability::failure_classifier::FailureClassifier`]
//! maps [`ModelNotApprovedError`] and [`PromptNotApprovedError`] to
//! `GOVERNANCE_ERROR`; the other two variants here are conflict/transition
//! errors surfaced directly from registry operations, not from the gate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Gate Errors
// ============================================================================

/// Raised by the governance gate when no `APPROVED` model record exists for
/// the workflow's declared `(name, version)`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("model {model_name} is unapproved")]
pub struct ModelNotApprovedError {
    /// Name of the unapproved (or missing) model.
    pub model_name: String,
}

/// Raised by the governance gate when no `APPROVED` prompt record exists for
/// the workflow's declared `(name, version)`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("prompt {prompt_name} is not approved")]
pub struct PromptNotApprovedError {
    /// Name of the unapproved (or missing) prompt.
    pub prompt_name: String,
}

// ============================================================================
// SECTION: Registry Errors
// ============================================================================

/// Raised by `register_model`/`register_prompt` when a record already exists
/// for `(name, version)` with a different checksum.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("conflicting registration for {name}@{version}: checksum mismatch")]
pub struct ModelConflictError {
    /// Name of the conflicting record.
    pub name: String,
    /// Version of the conflicting record.
    pub version: String,
}

/// Raised by `approve` when the record is not in the `REGISTERED` state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid model state transition for {name}@{version}: from {from} to {to}")]
pub struct InvalidModelStateTransition {
    /// Name of the record.
    pub name: String,
    /// Version of the record.
    pub version: String,
    /// Source status name.
    pub from: String,
    /// Requested target status name.
    pub to: String,
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
    fn error_messages_name_the_offending_record() {
        let err = ModelNotApprovedError {
            model_name: "risk-model".to_string(),
        };
        assert_eq!(err.to_string(), "model risk-model is unapproved");

        let err = PromptNotApprovedError {
            prompt_name: "risk-prompt".to_string(),
        };
        assert_eq!(err.to_string(), "prompt risk-prompt is not approved");

        let err = ModelConflictError {
            name: "m1".to_string(),
            version: "1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "conflicting registration for m1@1: checksum mismatch"
        );

        let err = InvalidModelStateTransition {
            name: "m1".to_string(),
            version: "1".to_string(),
            from: "absent".to_string(),
            to: "approved".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid model state transition for m1@1: from absent to approved"
        );
    }
}
