// src/workflow/gate.rs
// ============================================================================
// Module: Governance Gate
// Description: Pre-stage check that the declared model and prompt are approved.
// Purpose: Veto workflow execution before any stage runs, under audit.
// Dependencies: crate::{domain, governance, interfaces}
// ============================================================================

//! ## Overview
//! Shared by both workflows: resolve the workflow's declared model and
//! prompt, and fail closed if either gate lacks an `APPROVED` record. The
//! governance-violation audit entry is always emitted *before* the error is
//! returned, never after. The gate never checks whether a real
//! [`crate::governance::ModelRegistry`]/[`crate::governance::PromptRegistry`]
//! is present: an unconfigured gate is simply wired to
//! [`crate::governance::NoopModelGate`]/[`crate::governance::NoopPromptGate`],
//! which always approve.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::domain::CorrelationId;
use crate::domain::ModelName;
use crate::domain::ModelVersion;
use crate::domain::PromptName;
use crate::domain::PromptVersion;
use crate::domain::TenantId;
use crate::governance::ModelGate;
use crate::governance::ModelNotApprovedError;
use crate::governance::PromptGate;
use crate::governance::PromptNotApprovedError;
use crate::interfaces::AuditAction;
use crate::interfaces::AuditLogger;
use crate::workflow::errors::WorkflowError;

// ============================================================================
// SECTION: Gate Enforcement
// ============================================================================

/// Enforces the governance gate for one workflow invocation.
///
/// Checks the model gate first, then the prompt gate. On a failing check,
/// emits a `GOVERNANCE_VIOLATION` audit entry before returning the
/// corresponding error.
///
/// # Errors
///
/// Returns [`WorkflowError::ModelNotApproved`] or
/// [`WorkflowError::PromptNotApproved`] when the respective gate lacks an
/// `APPROVED` record for the declared version. Returns
/// [`WorkflowError::Repository`] if a gate lookup itself fails.
#[expect(clippy::too_many_arguments, reason = "gate checks two independent governed resources")]
pub async fn enforce_gate(
    model_gate: &dyn ModelGate,
    model_name: &ModelName,
    model_version: &ModelVersion,
    prompt_gate: &dyn PromptGate,
    prompt_name: &PromptName,
    prompt_version: PromptVersion,
    audit_logger: &dyn AuditLogger,
    tenant_id: &TenantId,
    correlation_id: &CorrelationId,
) -> Result<(), WorkflowError> {
    if !model_gate.is_approved(model_name, model_version).await? {
        let reason = format!("model {model_name} is unapproved");
        audit_logger
            .log_action(AuditAction {
                action: "GOVERNANCE_VIOLATION".to_string(),
                tenant_id: tenant_id.clone(),
                correlation_id: correlation_id.clone(),
                resource_type: "model".to_string(),
                resource_id: model_name.as_str().to_string(),
                reason: Some(reason),
                extra: None,
            })
            .await
            .ok();
        return Err(ModelNotApprovedError {
            model_name: model_name.as_str().to_string(),
        }
        .into());
    }

    if !prompt_gate.is_approved(prompt_name, prompt_version).await? {
        let reason = format!("prompt {prompt_name} is not approved");
        audit_logger
            .log_action(AuditAction {
                action: "GOVERNANCE_VIOLATION".to_string(),
                tenant_id: tenant_id.clone(),
                correlation_id: correlation_id.clone(),
                resource_type: "prompt".to_string(),
                resource_id: prompt_name.as_str().to_string(),
                reason: Some(reason),
                extra: None,
            })
            .await
            .ok();
        return Err(PromptNotApprovedError {
            prompt_name: prompt_name.as_str().to_string(),
        }
        .into());
    }

    Ok(())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "assertions in test code may fail fast via unwrap/expect"
)]
mod tests {
    use super::*;
    use crate::governance::NoopModelGate;
    use crate::governance::NoopPromptGate;
    use crate::interfaces::InMemoryAuditLogger;

    struct AlwaysDenyModelGate;

    #[async_trait::async_trait]
    impl ModelGate for AlwaysDenyModelGate {
        async fn is_approved(
            &self,
            _name: &ModelName,
            _version: &ModelVersion,
        ) -> Result<bool, crate::interfaces::RepositoryError> {
            Ok(false)
        }
    }

    struct AlwaysDenyPromptGate;

    #[async_trait::async_trait]
    impl PromptGate for AlwaysDenyPromptGate {
        async fn is_approved(
            &self,
            _name: &PromptName,
            _version: PromptVersion,
        ) -> Result<bool, crate::interfaces::RepositoryError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn noop_gates_always_pass() {
        let audit = InMemoryAuditLogger::new();
        let result = enforce_gate(
            &NoopModelGate,
            &ModelName::new("m"),
            &ModelVersion::new("1.0"),
            &NoopPromptGate,
            &PromptName::new("p"),
            PromptVersion::new(1),
            &audit,
            &TenantId::new("t1"),
            &CorrelationId::new("c1"),
        )
        .await;
        assert!(result.is_ok());
        assert!(audit.actions().expect("readable").is_empty());
    }

    #[tokio::test]
    async fn unapproved_model_blocks_before_the_prompt_check_and_audits_first() {
        let audit = InMemoryAuditLogger::new();
        let err = enforce_gate(
            &AlwaysDenyModelGate,
            &ModelName::new("m"),
            &ModelVersion::new("1.0"),
            &AlwaysDenyPromptGate,
            &PromptName::new("p"),
            PromptVersion::new(1),
            &audit,
            &TenantId::new("t1"),
            &CorrelationId::new("c1"),
        )
        .await
        .expect_err("model gate denies");
        assert!(matches!(err, WorkflowError::ModelNotApproved(_)));
        let actions = audit.actions().expect("readable");
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action, "GOVERNANCE_VIOLATION");
        assert_eq!(actions[0].resource_type, "model");
    }

    #[tokio::test]
    async fn unapproved_prompt_blocks_after_an_approved_model() {
        let audit = InMemoryAuditLogger::new();
        let err = enforce_gate(
            &NoopModelGate,
            &ModelName::new("m"),
            &ModelVersion::new("1.0"),
            &AlwaysDenyPromptGate,
            &PromptName::new("p"),
            PromptVersion::new(1),
            &audit,
            &TenantId::new("t1"),
            &CorrelationId::new("c1"),
        )
        .await
        .expect_err("prompt gate denies");
        assert!(matches!(err, WorkflowError::PromptNotApproved(_)));
        let actions = audit.actions().expect("readable");
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].resource_type, "prompt");
    }
}
