// src/workflow/trigger.rs
// ============================================================================
// Module: Workflow Trigger
// Description: Fire-and-forget notification hook distinct from the audit trail.
// Purpose: Let a caller be notified a workflow run started, without gating `run`.
// Dependencies: async-trait, crate::domain, crate::interfaces
// ============================================================================

//! ## Overview
//! `examples/original_source/app/workflows/dummy_workflow.py` shows a
//! `WorkflowTrigger` seam the distilled spec dropped: a collaborator that
//! starts a workflow run from an inbound event and never fails the
//! transaction if the trigger itself can't be dispatched (its own docstring:
//! "Does not fail the transaction"). [`WorkflowTrigger`] reproduces that seam
//! as an additive, infallible-by-contract trait; nothing in
//! [`crate::workflow::risk::RiskWorkflow::run`] or
//! [`crate::workflow::compliance::ComplianceWorkflow::run`] depends on it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;

use crate::domain::CorrelationId;
use crate::domain::EventId;
use crate::domain::TenantId;
use crate::interfaces::AuditAction;
use crate::interfaces::AuditLogger;

// ============================================================================
// SECTION: Workflow Trigger Trait
// ============================================================================

/// Fire-and-forget notification that a workflow run is starting for an event.
///
/// # Invariants
/// - Implementations must not fail the caller's transaction; there is no
///   error return because there is nothing for a caller to react to.
#[async_trait]
pub trait WorkflowTrigger: Send + Sync {
    /// Notifies the collaborator that a run is starting for `event_id`.
    async fn notify(&self, event_id: &EventId, tenant_id: &TenantId);
}

// ============================================================================
// SECTION: Logging Workflow Trigger
// ============================================================================

/// Reference [`WorkflowTrigger`] that appends a `WORKFLOW_TRIGGERED` action
/// to an [`AuditLogger`], replacing a bare placeholder log line with a
/// typed audit entry.
pub struct LoggingWorkflowTrigger {
    /// Sink the trigger reports through.
    audit_logger: std::sync::Arc<dyn AuditLogger>,
}

impl LoggingWorkflowTrigger {
    /// Builds a trigger that reports through `audit_logger`.
    #[must_use]
    pub fn new(audit_logger: std::sync::Arc<dyn AuditLogger>) -> Self {
        Self { audit_logger }
    }
}

#[async_trait]
impl WorkflowTrigger for LoggingWorkflowTrigger {
    async fn notify(&self, event_id: &EventId, tenant_id: &TenantId) {
        let _ = self
            .audit_logger
            .log_action(AuditAction {
                action: "WORKFLOW_TRIGGERED".to_string(),
                tenant_id: tenant_id.clone(),
                correlation_id: CorrelationId::new(event_id.as_str()),
                resource_type: "event".to_string(),
                resource_id: event_id.as_str().to_string(),
                reason: None,
                extra: None,
            })
            .await;
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "assertions in test code may fail fast via unwrap/expect"
)]
mod tests {
    use super::*;
    use crate::interfaces::InMemoryAuditLogger;

    #[tokio::test]
    async fn notify_never_fails_the_caller_even_if_the_sink_errors() {
        let audit_logger = std::sync::Arc::new(InMemoryAuditLogger::new());
        let trigger = LoggingWorkflowTrigger::new(audit_logger.clone());
        trigger
            .notify(&EventId::new("e1"), &TenantId::new("t1"))
            .await;
        let actions = audit_logger.actions().expect("audit readable");
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action, "WORKFLOW_TRIGGERED");
        assert_eq!(actions[0].resource_id, "e1");
    }
}
