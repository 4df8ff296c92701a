// src/interfaces/audit.rs
// ============================================================================
// Module: Audit Logger Interface
// Description: Append-only, structured action log consulted by registries and gates.
// Purpose: Give governance mutations and gate failures a single audit contract.
// Dependencies: async-trait, tokio, crate::domain, crate::interfaces::errors
// ============================================================================

//! ## Overview
//! [`AuditLogger`] is the external sink for structured governance actions
//! (`MODEL_REGISTERED`, `MODEL_APPROVED`, `GOVERNANCE_VIOLATION`, and their
//! prompt-registry equivalents). It is distinct from a workflow state's
//! in-memory `audit_trail`: stages append directly to that list, while this
//! trait records actions that cross a trust boundary and must be observable
//! independent of whether the workflow run ultimately succeeds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::CorrelationId;
use crate::domain::TenantId;
use crate::interfaces::errors::AuditError;

// ============================================================================
// SECTION: Audit Action Record
// ============================================================================

/// A single recorded audit action, as passed to [`AuditLogger::log_action`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditAction {
    /// Action name, e.g. `MODEL_REGISTERED` or `GOVERNANCE_VIOLATION`.
    pub action: String,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Correlation identifier for the triggering request.
    pub correlation_id: CorrelationId,
    /// Kind of resource acted on, e.g. `model` or `prompt`.
    pub resource_type: String,
    /// Identifier of the resource acted on, e.g. a model name.
    pub resource_id: String,
    /// Human-readable reason, present for violations.
    pub reason: Option<String>,
    /// Additional structured context.
    pub extra: Option<serde_json::Map<String, serde_json::Value>>,
}

// ============================================================================
// SECTION: Audit Logger Trait
// ============================================================================

/// Backend-agnostic, append-only audit sink.
///
/// # Invariants
/// - Implementations must not fail the caller's transaction: a [`AuditError`]
///   signals an infrastructure problem with the sink itself, never a reason
///   to suppress the governance outcome that triggered the call.
/// - Call order is observable: within one workflow run, calls to
///   `log_action` happen in the order the engine issues them.
#[async_trait]
pub trait AuditLogger: Send + Sync {
    /// Records a structured audit action.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] when the sink itself fails to record the action.
    async fn log_action(&self, action: AuditAction) -> Result<(), AuditError>;
}

// ============================================================================
// SECTION: Noop Audit Logger
// ============================================================================

/// Discards every action. The default for an unconfigured audit collaborator.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditLogger;

#[async_trait]
impl AuditLogger for NoopAuditLogger {
    async fn log_action(&self, _action: AuditAction) -> Result<(), AuditError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: In-Memory Audit Logger
// ============================================================================

/// Records every action into an in-process vector, in call order.
///
/// Intended for tests that assert on audit ordering and content; not a
/// production sink.
#[derive(Debug, Default)]
pub struct InMemoryAuditLogger {
    /// Recorded actions, in call order.
    actions: Mutex<Vec<AuditAction>>,
}

impl InMemoryAuditLogger {
    /// Creates an empty in-memory audit logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every action recorded so far, in call order.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError`] if the internal mutex is poisoned.
    pub fn actions(&self) -> Result<Vec<AuditAction>, AuditError> {
        let guard = self
            .actions
            .lock()
            .map_err(|_| AuditError::Sink("audit logger mutex poisoned".to_string()))?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl AuditLogger for InMemoryAuditLogger {
    async fn log_action(&self, action: AuditAction) -> Result<(), AuditError> {
        self.actions
            .lock()
            .map_err(|_| AuditError::Sink("audit logger mutex poisoned".to_string()))?
            .push(action);
        Ok(())
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

    fn action(name: &str) -> AuditAction {
        AuditAction {
            action: name.to_string(),
            tenant_id: TenantId::new("t1"),
            correlation_id: CorrelationId::new("c1"),
            resource_type: "model".to_string(),
            resource_id: "r1".to_string(),
            reason: None,
            extra: None,
        }
    }

    #[tokio::test]
    async fn noop_audit_logger_always_succeeds_and_records_nothing() {
        let logger = NoopAuditLogger;
        logger.log_action(action("MODEL_REGISTERED")).await.expect("never fails");
    }

    #[tokio::test]
    async fn in_memory_audit_logger_preserves_call_order() {
        let logger = InMemoryAuditLogger::new();
        logger.log_action(action("FIRST")).await.expect("recorded");
        logger.log_action(action("SECOND")).await.expect("recorded");
        let actions = logger.actions().expect("readable");
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].action, "FIRST");
        assert_eq!(actions[1].action, "SECOND");
    }
}
