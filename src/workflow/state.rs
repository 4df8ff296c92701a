// src/workflow/state.rs
// ============================================================================
// Module: Workflow State Records
// Description: Per-run state for the Risk and Compliance workflows.
// Purpose: Carry a workflow invocation's inputs, intermediate results, and audit trail.
// Dependencies: serde, serde_json, crate::domain
// ============================================================================

//! ## Overview
//! These records are workflow-local: owned by a single `run` invocation
//! until the run completes, at which point a configured
//! [`crate::interfaces::StateStore`] takes ownership of the finalized value.
//! They live here, rather than in `domain`, because
//! [`crate::interfaces::StateStore`] must name them concretely and the
//! workflow engine is their only producer.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::domain::CorrelationId;
use crate::domain::EventId;
use crate::domain::ModelVersion;
use crate::domain::PromptVersion;
use crate::domain::RawEvent;
use crate::domain::TenantId;
use crate::domain::Timestamp;

// ============================================================================
// SECTION: Stage Audit Entry
// ============================================================================

/// One append-only entry in a workflow state's `audit_trail`.
///
/// # Invariants
/// - `audit_trail` never mutates an existing entry; stages only push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageAuditEntry {
    /// Name of the stage that produced this entry, e.g. `retrieval`.
    pub node: String,
    /// Action recorded by the stage, e.g. `CONTEXT_RETRIEVED`.
    pub action: String,
    /// When the stage ran.
    pub timestamp: Timestamp,
    /// Correlation identifier carried from the triggering request.
    pub correlation_id: CorrelationId,
    /// Stage-specific structured context.
    #[serde(default)]
    pub extra: Map<String, Value>,
}

impl StageAuditEntry {
    /// Builds a new stage audit entry with no extra context.
    #[must_use]
    pub fn new(
        node: impl Into<String>,
        action: impl Into<String>,
        timestamp: Timestamp,
        correlation_id: CorrelationId,
    ) -> Self {
        Self {
            node: node.into(),
            action: action.into(),
            timestamp,
            correlation_id,
            extra: Map::new(),
        }
    }

    /// Attaches extra structured context to this entry.
    #[must_use]
    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra = extra;
        self
    }
}

// ============================================================================
// SECTION: Policy / Guardrail Result Enums
// ============================================================================

/// Outcome of a policy-evaluation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PolicyResult {
    /// Policy checks passed.
    Pass,
    /// Policy checks failed.
    Fail,
}

/// Outcome of a guardrail-check stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GuardrailResult {
    /// No guardrail was violated.
    Ok,
    /// A guardrail was violated.
    Violation,
}

/// Final, machine-actionable workflow decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// The event is approved; no human review required.
    Approved,
    /// The event requires human approval before proceeding.
    RequireApproval,
    /// The event is rejected.
    Rejected,
}

// ============================================================================
// SECTION: Risk State
// ============================================================================

/// Per-run state for [`crate::workflow::risk::RiskWorkflow`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskState {
    /// Event identifier; the idempotency key.
    pub event_id: EventId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Correlation identifier for the triggering request.
    pub correlation_id: CorrelationId,
    /// Raw inbound event payload.
    #[serde(default)]
    pub raw_event: RawEvent,
    /// Declared model version the governance gate must find approved.
    #[serde(default)]
    pub model_version: Option<ModelVersion>,
    /// Declared prompt version the governance gate must find approved.
    #[serde(default)]
    pub prompt_version: Option<PromptVersion>,
    /// Deterministic retrieval-stub output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_context: Option<String>,
    /// Policy-evaluation outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_result: Option<PolicyResult>,
    /// Deterministic risk score in `[0, 100]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    /// Guardrail-check outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardrail_result: Option<GuardrailResult>,
    /// Final aggregated decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_decision: Option<Decision>,
    /// Ordered, append-only stage-audit entries.
    #[serde(default)]
    pub audit_trail: Vec<StageAuditEntry>,
}

impl RiskState {
    /// Builds a fresh, unprocessed risk state for a new workflow invocation.
    #[must_use]
    pub fn new(
        event_id: EventId,
        tenant_id: TenantId,
        correlation_id: CorrelationId,
        raw_event: RawEvent,
    ) -> Self {
        Self {
            event_id,
            tenant_id,
            correlation_id,
            raw_event,
            model_version: None,
            prompt_version: None,
            retrieved_context: None,
            policy_result: None,
            risk_score: None,
            guardrail_result: None,
            final_decision: None,
            audit_trail: Vec::new(),
        }
    }
}

#[cfg(test)]
mod risk_state_tests {
    use super::*;

    #[test]
    fn new_risk_state_starts_with_no_results_and_empty_audit_trail() {
        let state = RiskState::new(
            EventId::new("e1"),
            TenantId::new("t1"),
            CorrelationId::new("c1"),
            RawEvent::default(),
        );
        assert!(state.retrieved_context.is_none());
        assert!(state.policy_result.is_none());
        assert!(state.risk_score.is_none());
        assert!(state.guardrail_result.is_none());
        assert!(state.final_decision.is_none());
        assert!(state.audit_trail.is_empty());
    }

    #[test]
    fn stage_audit_entry_with_extra_attaches_structured_context() {
        let mut extra = Map::new();
        extra.insert("k".to_string(), Value::from("v"));
        let entry = StageAuditEntry::new(
            "retrieval",
            "CONTEXT_RETRIEVED",
            Timestamp::Logical(1),
            CorrelationId::new("c1"),
        )
        .with_extra(extra.clone());
        assert_eq!(entry.extra, extra);
        assert_eq!(entry.node, "retrieval");
    }
}

// ============================================================================
// SECTION: Compliance State
// ============================================================================

/// Per-run state for [`crate::workflow::compliance::ComplianceWorkflow`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceState {
    /// Event identifier; the idempotency key.
    pub event_id: EventId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Correlation identifier for the triggering request.
    pub correlation_id: CorrelationId,
    /// Raw inbound event payload.
    #[serde(default)]
    pub raw_event: RawEvent,
    /// Declared model version the governance gate must find approved.
    #[serde(default)]
    pub model_version: Option<ModelVersion>,
    /// Declared prompt version the governance gate must find approved.
    #[serde(default)]
    pub prompt_version: Option<PromptVersion>,
    /// Regulatory flags attached to the event (e.g. `GDPR`).
    #[serde(default)]
    pub regulatory_flags: BTreeSet<String>,
    /// Deterministic risk score in `[0, 100]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    /// Policy-evaluation outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_result: Option<PolicyResult>,
    /// Whether human approval is required.
    #[serde(default)]
    pub approval_required: bool,
    /// Final aggregated decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_decision: Option<Decision>,
    /// Ordered, append-only stage-audit entries.
    #[serde(default)]
    pub audit_trail: Vec<StageAuditEntry>,
}

impl ComplianceState {
    /// Builds a fresh, unprocessed compliance state for a new workflow invocation.
    #[must_use]
    pub fn new(
        event_id: EventId,
        tenant_id: TenantId,
        correlation_id: CorrelationId,
        raw_event: RawEvent,
        regulatory_flags: BTreeSet<String>,
    ) -> Self {
        Self {
            event_id,
            tenant_id,
            correlation_id,
            raw_event,
            model_version: None,
            prompt_version: None,
            regulatory_flags,
            risk_score: None,
            policy_result: None,
            approval_required: false,
            final_decision: None,
            audit_trail: Vec::new(),
        }
    }
}

#[cfg(test)]
mod compliance_state_tests {
    use super::*;

    #[test]
    fn new_compliance_state_preserves_supplied_regulatory_flags() {
        let flags: BTreeSet<String> = ["GDPR".to_string(), "SOX".to_string()].into();
        let state = ComplianceState::new(
            EventId::new("e1"),
            TenantId::new("t1"),
            CorrelationId::new("c1"),
            RawEvent::default(),
            flags.clone(),
        );
        assert_eq!(state.regulatory_flags, flags);
        assert!(!state.approval_required);
        assert!(state.final_decision.is_none());
    }
}
