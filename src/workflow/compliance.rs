// src/workflow/compliance.rs
// ============================================================================
// Module: Compliance Workflow
// Description: Three-stage compliance governance workflow (flag-check -> decision).
// Purpose: Produce a deterministic, audited compliance decision for one event.
// Dependencies: crate::{domain, governance, interfaces, observability, workflow}
// ============================================================================

//! ## Overview
//! `flag_check -> policy -> decision`, three stages, three audit entries on
//! a non-cached run. Structurally identical to
//! [`crate::workflow::risk::RiskWorkflow`] -- same governance gate, same
//! idempotency envelope, same failure-count boundary -- with its own stage
//! chain and scoring table.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::domain::Timestamp;
use crate::governance::ModelGate;
use crate::governance::ModelRegistry;
use crate::governance::NoopModelGate;
use crate::governance::NoopPromptGate;
use crate::governance::PromptGate;
use crate::governance::PromptRegistry;
use crate::interfaces::AuditLogger;
use crate::interfaces::NoopStateStore;
use crate::interfaces::StateStore;
use crate::observability::FailureClassifier;
use crate::observability::MetricsCollector;
use crate::workflow::config::EngineConfig;
use crate::workflow::errors::WorkflowError;
use crate::workflow::gate::enforce_gate;
use crate::workflow::state::ComplianceState;
use crate::workflow::state::Decision;
use crate::workflow::state::PolicyResult;
use crate::workflow::state::StageAuditEntry;

// ============================================================================
// SECTION: Stage Trait
// ============================================================================

/// One stage of the compliance workflow: a pure transform over [`ComplianceState`].
pub trait ComplianceStage: Send + Sync {
    /// Stage name recorded as the audit entry's `node`.
    fn name(&self) -> &'static str;

    /// Runs the stage, consuming and returning the state.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] if the stage rejects the current state.
    fn run(&self, state: ComplianceState, now: Timestamp) -> Result<ComplianceState, WorkflowError>;
}

// ============================================================================
// SECTION: Flag Check Stage
// ============================================================================

/// Requires approval whenever any regulatory flag is attached to the event.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlagCheckStage;

impl ComplianceStage for FlagCheckStage {
    fn name(&self) -> &'static str {
        "flag_check"
    }

    fn run(
        &self,
        mut state: ComplianceState,
        now: Timestamp,
    ) -> Result<ComplianceState, WorkflowError> {
        if !state.regulatory_flags.is_empty() {
            state.approval_required = true;
        }
        state.audit_trail.push(StageAuditEntry::new(
            self.name(),
            "FLAGS_EVALUATED",
            now,
            state.correlation_id.clone(),
        ));
        Ok(state)
    }
}

// ============================================================================
// SECTION: Policy Stage
// ============================================================================

/// Deterministic score lookup keyed by `raw_event.event_type`, with its own
/// pass/fail threshold distinct from the risk workflow's.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyStage;

impl ComplianceStage for PolicyStage {
    fn name(&self) -> &'static str {
        "policy"
    }

    fn run(
        &self,
        mut state: ComplianceState,
        now: Timestamp,
    ) -> Result<ComplianceState, WorkflowError> {
        let score = match state.raw_event.event_type() {
            Some("low_risk") => 15.0,
            Some("standard") => 40.0,
            None | Some(_) => 50.0,
        };
        state.risk_score = Some(score);
        state.policy_result = Some(if score >= 80.0 {
            PolicyResult::Fail
        } else {
            PolicyResult::Pass
        });
        state.audit_trail.push(StageAuditEntry::new(
            self.name(),
            "COMPLIANCE_POLICY_EVALUATED",
            now,
            state.correlation_id.clone(),
        ));
        Ok(state)
    }
}

// ============================================================================
// SECTION: Decision Stage
// ============================================================================

/// Aggregates approval-required and policy outcomes into a final decision.
///
/// First match wins: a pending approval requirement wins outright, a
/// policy failure rejects, otherwise the event is approved and
/// `approval_required` is cleared.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplianceDecisionStage;

impl ComplianceStage for ComplianceDecisionStage {
    fn name(&self) -> &'static str {
        "decision"
    }

    fn run(
        &self,
        mut state: ComplianceState,
        now: Timestamp,
    ) -> Result<ComplianceState, WorkflowError> {
        let decision = if state.approval_required {
            Decision::RequireApproval
        } else if state.policy_result == Some(PolicyResult::Fail) {
            Decision::Rejected
        } else {
            state.approval_required = false;
            Decision::Approved
        };
        state.final_decision = Some(decision);
        state.audit_trail.push(StageAuditEntry::new(
            self.name(),
            "COMPLIANCE_DECISION_MADE",
            now,
            state.correlation_id.clone(),
        ));
        Ok(state)
    }
}

/// Builds the fixed, ordered three-stage compliance chain.
fn default_stages() -> Vec<Box<dyn ComplianceStage>> {
    vec![
        Box::new(FlagCheckStage),
        Box::new(PolicyStage),
        Box::new(ComplianceDecisionStage),
    ]
}

// ============================================================================
// SECTION: Compliance Workflow
// ============================================================================

/// Orchestrates the three-stage compliance workflow behind the shared
/// governance gate and idempotency envelope.
pub struct ComplianceWorkflow {
    /// Ordered, fixed stage chain.
    stages: Vec<Box<dyn ComplianceStage>>,
    /// Audit sink; required collaborator.
    audit_logger: Arc<dyn AuditLogger>,
    /// Idempotency cache; defaults to [`NoopStateStore`].
    state_store: Arc<dyn StateStore>,
    /// Counters collector; defaults to a private, unread collector.
    metrics: Arc<MetricsCollector>,
    /// Exception-to-category mapper used on the failure path.
    failure_classifier: FailureClassifier,
    /// Model approval gate; defaults to [`NoopModelGate`] (always approves).
    model_gate: Arc<dyn ModelGate>,
    /// Prompt approval gate; defaults to [`NoopPromptGate`] (always approves).
    prompt_gate: Arc<dyn PromptGate>,
    /// Governed model/prompt names and default versions.
    config: EngineConfig,
}

impl ComplianceWorkflow {
    /// Builds a compliance workflow with the required audit sink and every
    /// optional collaborator defaulted to its no-op implementation.
    #[must_use]
    pub fn new(audit_logger: impl AuditLogger + 'static) -> Self {
        Self {
            stages: default_stages(),
            audit_logger: Arc::new(audit_logger),
            state_store: Arc::new(NoopStateStore),
            metrics: Arc::new(MetricsCollector::new()),
            failure_classifier: FailureClassifier::new(),
            model_gate: Arc::new(NoopModelGate),
            prompt_gate: Arc::new(NoopPromptGate),
            config: EngineConfig::default_for_compliance(),
        }
    }

    /// Builds a compliance workflow over an already-shared audit sink, so
    /// the caller retains a handle to inspect recorded actions after `run`.
    #[must_use]
    pub fn new_with_shared_audit(audit_logger: Arc<dyn AuditLogger>) -> Self {
        Self {
            stages: default_stages(),
            audit_logger,
            state_store: Arc::new(NoopStateStore),
            metrics: Arc::new(MetricsCollector::new()),
            failure_classifier: FailureClassifier::new(),
            model_gate: Arc::new(NoopModelGate),
            prompt_gate: Arc::new(NoopPromptGate),
            config: EngineConfig::default_for_compliance(),
        }
    }

    /// Installs an idempotency state store.
    #[must_use]
    pub fn with_state_store(mut self, state_store: impl StateStore + 'static) -> Self {
        self.state_store = Arc::new(state_store);
        self
    }

    /// Installs a shared metrics collector so the caller can read exported counters.
    #[must_use]
    pub fn with_metrics_collector(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Overrides the failure classifier.
    #[must_use]
    pub fn with_failure_classifier(mut self, failure_classifier: FailureClassifier) -> Self {
        self.failure_classifier = failure_classifier;
        self
    }

    /// Installs a model registry as the governance gate's model collaborator.
    #[must_use]
    pub fn with_model_registry(mut self, registry: Arc<ModelRegistry>) -> Self {
        self.model_gate = registry;
        self
    }

    /// Installs a prompt registry as the governance gate's prompt collaborator.
    #[must_use]
    pub fn with_prompt_registry(mut self, registry: Arc<PromptRegistry>) -> Self {
        self.prompt_gate = registry;
        self
    }

    /// Overrides the default `(model, prompt)` names/versions the gate checks.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Executes the compliance workflow for `state`.
    ///
    /// See [`crate::workflow::risk::RiskWorkflow::run`] for the shared
    /// idempotency/gate/stage-chain/success-path contract and the
    /// failure-count boundary this mirrors exactly.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Store`] if the idempotency store fails,
    /// [`WorkflowError::ModelNotApproved`]/[`WorkflowError::PromptNotApproved`]
    /// if the governance gate rejects the declared model/prompt, or
    /// whatever error a stage raises.
    pub async fn run(&self, state: ComplianceState) -> Result<ComplianceState, WorkflowError> {
        let cached = self
            .state_store
            .get_compliance_state(&state.event_id)
            .await
            .map_err(WorkflowError::from)
            .map_err(|error| self.note_failure(error))?;
        if let Some(cached) = cached {
            self.metrics.inc("workflow_cache_hit_count");
            return Ok(cached);
        }

        let model_version = state
            .model_version
            .clone()
            .unwrap_or_else(|| self.config.model_version.clone());
        let prompt_version = state.prompt_version.unwrap_or(self.config.prompt_version);

        enforce_gate(
            self.model_gate.as_ref(),
            &self.config.model_name,
            &model_version,
            self.prompt_gate.as_ref(),
            &self.config.prompt_name,
            prompt_version,
            self.audit_logger.as_ref(),
            &state.tenant_id,
            &state.correlation_id,
        )
        .await?;

        self.execute(state).await.map_err(|error| self.note_failure(error))
    }

    /// Runs the stage chain and, on success, persists and counts the result.
    async fn execute(&self, mut state: ComplianceState) -> Result<ComplianceState, WorkflowError> {
        for stage in &self.stages {
            state = stage.run(state, Timestamp::now())?;
        }
        self.metrics.inc("workflow_execution_count");
        self.state_store
            .set_compliance_state(&state.event_id, state.clone())
            .await?;
        Ok(state)
    }

    /// Classifies `error` and increments `failure_count`, returning it unchanged.
    fn note_failure(&self, error: WorkflowError) -> WorkflowError {
        let category = self.failure_classifier.classify(&error);
        self.metrics.inc_labeled(
            "failure_count",
            &[("category", category.as_str()), ("workflow", "compliance")],
        );
        error
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
    use std::collections::BTreeSet;

    use super::*;
    use crate::domain::CorrelationId;
    use crate::domain::EventId;
    use crate::domain::RawEvent;
    use crate::domain::TenantId;
    use crate::governance::InMemoryModelRepository;
    use crate::governance::InMemoryPromptRepository;
    use crate::governance::ModelName;
    use crate::governance::ModelVersion;
    use crate::interfaces::InMemoryAuditLogger;
    use crate::interfaces::InMemoryStateStore;

    fn state(
        event_id: &str,
        raw_event: serde_json::Value,
        regulatory_flags: &[&str],
    ) -> ComplianceState {
        ComplianceState::new(
            EventId::new(event_id),
            TenantId::new("t1"),
            CorrelationId::new(format!("c-{event_id}")),
            RawEvent::new(raw_event),
            regulatory_flags.iter().map(ToString::to_string).collect::<BTreeSet<_>>(),
        )
    }

    #[tokio::test]
    async fn s4_regulatory_flag_escalates_to_require_approval() {
        let workflow = ComplianceWorkflow::new(InMemoryAuditLogger::new());
        let out = workflow
            .run(state(
                "e1",
                serde_json::json!({"event_type": "low_risk"}),
                &["GDPR"],
            ))
            .await
            .expect("run succeeds");
        assert_eq!(out.final_decision, Some(Decision::RequireApproval));
        assert!(out.approval_required);
    }

    #[tokio::test]
    async fn s5_low_risk_no_flags_is_approved() {
        let workflow = ComplianceWorkflow::new(InMemoryAuditLogger::new());
        let out = workflow
            .run(state(
                "e2",
                serde_json::json!({"event_type": "low_risk", "metadata": {"category": "normal"}}),
                &[],
            ))
            .await
            .expect("run succeeds");
        assert_eq!(out.final_decision, Some(Decision::Approved));
        assert!(!out.approval_required);
        assert_eq!(out.risk_score, Some(15.0));
    }

    #[tokio::test]
    async fn other_event_scores_50_and_still_approves() {
        let workflow = ComplianceWorkflow::new(InMemoryAuditLogger::new());
        let out = workflow
            .run(state(
                "e-reject",
                serde_json::json!({"event_type": "other"}),
                &[],
            ))
            .await
            .expect("run succeeds");
        assert_eq!(out.risk_score, Some(50.0));
        assert_eq!(out.policy_result, Some(PolicyResult::Pass));
        assert_eq!(out.final_decision, Some(Decision::Approved));
    }

    #[tokio::test]
    async fn audit_trail_has_three_entries_in_stage_order() {
        let workflow = ComplianceWorkflow::new(InMemoryAuditLogger::new());
        let out = workflow
            .run(state(
                "e3",
                serde_json::json!({"event_type": "standard"}),
                &[],
            ))
            .await
            .expect("run succeeds");
        let nodes: Vec<&str> = out.audit_trail.iter().map(|entry| entry.node.as_str()).collect();
        assert_eq!(nodes, vec!["flag_check", "policy", "decision"]);
        assert_eq!(out.audit_trail.len(), 3);
    }

    #[tokio::test]
    async fn deterministic_decision_across_independent_runs() {
        let workflow = ComplianceWorkflow::new(InMemoryAuditLogger::new());
        let out1 = workflow
            .run(state(
                "e3",
                serde_json::json!({"event_type": "standard"}),
                &[],
            ))
            .await
            .expect("run succeeds");
        let out2 = workflow
            .run(state(
                "e3b",
                serde_json::json!({"event_type": "standard"}),
                &[],
            ))
            .await
            .expect("run succeeds");
        assert_eq!(out1.final_decision, out2.final_decision);
        assert_eq!(out1.risk_score, out2.risk_score);
    }

    #[tokio::test]
    async fn cache_hit_returns_cached_state_and_skips_set() {
        let store = InMemoryStateStore::new();
        let mut cached = state("e4", serde_json::json!({}), &[]);
        cached.final_decision = Some(Decision::Approved);
        cached.approval_required = false;
        store
            .set_compliance_state(&EventId::new("e4"), cached.clone())
            .await
            .expect("seed cache");
        let workflow = ComplianceWorkflow::new(InMemoryAuditLogger::new()).with_state_store(store);

        let out = workflow
            .run(state("e4", serde_json::json!({"event_type": "low_risk"}), &["GDPR"]))
            .await
            .expect("run succeeds");
        assert_eq!(out.final_decision, Some(Decision::Approved));
        assert!(out.audit_trail.is_empty());
    }

    #[tokio::test]
    async fn model_not_approved_blocks_execution() {
        let model_repo = InMemoryModelRepository::new();
        let registry = Arc::new(ModelRegistry::new(model_repo, InMemoryAuditLogger::new()));
        registry
            .register_model(
                ModelName::new("compliance-model"),
                ModelVersion::new("1.0"),
                "x".to_string(),
                Timestamp::Logical(1),
                CorrelationId::new("c1"),
                TenantId::new("t1"),
            )
            .await
            .expect("register succeeds");

        let workflow = ComplianceWorkflow::new(InMemoryAuditLogger::new()).with_model_registry(registry);
        let err = workflow
            .run(state(
                "e5",
                serde_json::json!({"event_type": "standard"}),
                &[],
            ))
            .await
            .expect_err("unapproved model blocks execution");
        assert!(matches!(err, WorkflowError::ModelNotApproved(_)));
    }

    #[tokio::test]
    async fn prompt_not_approved_blocks_execution() {
        let prompt_repo = InMemoryPromptRepository::new();
        let registry = Arc::new(PromptRegistry::new(prompt_repo, InMemoryAuditLogger::new()));
        let workflow =
            ComplianceWorkflow::new(InMemoryAuditLogger::new()).with_prompt_registry(registry);
        let err = workflow
            .run(state(
                "e6",
                serde_json::json!({"event_type": "standard"}),
                &[],
            ))
            .await
            .expect_err("unapproved prompt blocks execution");
        assert!(matches!(err, WorkflowError::PromptNotApproved(_)));
    }

    #[tokio::test]
    async fn governance_violation_audit_emitted_before_raise() {
        let model_repo = InMemoryModelRepository::new();
        let registry = Arc::new(ModelRegistry::new(model_repo, InMemoryAuditLogger::new()));
        registry
            .register_model(
                ModelName::new("compliance-model"),
                ModelVersion::new("1.0"),
                "x".to_string(),
                Timestamp::Logical(1),
                CorrelationId::new("c1"),
                TenantId::new("t1"),
            )
            .await
            .expect("register succeeds");

        let workflow_audit = Arc::new(InMemoryAuditLogger::new());
        let workflow = ComplianceWorkflow::new_with_shared_audit(Arc::clone(&workflow_audit))
            .with_model_registry(registry);

        let result = workflow
            .run(state(
                "e7",
                serde_json::json!({"event_type": "standard"}),
                &[],
            ))
            .await;
        assert!(result.is_err());
        let actions = workflow_audit.actions().expect("audit readable");
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action, "GOVERNANCE_VIOLATION");
        assert_eq!(actions[0].resource_id, "compliance-model");
        assert_eq!(actions[0].tenant_id, TenantId::new("t1"));
        assert_eq!(actions[0].correlation_id, CorrelationId::new("c-e7"));
    }
}
