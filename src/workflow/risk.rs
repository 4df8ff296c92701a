// src/workflow/risk.rs
// ============================================================================
// Module: Risk Workflow
// Description: Five-stage risk governance workflow (retrieval -> decision).
// Purpose: Produce a deterministic, audited risk decision for one event.
// Dependencies: crate::{domain, governance, interfaces, observability, workflow}
// ============================================================================

//! ## Overview
//! `retrieval -> policy_validation -> risk_scoring -> guardrails ->
//! decision`, five stages, five audit entries on a non-cached run. Each
//! stage is a plain, synchronous, infallible-by-default transform
//! (`RiskStage::run` still returns a `Result` so a future stage could reject
//! a malformed state without changing the trait), chained by
//! [`RiskWorkflow`] the same way a gate evaluator chains predicate
//! evaluation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Map;
use serde_json::Value;

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
use crate::workflow::state::Decision;
use crate::workflow::state::GuardrailResult;
use crate::workflow::state::PolicyResult;
use crate::workflow::state::RiskState;
use crate::workflow::state::StageAuditEntry;

// ============================================================================
// SECTION: Stage Trait
// ============================================================================

/// One stage of the risk workflow: a pure transform over [`RiskState`].
///
/// Stage bodies never suspend; `run` returns a `Result` so
/// a future stage can reject malformed state without a trait change, even
/// though every stage shipped here always returns `Ok`.
pub trait RiskStage: Send + Sync {
    /// Stage name recorded as the audit entry's `node`.
    fn name(&self) -> &'static str;

    /// Runs the stage, consuming and returning the state.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] if the stage rejects the current state.
    fn run(&self, state: RiskState, now: Timestamp) -> Result<RiskState, WorkflowError>;
}

/// Deterministic stub context blob echoed by the retrieval stage.
const STUB_CONTEXT_BLOB: &str = "stub-context-v1";

// ============================================================================
// SECTION: Retrieval Stage
// ============================================================================

/// Produces a deterministic retrieval stub from `raw_event.event_type`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetrievalStage;

impl RiskStage for RetrievalStage {
    fn name(&self) -> &'static str {
        "retrieval"
    }

    fn run(&self, mut state: RiskState, now: Timestamp) -> Result<RiskState, WorkflowError> {
        let event_type = state.raw_event.event_type().unwrap_or("unknown");
        state.retrieved_context = Some(format!("{event_type}::{STUB_CONTEXT_BLOB}"));
        let mut extra = Map::new();
        extra.insert("event_type".to_string(), Value::String(event_type.to_string()));
        state.audit_trail.push(StageAuditEntry::new(
            self.name(),
            "CONTEXT_RETRIEVED",
            now,
            state.correlation_id.clone(),
        ).with_extra(extra));
        Ok(state)
    }
}

// ============================================================================
// SECTION: Policy Validation Stage
// ============================================================================

/// `category == "sensitive"` fails policy; anything else passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyValidationStage;

impl RiskStage for PolicyValidationStage {
    fn name(&self) -> &'static str {
        "policy_validation"
    }

    fn run(&self, mut state: RiskState, now: Timestamp) -> Result<RiskState, WorkflowError> {
        let result = if state.raw_event.metadata_category() == Some("sensitive") {
            PolicyResult::Fail
        } else {
            PolicyResult::Pass
        };
        state.policy_result = Some(result);
        state.audit_trail.push(StageAuditEntry::new(
            self.name(),
            "POLICY_EVALUATED",
            now,
            state.correlation_id.clone(),
        ));
        Ok(state)
    }
}

// ============================================================================
// SECTION: Risk Scoring Stage
// ============================================================================

/// Deterministic score lookup keyed by `raw_event.event_type`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScoringStage;

impl RiskStage for RiskScoringStage {
    fn name(&self) -> &'static str {
        "risk_scoring"
    }

    fn run(&self, mut state: RiskState, now: Timestamp) -> Result<RiskState, WorkflowError> {
        let score = match state.raw_event.event_type() {
            Some("high_risk") => 85.0,
            Some("low_risk") => 15.0,
            Some("standard") | None | Some(_) => 30.0,
        };
        state.risk_score = Some(score);
        state.audit_trail.push(StageAuditEntry::new(
            self.name(),
            "RISK_SCORED",
            now,
            state.correlation_id.clone(),
        ));
        Ok(state)
    }
}

// ============================================================================
// SECTION: Guardrails Stage
// ============================================================================

/// `risk_score <= 90` passes; anything higher is a guardrail violation.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuardrailsStage;

impl RiskStage for GuardrailsStage {
    fn name(&self) -> &'static str {
        "guardrails"
    }

    fn run(&self, mut state: RiskState, now: Timestamp) -> Result<RiskState, WorkflowError> {
        let score = state.risk_score.unwrap_or(0.0);
        let result = if score <= 90.0 {
            GuardrailResult::Ok
        } else {
            GuardrailResult::Violation
        };
        state.guardrail_result = Some(result);
        state.audit_trail.push(StageAuditEntry::new(
            self.name(),
            "GUARDRAIL_CHECKED",
            now,
            state.correlation_id.clone(),
        ));
        Ok(state)
    }
}

// ============================================================================
// SECTION: Decision Stage
// ============================================================================

/// Aggregates policy, score, and guardrail outcomes into a final decision.
///
/// First match wins: guardrail violation rejects, policy failure or a
/// score at or above 70 requires approval, otherwise the event is
/// approved.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionStage;

impl RiskStage for DecisionStage {
    fn name(&self) -> &'static str {
        "decision"
    }

    fn run(&self, mut state: RiskState, now: Timestamp) -> Result<RiskState, WorkflowError> {
        let decision = if state.guardrail_result == Some(GuardrailResult::Violation) {
            Decision::Rejected
        } else if state.policy_result == Some(PolicyResult::Fail) {
            Decision::RequireApproval
        } else if state.risk_score.unwrap_or(0.0) >= 70.0 {
            Decision::RequireApproval
        } else {
            Decision::Approved
        };
        state.final_decision = Some(decision);
        state.audit_trail.push(StageAuditEntry::new(
            self.name(),
            "DECISION_MADE",
            now,
            state.correlation_id.clone(),
        ));
        Ok(state)
    }
}

/// Builds the fixed, ordered five-stage risk chain.
fn default_stages() -> Vec<Box<dyn RiskStage>> {
    vec![
        Box::new(RetrievalStage),
        Box::new(PolicyValidationStage),
        Box::new(RiskScoringStage),
        Box::new(GuardrailsStage),
        Box::new(DecisionStage),
    ]
}

// ============================================================================
// SECTION: Risk Workflow
// ============================================================================

/// Orchestrates the five-stage risk workflow behind the shared governance
/// gate and idempotency envelope.
pub struct RiskWorkflow {
    /// Ordered, fixed stage chain.
    stages: Vec<Box<dyn RiskStage>>,
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

impl RiskWorkflow {
    /// Builds a risk workflow with the required audit sink and every
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
            config: EngineConfig::default_for_risk(),
        }
    }

    /// Builds a risk workflow over an already-shared audit sink, so the
    /// caller retains a handle to inspect recorded actions after `run`.
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
            config: EngineConfig::default_for_risk(),
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

    /// Executes the risk workflow for `state`.
    ///
    /// Idempotency read -> governance gate -> stage chain -> success path.
    /// A cache hit short-circuits
    /// everything after it; a gate failure emits `GOVERNANCE_VIOLATION`
    /// before raising and does not touch `failure_count` (that audit entry
    /// is already the gate's own observable failure signal). Any other
    /// error -- a stage rejecting its input, or a state-store failure on
    /// either side of the stage chain -- increments `failure_count` labeled
    /// by the classified category before propagating.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Store`] if the idempotency store fails,
    /// [`WorkflowError::ModelNotApproved`]/[`WorkflowError::PromptNotApproved`]
    /// if the governance gate rejects the declared model/prompt, or
    /// whatever error a stage raises.
    pub async fn run(&self, state: RiskState) -> Result<RiskState, WorkflowError> {
        let cached = self
            .state_store
            .get_risk_state(&state.event_id)
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
    async fn execute(&self, mut state: RiskState) -> Result<RiskState, WorkflowError> {
        for stage in &self.stages {
            state = stage.run(state, Timestamp::now())?;
        }
        self.metrics.inc("workflow_execution_count");
        self.state_store
            .set_risk_state(&state.event_id, state.clone())
            .await?;
        Ok(state)
    }

    /// Classifies `error` and increments `failure_count`, returning it unchanged.
    fn note_failure(&self, error: WorkflowError) -> WorkflowError {
        let category = self.failure_classifier.classify(&error);
        self.metrics.inc_labeled(
            "failure_count",
            &[("category", category.as_str()), ("workflow", "risk")],
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
    use crate::interfaces::StoreError;
    use crate::workflow::state::ComplianceState;

    /// Delegates to a shared [`InMemoryStateStore`] so a test can inspect
    /// persisted state through its own handle after `run` returns.
    struct SharedStateStore(Arc<InMemoryStateStore>);

    #[async_trait::async_trait]
    impl StateStore for SharedStateStore {
        async fn get_risk_state(
            &self,
            event_id: &EventId,
        ) -> Result<Option<RiskState>, StoreError> {
            self.0.get_risk_state(event_id).await
        }

        async fn set_risk_state(
            &self,
            event_id: &EventId,
            state: RiskState,
        ) -> Result<(), StoreError> {
            self.0.set_risk_state(event_id, state).await
        }

        async fn get_compliance_state(
            &self,
            event_id: &EventId,
        ) -> Result<Option<ComplianceState>, StoreError> {
            self.0.get_compliance_state(event_id).await
        }

        async fn set_compliance_state(
            &self,
            event_id: &EventId,
            state: ComplianceState,
        ) -> Result<(), StoreError> {
            self.0.set_compliance_state(event_id, state).await
        }
    }

    fn state(event_id: &str, raw_event: serde_json::Value) -> RiskState {
        RiskState::new(
            EventId::new(event_id),
            TenantId::new("t1"),
            CorrelationId::new(format!("c-{event_id}")),
            RawEvent::new(raw_event),
        )
    }

    #[tokio::test]
    async fn s1_standard_normal_is_approved() {
        let workflow = RiskWorkflow::new(InMemoryAuditLogger::new());
        let out = workflow
            .run(state(
                "e1",
                serde_json::json!({"event_type": "standard", "metadata": {"category": "normal"}}),
            ))
            .await
            .expect("run succeeds");
        assert_eq!(out.final_decision, Some(Decision::Approved));
        assert_eq!(out.risk_score, Some(30.0));
        assert_eq!(out.policy_result, Some(PolicyResult::Pass));
        assert_eq!(out.guardrail_result, Some(GuardrailResult::Ok));
    }

    #[tokio::test]
    async fn s2_sensitive_category_requires_approval() {
        let workflow = RiskWorkflow::new(InMemoryAuditLogger::new());
        let out = workflow
            .run(state(
                "e2",
                serde_json::json!({"event_type": "standard", "metadata": {"category": "sensitive"}}),
            ))
            .await
            .expect("run succeeds");
        assert_eq!(out.policy_result, Some(PolicyResult::Fail));
        assert_eq!(out.final_decision, Some(Decision::RequireApproval));
    }

    #[tokio::test]
    async fn s3_high_risk_requires_approval() {
        let workflow = RiskWorkflow::new(InMemoryAuditLogger::new());
        let out = workflow
            .run(state("e3", serde_json::json!({"event_type": "high_risk"})))
            .await
            .expect("run succeeds");
        assert_eq!(out.risk_score, Some(85.0));
        assert_eq!(out.final_decision, Some(Decision::RequireApproval));
    }

    #[tokio::test]
    async fn low_risk_is_approved() {
        let workflow = RiskWorkflow::new(InMemoryAuditLogger::new());
        let out = workflow
            .run(state("e-low", serde_json::json!({"event_type": "low_risk"})))
            .await
            .expect("run succeeds");
        assert_eq!(out.risk_score, Some(15.0));
        assert_eq!(out.final_decision, Some(Decision::Approved));
    }

    #[tokio::test]
    async fn audit_trail_has_five_entries_in_stage_order() {
        let workflow = RiskWorkflow::new(InMemoryAuditLogger::new());
        let out = workflow
            .run(state("e5", serde_json::json!({"event_type": "standard"})))
            .await
            .expect("run succeeds");
        let nodes: Vec<&str> = out.audit_trail.iter().map(|entry| entry.node.as_str()).collect();
        assert_eq!(
            nodes,
            vec![
                "retrieval",
                "policy_validation",
                "risk_scoring",
                "guardrails",
                "decision"
            ]
        );
        assert_eq!(out.audit_trail.len(), 5);
    }

    #[tokio::test]
    async fn s7_cache_hit_returns_cached_state_and_skips_set() {
        let store = InMemoryStateStore::new();
        let cached = {
            let mut cached = state("e4", serde_json::json!({}));
            cached.final_decision = Some(Decision::Approved);
            cached.risk_score = Some(20.0);
            cached
        };
        store.set_risk_state(&EventId::new("e4"), cached.clone()).await.expect("seed cache");
        let workflow = RiskWorkflow::new(InMemoryAuditLogger::new()).with_state_store(store);

        let out = workflow
            .run(state("e4", serde_json::json!({"event_type": "high_risk"})))
            .await
            .expect("run succeeds");
        assert_eq!(out.final_decision, Some(Decision::Approved));
        assert_eq!(out.risk_score, Some(20.0));
        assert!(out.audit_trail.is_empty());
    }

    #[tokio::test]
    async fn stores_result_when_store_provided() {
        let store = Arc::new(InMemoryStateStore::new());
        let workflow = RiskWorkflow::new(InMemoryAuditLogger::new())
            .with_state_store(SharedStateStore(Arc::clone(&store)));
        let out = workflow
            .run(state("e6", serde_json::json!({"event_type": "standard"})))
            .await
            .expect("run succeeds");
        let persisted = store
            .get_risk_state(&EventId::new("e6"))
            .await
            .expect("read succeeds")
            .expect("state was persisted");
        assert_eq!(persisted.final_decision, out.final_decision);
    }

    #[tokio::test]
    async fn s6_model_registered_not_approved_blocks_and_audits_first() {
        let model_repo = InMemoryModelRepository::new();
        let registry = Arc::new(ModelRegistry::new(model_repo, InMemoryAuditLogger::new()));
        registry
            .register_model(
                ModelName::new("risk-model"),
                ModelVersion::new("1.0"),
                "abc".to_string(),
                Timestamp::Logical(1),
                CorrelationId::new("c1"),
                TenantId::new("t1"),
            )
            .await
            .expect("register succeeds");

        let workflow_audit = InMemoryAuditLogger::new();
        let workflow = RiskWorkflow::new(workflow_audit).with_model_registry(registry);

        let err = workflow
            .run(state("e7", serde_json::json!({"event_type": "standard"})))
            .await
            .expect_err("unapproved model blocks execution");
        assert!(matches!(err, WorkflowError::ModelNotApproved(_)));
    }

    #[tokio::test]
    async fn governance_violation_audit_emitted_before_raise() {
        let model_repo = InMemoryModelRepository::new();
        let registry = Arc::new(ModelRegistry::new(model_repo, InMemoryAuditLogger::new()));
        registry
            .register_model(
                ModelName::new("risk-model"),
                ModelVersion::new("1.0"),
                "x".to_string(),
                Timestamp::Logical(1),
                CorrelationId::new("c1"),
                TenantId::new("t1"),
            )
            .await
            .expect("register succeeds");

        let workflow_audit = Arc::new(InMemoryAuditLogger::new());
        let workflow = RiskWorkflow::new_with_shared_audit(Arc::clone(&workflow_audit))
            .with_model_registry(registry);

        let result = workflow
            .run(state("e7b", serde_json::json!({"event_type": "standard"})))
            .await;
        assert!(result.is_err());
        let actions = workflow_audit.actions().expect("audit readable");
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action, "GOVERNANCE_VIOLATION");
        assert_eq!(actions[0].resource_type, "model");
        assert_eq!(actions[0].resource_id, "risk-model");
        assert_eq!(actions[0].tenant_id, TenantId::new("t1"));
        assert_eq!(actions[0].correlation_id, CorrelationId::new("c-e7b"));
    }

    #[tokio::test]
    async fn prompt_not_approved_blocks_execution() {
        let prompt_repo = InMemoryPromptRepository::new();
        let registry = Arc::new(PromptRegistry::new(prompt_repo, InMemoryAuditLogger::new()));
        let workflow =
            RiskWorkflow::new(InMemoryAuditLogger::new()).with_prompt_registry(registry);

        let err = workflow
            .run(state("e8", serde_json::json!({"event_type": "standard"})))
            .await
            .expect_err("unapproved prompt blocks execution");
        assert!(matches!(err, WorkflowError::PromptNotApproved(_)));
    }

    #[tokio::test]
    async fn same_input_is_deterministic_across_runs() {
        let a = RiskWorkflow::new(InMemoryAuditLogger::new())
            .run(state("e-a", serde_json::json!({"event_type": "standard"})))
            .await
            .expect("run succeeds");
        let b = RiskWorkflow::new(InMemoryAuditLogger::new())
            .run(state("e-b", serde_json::json!({"event_type": "standard"})))
            .await
            .expect("run succeeds");
        assert_eq!(a.final_decision, b.final_decision);
        assert_eq!(a.risk_score, b.risk_score);
    }
}
