// src/interfaces/store.rs
// ============================================================================
// Module: State Store Interface
// Description: Idempotency cache keyed by event_id, one keyspace per workflow kind.
// Purpose: Let a workflow invocation short-circuit when a prior result exists.
// Dependencies: async-trait, tokio, crate::workflow::state, crate::interfaces::errors
// ============================================================================

//! ## Overview
//! A [`StateStore`] is consulted at the start of every `run`. A hit
//! short-circuits the entire stage chain: the cached value
//! is returned byte-for-byte and no stage, audit entry, or further store
//! write occurs for that invocation. When no store is configured, the
//! engine always executes the stage chain.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::EventId;
use crate::interfaces::errors::StoreError;
use crate::workflow::state::ComplianceState;
use crate::workflow::state::RiskState;

// ============================================================================
// SECTION: State Store Trait
// ============================================================================

/// Idempotency cache for workflow final states, keyed by `event_id`.
///
/// # Invariants
/// - If `get_risk_state`/`get_compliance_state` returns `Some`, the caller
///   must treat that value as the final result and must not call the
///   matching `set_*` for the same invocation.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Looks up a cached risk workflow state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup itself fails.
    async fn get_risk_state(&self, event_id: &EventId) -> Result<Option<RiskState>, StoreError>;

    /// Stores a finalized risk workflow state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    async fn set_risk_state(&self, event_id: &EventId, state: RiskState)
    -> Result<(), StoreError>;

    /// Looks up a cached compliance workflow state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the lookup itself fails.
    async fn get_compliance_state(
        &self,
        event_id: &EventId,
    ) -> Result<Option<ComplianceState>, StoreError>;

    /// Stores a finalized compliance workflow state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    async fn set_compliance_state(
        &self,
        event_id: &EventId,
        state: ComplianceState,
    ) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: No-Op State Store
// ============================================================================

/// The default state store: every lookup misses, every write is discarded.
///
/// Installed by default so the engine never branches on an absent
/// collaborator: a workflow built with no `with_state_store` call simply
/// always executes its stage chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStateStore;

#[async_trait]
impl StateStore for NoopStateStore {
    async fn get_risk_state(&self, _event_id: &EventId) -> Result<Option<RiskState>, StoreError> {
        Ok(None)
    }

    async fn set_risk_state(
        &self,
        _event_id: &EventId,
        _state: RiskState,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get_compliance_state(
        &self,
        _event_id: &EventId,
    ) -> Result<Option<ComplianceState>, StoreError> {
        Ok(None)
    }

    async fn set_compliance_state(
        &self,
        _event_id: &EventId,
        _state: ComplianceState,
    ) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: In-Memory State Store
// ============================================================================

/// In-memory state store for tests and examples.
///
/// Not intended for production use: state is lost on process exit and
/// nothing is persisted across runs.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    /// Cached risk states, keyed by `event_id`.
    risk: Mutex<BTreeMap<String, RiskState>>,
    /// Cached compliance states, keyed by `event_id`.
    compliance: Mutex<BTreeMap<String, ComplianceState>>,
}

impl InMemoryStateStore {
    /// Creates an empty in-memory state store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get_risk_state(&self, event_id: &EventId) -> Result<Option<RiskState>, StoreError> {
        Ok(self.risk.lock().await.get(event_id.as_str()).cloned())
    }

    async fn set_risk_state(
        &self,
        event_id: &EventId,
        state: RiskState,
    ) -> Result<(), StoreError> {
        self.risk
            .lock()
            .await
            .insert(event_id.as_str().to_string(), state);
        Ok(())
    }

    async fn get_compliance_state(
        &self,
        event_id: &EventId,
    ) -> Result<Option<ComplianceState>, StoreError> {
        Ok(self.compliance.lock().await.get(event_id.as_str()).cloned())
    }

    async fn set_compliance_state(
        &self,
        event_id: &EventId,
        state: ComplianceState,
    ) -> Result<(), StoreError> {
        self.compliance
            .lock()
            .await
            .insert(event_id.as_str().to_string(), state);
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
    use crate::domain::TenantId;

    fn risk_state(event_id: &str) -> RiskState {
        RiskState::new(
            EventId::new(event_id),
            TenantId::new("t1"),
            crate::domain::CorrelationId::new("c1"),
            crate::domain::RawEvent::default(),
        )
    }

    #[tokio::test]
    async fn noop_state_store_always_misses_and_discards_writes() {
        let store = NoopStateStore;
        let event_id = EventId::new("e1");
        assert_eq!(store.get_risk_state(&event_id).await.expect("ok"), None);
        store
            .set_risk_state(&event_id, risk_state("e1"))
            .await
            .expect("discarded");
        assert_eq!(store.get_risk_state(&event_id).await.expect("ok"), None);
    }

    #[tokio::test]
    async fn in_memory_state_store_round_trips_risk_state_by_event_id() {
        let store = InMemoryStateStore::new();
        let event_id = EventId::new("e1");
        assert_eq!(store.get_risk_state(&event_id).await.expect("ok"), None);
        let state = risk_state("e1");
        store
            .set_risk_state(&event_id, state.clone())
            .await
            .expect("stored");
        assert_eq!(store.get_risk_state(&event_id).await.expect("ok"), Some(state));
    }

    #[tokio::test]
    async fn risk_and_compliance_keyspaces_do_not_collide() {
        let store = InMemoryStateStore::new();
        let event_id = EventId::new("shared-id");
        store
            .set_risk_state(&event_id, risk_state("shared-id"))
            .await
            .expect("stored");
        assert_eq!(
            store.get_compliance_state(&event_id).await.expect("ok"),
            None
        );
    }
}
