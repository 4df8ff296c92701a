// src/governance/model_registry.rs
// ============================================================================
// Module: Model Registry
// Description: Approval state of governed models, with audited mutations.
// Purpose: Give the governance gate a single source of truth for "is this model approved".
// Dependencies: async-trait, tokio, crate::domain, crate::interfaces
// ============================================================================

//! ## Overview
//! A model moves `REGISTERED -> APPROVED` (or sits deprecated) under audit.
//! The registry never persists anything itself: it delegates to an injected
//! [`ModelRepository`] and reports every mutation through an injected
//! [`AuditLogger`], so the repository stays the only source of persistence
//! nondeterminism.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::domain::CorrelationId;
use crate::domain::ModelName;
use crate::domain::ModelVersion;
use crate::domain::TenantId;
use crate::domain::Timestamp;
use crate::governance::errors::InvalidModelStateTransition;
use crate::governance::errors::ModelConflictError;
use crate::interfaces::AuditAction;
use crate::interfaces::AuditLogger;
use crate::interfaces::RepositoryError;

// ============================================================================
// SECTION: Model Record
// ============================================================================

/// Approval status of a registered model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    /// Registered but not yet approved.
    Registered,
    /// Approved for use by the governance gate.
    Approved,
    /// Deprecated; no longer eligible for the gate.
    Deprecated,
}

impl ModelStatus {
    /// Canonical lowercase name used in error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Approved => "approved",
            Self::Deprecated => "deprecated",
        }
    }
}

/// A registered model version and its governance approval state.
///
/// Identity is `(model_name, version)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    /// Model name.
    pub model_name: ModelName,
    /// Model version.
    pub version: ModelVersion,
    /// Caller-supplied integrity checksum.
    pub checksum: String,
    /// Approval status.
    pub status: ModelStatus,
    /// When the record was first registered.
    pub registered_at: Timestamp,
    /// When the record was approved, if it has been.
    pub approved_at: Option<Timestamp>,
    /// Tenant that registered the model.
    pub tenant_id: TenantId,
    /// Correlation identifier of the registering request.
    pub correlation_id: CorrelationId,
}

// ============================================================================
// SECTION: Model Repository
// ============================================================================

/// Persistence contract for [`ModelRecord`]s.
///
/// Repositories are the only source of persistence nondeterminism in the
/// model registry; the registry itself holds no records.
#[async_trait]
pub trait ModelRepository: Send + Sync {
    /// Persists a model record, overwriting any existing record with the
    /// same `(model_name, version)`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the write fails.
    async fn save(&self, record: ModelRecord) -> Result<(), RepositoryError>;

    /// Looks up a model record by exact `(name, version)`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the read fails.
    async fn get(
        &self,
        name: &ModelName,
        version: &ModelVersion,
    ) -> Result<Option<ModelRecord>, RepositoryError>;

    /// Looks up the most recently saved record for a model name.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the read fails.
    async fn get_latest(&self, name: &ModelName) -> Result<Option<ModelRecord>, RepositoryError>;
}

// ============================================================================
// SECTION: In-Memory Model Repository
// ============================================================================

/// In-memory model repository for tests and examples.
#[derive(Debug, Default)]
pub struct InMemoryModelRepository {
    /// All records, keyed by `(model_name, version)`.
    records: Mutex<BTreeMap<(String, String), ModelRecord>>,
    /// Most recently saved record per model name.
    latest: Mutex<BTreeMap<String, ModelRecord>>,
}

impl InMemoryModelRepository {
    /// Creates an empty in-memory model repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelRepository for InMemoryModelRepository {
    async fn save(&self, record: ModelRecord) -> Result<(), RepositoryError> {
        let key = (
            record.model_name.as_str().to_string(),
            record.version.as_str().to_string(),
        );
        self.records.lock().await.insert(key, record.clone());
        self.latest
            .lock()
            .await
            .insert(record.model_name.as_str().to_string(), record);
        Ok(())
    }

    async fn get(
        &self,
        name: &ModelName,
        version: &ModelVersion,
    ) -> Result<Option<ModelRecord>, RepositoryError> {
        let key = (name.as_str().to_string(), version.as_str().to_string());
        Ok(self.records.lock().await.get(&key).cloned())
    }

    async fn get_latest(&self, name: &ModelName) -> Result<Option<ModelRecord>, RepositoryError> {
        Ok(self.latest.lock().await.get(name.as_str()).cloned())
    }
}

// ============================================================================
// SECTION: Model Registry Errors
// ============================================================================

/// Errors raised by [`ModelRegistry`] mutation operations.
#[derive(Debug, Error)]
pub enum ModelRegistryError {
    /// Registration conflicted with an existing record of a different checksum.
    #[error(transparent)]
    Conflict(#[from] ModelConflictError),
    /// Approval was attempted from a non-`REGISTERED` state.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidModelStateTransition),
    /// The repository failed to complete the operation.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

// ============================================================================
// SECTION: Model Gate
// ============================================================================

/// What the governance gate needs from a model collaborator: "is this
/// `(name, version)` approved?" Lets the gate hold a trait object that
/// defaults to [`NoopModelGate`] rather than branching on an absent
/// [`ModelRegistry`]: the engine never inspects for null, so absent
/// collaborators are always the no-op instances.
#[async_trait]
pub trait ModelGate: Send + Sync {
    /// Returns whether `(name, version)` is approved for use.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the underlying lookup fails.
    async fn is_approved(
        &self,
        name: &ModelName,
        version: &ModelVersion,
    ) -> Result<bool, RepositoryError>;
}

/// The default model gate: every model is approved, so the gate never
/// vetoes. Installed when no [`ModelRegistry`] is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopModelGate;

#[async_trait]
impl ModelGate for NoopModelGate {
    async fn is_approved(
        &self,
        _name: &ModelName,
        _version: &ModelVersion,
    ) -> Result<bool, RepositoryError> {
        Ok(true)
    }
}

// ============================================================================
// SECTION: Model Registry
// ============================================================================

/// Approval state of registered models, with audited mutations.
pub struct ModelRegistry {
    /// Backing repository.
    repository: Arc<dyn ModelRepository>,
    /// Audit sink for registry mutations.
    audit_logger: Arc<dyn AuditLogger>,
}

impl ModelRegistry {
    /// Builds a registry over the given repository and audit sink.
    pub fn new(
        repository: impl ModelRepository + 'static,
        audit_logger: impl AuditLogger + 'static,
    ) -> Self {
        Self {
            repository: Arc::new(repository),
            audit_logger: Arc::new(audit_logger),
        }
    }

    /// Registers a model in `REGISTERED` state, or confirms an identical
    /// prior registration.
    ///
    /// # Errors
    ///
    /// Returns [`ModelRegistryError::Conflict`] if `(model_name, version)`
    /// already exists with a different checksum, or
    /// [`ModelRegistryError::Repository`] on a repository failure.
    pub async fn register_model(
        &self,
        model_name: ModelName,
        version: ModelVersion,
        checksum: String,
        registered_at: Timestamp,
        correlation_id: CorrelationId,
        tenant_id: TenantId,
    ) -> Result<ModelRecord, ModelRegistryError> {
        if let Some(existing) = self.repository.get(&model_name, &version).await? {
            if existing.checksum == checksum {
                return Ok(existing);
            }
            return Err(ModelConflictError {
                name: model_name.as_str().to_string(),
                version: version.as_str().to_string(),
            }
            .into());
        }

        let record = ModelRecord {
            model_name: model_name.clone(),
            version: version.clone(),
            checksum,
            status: ModelStatus::Registered,
            registered_at,
            approved_at: None,
            tenant_id: tenant_id.clone(),
            correlation_id: correlation_id.clone(),
        };
        self.repository.save(record.clone()).await?;
        self.audit_logger
            .log_action(AuditAction {
                action: "MODEL_REGISTERED".to_string(),
                tenant_id,
                correlation_id,
                resource_type: "model".to_string(),
                resource_id: model_name.as_str().to_string(),
                reason: None,
                extra: None,
            })
            .await
            .ok();
        Ok(record)
    }

    /// Transitions a model from `REGISTERED` to `APPROVED`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelRegistryError::InvalidTransition`] if no record exists
    /// or the record is not in `REGISTERED` state, or
    /// [`ModelRegistryError::Repository`] on a repository failure.
    pub async fn approve(
        &self,
        model_name: &ModelName,
        version: &ModelVersion,
        approved_at: Timestamp,
        correlation_id: CorrelationId,
    ) -> Result<ModelRecord, ModelRegistryError> {
        let Some(mut record) = self.repository.get(model_name, version).await? else {
            return Err(InvalidModelStateTransition {
                name: model_name.as_str().to_string(),
                version: version.as_str().to_string(),
                from: "absent".to_string(),
                to: ModelStatus::Approved.as_str().to_string(),
            }
            .into());
        };
        if record.status != ModelStatus::Registered {
            return Err(InvalidModelStateTransition {
                name: model_name.as_str().to_string(),
                version: version.as_str().to_string(),
                from: record.status.as_str().to_string(),
                to: ModelStatus::Approved.as_str().to_string(),
            }
            .into());
        }
        record.status = ModelStatus::Approved;
        record.approved_at = Some(approved_at);
        self.repository.save(record.clone()).await?;
        self.audit_logger
            .log_action(AuditAction {
                action: "MODEL_APPROVED".to_string(),
                tenant_id: record.tenant_id.clone(),
                correlation_id,
                resource_type: "model".to_string(),
                resource_id: model_name.as_str().to_string(),
                reason: None,
                extra: None,
            })
            .await
            .ok();
        Ok(record)
    }

    /// Looks up a model record by exact `(name, version)`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the lookup fails.
    pub async fn get(
        &self,
        name: &ModelName,
        version: &ModelVersion,
    ) -> Result<Option<ModelRecord>, RepositoryError> {
        self.repository.get(name, version).await
    }

    /// Looks up the most recently registered record for a model name.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the lookup fails.
    pub async fn get_latest(&self, name: &ModelName) -> Result<Option<ModelRecord>, RepositoryError> {
        self.repository.get_latest(name).await
    }

    /// Returns whether `(name, version)` is registered and `APPROVED`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the lookup fails.
    pub async fn is_approved(
        &self,
        name: &ModelName,
        version: &ModelVersion,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .repository
            .get(name, version)
            .await?
            .is_some_and(|record| record.status == ModelStatus::Approved))
    }
}

#[async_trait]
impl ModelGate for ModelRegistry {
    async fn is_approved(
        &self,
        name: &ModelName,
        version: &ModelVersion,
    ) -> Result<bool, RepositoryError> {
        Self::is_approved(self, name, version).await
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
    use crate::interfaces::InMemoryAuditLogger;

    fn registry() -> ModelRegistry {
        ModelRegistry::new(InMemoryModelRepository::new(), InMemoryAuditLogger::new())
    }

    #[tokio::test]
    async fn register_then_approve_flips_status_and_audits_both_steps() {
        let registry = registry();
        let name = ModelName::new("risk-model");
        let version = ModelVersion::new("1.0");
        let record = registry
            .register_model(
                name.clone(),
                version.clone(),
                "checksum-1".to_string(),
                Timestamp::Logical(1),
                CorrelationId::new("c1"),
                TenantId::new("t1"),
            )
            .await
            .expect("registers cleanly");
        assert_eq!(record.status, ModelStatus::Registered);
        assert!(!registry.is_approved(&name, &version).await.expect("ok"));

        registry
            .approve(&name, &version, Timestamp::Logical(2), CorrelationId::new("c2"))
            .await
            .expect("approves cleanly");
        assert!(registry.is_approved(&name, &version).await.expect("ok"));
    }

    #[tokio::test]
    async fn registering_the_same_checksum_twice_is_idempotent() {
        let registry = registry();
        let name = ModelName::new("m1");
        let version = ModelVersion::new("1.0");
        let first = registry
            .register_model(
                name.clone(),
                version.clone(),
                "checksum-1".to_string(),
                Timestamp::Logical(1),
                CorrelationId::new("c1"),
                TenantId::new("t1"),
            )
            .await
            .expect("first registration");
        let second = registry
            .register_model(
                name,
                version,
                "checksum-1".to_string(),
                Timestamp::Logical(2),
                CorrelationId::new("c2"),
                TenantId::new("t1"),
            )
            .await
            .expect("second registration returns the existing record");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn registering_a_different_checksum_conflicts() {
        let registry = registry();
        let name = ModelName::new("m1");
        let version = ModelVersion::new("1.0");
        registry
            .register_model(
                name.clone(),
                version.clone(),
                "checksum-1".to_string(),
                Timestamp::Logical(1),
                CorrelationId::new("c1"),
                TenantId::new("t1"),
            )
            .await
            .expect("first registration");
        let err = registry
            .register_model(
                name,
                version,
                "checksum-2".to_string(),
                Timestamp::Logical(2),
                CorrelationId::new("c2"),
                TenantId::new("t1"),
            )
            .await
            .expect_err("checksum mismatch conflicts");
        assert!(matches!(err, ModelRegistryError::Conflict(_)));
    }

    #[tokio::test]
    async fn approving_an_unregistered_model_fails() {
        let registry = registry();
        let err = registry
            .approve(
                &ModelName::new("missing"),
                &ModelVersion::new("1.0"),
                Timestamp::Logical(1),
                CorrelationId::new("c1"),
            )
            .await
            .expect_err("no record to approve");
        assert!(matches!(err, ModelRegistryError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn approving_twice_fails_on_the_second_call() {
        let registry = registry();
        let name = ModelName::new("m1");
        let version = ModelVersion::new("1.0");
        registry
            .register_model(
                name.clone(),
                version.clone(),
                "checksum-1".to_string(),
                Timestamp::Logical(1),
                CorrelationId::new("c1"),
                TenantId::new("t1"),
            )
            .await
            .expect("registers");
        registry
            .approve(&name, &version, Timestamp::Logical(2), CorrelationId::new("c2"))
            .await
            .expect("first approval");
        let err = registry
            .approve(&name, &version, Timestamp::Logical(3), CorrelationId::new("c3"))
            .await
            .expect_err("already approved");
        assert!(matches!(err, ModelRegistryError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn noop_model_gate_always_approves() {
        let gate = NoopModelGate;
        assert!(gate
            .is_approved(&ModelName::new("anything"), &ModelVersion::new("anything"))
            .await
            .expect("never vetoes"));
    }

    #[tokio::test]
    async fn get_latest_tracks_the_most_recently_saved_record() {
        let registry = registry();
        let name = ModelName::new("m1");
        registry
            .register_model(
                name.clone(),
                ModelVersion::new("1.0"),
                "checksum-1".to_string(),
                Timestamp::Logical(1),
                CorrelationId::new("c1"),
                TenantId::new("t1"),
            )
            .await
            .expect("registers v1");
        registry
            .register_model(
                name.clone(),
                ModelVersion::new("2.0"),
                "checksum-2".to_string(),
                Timestamp::Logical(2),
                CorrelationId::new("c2"),
                TenantId::new("t1"),
            )
            .await
            .expect("registers v2");
        let latest = registry
            .get_latest(&name)
            .await
            .expect("readable")
            .expect("present");
        assert_eq!(latest.version, ModelVersion::new("2.0"));
    }
}
