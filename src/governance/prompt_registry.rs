// src/governance/prompt_registry.rs
// ============================================================================
// Module: Prompt Registry
// Description: Approval state of governed prompt templates, with audited mutations.
// Purpose: Give the governance gate a single source of truth for "is this prompt approved".
// Dependencies: async-trait, tokio, crate::domain, crate::interfaces
// ============================================================================

//! ## Overview
//! Analogous to [`crate::governance::model_registry::ModelRegistry`], with
//! monotonically increasing integer versions (`PromptRecord.version`) and an
//! additional `get_versions` lookup that returns the ordered version
//! sequence registered for a given name.

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
use crate::domain::PromptName;
use crate::domain::PromptVersion;
use crate::domain::Timestamp;
use crate::governance::errors::InvalidModelStateTransition;
use crate::governance::errors::ModelConflictError;
use crate::interfaces::AuditAction;
use crate::interfaces::AuditLogger;
use crate::interfaces::RepositoryError;

// ============================================================================
// SECTION: Prompt Record
// ============================================================================

/// Approval status of a registered prompt version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStatus {
    /// Registered but not yet approved.
    Registered,
    /// Approved for use by the governance gate.
    Approved,
    /// Deprecated; no longer eligible for the gate.
    Deprecated,
}

impl PromptStatus {
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

/// A registered prompt version and its governance approval state.
///
/// Identity is `(prompt_name, version)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRecord {
    /// Prompt name.
    pub prompt_name: PromptName,
    /// Monotonically increasing prompt version.
    pub version: PromptVersion,
    /// Prompt template body.
    pub template: String,
    /// Approval status.
    pub status: PromptStatus,
    /// When the record was first registered.
    pub registered_at: Timestamp,
    /// When the record was approved, if it has been.
    pub approved_at: Option<Timestamp>,
}

// ============================================================================
// SECTION: Prompt Repository
// ============================================================================

/// Persistence contract for [`PromptRecord`]s.
#[async_trait]
pub trait PromptRepository: Send + Sync {
    /// Persists a prompt record, overwriting any existing record with the
    /// same `(prompt_name, version)`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the write fails.
    async fn save(&self, record: PromptRecord) -> Result<(), RepositoryError>;

    /// Looks up a prompt record by exact `(name, version)`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the read fails.
    async fn get(
        &self,
        name: &PromptName,
        version: PromptVersion,
    ) -> Result<Option<PromptRecord>, RepositoryError>;

    /// Looks up the most recently saved record for a prompt name.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the read fails.
    async fn get_latest(&self, name: &PromptName) -> Result<Option<PromptRecord>, RepositoryError>;

    /// Returns every registered version for a prompt name, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the read fails.
    async fn get_versions(&self, name: &PromptName) -> Result<Vec<PromptVersion>, RepositoryError>;
}

// ============================================================================
// SECTION: In-Memory Prompt Repository
// ============================================================================

/// In-memory prompt repository for tests and examples.
#[derive(Debug, Default)]
pub struct InMemoryPromptRepository {
    /// All records, keyed by `(prompt_name, version)`.
    records: Mutex<BTreeMap<(String, u32), PromptRecord>>,
    /// Most recently saved record per prompt name.
    latest: Mutex<BTreeMap<String, PromptRecord>>,
}

impl InMemoryPromptRepository {
    /// Creates an empty in-memory prompt repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PromptRepository for InMemoryPromptRepository {
    async fn save(&self, record: PromptRecord) -> Result<(), RepositoryError> {
        let key = (record.prompt_name.as_str().to_string(), record.version.as_u32());
        self.records.lock().await.insert(key, record.clone());
        self.latest
            .lock()
            .await
            .insert(record.prompt_name.as_str().to_string(), record);
        Ok(())
    }

    async fn get(
        &self,
        name: &PromptName,
        version: PromptVersion,
    ) -> Result<Option<PromptRecord>, RepositoryError> {
        let key = (name.as_str().to_string(), version.as_u32());
        Ok(self.records.lock().await.get(&key).cloned())
    }

    async fn get_latest(&self, name: &PromptName) -> Result<Option<PromptRecord>, RepositoryError> {
        Ok(self.latest.lock().await.get(name.as_str()).cloned())
    }

    async fn get_versions(&self, name: &PromptName) -> Result<Vec<PromptVersion>, RepositoryError> {
        let records = self.records.lock().await;
        let mut versions: Vec<PromptVersion> = records
            .keys()
            .filter(|(record_name, _)| record_name == name.as_str())
            .map(|(_, version)| PromptVersion::new(*version))
            .collect();
        versions.sort_unstable();
        Ok(versions)
    }
}

// ============================================================================
// SECTION: Prompt Registry Errors
// ============================================================================

/// Errors raised by [`PromptRegistry`] mutation operations.
#[derive(Debug, Error)]
pub enum PromptRegistryError {
    /// Registration conflicted with an existing record of a different template.
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
// SECTION: Prompt Gate
// ============================================================================

/// What the governance gate needs from a prompt collaborator: "is this
/// `(name, version)` approved?" See [`crate::governance::model_registry::ModelGate`]
/// for why this is a trait rather than an `Option<PromptRegistry>` field.
#[async_trait]
pub trait PromptGate: Send + Sync {
    /// Returns whether `(name, version)` is approved for use.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the underlying lookup fails.
    async fn is_approved(
        &self,
        name: &PromptName,
        version: PromptVersion,
    ) -> Result<bool, RepositoryError>;
}

/// The default prompt gate: every prompt is approved, so the gate never vetoes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPromptGate;

#[async_trait]
impl PromptGate for NoopPromptGate {
    async fn is_approved(
        &self,
        _name: &PromptName,
        _version: PromptVersion,
    ) -> Result<bool, RepositoryError> {
        Ok(true)
    }
}

// ============================================================================
// SECTION: Prompt Registry
// ============================================================================

/// Approval state of registered prompts, with audited mutations.
pub struct PromptRegistry {
    /// Backing repository.
    repository: Arc<dyn PromptRepository>,
    /// Audit sink for registry mutations.
    audit_logger: Arc<dyn AuditLogger>,
}

impl PromptRegistry {
    /// Builds a registry over the given repository and audit sink.
    pub fn new(
        repository: impl PromptRepository + 'static,
        audit_logger: impl AuditLogger + 'static,
    ) -> Self {
        Self {
            repository: Arc::new(repository),
            audit_logger: Arc::new(audit_logger),
        }
    }

    /// Registers a prompt in `REGISTERED` state, or confirms an identical
    /// prior registration.
    ///
    /// # Errors
    ///
    /// Returns [`PromptRegistryError::Conflict`] if `(prompt_name, version)`
    /// already exists with a different template, or
    /// [`PromptRegistryError::Repository`] on a repository failure.
    pub async fn register_prompt(
        &self,
        prompt_name: PromptName,
        version: PromptVersion,
        template: String,
        registered_at: Timestamp,
        correlation_id: CorrelationId,
        tenant_id: crate::domain::TenantId,
    ) -> Result<PromptRecord, PromptRegistryError> {
        if let Some(existing) = self.repository.get(&prompt_name, version).await? {
            if existing.template == template {
                return Ok(existing);
            }
            return Err(ModelConflictError {
                name: prompt_name.as_str().to_string(),
                version: version.to_string(),
            }
            .into());
        }

        let record = PromptRecord {
            prompt_name: prompt_name.clone(),
            version,
            template,
            status: PromptStatus::Registered,
            registered_at,
            approved_at: None,
        };
        self.repository.save(record.clone()).await?;
        self.audit_logger
            .log_action(AuditAction {
                action: "PROMPT_REGISTERED".to_string(),
                tenant_id,
                correlation_id,
                resource_type: "prompt".to_string(),
                resource_id: prompt_name.as_str().to_string(),
                reason: None,
                extra: None,
            })
            .await
            .ok();
        Ok(record)
    }

    /// Transitions a prompt from `REGISTERED` to `APPROVED`.
    ///
    /// # Errors
    ///
    /// Returns [`PromptRegistryError::InvalidTransition`] if no record exists
    /// or the record is not in `REGISTERED` state, or
    /// [`PromptRegistryError::Repository`] on a repository failure.
    pub async fn approve(
        &self,
        prompt_name: &PromptName,
        version: PromptVersion,
        approved_at: Timestamp,
        correlation_id: CorrelationId,
        tenant_id: crate::domain::TenantId,
    ) -> Result<PromptRecord, PromptRegistryError> {
        let Some(mut record) = self.repository.get(prompt_name, version).await? else {
            return Err(InvalidModelStateTransition {
                name: prompt_name.as_str().to_string(),
                version: version.to_string(),
                from: "absent".to_string(),
                to: PromptStatus::Approved.as_str().to_string(),
            }
            .into());
        };
        if record.status != PromptStatus::Registered {
            return Err(InvalidModelStateTransition {
                name: prompt_name.as_str().to_string(),
                version: version.to_string(),
                from: record.status.as_str().to_string(),
                to: PromptStatus::Approved.as_str().to_string(),
            }
            .into());
        }
        record.status = PromptStatus::Approved;
        record.approved_at = Some(approved_at);
        self.repository.save(record.clone()).await?;
        self.audit_logger
            .log_action(AuditAction {
                action: "PROMPT_APPROVED".to_string(),
                tenant_id,
                correlation_id,
                resource_type: "prompt".to_string(),
                resource_id: prompt_name.as_str().to_string(),
                reason: None,
                extra: None,
            })
            .await
            .ok();
        Ok(record)
    }

    /// Looks up a prompt record by exact `(name, version)`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the lookup fails.
    pub async fn get(
        &self,
        name: &PromptName,
        version: PromptVersion,
    ) -> Result<Option<PromptRecord>, RepositoryError> {
        self.repository.get(name, version).await
    }

    /// Looks up the most recently registered record for a prompt name.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the lookup fails.
    pub async fn get_latest(&self, name: &PromptName) -> Result<Option<PromptRecord>, RepositoryError> {
        self.repository.get_latest(name).await
    }

    /// Returns every registered version for a prompt name, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the lookup fails.
    pub async fn get_versions(&self, name: &PromptName) -> Result<Vec<PromptVersion>, RepositoryError> {
        self.repository.get_versions(name).await
    }

    /// Returns whether `(name, version)` is registered and `APPROVED`.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] when the lookup fails.
    pub async fn is_approved(
        &self,
        name: &PromptName,
        version: PromptVersion,
    ) -> Result<bool, RepositoryError> {
        Ok(self
            .repository
            .get(name, version)
            .await?
            .is_some_and(|record| record.status == PromptStatus::Approved))
    }
}

#[async_trait]
impl PromptGate for PromptRegistry {
    async fn is_approved(
        &self,
        name: &PromptName,
        version: PromptVersion,
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
    use crate::domain::TenantId;
    use crate::interfaces::InMemoryAuditLogger;

    fn registry() -> PromptRegistry {
        PromptRegistry::new(InMemoryPromptRepository::new(), InMemoryAuditLogger::new())
    }

    #[tokio::test]
    async fn register_then_approve_flips_status() {
        let registry = registry();
        let name = PromptName::new("risk-prompt");
        let version = PromptVersion::new(1);
        registry
            .register_prompt(
                name.clone(),
                version,
                "template-v1".to_string(),
                Timestamp::Logical(1),
                CorrelationId::new("c1"),
                TenantId::new("t1"),
            )
            .await
            .expect("registers cleanly");
        assert!(!registry.is_approved(&name, version).await.expect("ok"));

        registry
            .approve(
                &name,
                version,
                Timestamp::Logical(2),
                CorrelationId::new("c2"),
                TenantId::new("t1"),
            )
            .await
            .expect("approves cleanly");
        assert!(registry.is_approved(&name, version).await.expect("ok"));
    }

    #[tokio::test]
    async fn registering_a_different_template_conflicts() {
        let registry = registry();
        let name = PromptName::new("p1");
        registry
            .register_prompt(
                name.clone(),
                PromptVersion::new(1),
                "template-a".to_string(),
                Timestamp::Logical(1),
                CorrelationId::new("c1"),
                TenantId::new("t1"),
            )
            .await
            .expect("first registration");
        let err = registry
            .register_prompt(
                name,
                PromptVersion::new(1),
                "template-b".to_string(),
                Timestamp::Logical(2),
                CorrelationId::new("c2"),
                TenantId::new("t1"),
            )
            .await
            .expect_err("template mismatch conflicts");
        assert!(matches!(err, PromptRegistryError::Conflict(_)));
    }

    #[tokio::test]
    async fn get_versions_returns_every_registered_version_ascending() {
        let registry = registry();
        let name = PromptName::new("p1");
        for version in [3u32, 1, 2] {
            registry
                .register_prompt(
                    name.clone(),
                    PromptVersion::new(version),
                    format!("template-{version}"),
                    Timestamp::Logical(u64::from(version)),
                    CorrelationId::new("c1"),
                    TenantId::new("t1"),
                )
                .await
                .expect("registers");
        }
        let versions = registry.get_versions(&name).await.expect("readable");
        assert_eq!(
            versions,
            vec![
                PromptVersion::new(1),
                PromptVersion::new(2),
                PromptVersion::new(3)
            ]
        );
    }

    #[tokio::test]
    async fn approving_an_unregistered_prompt_fails() {
        let registry = registry();
        let err = registry
            .approve(
                &PromptName::new("missing"),
                PromptVersion::new(1),
                Timestamp::Logical(1),
                CorrelationId::new("c1"),
                TenantId::new("t1"),
            )
            .await
            .expect_err("no record to approve");
        assert!(matches!(err, PromptRegistryError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn noop_prompt_gate_always_approves() {
        let gate = NoopPromptGate;
        assert!(gate
            .is_approved(&PromptName::new("anything"), PromptVersion::new(1))
            .await
            .expect("never vetoes"));
    }
}
