// src/validators/mod.rs
// ============================================================================
// Module: Domain Validators
// Description: Pure predicates over create-requests and materialized entities.
// Purpose: Single place where business-rule validation lives; no I/O.
// Dependencies: crate::domain
// ============================================================================

//! ## Overview
//! Every function here is pure and deterministic: given the same input it
//! either returns `Ok(())` or the same [`DomainError`] every time. Stages and
//! registries call these rather than re-implementing checks inline, so each
//! validation rule has exactly one definition.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value;

use crate::domain::ComplianceEvent;
use crate::domain::ComplianceEventCreateRequest;
use crate::domain::DomainError;
use crate::domain::EventStatus;
use crate::domain::RiskEvent;
use crate::domain::RiskEventCreateRequest;
use crate::domain::TenantId;
use crate::domain::is_allowed_transition;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Minimum accepted `risk_score`.
pub const RISK_SCORE_MIN: f64 = 0.0;
/// Maximum accepted `risk_score`.
pub const RISK_SCORE_MAX: f64 = 100.0;

// ============================================================================
// SECTION: Field Validators
// ============================================================================

/// Validates that a tenant identifier is non-empty after trimming whitespace.
///
/// # Errors
///
/// Returns [`DomainError::InvalidTenant`] if `tenant_id` trimmed is empty.
pub fn validate_tenant_id(tenant_id: &TenantId) -> Result<(), DomainError> {
    if tenant_id.as_str().trim().is_empty() {
        Err(DomainError::InvalidTenant)
    } else {
        Ok(())
    }
}

/// Validates that a risk score, if present, lies in `[0, 100]`.
///
/// # Errors
///
/// Returns [`DomainError::RiskThresholdViolation`] if `risk_score` is present
/// and outside `[RISK_SCORE_MIN, RISK_SCORE_MAX]`.
pub fn validate_risk_score(risk_score: Option<f64>) -> Result<(), DomainError> {
    match risk_score {
        None => Ok(()),
        Some(score) if (RISK_SCORE_MIN..=RISK_SCORE_MAX).contains(&score) => Ok(()),
        Some(actual) => Err(DomainError::RiskThresholdViolation {
            min: RISK_SCORE_MIN,
            max: RISK_SCORE_MAX,
            actual,
        }),
    }
}

/// Validates that metadata, if present, is representable as JSON.
///
/// In this crate metadata is already typed as a JSON object, so this check
/// only needs to walk for values that cannot round-trip as JSON (non-finite
/// floats); it exists so metadata assembled by hand, rather than parsed,
/// cannot smuggle an invalid number through.
///
/// # Errors
///
/// Returns [`DomainError::InvalidMetadata`] if any contained number is not finite.
pub fn validate_metadata_json_serializable(
    metadata: Option<&Map<String, Value>>,
) -> Result<(), DomainError> {
    let Some(metadata) = metadata else {
        return Ok(());
    };
    for value in metadata.values() {
        check_json_serializable(value)?;
    }
    Ok(())
}

/// Recursively checks a JSON value for non-finite numbers.
fn check_json_serializable(value: &Value) -> Result<(), DomainError> {
    match value {
        Value::Number(number) => {
            if let Some(float) = number.as_f64() {
                if !float.is_finite() {
                    return Err(DomainError::InvalidMetadata(format!(
                        "metadata must be JSON-serializable: non-finite number {float}"
                    )));
                }
            }
            Ok(())
        }
        Value::Array(items) => {
            for item in items {
                check_json_serializable(item)?;
            }
            Ok(())
        }
        Value::Object(fields) => {
            for field in fields.values() {
                check_json_serializable(field)?;
            }
            Ok(())
        }
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
    }
}

/// Validates a status transition against the canonical transition matrix.
///
/// # Errors
///
/// Returns [`DomainError::InvalidStatusTransition`] if `(from, to)` is not in
/// the transition matrix. The error message contains both status names.
pub fn validate_status_transition(from: EventStatus, to: EventStatus) -> Result<(), DomainError> {
    if is_allowed_transition(from, to) {
        Ok(())
    } else {
        Err(DomainError::InvalidStatusTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        })
    }
}

/// Validates that an intake schema version is non-empty after trimming.
///
/// # Errors
///
/// Returns [`DomainError::Validation`] whose message contains the substring
/// `version` when `version` trimmed is empty.
fn validate_version(version: &str) -> Result<(), DomainError> {
    if version.trim().is_empty() {
        Err(DomainError::Validation(
            "version must not be empty".to_string(),
        ))
    } else {
        Ok(())
    }
}

// ============================================================================
// SECTION: Create-Request Validators
// ============================================================================

/// Validates a [`RiskEventCreateRequest`]: tenant, risk score, and version.
///
/// # Errors
///
/// Returns the first failing check's [`DomainError`], in the order: tenant,
/// risk score, version.
pub fn validate_risk_event_create_request(
    request: &RiskEventCreateRequest,
) -> Result<(), DomainError> {
    validate_tenant_id(&request.tenant_id)?;
    validate_risk_score(request.risk_score)?;
    validate_version(&request.version)?;
    Ok(())
}

/// Validates a [`ComplianceEventCreateRequest`]: tenant and version.
///
/// # Errors
///
/// Returns the first failing check's [`DomainError`], in the order: tenant,
/// version.
pub fn validate_compliance_event_create_request(
    request: &ComplianceEventCreateRequest,
) -> Result<(), DomainError> {
    validate_tenant_id(&request.tenant_id)?;
    validate_version(&request.version)?;
    Ok(())
}

// ============================================================================
// SECTION: Entity Validators
// ============================================================================

/// Validates a materialized [`RiskEvent`]: tenant, risk score, and metadata.
///
/// # Errors
///
/// Returns the first failing check's [`DomainError`], in the order: tenant,
/// risk score, metadata.
pub fn validate_risk_event(event: &RiskEvent) -> Result<(), DomainError> {
    validate_tenant_id(&event.base.tenant_id)?;
    validate_risk_score(event.risk_score)?;
    validate_metadata_json_serializable(event.base.metadata.as_ref())?;
    Ok(())
}

/// Validates a materialized [`ComplianceEvent`]: tenant and metadata.
///
/// # Errors
///
/// Returns the first failing check's [`DomainError`], in the order: tenant,
/// metadata.
pub fn validate_compliance_event(event: &ComplianceEvent) -> Result<(), DomainError> {
    validate_tenant_id(&event.base.tenant_id)?;
    validate_metadata_json_serializable(event.base.metadata.as_ref())?;
    Ok(())
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
    use crate::domain::BaseEvent;
    use crate::domain::EventId;
    use crate::domain::Timestamp;

    #[test]
    fn tenant_id_rejects_empty_and_whitespace_only() {
        assert!(validate_tenant_id(&TenantId::new("")).is_err());
        assert!(validate_tenant_id(&TenantId::new("   ")).is_err());
        assert!(validate_tenant_id(&TenantId::new("t1")).is_ok());
    }

    #[test]
    fn risk_score_accepts_absent_and_boundary_values() {
        assert!(validate_risk_score(None).is_ok());
        assert!(validate_risk_score(Some(RISK_SCORE_MIN)).is_ok());
        assert!(validate_risk_score(Some(RISK_SCORE_MAX)).is_ok());
    }

    #[test]
    fn risk_score_rejects_values_outside_the_range() {
        let err = validate_risk_score(Some(RISK_SCORE_MAX + 0.01)).expect_err("out of range");
        assert_eq!(
            err,
            DomainError::RiskThresholdViolation {
                min: RISK_SCORE_MIN,
                max: RISK_SCORE_MAX,
                actual: RISK_SCORE_MAX + 0.01,
            }
        );
        assert!(validate_risk_score(Some(RISK_SCORE_MIN - 0.01)).is_err());
    }

    #[test]
    fn metadata_accepts_absent_and_finite_values() {
        assert!(validate_metadata_json_serializable(None).is_ok());
        let mut map = Map::new();
        map.insert("k".to_string(), Value::from(1.5));
        assert!(validate_metadata_json_serializable(Some(&map)).is_ok());
    }

    #[test]
    fn metadata_rejects_non_finite_numbers_nested_in_arrays_and_objects() {
        let mut inner = Map::new();
        inner.insert("score".to_string(), Value::from(f64::NAN));
        let mut map = Map::new();
        map.insert(
            "nested".to_string(),
            Value::Array(vec![Value::Object(inner)]),
        );
        assert!(validate_metadata_json_serializable(Some(&map)).is_err());
    }

    #[test]
    fn status_transition_delegates_to_the_canonical_matrix() {
        assert!(validate_status_transition(EventStatus::Received, EventStatus::Validated).is_ok());
        assert!(validate_status_transition(EventStatus::Received, EventStatus::Approved).is_err());
    }

    fn risk_request() -> RiskEventCreateRequest {
        RiskEventCreateRequest {
            tenant_id: TenantId::new("t1"),
            risk_score: Some(10.0),
            category: None,
            version: "1".to_string(),
        }
    }

    #[test]
    fn risk_create_request_checks_tenant_then_score_then_version() {
        assert!(validate_risk_event_create_request(&risk_request()).is_ok());

        let mut bad_tenant = risk_request();
        bad_tenant.tenant_id = TenantId::new("");
        assert_eq!(
            validate_risk_event_create_request(&bad_tenant),
            Err(DomainError::InvalidTenant)
        );

        let mut bad_score = risk_request();
        bad_score.risk_score = Some(-1.0);
        assert!(matches!(
            validate_risk_event_create_request(&bad_score),
            Err(DomainError::RiskThresholdViolation { .. })
        ));

        let mut bad_version = risk_request();
        bad_version.version = "  ".to_string();
        assert!(matches!(
            validate_risk_event_create_request(&bad_version),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn compliance_create_request_checks_tenant_then_version() {
        let request = ComplianceEventCreateRequest {
            tenant_id: TenantId::new("t1"),
            regulation_ref: None,
            version: "1".to_string(),
        };
        assert!(validate_compliance_event_create_request(&request).is_ok());

        let mut bad_version = request;
        bad_version.version = String::new();
        assert!(validate_compliance_event_create_request(&bad_version).is_err());
    }

    #[test]
    fn entity_validators_walk_tenant_score_and_metadata() {
        let risk_event = RiskEvent {
            base: BaseEvent {
                event_id: EventId::new("e1"),
                tenant_id: TenantId::new("t1"),
                status: EventStatus::Received,
                created_at: Timestamp::Logical(0),
                metadata: None,
            },
            risk_score: Some(42.0),
            category: None,
        };
        assert!(validate_risk_event(&risk_event).is_ok());

        let mut bad = risk_event.clone();
        bad.risk_score = Some(200.0);
        assert!(validate_risk_event(&bad).is_err());

        let compliance_event = ComplianceEvent {
            base: BaseEvent {
                event_id: EventId::new("e2"),
                tenant_id: TenantId::new("t1"),
                status: EventStatus::Received,
                created_at: Timestamp::Logical(0),
                metadata: None,
            },
            regulation_ref: None,
            compliance_type: None,
        };
        assert!(validate_compliance_event(&compliance_event).is_ok());
    }
}
