// src/domain/event.rs
// ============================================================================
// Module: Event Entities
// Description: Event status lifecycle and the Risk/Compliance event entities.
// Purpose: Canonical, serializable event entities with status-transition invariants.
// Dependencies: serde, serde_json, crate::domain::{errors, identifiers, time}
// ============================================================================

//! ## Overview
//! [`EventStatus`] and its transition matrix are the single source of truth
//! for event lifecycle rules; [`BaseEvent::transition_to`] and
//! [`crate::validators::validate_status_transition`] both consult
//! [`is_allowed_transition`] so the two can never drift apart.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::domain::errors::DomainError;
use crate::domain::identifiers::EventId;
use crate::domain::identifiers::TenantId;
use crate::domain::time::Timestamp;

// ============================================================================
// SECTION: Event Status
// ============================================================================

/// Lifecycle status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Event has been received but not yet validated.
    Received,
    /// Event has been created directly (bypassing intake validation).
    Created,
    /// Event passed validation.
    Validated,
    /// Event is actively being processed by a workflow.
    Processing,
    /// Workflow approved the event. Terminal.
    Approved,
    /// Workflow rejected the event. Terminal.
    Rejected,
    /// Workflow failed to process the event. Terminal.
    Failed,
}

impl EventStatus {
    /// Returns the canonical lowercase name used in error messages and audit entries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Created => "created",
            Self::Validated => "validated",
            Self::Processing => "processing",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }

    /// Returns true if no outgoing transition is ever allowed from this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Failed)
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical status-transition matrix. The single source of
/// truth for which transitions are allowed; both [`BaseEvent::transition_to`]
/// and [`crate::validators::validate_status_transition`] call this function.
#[must_use]
pub const fn is_allowed_transition(from: EventStatus, to: EventStatus) -> bool {
    matches!(
        (from, to),
        (EventStatus::Received, EventStatus::Validated)
            | (EventStatus::Received, EventStatus::Rejected)
            | (EventStatus::Created, EventStatus::Validated)
            | (EventStatus::Created, EventStatus::Rejected)
            | (EventStatus::Validated, EventStatus::Processing)
            | (EventStatus::Processing, EventStatus::Approved)
            | (EventStatus::Processing, EventStatus::Rejected)
            | (EventStatus::Processing, EventStatus::Failed)
    )
}

// ============================================================================
// SECTION: Base Event
// ============================================================================

/// Common event fields shared by every event kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseEvent {
    /// Event identifier; the idempotency key for workflow execution.
    pub event_id: EventId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Current lifecycle status.
    pub status: EventStatus,
    /// Creation timestamp.
    pub created_at: Timestamp,
    /// Optional free-form, JSON-serializable metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl BaseEvent {
    /// Attempts to move this event to a new status.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidStatusTransition`] when `(self.status,
    /// to)` is not in the transition matrix; `self.status` is left unchanged.
    pub fn transition_to(&mut self, to: EventStatus) -> Result<(), DomainError> {
        if is_allowed_transition(self.status, to) {
            self.status = to;
            Ok(())
        } else {
            Err(DomainError::InvalidStatusTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
            })
        }
    }
}

// ============================================================================
// SECTION: Risk Event
// ============================================================================

/// A risk-governance event: `BaseEvent` plus a risk score and category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEvent {
    /// Common event fields.
    #[serde(flatten)]
    pub base: BaseEvent,
    /// Risk score in `[0, 100]`, if scored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    /// Risk category label (e.g. `fraud`), if classified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl RiskEvent {
    /// Attempts to move this event to a new status; delegates to [`BaseEvent::transition_to`].
    ///
    /// # Errors
    ///
    /// See [`BaseEvent::transition_to`].
    pub fn transition_to(&mut self, to: EventStatus) -> Result<(), DomainError> {
        self.base.transition_to(to)
    }
}

// ============================================================================
// SECTION: Compliance Event
// ============================================================================

/// A compliance-governance event: `BaseEvent` plus a regulation reference and type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceEvent {
    /// Common event fields.
    #[serde(flatten)]
    pub base: BaseEvent,
    /// Regulation reference (e.g. `REG-123`), if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulation_ref: Option<String>,
    /// Compliance type label (e.g. `kyc`), if classified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_type: Option<String>,
}

impl ComplianceEvent {
    /// Attempts to move this event to a new status; delegates to [`BaseEvent::transition_to`].
    ///
    /// # Errors
    ///
    /// See [`BaseEvent::transition_to`].
    pub fn transition_to(&mut self, to: EventStatus) -> Result<(), DomainError> {
        self.base.transition_to(to)
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

    const ALL_STATUSES: [EventStatus; 7] = [
        EventStatus::Received,
        EventStatus::Created,
        EventStatus::Validated,
        EventStatus::Processing,
        EventStatus::Approved,
        EventStatus::Rejected,
        EventStatus::Failed,
    ];

    const ALLOWED: [(EventStatus, EventStatus); 8] = [
        (EventStatus::Received, EventStatus::Validated),
        (EventStatus::Received, EventStatus::Rejected),
        (EventStatus::Created, EventStatus::Validated),
        (EventStatus::Created, EventStatus::Rejected),
        (EventStatus::Validated, EventStatus::Processing),
        (EventStatus::Processing, EventStatus::Approved),
        (EventStatus::Processing, EventStatus::Rejected),
        (EventStatus::Processing, EventStatus::Failed),
    ];

    #[test]
    fn transition_matrix_allows_exactly_the_documented_pairs() {
        for from in ALL_STATUSES {
            for to in ALL_STATUSES {
                let expected = ALLOWED.contains(&(from, to));
                assert_eq!(
                    is_allowed_transition(from, to),
                    expected,
                    "transition {from:?} -> {to:?}"
                );
            }
        }
    }

    #[test]
    fn terminal_statuses_have_no_outgoing_transition() {
        for from in [EventStatus::Approved, EventStatus::Rejected, EventStatus::Failed] {
            assert!(from.is_terminal());
            for to in ALL_STATUSES {
                assert!(!is_allowed_transition(from, to), "{from:?} -> {to:?}");
            }
        }
    }

    fn base(status: EventStatus) -> BaseEvent {
        BaseEvent {
            event_id: EventId::new("e1"),
            tenant_id: TenantId::new("t1"),
            status,
            created_at: Timestamp::Logical(0),
            metadata: None,
        }
    }

    #[test]
    fn transition_to_allowed_target_updates_status() {
        let mut event = base(EventStatus::Received);
        event.transition_to(EventStatus::Validated).expect("allowed");
        assert_eq!(event.status, EventStatus::Validated);
    }

    #[test]
    fn transition_to_disallowed_target_leaves_status_unchanged() {
        let mut event = base(EventStatus::Received);
        let err = event
            .transition_to(EventStatus::Approved)
            .expect_err("Received -> Approved is not in the matrix");
        assert_eq!(
            err,
            DomainError::InvalidStatusTransition {
                from: "received".to_string(),
                to: "approved".to_string(),
            }
        );
        assert_eq!(event.status, EventStatus::Received);
    }

    #[test]
    fn risk_event_transition_delegates_to_base() {
        let mut risk = RiskEvent {
            base: base(EventStatus::Validated),
            risk_score: None,
            category: None,
        };
        risk.transition_to(EventStatus::Processing).expect("allowed");
        assert_eq!(risk.base.status, EventStatus::Processing);
    }

    #[test]
    fn compliance_event_transition_delegates_to_base() {
        let mut compliance = ComplianceEvent {
            base: base(EventStatus::Processing),
            regulation_ref: None,
            compliance_type: None,
        };
        compliance
            .transition_to(EventStatus::Rejected)
            .expect("allowed");
        assert_eq!(compliance.base.status, EventStatus::Rejected);
    }
}

// ============================================================================
// SECTION: Create Requests
// ============================================================================

/// Request to create a new [`RiskEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskEventCreateRequest {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Risk score in `[0, 100]`, if known at creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    /// Risk category label, if known at creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Intake schema version; must be non-empty after trimming.
    pub version: String,
}

/// Request to create a new [`ComplianceEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceEventCreateRequest {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Regulation reference, if known at creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulation_ref: Option<String>,
    /// Intake schema version; must be non-empty after trimming.
    pub version: String,
}
