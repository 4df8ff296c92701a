// src/interfaces/errors.rs
// ============================================================================
// Module: Interface Errors
// Description: Infrastructure-level errors raised by audit/store backends.
// Purpose: Keep infra failures classifiable but distinct from domain errors.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! These are the only error kinds an `AuditLogger` or `StateStore`
//! implementation may raise. They are never mapped to `VALIDATION_ERROR` or
//! `WORKFLOW_ERROR` by the failure classifier; infra errors are their own
//! named kind here so logs stay legible.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Audit Error
// ============================================================================

/// Errors raised by an [`crate::interfaces::AuditLogger`] implementation.
///
/// # Invariants
/// - An audit sink failure must never mask the caller's real outcome; it is
///   the infra caller's responsibility not to let this error silently
///   swallow a stage result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuditError {
    /// The audit sink could not record the entry.
    #[error("audit sink error: {0}")]
    Sink(String),
}

// ============================================================================
// SECTION: Store Error
// ============================================================================

/// Errors raised by a [`crate::interfaces::StateStore`] implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The state store could not complete a read or write.
    #[error("state store error: {0}")]
    Store(String),
}

// ============================================================================
// SECTION: Repository Error
// ============================================================================

/// Errors raised by a model/prompt registry repository implementation.
///
/// # Invariants
/// - Repositories are the only source of persistence nondeterminism; this
///   variant carries that nondeterminism without collapsing it into a
///   domain or governance error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    /// The repository could not complete a read or write.
    #[error("repository error: {0}")]
    Backend(String),
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "assertions in test code may fail fast via unwrap/expect"
)]
mod tests {
    use super::*;

    #[test]
    fn error_display_strings_name_their_kind() {
        assert_eq!(
            AuditError::Sink("disk full".to_string()).to_string(),
            "audit sink error: disk full"
        );
        assert_eq!(
            StoreError::Store("timeout".to_string()).to_string(),
            "state store error: timeout"
        );
        assert_eq!(
            RepositoryError::Backend("connection refused".to_string()).to_string(),
            "repository error: connection refused"
        );
    }
}
