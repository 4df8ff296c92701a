// src/domain/raw_event.rs
// ============================================================================
// Module: Raw Event Payload
// Description: Typed accessors over the inbound JSON event payload.
// Purpose: Give workflow stages a stable, typed view of an otherwise dynamic event.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Inbound events arrive as an open-ended JSON object (`event_type`, an
//! optional `metadata` object, and whatever else a producer attaches).
//! [`RawEvent`] wraps that payload and exposes the two fields the risk and
//! compliance stages actually read, so stage code never touches
//! `serde_json::Value` directly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Raw Event
// ============================================================================

/// The inbound event payload, as a JSON object.
///
/// # Invariants
/// - Construction never fails; absent or mistyped fields simply read back as
///   `None` from the typed accessors rather than rejecting the payload. Shape
///   validation belongs to the validator layer, not this wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct RawEvent(Value);

impl RawEvent {
    /// Wraps a JSON value as a raw event payload.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns the underlying JSON value.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Returns the `event_type` field, if present and a string.
    #[must_use]
    pub fn event_type(&self) -> Option<&str> {
        self.0.get("event_type").and_then(Value::as_str)
    }

    /// Returns the `metadata.category` field, if present and a string.
    #[must_use]
    pub fn metadata_category(&self) -> Option<&str> {
        self.0.get("metadata")?.get("category")?.as_str()
    }
}

impl From<Value> for RawEvent {
    fn from(value: Value) -> Self {
        Self::new(value)
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
    use serde_json::json;

    #[test]
    fn event_type_reads_back_a_top_level_string_field() {
        let event = RawEvent::new(json!({"event_type": "standard"}));
        assert_eq!(event.event_type(), Some("standard"));
    }

    #[test]
    fn event_type_is_none_when_absent_or_mistyped() {
        assert_eq!(RawEvent::new(json!({})).event_type(), None);
        assert_eq!(
            RawEvent::new(json!({"event_type": 42})).event_type(),
            None
        );
    }

    #[test]
    fn metadata_category_reads_back_a_nested_string_field() {
        let event = RawEvent::new(json!({"metadata": {"category": "sensitive"}}));
        assert_eq!(event.metadata_category(), Some("sensitive"));
    }

    #[test]
    fn metadata_category_is_none_when_metadata_missing() {
        let event = RawEvent::new(json!({"event_type": "standard"}));
        assert_eq!(event.metadata_category(), None);
    }

    #[test]
    fn default_is_an_empty_payload_with_no_event_type() {
        let event = RawEvent::default();
        assert_eq!(event.event_type(), None);
        assert_eq!(event.metadata_category(), None);
    }
}
