// src/domain/time.rs
// ============================================================================
// Module: Event Gate Timestamps
// Description: Wall-clock and logical timestamps used across events and audit entries.
// Purpose: Let tests and replay drive deterministic clocks without faking `SystemTime`.
// Dependencies: time, serde
// ============================================================================

//! ## Overview
//! Every timestamp that crosses a trait boundary (event creation, registry
//! approval, audit entries) is a [`Timestamp`] rather than a raw
//! `OffsetDateTime`. Production callers use [`Timestamp::now`]; tests and
//! replay harnesses use [`Timestamp::Logical`] so ordering assertions do not
//! depend on wall-clock jitter.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// A point in time, either a real wall-clock reading or a logical sequence
/// number for deterministic tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Real wall-clock timestamp, serialized as RFC 3339.
    Wall(#[serde(with = "time::serde::rfc3339")] OffsetDateTime),
    /// Logical sequence number for deterministic tests and replay.
    Logical(u64),
}

impl Timestamp {
    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self::Wall(OffsetDateTime::now_utc())
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    /// Orders within a variant by value; `Logical` timestamps sort before all
    /// `Wall` timestamps, since they only ever compare against each other
    /// within a single deterministic test or replay run.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Logical(a), Self::Logical(b)) => a.cmp(b),
            (Self::Wall(a), Self::Wall(b)) => a.cmp(b),
            (Self::Logical(_), Self::Wall(_)) => Ordering::Less,
            (Self::Wall(_), Self::Logical(_)) => Ordering::Greater,
        }
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

    #[test]
    fn logical_timestamps_order_by_sequence_number() {
        assert!(Timestamp::Logical(1) < Timestamp::Logical(2));
        assert_eq!(Timestamp::Logical(5), Timestamp::Logical(5));
    }

    #[test]
    fn logical_timestamps_always_sort_before_wall_timestamps() {
        let logical = Timestamp::Logical(u64::MAX);
        let wall = Timestamp::now();
        assert!(logical < wall);
    }

    #[test]
    fn now_produces_a_wall_variant() {
        assert!(matches!(Timestamp::now(), Timestamp::Wall(_)));
    }

    #[test]
    fn wall_timestamps_round_trip_through_json_as_rfc3339() {
        let ts = Timestamp::now();
        let json = serde_json::to_string(&ts).expect("serializable");
        let back: Timestamp = serde_json::from_str(&json).expect("deserializable");
        assert_eq!(ts, back);
    }
}
