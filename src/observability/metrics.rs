// src/observability/metrics.rs
// ============================================================================
// Module: Metrics Collector
// Description: Flat and labeled counters exported as a point-in-time snapshot.
// Purpose: Give the workflow engine a thread-safe counters surface.
// Dependencies: std::sync
// ============================================================================

//! ## Overview
//! Two counter families: a flat `name -> count` map and a
//! `name -> (label -> count)` map. Labels are serialized as a sorted,
//! pipe-joined `key=value` string (e.g.
//! `category=VALIDATION_ERROR|workflow=risk`) so the exported snapshot stays
//! a plain, comparable string key rather than a nested structure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;

// ============================================================================
// SECTION: Metrics Snapshot
// ============================================================================

/// A consistent, point-in-time snapshot of every counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Flat counters, keyed by name.
    pub counters: BTreeMap<String, u64>,
    /// Labeled counters, keyed by name then by sorted `key=value|...` label string.
    pub counters_by_labels: BTreeMap<String, BTreeMap<String, u64>>,
}

// ============================================================================
// SECTION: Metrics Collector
// ============================================================================

/// Thread-safe counters collector.
///
/// # Invariants
/// - Concurrent increments are atomic (serialized through the internal mutex).
/// - `export_metrics` returns an owned, consistent snapshot; it is never a
///   live view into the collector's internal state.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    /// Flat counters, keyed by name.
    counters: Mutex<BTreeMap<String, u64>>,
    /// Labeled counters, keyed by name then by sorted label string.
    counters_by_labels: Mutex<BTreeMap<String, BTreeMap<String, u64>>>,
}

impl MetricsCollector {
    /// Creates a new metrics collector with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments a flat counter by one.
    ///
    /// A poisoned mutex (only possible if a prior holder panicked mid-update)
    /// recovers its last-written contents rather than propagating the panic;
    /// metrics are best-effort observability, not a correctness boundary.
    pub fn inc(&self, name: &str) {
        let mut guard = self
            .counters
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard.entry(name.to_string()).or_insert(0) += 1;
    }

    /// Increments a labeled counter by one. `labels` is sorted and joined as
    /// `key=value|key=value` before being used as the inner map key.
    pub fn inc_labeled(&self, name: &str, labels: &[(&str, &str)]) {
        let label_key = format_labels(labels);
        let mut guard = self
            .counters_by_labels
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard
            .entry(name.to_string())
            .or_default()
            .entry(label_key)
            .or_insert(0) += 1;
    }

    /// Returns a consistent, point-in-time snapshot of every counter.
    #[must_use]
    pub fn export_metrics(&self) -> MetricsSnapshot {
        let counters = self
            .counters
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        let counters_by_labels = self
            .counters_by_labels
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        MetricsSnapshot {
            counters,
            counters_by_labels,
        }
    }
}

/// Sorts and joins `labels` into the canonical `key=value|key=value` form.
fn format_labels(labels: &[(&str, &str)]) -> String {
    let mut pairs: Vec<String> = labels.iter().map(|(k, v)| format!("{k}={v}")).collect();
    pairs.sort_unstable();
    pairs.join("|")
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
    fn inc_accumulates_per_name() {
        let metrics = MetricsCollector::new();
        metrics.inc("workflow_execution_count");
        metrics.inc("workflow_execution_count");
        metrics.inc("workflow_cache_hit_count");
        let snapshot = metrics.export_metrics();
        assert_eq!(snapshot.counters["workflow_execution_count"], 2);
        assert_eq!(snapshot.counters["workflow_cache_hit_count"], 1);
    }

    #[test]
    fn inc_labeled_sorts_and_pipe_joins_label_keys_regardless_of_input_order() {
        let metrics = MetricsCollector::new();
        metrics.inc_labeled("failure_count", &[("workflow", "risk"), ("category", "VALIDATION_ERROR")]);
        metrics.inc_labeled("failure_count", &[("category", "VALIDATION_ERROR"), ("workflow", "risk")]);
        let snapshot = metrics.export_metrics();
        let by_label = &snapshot.counters_by_labels["failure_count"];
        assert_eq!(by_label.len(), 1);
        assert_eq!(by_label["category=VALIDATION_ERROR|workflow=risk"], 2);
    }

    #[test]
    fn export_metrics_returns_an_independent_snapshot() {
        let metrics = MetricsCollector::new();
        metrics.inc("a");
        let snapshot = metrics.export_metrics();
        metrics.inc("a");
        assert_eq!(snapshot.counters["a"], 1);
        assert_eq!(metrics.export_metrics().counters["a"], 2);
    }
}
