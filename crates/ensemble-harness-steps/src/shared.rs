// crates/ensemble-harness-steps/src/shared.rs
// ============================================================================
// Module: Shared Resources
// Description: Label-keyed memo of finished resources reused across scenarios.
// Purpose: Let expensive remote resources be created once per test run.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Scenarios tagged with the same label reuse one finished ensemble. The
//! memo lives outside [`crate::ScenarioContext`] so resetting a scenario
//! keeps it. Only finished resources are stored.

use std::collections::BTreeMap;

use serde_json::Value;

/// Finished resources keyed by caller label.
#[derive(Debug, Clone, Default)]
pub struct SharedResources {
    /// Finished ensemble bodies by label.
    ensembles: BTreeMap<String, Value>,
}

impl SharedResources {
    /// Creates an empty memo.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ensemble cached under `label`.
    #[must_use]
    pub fn ensemble(&self, label: &str) -> Option<&Value> {
        self.ensembles.get(label)
    }

    /// Returns true when an ensemble is cached under `label`.
    #[must_use]
    pub fn has_ensemble(&self, label: &str) -> bool {
        self.ensembles.contains_key(label)
    }

    /// Caches a finished ensemble body under `label`, replacing any previous one.
    pub fn insert_ensemble(&mut self, label: impl Into<String>, ensemble: Value) {
        self.ensembles.insert(label.into(), ensemble);
    }

    /// Returns the number of cached resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ensembles.len()
    }

    /// Returns true when nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ensembles.is_empty()
    }
}
