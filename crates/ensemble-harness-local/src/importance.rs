// crates/ensemble-harness-local/src/importance.rs
// ============================================================================
// Module: Field Importance
// Description: Ranked per-field importance for ensembles.
// Purpose: Aggregate constituent importance and render the comparison form.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Ensemble importance is either published directly on the ensemble as a
//! `{field_id: value}` map, or averaged from per-model `[[field_id, value]]`
//! pairs. Rankings are sorted by descending value; ties keep first-seen
//! order so repeated runs render identically.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Field Importance
// ============================================================================

/// Ranked field importance with field names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldImportance {
    /// `(field_id, value)` pairs sorted by descending value.
    pub ranking: Vec<(String, f64)>,
    /// Field names keyed by field id.
    pub names: BTreeMap<String, String>,
}

impl FieldImportance {
    /// Renders the ranking as `[[field_id, value], ...]`.
    #[must_use]
    pub fn ranking_json(&self) -> Value {
        Value::Array(
            self.ranking
                .iter()
                .map(|(id, value)| {
                    Value::Array(vec![Value::String(id.clone()), finite_number(*value)])
                })
                .collect(),
        )
    }

    /// Returns the name of a field when known.
    #[must_use]
    pub fn name(&self, field_id: &str) -> Option<&str> {
        self.names.get(field_id).map(String::as_str)
    }
}

/// Converts a float into a JSON number, using null for non-finite values.
fn finite_number(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}

// ============================================================================
// SECTION: Aggregation
// ============================================================================

/// Ranks a published `{field_id: value}` importance map.
#[must_use]
pub fn rank_map(importance: &Map<String, Value>) -> Vec<(String, f64)> {
    let mut ranking: Vec<(String, f64)> = importance
        .iter()
        .filter_map(|(id, value)| value.as_f64().map(|score| (id.clone(), score)))
        .collect();
    sort_descending(&mut ranking);
    ranking
}

/// Averages per-model importance pairs across `sources` and ranks the result.
///
/// Each field's value is summed across sources and divided by the number of
/// sources; a field absent from a source contributes zero for it.
#[must_use]
pub fn average_pairs(sources: &[&[(String, f64)]]) -> Vec<(String, f64)> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for pairs in sources {
        for (id, value) in *pairs {
            match totals.get_mut(id) {
                Some(total) => *total += value,
                None => {
                    order.push(id.clone());
                    totals.insert(id.clone(), *value);
                }
            }
        }
    }
    let count = u32::try_from(sources.len()).unwrap_or(u32::MAX).max(1);
    let divisor = f64::from(count);
    let mut ranking: Vec<(String, f64)> = order
        .into_iter()
        .map(|id| {
            let total = totals.get(&id).copied().unwrap_or_default();
            (id, total / divisor)
        })
        .collect();
    sort_descending(&mut ranking);
    ranking
}

/// Stable sort by descending value.
fn sort_descending(ranking: &mut [(String, f64)]) {
    ranking.sort_by(|left, right| right.1.total_cmp(&left.1));
}

// ============================================================================
// SECTION: Tests
// ============================================================================
