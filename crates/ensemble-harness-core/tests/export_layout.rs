// crates/ensemble-harness-core/tests/export_layout.rs
// ============================================================================
// Module: Export Layout Tests
// Description: Default `ResourceApi::export` behavior over an in-memory backend.
// Purpose: Ensure composite exports write constituent models beside the parent.
// ============================================================================

//! ## Overview
//! Drives the provided `export` and `get_finished` methods with a map-backed
//! [`ResourceApi`] and inspects the files written to a temp directory.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;

use ensemble_harness_core::ApiError;
use ensemble_harness_core::ResourceApi;
use ensemble_harness_core::ResourceEnvelope;
use ensemble_harness_core::ResourceId;
use ensemble_harness_core::ResourceStatus;
use ensemble_harness_core::read_json_file;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Test Backend
// ============================================================================

struct MapApi {
    resources: BTreeMap<ResourceId, Value>,
}

impl MapApi {
    fn new(entries: Vec<(&str, Value)>) -> Self {
        Self {
            resources: entries.into_iter().map(|(id, body)| (ResourceId::new(id), body)).collect(),
        }
    }
}

impl ResourceApi for MapApi {
    fn create_ensemble(
        &self,
        _dataset: &ResourceId,
        _args: &Map<String, Value>,
    ) -> Result<ResourceEnvelope, ApiError> {
        Err(ApiError::Invalid("read-only backend".to_string()))
    }

    fn clone_ensemble(
        &self,
        _ensemble: &ResourceId,
        _args: &Map<String, Value>,
    ) -> Result<ResourceEnvelope, ApiError> {
        Err(ApiError::Invalid("read-only backend".to_string()))
    }

    fn get_resource(&self, resource: &ResourceId) -> Result<ResourceEnvelope, ApiError> {
        Ok(self.resources.get(resource).map_or_else(
            || ResourceEnvelope::rejected(404, json!({"status": {"message": "not found"}})),
            |body| ResourceEnvelope::accepted(200, resource.clone(), None, body.clone()),
        ))
    }
}

fn finished(extra: Value) -> Value {
    let mut body = json!({"status": {"code": 5}});
    if let (Some(target), Value::Object(source)) = (body.as_object_mut(), extra) {
        target.extend(source);
    }
    body
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn ensemble_export_writes_models_beside_file() {
    let api = MapApi::new(vec![
        (
            "ensemble/e1",
            finished(json!({"resource": "ensemble/e1", "models": ["model/m1", "model/m2"]})),
        ),
        ("model/m1", finished(json!({"resource": "model/m1"}))),
        ("model/m2", finished(json!({"resource": "model/m2"}))),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("exports").join("ensemble.json");

    let written = api.export(&ResourceId::new("ensemble/e1"), &target).unwrap();

    assert_eq!(written, target);
    let stored = read_json_file(&target).unwrap();
    assert_eq!(stored["resource"], "ensemble/e1");
    assert_eq!(stored["object"]["models"], json!(["model/m1", "model/m2"]));
    let model = read_json_file(&dir.path().join("exports").join("model_m2")).unwrap();
    assert_eq!(model["object"]["resource"], "model/m2");
}

#[test]
fn model_export_writes_single_file() {
    let api = MapApi::new(vec![("model/m1", finished(json!({"resource": "model/m1"})))]);
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("model.json");
    api.export(&ResourceId::new("model/m1"), &target).unwrap();
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn export_rejects_unfinished_resource() {
    let api = MapApi::new(vec![("ensemble/e1", json!({"status": {"code": 3}, "models": []}))]);
    let dir = tempfile::tempdir().unwrap();
    let err = api.export(&ResourceId::new("ensemble/e1"), &dir.path().join("e.json")).unwrap_err();
    match err {
        ApiError::NotFinished {
            status, ..
        } => assert_eq!(status, ResourceStatus::InProgress),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn export_reports_missing_resource() {
    let api = MapApi::new(Vec::new());
    let dir = tempfile::tempdir().unwrap();
    let err = api.export(&ResourceId::new("model/x"), &dir.path().join("m.json")).unwrap_err();
    assert!(matches!(err, ApiError::Rejected { code: 404, .. }));
}
