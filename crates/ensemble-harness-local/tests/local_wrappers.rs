// crates/ensemble-harness-local/tests/local_wrappers.rs
// ============================================================================
// Module: Local Wrapper Tests
// Description: Construction paths and derived data for local wrappers.
// Purpose: Verify every constructor agrees on model ids and importance.
// ============================================================================

//! ## Overview
//! Fixtures are written into temporary export directories or served from an
//! in-memory [`ResourceApi`]. Importance values are binary fractions so the
//! averaged expectations are exact.

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

use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::Path;

use ensemble_harness_core::ApiError;
use ensemble_harness_core::ResourceApi;
use ensemble_harness_core::ResourceEnvelope;
use ensemble_harness_core::ResourceId;
use ensemble_harness_core::write_json_file;
use ensemble_harness_local::ENSEMBLE_FILE;
use ensemble_harness_local::EnsemblePredictor;
use ensemble_harness_local::EnsembleView;
use ensemble_harness_local::LocalEnsemble;
use ensemble_harness_local::LocalError;
use ensemble_harness_local::LocalModel;
use ensemble_harness_local::SupervisedModel;
use ensemble_harness_local::load_full_ensemble;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn fields() -> Value {
    json!({
        "000000": {"name": "sepal length", "optype": "numeric"},
        "000001": {"name": "sepal width", "optype": "numeric"},
        "000002": {"name": "petal length", "optype": "numeric"},
    })
}

fn model_body(id: &str, importance: Value) -> Value {
    json!({
        "resource": id,
        "name": "iris model",
        "objective_field": "000004",
        "status": {"code": 5, "message": "The model has been created"},
        "model": {"fields": fields(), "importance": importance},
    })
}

fn model_record(id: &str, importance: Value) -> Value {
    json!({
        "code": 200,
        "resource": id,
        "location": format!("https://example.test/andromeda/{id}"),
        "object": model_body(id, importance),
        "error": null,
    })
}

fn ensemble_body(extra: Value) -> Value {
    let mut body = json!({
        "resource": "ensemble/e1",
        "status": {"code": 5, "message": "The ensemble has been created"},
        "models": ["model/m1", "model/m2"],
        "ensemble": {"fields": fields()},
    });
    if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            body.insert(key.clone(), value.clone());
        }
    }
    body
}

fn ensemble_record(extra: Value) -> Value {
    json!({
        "code": 200,
        "resource": "ensemble/e1",
        "location": "https://example.test/andromeda/ensemble/e1",
        "object": ensemble_body(extra),
        "error": null,
    })
}

fn first_importance() -> Value {
    json!([["000002", 0.75], ["000000", 0.25]])
}

fn second_importance() -> Value {
    json!([["000000", 0.5], ["000002", 0.375], ["000001", 0.125]])
}

/// Expected average of the two model importance lists.
fn averaged() -> Value {
    json!([["000002", 0.5625], ["000000", 0.375], ["000001", 0.0625]])
}

fn write_export(dir: &Path, extra: Value) {
    write_json_file(&dir.join(ENSEMBLE_FILE), &ensemble_record(extra)).unwrap();
    write_json_file(&dir.join("model_m1"), &model_record("model/m1", first_importance())).unwrap();
    write_json_file(&dir.join("model_m2"), &model_record("model/m2", second_importance())).unwrap();
}

fn ids(raw: &[&str]) -> Vec<ResourceId> {
    raw.iter().map(|id| ResourceId::new(*id)).collect()
}

/// In-memory API serving fixed bodies and counting reads.
struct FixtureApi {
    resources: BTreeMap<ResourceId, Value>,
    reads: Cell<usize>,
}

impl FixtureApi {
    fn new(extra: Value) -> Self {
        let mut resources = BTreeMap::new();
        resources.insert(ResourceId::new("ensemble/e1"), ensemble_body(extra));
        resources.insert(ResourceId::new("model/m1"), model_body("model/m1", first_importance()));
        resources.insert(ResourceId::new("model/m2"), model_body("model/m2", second_importance()));
        Self {
            resources,
            reads: Cell::new(0),
        }
    }
}

impl ResourceApi for FixtureApi {
    fn create_ensemble(
        &self,
        _dataset: &ResourceId,
        _args: &Map<String, Value>,
    ) -> Result<ResourceEnvelope, ApiError> {
        Err(ApiError::Invalid("read-only fixture".to_string()))
    }

    fn clone_ensemble(
        &self,
        _ensemble: &ResourceId,
        _args: &Map<String, Value>,
    ) -> Result<ResourceEnvelope, ApiError> {
        Err(ApiError::Invalid("read-only fixture".to_string()))
    }

    fn get_resource(&self, resource: &ResourceId) -> Result<ResourceEnvelope, ApiError> {
        self.reads.set(self.reads.get() + 1);
        Ok(match self.resources.get(resource) {
            Some(body) => ResourceEnvelope::accepted(200, resource.clone(), None, body.clone()),
            None => ResourceEnvelope::rejected(404, json!({"status": {"code": 404}})),
        })
    }
}

// ============================================================================
// SECTION: Local Models
// ============================================================================

#[test]
fn model_reads_identity_fields_and_importance() {
    let model = LocalModel::from_resource(&model_record("model/m1", first_importance())).unwrap();
    assert_eq!(model.resource_id().as_str(), "model/m1");
    assert_eq!(model.name(), Some("iris model"));
    assert_eq!(model.objective_field(), Some("000004"));
    assert_eq!(model.fields()["000002"].name, "petal length");
    assert_eq!(model.field_importance()[0], ("000002".to_string(), 0.75));
}

#[test]
fn model_rejects_unfinished_and_wrong_kind() {
    let mut body = model_body("model/m1", first_importance());
    body["status"] = json!({"code": 3});
    assert!(matches!(LocalModel::from_resource(&body), Err(LocalError::NotFinished { .. })));
    assert!(matches!(
        LocalModel::from_resource(&ensemble_body(json!({}))),
        Err(LocalError::Invalid(_))
    ));
}

// ============================================================================
// SECTION: Local Ensembles
// ============================================================================

#[test]
fn fetch_builds_every_model_in_order() {
    let api = FixtureApi::new(json!({}));
    let ensemble = LocalEnsemble::fetch(&ResourceId::new("ensemble/e1"), &api).unwrap();
    assert_eq!(ensemble.resource_id(), Some(&ResourceId::new("ensemble/e1")));
    assert_eq!(ensemble.model_ids(), ids(&["model/m1", "model/m2"]).as_slice());
    assert_eq!(ensemble.multi_model().ids(), ids(&["model/m1", "model/m2"]));
    assert_eq!(api.reads.get(), 3);
}

#[test]
fn importance_averages_model_pairs() {
    let api = FixtureApi::new(json!({}));
    let ensemble = LocalEnsemble::fetch(&ResourceId::new("ensemble/e1"), &api).unwrap();
    let importance = ensemble.field_importance_data().unwrap();
    assert_eq!(importance.ranking_json(), averaged());
    assert_eq!(importance.name("000002"), Some("petal length"));
}

#[test]
fn published_importance_map_wins() {
    let api = FixtureApi::new(json!({"importance": {"000000": 0.125, "000001": 0.875}}));
    let ensemble = LocalEnsemble::fetch(&ResourceId::new("ensemble/e1"), &api).unwrap();
    assert_eq!(
        ensemble.field_importance_data().unwrap().ranking_json(),
        json!([["000001", 0.875], ["000000", 0.125]])
    );
}

#[test]
fn published_importance_ties_keep_listed_order() {
    let api = FixtureApi::new(json!({"importance": {"000002": 0.5, "000001": 0.5}}));
    let ensemble = LocalEnsemble::fetch(&ResourceId::new("ensemble/e1"), &api).unwrap();
    assert_eq!(
        ensemble.field_importance_data().unwrap().ranking_json(),
        json!([["000002", 0.5], ["000001", 0.5]])
    );
}

#[test]
fn empty_published_importance_falls_through_to_distributions() {
    let extra = json!({
        "importance": {},
        "distributions": [{"importance": [["000003", 0.875]]}],
    });
    let api = FixtureApi::new(extra);
    let ensemble = LocalEnsemble::fetch(&ResourceId::new("ensemble/e1"), &api).unwrap();
    assert_eq!(
        ensemble.field_importance_data().unwrap().ranking_json(),
        json!([["000003", 0.875]])
    );
}

#[test]
fn empty_published_importance_falls_through_to_models() {
    let api = FixtureApi::new(json!({"importance": {}}));
    let ensemble = LocalEnsemble::fetch(&ResourceId::new("ensemble/e1"), &api).unwrap();
    assert_eq!(ensemble.field_importance_data().unwrap().ranking_json(), averaged());
}

#[test]
fn distributions_are_averaged_when_complete() {
    let distributions = json!([
        {"importance": [["000001", 1.0]]},
        {"importance": [["000001", 0.5], ["000000", 0.5]]},
    ]);
    let api = FixtureApi::new(json!({"distributions": distributions}));
    let ensemble = LocalEnsemble::fetch(&ResourceId::new("ensemble/e1"), &api).unwrap();
    assert_eq!(
        ensemble.field_importance_data().unwrap().ranking_json(),
        json!([["000001", 0.75], ["000000", 0.25]])
    );
}

#[test]
fn incomplete_distributions_fall_back_to_models() {
    let distributions = json!([{"importance": [["000001", 1.0]]}, {"training": {}}]);
    let api = FixtureApi::new(json!({"distributions": distributions}));
    let ensemble = LocalEnsemble::fetch(&ResourceId::new("ensemble/e1"), &api).unwrap();
    assert_eq!(ensemble.field_importance_data().unwrap().ranking_json(), averaged());
}

#[test]
fn unfinished_ensemble_is_refused() {
    let api = FixtureApi::new(json!({"status": {"code": 2}}));
    let err = LocalEnsemble::fetch(&ResourceId::new("ensemble/e1"), &api).unwrap_err();
    assert!(matches!(err, LocalError::Api(ApiError::NotFinished { .. })));
}

#[test]
fn from_file_reads_models_beside_export() {
    let dir = TempDir::new().unwrap();
    write_export(dir.path(), json!({}));
    let ensemble = LocalEnsemble::from_file(&dir.path().join(ENSEMBLE_FILE)).unwrap();
    assert_eq!(ensemble.resource_id(), Some(&ResourceId::new("ensemble/e1")));
    assert_eq!(ensemble.multi_model().len(), 2);
    assert_eq!(ensemble.field_importance_data().unwrap().ranking_json(), averaged());
}

#[test]
fn from_file_fails_when_model_file_missing() {
    let dir = TempDir::new().unwrap();
    write_export(dir.path(), json!({}));
    std::fs::remove_file(dir.path().join("model_m2")).unwrap();
    let err = LocalEnsemble::from_file(&dir.path().join(ENSEMBLE_FILE)).unwrap_err();
    assert!(matches!(err, LocalError::Io(_)));
}

#[test]
fn models_only_ensemble_has_no_resource_id() {
    let api = FixtureApi::new(json!({}));
    let ensemble = LocalEnsemble::fetch_models(&ids(&["model/m2", "model/m1"]), &api).unwrap();
    assert_eq!(ensemble.resource_id(), None);
    assert_eq!(ensemble.model_ids(), ids(&["model/m2", "model/m1"]).as_slice());
}

#[test]
fn local_models_combine_without_refetching() {
    let api = FixtureApi::new(json!({}));
    let models = vec![
        LocalModel::fetch(&ResourceId::new("model/m1"), &api).unwrap(),
        LocalModel::fetch(&ResourceId::new("model/m2"), &api).unwrap(),
    ];
    let reads = api.reads.get();
    let ensemble = LocalEnsemble::from_local_models(models).unwrap();
    assert_eq!(api.reads.get(), reads);
    assert_eq!(ensemble.field_importance_data().unwrap().ranking_json(), averaged());
    assert!(matches!(LocalEnsemble::from_local_models(Vec::new()), Err(LocalError::Invalid(_))));
}

#[test]
fn resource_list_with_leading_ensemble_matches_fetch() {
    let dir = TempDir::new().unwrap();
    write_export(dir.path(), json!({}));
    let resources = load_full_ensemble(dir.path()).unwrap();
    assert_eq!(resources.len(), 3);
    let ensemble = LocalEnsemble::from_resource_list(&resources).unwrap();
    assert_eq!(ensemble.resource_id(), Some(&ResourceId::new("ensemble/e1")));
    assert_eq!(ensemble.model_ids(), ids(&["model/m1", "model/m2"]).as_slice());
}

#[test]
fn resource_list_of_models_only() {
    let resources = vec![
        model_record("model/m1", first_importance()),
        model_record("model/m2", second_importance()),
    ];
    let ensemble = LocalEnsemble::from_resource_list(&resources).unwrap();
    assert_eq!(ensemble.resource_id(), None);
    assert_eq!(ensemble.multi_model().len(), 2);
    assert!(LocalEnsemble::from_resource_list(&[]).is_err());
}

#[test]
fn resource_list_missing_listed_model_is_invalid() {
    let resources = vec![ensemble_record(json!({})), model_record("model/m1", first_importance())];
    let err = LocalEnsemble::from_resource_list(&resources).unwrap_err();
    assert!(err.to_string().contains("model/m2"));
}

// ============================================================================
// SECTION: Supervised Models and Predictors
// ============================================================================

#[test]
fn supervised_model_dispatches_by_kind() {
    let api = FixtureApi::new(json!({}));
    let ensemble = SupervisedModel::fetch(&ResourceId::new("ensemble/e1"), &api).unwrap();
    assert!(matches!(ensemble, SupervisedModel::Ensemble(_)));
    assert_eq!(ensemble.model_ids().len(), 2);

    let model = SupervisedModel::fetch(&ResourceId::new("model/m1"), &api).unwrap();
    assert_eq!(model.model_ids(), ids(&["model/m1"]).as_slice());
    assert!(matches!(
        SupervisedModel::fetch(&ResourceId::new("dataset/d1"), &api),
        Err(LocalError::Invalid(_))
    ));
}

#[test]
fn predictor_defers_model_loading() {
    let dir = TempDir::new().unwrap();
    write_json_file(&dir.path().join(ENSEMBLE_FILE), &ensemble_record(json!({}))).unwrap();
    let predictor = EnsemblePredictor::from_directory(dir.path()).unwrap();
    assert_eq!(predictor.resource_id(), Some(&ResourceId::new("ensemble/e1")));
    assert_eq!(
        predictor.model_paths(),
        vec![dir.path().join("model_m1"), dir.path().join("model_m2")]
    );
    assert!(predictor.field_importance_data().is_err());
}

#[test]
fn predictor_uses_published_importance() {
    let record = ensemble_record(json!({"importance": {"000002": 1.0}}));
    let predictor = EnsemblePredictor::new(&record, "unused").unwrap();
    assert_eq!(predictor.field_importance_data().unwrap().ranking_json(), json!([["000002", 1.0]]));
    assert_eq!(predictor.directory(), Path::new("unused"));
}

#[test]
fn load_full_ensemble_requires_model_files() {
    let dir = TempDir::new().unwrap();
    write_json_file(&dir.path().join(ENSEMBLE_FILE), &ensemble_record(json!({}))).unwrap();
    assert!(matches!(load_full_ensemble(dir.path()), Err(LocalError::Io(_))));
}
