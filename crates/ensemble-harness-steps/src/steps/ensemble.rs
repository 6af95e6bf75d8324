// crates/ensemble-harness-steps/src/steps/ensemble.rs
// ============================================================================
// Module: Ensemble Steps
// Description: Step definitions for ensemble scenarios.
// Purpose: Create, wait for, export, clone, and inspect ensembles.
// Dependencies: ensemble-harness-{core,local}, serde_json
// ============================================================================

//! ## Overview
//! One public function per step. Create and wait steps accept an optional
//! shared label: a label already present in [`SharedResources`] turns the
//! create step into a no-op and the wait step into a reuse of the cached
//! body. Local-build steps replace the context's local ensemble (and, for
//! the id and file flavours, its local model).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use ensemble_harness_core::HTTP_CREATED;
use ensemble_harness_core::ResourceEnvelope;
use ensemble_harness_core::ResourceId;
use ensemble_harness_core::ResourceStatus;
use ensemble_harness_local::EnsemblePredictor;
use ensemble_harness_local::EnsembleView;
use ensemble_harness_local::LocalEnsemble;
use ensemble_harness_local::LocalModel;
use ensemble_harness_local::SupervisedModel;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::audit::StepAuditEvent;
use crate::audit::StepOutcome;
use crate::context::FaultyResource;
use crate::context::LocalEnsembleHandle;
use crate::context::ScenarioContext;
use crate::error::StepError;
use crate::shared::SharedResources;
use crate::wait::wait_until_status_code_is;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of models requested when the step argument is absent or invalid.
pub const DEFAULT_NUMBER_OF_MODELS: u64 = 2;
/// Seed used for model building and bagging.
pub const SAMPLE_SEED: &str = "BigML";
/// Bagging sample rate.
pub const SAMPLE_RATE: f64 = 0.7;

// ============================================================================
// SECTION: Request Arguments
// ============================================================================

/// Returns the fixed seed and sampling configuration.
fn sampling_args() -> Map<String, Value> {
    let mut args = Map::new();
    args.insert("seed".to_string(), json!(SAMPLE_SEED));
    args.insert(
        "ensemble_sample".to_string(),
        json!({"rate": SAMPLE_RATE, "seed": SAMPLE_SEED}),
    );
    args
}

/// Builds the create arguments for a fixed-size ensemble.
///
/// `number_of_models` must parse as a positive integer; anything else
/// requests [`DEFAULT_NUMBER_OF_MODELS`].
#[must_use]
pub fn ensemble_args(number_of_models: Option<&str>) -> Map<String, Value> {
    let count = number_of_models
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|count| *count > 0)
        .unwrap_or(DEFAULT_NUMBER_OF_MODELS);
    let mut args = Map::new();
    args.insert("number_of_models".to_string(), json!(count));
    args.insert("missing_splits".to_string(), json!(false));
    args.extend(sampling_args());
    args
}

/// Parses caller-supplied JSON arguments and applies the sampling configuration.
///
/// # Errors
///
/// Returns [`StepError::InvalidConfiguration`] when `params` is not a JSON object.
pub fn parse_ensemble_params(params: &str) -> Result<Map<String, Value>, StepError> {
    let value: Value = serde_json::from_str(params)
        .map_err(|err| StepError::InvalidConfiguration(format!("ensemble params: {err}")))?;
    let Value::Object(mut args) = value else {
        return Err(StepError::InvalidConfiguration(
            "ensemble params must be a JSON object".to_string(),
        ));
    };
    args.extend(sampling_args());
    Ok(args)
}

// ============================================================================
// SECTION: Step Plumbing
// ============================================================================

/// Runs a step body between started and succeeded/failed audit events.
fn audited<T>(
    ctx: &mut ScenarioContext,
    step: &'static str,
    body: impl FnOnce(&mut ScenarioContext) -> Result<T, StepError>,
) -> Result<T, StepError> {
    ctx.record(&StepAuditEvent::new(step, StepOutcome::Started));
    let result = body(ctx);
    match &result {
        Ok(_) => ctx.record(&StepAuditEvent::new(step, StepOutcome::Succeeded)),
        Err(err) => ctx.record(
            &StepAuditEvent::new(step, StepOutcome::Failed).with_message(err.to_string()),
        ),
    }
    result
}

/// Stores a create or clone response, requiring `201 Created`.
fn store_created(ctx: &mut ScenarioContext, envelope: ResourceEnvelope) -> Result<(), StepError> {
    ctx.status = Some(envelope.code);
    if envelope.code != HTTP_CREATED {
        return Err(StepError::UnexpectedStatus {
            expected: i64::from(HTTP_CREATED),
            actual: i64::from(envelope.code),
        });
    }
    let resource = envelope.resource.ok_or(StepError::MissingState("created resource id"))?;
    ctx.location = envelope.location;
    ctx.ensemble = Some(envelope.object);
    ctx.ensemble_id = Some(resource.clone());
    ctx.ensembles.push(resource);
    Ok(())
}

/// Creates an ensemble from the current dataset.
fn submit_ensemble(ctx: &mut ScenarioContext, args: &Map<String, Value>) -> Result<(), StepError> {
    let dataset = ctx.dataset.clone().ok_or(StepError::MissingState("dataset"))?;
    let envelope = ctx.api().create_ensemble(&dataset, args)?;
    store_created(ctx, envelope)
}

/// Polls the current ensemble and stores the final body.
fn wait_for_ensemble(
    ctx: &mut ScenarioContext,
    code1: ResourceStatus,
    code2: ResourceStatus,
    secs: u64,
) -> Result<(), StepError> {
    let resource = ctx.current_ensemble_id()?;
    let outcome = wait_until_status_code_is(
        ctx.api(),
        ctx.audit(),
        &ctx.polling,
        &resource,
        code1,
        code2,
        secs,
    )?;
    let status = outcome.status;
    ctx.ensemble = Some(outcome.envelope.object);
    ctx.ensemble_id = Some(resource.clone());
    if status.status == ResourceStatus::Faulty {
        ctx.errors.push(FaultyResource {
            resource: resource.clone(),
            code: status.code,
            message: status.message.clone(),
        });
    }
    if status.status == code1 {
        return Ok(());
    }
    if status.status == ResourceStatus::Faulty {
        return Err(StepError::Faulty {
            resource,
            message: status.message,
        });
    }
    Err(StepError::UnexpectedStatus {
        expected: code1.code(),
        actual: status.code,
    })
}

/// Returns the first model of a local view.
fn first_model_id(view: &dyn EnsembleView) -> Result<ResourceId, StepError> {
    view.model_ids().first().cloned().ok_or(StepError::MissingState("ensemble models"))
}

/// Returns the last `count` created model ids.
fn last_models(ctx: &ScenarioContext, count: usize) -> Result<Vec<ResourceId>, StepError> {
    if count == 0 || count > ctx.models.len() {
        return Err(StepError::InvalidConfiguration(format!(
            "requested the last {count} models but {} exist",
            ctx.models.len()
        )));
    }
    Ok(ctx.models[ctx.models.len() - count..].to_vec())
}

// ============================================================================
// SECTION: Create and Wait
// ============================================================================

/// Creates an ensemble of `number_of_models` models from the current dataset.
///
/// Does nothing when `label` is already cached in `shared`.
///
/// # Errors
///
/// Returns [`StepError`] when no dataset is set, the call fails, or the
/// response code is not `201 Created`.
pub fn create_ensemble(
    ctx: &mut ScenarioContext,
    shared: &SharedResources,
    number_of_models: Option<&str>,
    label: Option<&str>,
) -> Result<(), StepError> {
    audited(ctx, "create_ensemble", |ctx| {
        if let Some(label) = label
            && shared.has_ensemble(label)
        {
            return Ok(());
        }
        submit_ensemble(ctx, &ensemble_args(number_of_models))
    })
}

/// Creates an ensemble from caller-supplied JSON arguments.
///
/// # Errors
///
/// Returns [`StepError::InvalidConfiguration`] before any request when
/// `params` is not a JSON object, and the errors of [`create_ensemble`]
/// otherwise.
pub fn create_ensemble_with_params(
    ctx: &mut ScenarioContext,
    params: &str,
) -> Result<(), StepError> {
    audited(ctx, "create_ensemble_with_params", |ctx| {
        let args = parse_ensemble_params(params)?;
        submit_ensemble(ctx, &args)
    })
}

/// Waits until the current ensemble's status is `code1` or `code2`.
///
/// The step succeeds only when the final status is `code1`. A faulty final
/// status is also appended to the context's errors.
///
/// # Errors
///
/// Returns [`StepError::Timeout`], [`StepError::Faulty`], or
/// [`StepError::UnexpectedStatus`] per the final state.
pub fn wait_until_ensemble_status_code_is(
    ctx: &mut ScenarioContext,
    code1: ResourceStatus,
    code2: ResourceStatus,
    secs: u64,
) -> Result<(), StepError> {
    audited(ctx, "wait_until_ensemble_status_code_is", |ctx| {
        wait_for_ensemble(ctx, code1, code2, secs)
    })
}

/// Waits until the current ensemble is finished.
///
/// With a cached `label` the cached body becomes the current ensemble and no
/// request is made. Otherwise a finished ensemble is cached under `label`.
///
/// # Errors
///
/// Returns the errors of [`wait_until_ensemble_status_code_is`].
pub fn wait_until_ensemble_ready(
    ctx: &mut ScenarioContext,
    shared: &mut SharedResources,
    secs: u64,
    label: Option<&str>,
) -> Result<(), StepError> {
    audited(ctx, "wait_until_ensemble_ready", |ctx| {
        if let Some(label) = label
            && let Some(cached) = shared.ensemble(label)
        {
            let resource = cached
                .get("resource")
                .and_then(Value::as_str)
                .map(ResourceId::new)
                .ok_or(StepError::MissingState("shared ensemble id"))?;
            ctx.record(
                &StepAuditEvent::new("wait_until_ensemble_ready", StepOutcome::Reused)
                    .with_resource(&resource)
                    .with_message(format!("reusing shared ensemble {label}")),
            );
            ctx.ensemble = Some(cached.clone());
            ctx.ensemble_id = Some(resource);
            return Ok(());
        }
        wait_for_ensemble(ctx, ResourceStatus::Finished, ResourceStatus::Faulty, secs)?;
        if let Some(label) = label
            && let Some(ensemble) = &ctx.ensemble
        {
            shared.insert_ensemble(label, ensemble.clone());
        }
        Ok(())
    })
}

// ============================================================================
// SECTION: Local Wrappers
// ============================================================================

/// Builds a local ensemble from the current ensemble id or an export file.
///
/// From an id, the first constituent model is fetched as the local model;
/// from a file, the first loaded model is used.
///
/// # Errors
///
/// Returns [`StepError`] when the ensemble or its models cannot be loaded.
pub fn create_local_ensemble(
    ctx: &mut ScenarioContext,
    path: Option<&Path>,
) -> Result<(), StepError> {
    audited(ctx, "create_local_ensemble", |ctx| {
        let (ensemble, model) = match path {
            None => {
                let resource = ctx.current_ensemble_id()?;
                let ensemble = LocalEnsemble::fetch(&resource, ctx.api())?;
                let model = LocalModel::fetch(&first_model_id(&ensemble)?, ctx.api())?;
                (ensemble, model)
            }
            Some(path) => {
                let ensemble = LocalEnsemble::from_file(&ctx.resolve(path))?;
                let model = ensemble
                    .multi_model()
                    .models
                    .first()
                    .cloned()
                    .ok_or(StepError::MissingState("ensemble models"))?;
                (ensemble, model)
            }
        };
        ctx.local_ensemble = Some(LocalEnsembleHandle::Ensemble(ensemble));
        ctx.local_model = Some(model);
        Ok(())
    })
}

/// Builds a kind-dispatching local wrapper from the current ensemble id.
///
/// # Errors
///
/// Returns [`StepError`] when the resource or its first model cannot be loaded.
pub fn create_local_supervised_ensemble(ctx: &mut ScenarioContext) -> Result<(), StepError> {
    audited(ctx, "create_local_supervised_ensemble", |ctx| {
        let resource = ctx.current_ensemble_id()?;
        let supervised = SupervisedModel::fetch(&resource, ctx.api())?;
        let model = LocalModel::fetch(&first_model_id(&supervised)?, ctx.api())?;
        ctx.local_ensemble = Some(LocalEnsembleHandle::Supervised(supervised));
        ctx.local_model = Some(model);
        Ok(())
    })
}

/// Builds a directory-backed predictor from `directory/ensemble.json`.
///
/// # Errors
///
/// Returns [`StepError`] when the file is missing or not a finished ensemble.
pub fn create_local_ensemble_predictor(
    ctx: &mut ScenarioContext,
    directory: &Path,
) -> Result<(), StepError> {
    audited(ctx, "create_local_ensemble_predictor", |ctx| {
        let predictor = EnsemblePredictor::from_directory(&ctx.resolve(directory))?;
        ctx.local_ensemble = Some(LocalEnsembleHandle::Predictor(predictor));
        Ok(())
    })
}

/// Loads the ensemble record and every model record from `directory`.
///
/// # Errors
///
/// Returns [`StepError`] when any file is missing or malformed.
pub fn load_full_ensemble(
    ctx: &mut ScenarioContext,
    directory: &Path,
) -> Result<Vec<Value>, StepError> {
    audited(ctx, "load_full_ensemble", |ctx| {
        Ok(ensemble_harness_local::load_full_ensemble(&ctx.resolve(directory))?)
    })
}

/// Builds a local ensemble from the last `count` created models.
///
/// # Errors
///
/// Returns [`StepError::InvalidConfiguration`] when fewer than `count`
/// models exist and [`StepError`] when a model cannot be fetched.
pub fn create_local_ensemble_with_last_models(
    ctx: &mut ScenarioContext,
    count: usize,
) -> Result<(), StepError> {
    audited(ctx, "create_local_ensemble_with_last_models", |ctx| {
        let ids = last_models(ctx, count)?;
        let ensemble = LocalEnsemble::fetch_models(&ids, ctx.api())?;
        ctx.local_ensemble = Some(LocalEnsembleHandle::Ensemble(ensemble));
        Ok(())
    })
}

/// Builds a local ensemble from an in-memory resource list.
///
/// # Errors
///
/// Returns [`StepError`] when the list is empty or malformed.
pub fn create_local_ensemble_from_models(
    ctx: &mut ScenarioContext,
    resources: &[Value],
) -> Result<(), StepError> {
    audited(ctx, "create_local_ensemble_from_models", |ctx| {
        let ensemble = LocalEnsemble::from_resource_list(resources)?;
        ctx.local_ensemble = Some(LocalEnsembleHandle::Ensemble(ensemble));
        Ok(())
    })
}

/// Builds local models for the last `count` created models, then combines them.
///
/// # Errors
///
/// Returns the errors of [`create_local_ensemble_with_last_models`].
pub fn create_local_ensemble_with_last_local_models(
    ctx: &mut ScenarioContext,
    count: usize,
) -> Result<(), StepError> {
    audited(ctx, "create_local_ensemble_with_last_local_models", |ctx| {
        let ids = last_models(ctx, count)?;
        let models =
            ids.iter().map(|id| LocalModel::fetch(id, ctx.api())).collect::<Result<Vec<_>, _>>()?;
        let ensemble = LocalEnsemble::from_local_models(models)?;
        ctx.local_ensemble = Some(LocalEnsembleHandle::Ensemble(ensemble));
        Ok(())
    })
}

/// Builds a local ensemble from an export file without touching the local model.
///
/// # Errors
///
/// Returns [`StepError`] when the export or its model files cannot be read.
pub fn create_local_ensemble_from_file(
    ctx: &mut ScenarioContext,
    export_file: &Path,
) -> Result<(), StepError> {
    audited(ctx, "create_local_ensemble_from_file", |ctx| {
        let ensemble = LocalEnsemble::from_file(&ctx.resolve(export_file))?;
        ctx.local_ensemble = Some(LocalEnsembleHandle::Ensemble(ensemble));
        Ok(())
    })
}

// ============================================================================
// SECTION: Export and Clone
// ============================================================================

/// Exports the current ensemble, and its models, to `filename`.
///
/// # Errors
///
/// Returns [`StepError`] when no ensemble exists or the export fails.
pub fn export_ensemble(ctx: &mut ScenarioContext, filename: &Path) -> Result<PathBuf, StepError> {
    audited(ctx, "export_ensemble", |ctx| {
        let resource = ctx.current_ensemble_id()?;
        Ok(ctx.api().export(&resource, &ctx.resolve(filename))?)
    })
}

/// Clones `source` server-side into the scenario's project.
///
/// # Errors
///
/// Returns [`StepError`] when the call fails or is not `201 Created`.
pub fn clone_ensemble(ctx: &mut ScenarioContext, source: &ResourceId) -> Result<(), StepError> {
    audited(ctx, "clone_ensemble", |ctx| {
        let mut args = Map::new();
        if let Some(project) = &ctx.project_id {
            args.insert("project".to_string(), Value::String(project.to_string()));
        }
        let envelope = ctx.api().clone_ensemble(source, &args)?;
        store_created(ctx, envelope)
    })
}

// ============================================================================
// SECTION: Assertions
// ============================================================================

/// Asserts the local ensemble's field importance equals `expected` JSON.
///
/// # Errors
///
/// Returns [`StepError::InvalidConfiguration`] when `expected` is not JSON
/// and [`StepError::Mismatch`] when the rankings differ.
pub fn assert_field_importance(
    ctx: &mut ScenarioContext,
    expected: &str,
) -> Result<(), StepError> {
    audited(ctx, "assert_field_importance", |ctx| {
        let expected: Value = serde_json::from_str(expected).map_err(|err| {
            StepError::InvalidConfiguration(format!("expected field importance: {err}"))
        })?;
        let actual = ctx.local_view()?.field_importance_data()?.ranking_json();
        if actual == expected {
            Ok(())
        } else {
            Err(StepError::Mismatch {
                what: "field importance",
                expected: expected.to_string(),
                actual: actual.to_string(),
            })
        }
    })
}

/// Asserts the local ensemble was built from the current ensemble.
///
/// # Errors
///
/// Returns [`StepError::Mismatch`] when the ids differ.
pub fn assert_local_ensemble_id_matches(ctx: &mut ScenarioContext) -> Result<(), StepError> {
    audited(ctx, "assert_local_ensemble_id_matches", |ctx| {
        let expected = ctx.current_ensemble_id()?;
        let actual = ctx.local_view()?.resource_id().cloned();
        if actual.as_ref() == Some(&expected) {
            Ok(())
        } else {
            Err(StepError::Mismatch {
                what: "local ensemble id",
                expected: expected.to_string(),
                actual: actual.map_or_else(|| "none".to_string(), |id| id.to_string()),
            })
        }
    })
}

/// Asserts the current ensemble was cloned from `expected`.
///
/// # Errors
///
/// Returns [`StepError::Mismatch`] when the origin differs or is absent.
pub fn assert_cloned_ensemble_origin(
    ctx: &mut ScenarioContext,
    expected: &ResourceId,
) -> Result<(), StepError> {
    audited(ctx, "assert_cloned_ensemble_origin", |ctx| {
        let origin = ctx
            .ensemble
            .as_ref()
            .ok_or(StepError::MissingState("ensemble"))?
            .get("origin")
            .and_then(Value::as_str);
        if origin == Some(expected.as_str()) {
            Ok(())
        } else {
            Err(StepError::Mismatch {
                what: "ensemble origin",
                expected: expected.to_string(),
                actual: origin.unwrap_or("none").to_string(),
            })
        }
    })
}
