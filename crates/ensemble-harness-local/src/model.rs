// crates/ensemble-harness-local/src/model.rs
// ============================================================================
// Module: Local Model
// Description: Offline view of a single finished decision model.
// Purpose: Expose model identity, field metadata, and field importance.
// Dependencies: ensemble-harness-core, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`LocalModel`] is built from a finished model resource, either a full
//! export record (`{"code", "resource", "object", ...}`) or a bare body. The
//! model's field importance lives under `model.importance` as
//! `[[field_id, value], ...]` pairs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use ensemble_harness_core::ResourceApi;
use ensemble_harness_core::ResourceId;
use ensemble_harness_core::ResourceStatus;
use ensemble_harness_core::ResourceType;
use ensemble_harness_core::get_status;
use ensemble_harness_core::read_json_file;
use ensemble_harness_core::resource_body;
use serde::Serialize;
use serde_json::Value;

use crate::error::LocalError;

// ============================================================================
// SECTION: Field Metadata
// ============================================================================

/// Name and optype of an input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldInfo {
    /// Human-readable field name.
    pub name: String,
    /// Field optype such as `numeric` or `categorical`.
    pub optype: Option<String>,
}

/// Parses a `{field_id: {"name": .., "optype": ..}}` map.
pub(crate) fn parse_fields(value: Option<&Value>) -> BTreeMap<String, FieldInfo> {
    let Some(fields) = value.and_then(Value::as_object) else {
        return BTreeMap::new();
    };
    fields
        .iter()
        .map(|(id, field)| {
            let name = field.get("name").and_then(Value::as_str).unwrap_or(id).to_string();
            let optype = field.get("optype").and_then(Value::as_str).map(str::to_string);
            (id.clone(), FieldInfo { name, optype })
        })
        .collect()
}

/// Parses `[[field_id, value], ...]` importance pairs, skipping malformed entries.
pub(crate) fn parse_importance_pairs(value: Option<&Value>) -> Option<Vec<(String, f64)>> {
    let pairs = value?.as_array()?;
    Some(
        pairs
            .iter()
            .filter_map(|pair| {
                let pair = pair.as_array()?;
                let id = pair.first()?.as_str()?;
                let score = pair.get(1)?.as_f64()?;
                Some((id.to_string(), score))
            })
            .collect(),
    )
}

/// Returns the resource id carried by a record or body.
pub(crate) fn record_resource_id(record: &Value) -> Option<ResourceId> {
    record
        .get("resource")
        .and_then(Value::as_str)
        .or_else(|| resource_body(record).get("resource").and_then(Value::as_str))
        .map(ResourceId::new)
}

/// Fails when the record carries a status other than finished.
pub(crate) fn require_finished(record: &Value, resource: &ResourceId) -> Result<(), LocalError> {
    let body = resource_body(record);
    if body.get("status").is_none() {
        return Ok(());
    }
    let status = get_status(record).status;
    if status == ResourceStatus::Finished {
        Ok(())
    } else {
        Err(LocalError::NotFinished {
            resource: resource.clone(),
            status,
        })
    }
}

// ============================================================================
// SECTION: Local Model
// ============================================================================

/// Offline view of a finished model resource.
///
/// # Invariants
/// - `resource_id` is a `model/...` identifier.
/// - The wrapped resource was finished when read.
#[derive(Debug, Clone)]
pub struct LocalModel {
    /// Model identifier.
    resource_id: ResourceId,
    /// Model name when present.
    name: Option<String>,
    /// Objective field id when present.
    objective_field: Option<String>,
    /// Input field metadata keyed by field id.
    fields: BTreeMap<String, FieldInfo>,
    /// Field importance pairs in resource order.
    field_importance: Vec<(String, f64)>,
    /// Resource body the model was built from.
    resource: Value,
}

impl LocalModel {
    /// Builds a model from a resource record or body.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::Invalid`] when the value is not a model resource
    /// and [`LocalError::NotFinished`] when it has not finished.
    pub fn from_resource(record: &Value) -> Result<Self, LocalError> {
        let resource_id = record_resource_id(record)
            .ok_or_else(|| LocalError::Invalid("model resource has no id".to_string()))?;
        if resource_id.resource_type() != ResourceType::Model {
            return Err(LocalError::Invalid(format!("{resource_id} is not a model")));
        }
        require_finished(record, &resource_id)?;
        let body = resource_body(record);
        let model = body
            .get("model")
            .ok_or_else(|| LocalError::Invalid(format!("{resource_id} has no model structure")))?;
        let objective_field = body
            .get("objective_field")
            .and_then(Value::as_str)
            .or_else(|| {
                body.get("objective_fields")
                    .and_then(Value::as_array)
                    .and_then(|ids| ids.first())
                    .and_then(Value::as_str)
            })
            .map(str::to_string);
        Ok(Self {
            name: body.get("name").and_then(Value::as_str).map(str::to_string),
            objective_field,
            fields: parse_fields(model.get("fields")),
            field_importance: parse_importance_pairs(model.get("importance")).unwrap_or_default(),
            resource: body.clone(),
            resource_id,
        })
    }

    /// Builds a model from an export file.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::Io`] when the file cannot be read or parsed and
    /// the errors of [`LocalModel::from_resource`] otherwise.
    pub fn from_file(path: &Path) -> Result<Self, LocalError> {
        let record = read_json_file(path)
            .map_err(|err| LocalError::Io(format!("{}: {err}", path.display())))?;
        Self::from_resource(&record)
    }

    /// Fetches a finished model from the remote service.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::Api`] when the read fails or the model is not finished.
    pub fn fetch(resource: &ResourceId, api: &dyn ResourceApi) -> Result<Self, LocalError> {
        let envelope = api.get_finished(resource)?;
        Self::from_resource(&envelope.object)
    }

    /// Returns the model identifier.
    #[must_use]
    pub const fn resource_id(&self) -> &ResourceId {
        &self.resource_id
    }

    /// Returns the model name when present.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the objective field id when present.
    #[must_use]
    pub fn objective_field(&self) -> Option<&str> {
        self.objective_field.as_deref()
    }

    /// Returns input field metadata keyed by field id.
    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<String, FieldInfo> {
        &self.fields
    }

    /// Returns the field importance pairs in resource order.
    #[must_use]
    pub fn field_importance(&self) -> &[(String, f64)] {
        &self.field_importance
    }

    /// Returns the resource body the model was built from.
    #[must_use]
    pub const fn resource(&self) -> &Value {
        &self.resource
    }
}
