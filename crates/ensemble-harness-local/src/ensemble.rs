// crates/ensemble-harness-local/src/ensemble.rs
// ============================================================================
// Module: Local Ensemble
// Description: Offline view of a finished ensemble and its models.
// Purpose: Rebuild ensembles from the API, export files, or loaded models.
// Dependencies: ensemble-harness-core, serde_json
// ============================================================================

//! ## Overview
//! A [`LocalEnsemble`] always holds its constituent models, in the order
//! the ensemble lists them. It can be built from:
//! - a remote ensemble id, fetching every model
//! - an export file, reading model files written beside it
//! - a list of model ids or already-built [`LocalModel`]s
//! - a resource list whose first element may be the ensemble itself
//!
//! [`EnsembleView`] is the read-only surface shared with
//! [`crate::SupervisedModel`] and [`crate::EnsemblePredictor`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use ensemble_harness_core::ResourceApi;
use ensemble_harness_core::ResourceId;
use ensemble_harness_core::ResourceType;
use ensemble_harness_core::component_ids;
use ensemble_harness_core::read_json_file;
use ensemble_harness_core::resource_body;
use serde_json::Value;

use crate::error::LocalError;
use crate::importance::FieldImportance;
use crate::importance::average_pairs;
use crate::importance::rank_map;
use crate::model::FieldInfo;
use crate::model::LocalModel;
use crate::model::parse_fields;
use crate::model::parse_importance_pairs;
use crate::model::record_resource_id;
use crate::model::require_finished;

// ============================================================================
// SECTION: View Trait
// ============================================================================

/// Read-only surface shared by every local ensemble flavour.
pub trait EnsembleView {
    /// Returns the id of the source ensemble, when built from one.
    fn resource_id(&self) -> Option<&ResourceId>;

    /// Returns the constituent model ids in ensemble order.
    fn model_ids(&self) -> &[ResourceId];

    /// Returns ranked field importance.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::Invalid`] when importance cannot be derived
    /// from the data the wrapper holds.
    fn field_importance_data(&self) -> Result<FieldImportance, LocalError>;
}

// ============================================================================
// SECTION: Multi Model
// ============================================================================

/// Constituent models of a local ensemble.
#[derive(Debug, Clone, Default)]
pub struct MultiModel {
    /// Models in ensemble order.
    pub models: Vec<LocalModel>,
}

impl MultiModel {
    /// Returns the number of models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns true when no models are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Returns the model ids in order.
    #[must_use]
    pub fn ids(&self) -> Vec<ResourceId> {
        self.models.iter().map(|model| model.resource_id().clone()).collect()
    }
}

// ============================================================================
// SECTION: Ensemble Metadata
// ============================================================================

/// Data read from an ensemble resource body.
#[derive(Debug, Clone, Default)]
struct EnsembleMetadata {
    /// Ensemble id.
    resource_id: Option<ResourceId>,
    /// Model ids the ensemble lists.
    model_ids: Vec<ResourceId>,
    /// Published `{field_id: value}` importance, ranked; absent when empty.
    importance: Option<Vec<(String, f64)>>,
    /// Per-model importance pairs from `distributions`.
    distributions: Option<Vec<Vec<(String, f64)>>>,
    /// Field metadata published on the ensemble.
    fields: BTreeMap<String, FieldInfo>,
}

impl EnsembleMetadata {
    /// Reads a finished ensemble record or body.
    fn from_resource(record: &Value) -> Result<Self, LocalError> {
        let resource_id = record_resource_id(record)
            .ok_or_else(|| LocalError::Invalid("ensemble resource has no id".to_string()))?;
        if resource_id.resource_type() != ResourceType::Ensemble {
            return Err(LocalError::Invalid(format!("{resource_id} is not an ensemble")));
        }
        require_finished(record, &resource_id)?;
        let body = resource_body(record);
        let model_ids = component_ids(body);
        if model_ids.is_empty() {
            return Err(LocalError::Invalid(format!("{resource_id} lists no models")));
        }
        Ok(Self {
            importance: body
                .get("importance")
                .and_then(Value::as_object)
                .filter(|map| !map.is_empty())
                .map(rank_map),
            distributions: parse_distributions(body.get("distributions")),
            fields: parse_fields(
                body.get("ensemble")
                    .and_then(|ensemble| ensemble.get("fields"))
                    .or_else(|| body.get("fields")),
            ),
            resource_id: Some(resource_id),
            model_ids,
        })
    }

    /// Derives importance from published data without model bodies.
    fn published_importance(&self) -> Option<Vec<(String, f64)>> {
        if let Some(importance) = &self.importance {
            return Some(importance.clone());
        }
        let distributions = self.distributions.as_ref()?;
        let sources: Vec<&[(String, f64)]> = distributions.iter().map(Vec::as_slice).collect();
        Some(average_pairs(&sources))
    }
}

/// Reads `distributions[*].importance`, requiring every entry to carry it.
fn parse_distributions(value: Option<&Value>) -> Option<Vec<Vec<(String, f64)>>> {
    let entries = value?.as_array()?;
    if entries.is_empty() {
        return None;
    }
    entries.iter().map(|entry| parse_importance_pairs(entry.get("importance"))).collect()
}

// ============================================================================
// SECTION: Local Ensemble
// ============================================================================

/// Offline ensemble holding every constituent model.
///
/// # Invariants
/// - `multi_model.models` is non-empty and ordered like `model_ids`.
#[derive(Debug, Clone)]
pub struct LocalEnsemble {
    /// Source ensemble metadata; default when built from models only.
    metadata: EnsembleMetadata,
    /// Constituent models.
    multi_model: MultiModel,
}

impl LocalEnsemble {
    /// Fetches a finished ensemble and all of its models.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError`] when the ensemble or any model cannot be read
    /// or is not finished.
    pub fn fetch(resource: &ResourceId, api: &dyn ResourceApi) -> Result<Self, LocalError> {
        let envelope = api.get_finished(resource)?;
        let metadata = EnsembleMetadata::from_resource(&envelope.object)?;
        let models = metadata
            .model_ids
            .iter()
            .map(|id| LocalModel::fetch(id, api))
            .collect::<Result<Vec<_>, _>>()?;
        Self::with_metadata(metadata, models)
    }

    /// Reads an exported ensemble and the model files written beside it.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError`] when the ensemble file or a model file is
    /// missing, unreadable, or not finished.
    pub fn from_file(path: &Path) -> Result<Self, LocalError> {
        let record = read_json_file(path)
            .map_err(|err| LocalError::Io(format!("{}: {err}", path.display())))?;
        let metadata = EnsembleMetadata::from_resource(&record)?;
        let directory = path.parent().unwrap_or_else(|| Path::new(""));
        let models = metadata
            .model_ids
            .iter()
            .map(|id| LocalModel::from_file(&directory.join(id.file_name())))
            .collect::<Result<Vec<_>, _>>()?;
        Self::with_metadata(metadata, models)
    }

    /// Fetches the listed models and combines them without an ensemble resource.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError`] when the list is empty or a model cannot be read.
    pub fn fetch_models(ids: &[ResourceId], api: &dyn ResourceApi) -> Result<Self, LocalError> {
        let models =
            ids.iter().map(|id| LocalModel::fetch(id, api)).collect::<Result<Vec<_>, _>>()?;
        Self::from_local_models(models)
    }

    /// Combines already-built models without an ensemble resource.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::Invalid`] when `models` is empty.
    pub fn from_local_models(models: Vec<LocalModel>) -> Result<Self, LocalError> {
        if models.is_empty() {
            return Err(LocalError::Invalid("an ensemble needs at least one model".to_string()));
        }
        let metadata = EnsembleMetadata {
            model_ids: models.iter().map(|model| model.resource_id().clone()).collect(),
            ..EnsembleMetadata::default()
        };
        Ok(Self {
            metadata,
            multi_model: MultiModel { models },
        })
    }

    /// Builds from a resource list whose first element may be the ensemble.
    ///
    /// When the first element is an ensemble, the remaining elements are its
    /// models; otherwise every element is a model.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError`] when an element is malformed or the models do
    /// not match the ensemble's list.
    pub fn from_resource_list(resources: &[Value]) -> Result<Self, LocalError> {
        let Some((first, rest)) = resources.split_first() else {
            return Err(LocalError::Invalid("resource list is empty".to_string()));
        };
        let first_is_ensemble = record_resource_id(first)
            .is_some_and(|id| id.resource_type() == ResourceType::Ensemble);
        if first_is_ensemble {
            let metadata = EnsembleMetadata::from_resource(first)?;
            let models =
                rest.iter().map(LocalModel::from_resource).collect::<Result<Vec<_>, _>>()?;
            Self::with_metadata(metadata, models)
        } else {
            let models =
                resources.iter().map(LocalModel::from_resource).collect::<Result<Vec<_>, _>>()?;
            Self::from_local_models(models)
        }
    }

    /// Orders `models` by the ensemble's list, requiring every listed model.
    fn with_metadata(
        metadata: EnsembleMetadata,
        models: Vec<LocalModel>,
    ) -> Result<Self, LocalError> {
        let mut by_id: BTreeMap<ResourceId, LocalModel> =
            models.into_iter().map(|model| (model.resource_id().clone(), model)).collect();
        let mut ordered = Vec::with_capacity(metadata.model_ids.len());
        for id in &metadata.model_ids {
            let model = by_id
                .remove(id)
                .ok_or_else(|| LocalError::Invalid(format!("model {id} is missing")))?;
            ordered.push(model);
        }
        Ok(Self {
            metadata,
            multi_model: MultiModel { models: ordered },
        })
    }

    /// Returns the constituent models.
    #[must_use]
    pub const fn multi_model(&self) -> &MultiModel {
        &self.multi_model
    }

    /// Returns field metadata from the ensemble and its models.
    #[must_use]
    pub fn fields(&self) -> BTreeMap<String, FieldInfo> {
        let mut fields = self.metadata.fields.clone();
        for model in &self.multi_model.models {
            for (id, info) in model.fields() {
                fields.entry(id.clone()).or_insert_with(|| info.clone());
            }
        }
        fields
    }

    /// Returns ranked field importance.
    ///
    /// Published ensemble importance wins; otherwise per-model importance is
    /// averaged over the constituent models.
    #[must_use]
    pub fn field_importance(&self) -> FieldImportance {
        let ranking = self.metadata.published_importance().unwrap_or_else(|| {
            let sources: Vec<&[(String, f64)]> =
                self.multi_model.models.iter().map(LocalModel::field_importance).collect();
            average_pairs(&sources)
        });
        FieldImportance {
            ranking,
            names: self.fields().into_iter().map(|(id, info)| (id, info.name)).collect(),
        }
    }
}

impl EnsembleView for LocalEnsemble {
    fn resource_id(&self) -> Option<&ResourceId> {
        self.metadata.resource_id.as_ref()
    }

    fn model_ids(&self) -> &[ResourceId] {
        &self.metadata.model_ids
    }

    fn field_importance_data(&self) -> Result<FieldImportance, LocalError> {
        Ok(self.field_importance())
    }
}

// ============================================================================
// SECTION: Lightweight Metadata Access
// ============================================================================

/// Published ensemble data available without model bodies.
#[derive(Debug, Clone)]
pub(crate) struct PublishedEnsemble {
    /// Parsed metadata.
    metadata: EnsembleMetadata,
}

impl PublishedEnsemble {
    /// Reads a finished ensemble record or body.
    pub(crate) fn from_resource(record: &Value) -> Result<Self, LocalError> {
        Ok(Self {
            metadata: EnsembleMetadata::from_resource(record)?,
        })
    }

    /// Returns the ensemble id.
    pub(crate) fn resource_id(&self) -> Option<&ResourceId> {
        self.metadata.resource_id.as_ref()
    }

    /// Returns the listed model ids.
    pub(crate) fn model_ids(&self) -> &[ResourceId] {
        &self.metadata.model_ids
    }

    /// Returns importance derivable from the ensemble body alone.
    pub(crate) fn field_importance(&self) -> Option<FieldImportance> {
        let ranking = self.metadata.published_importance()?;
        Some(FieldImportance {
            ranking,
            names: self
                .metadata
                .fields
                .iter()
                .map(|(id, info)| (id.clone(), info.name.clone()))
                .collect(),
        })
    }
}
