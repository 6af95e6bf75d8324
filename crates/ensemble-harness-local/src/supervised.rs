// crates/ensemble-harness-local/src/supervised.rs
// ============================================================================
// Module: Supervised Model
// Description: Type-dispatching local wrapper for supervised resources.
// Purpose: Build the right local wrapper from any supervised resource id.
// Dependencies: ensemble-harness-core
// ============================================================================

//! ## Overview
//! [`SupervisedModel`] inspects the resource kind of an id and builds the
//! matching wrapper. Ensembles and single models are supported.

use std::slice;

use ensemble_harness_core::ResourceApi;
use ensemble_harness_core::ResourceId;
use ensemble_harness_core::ResourceType;

use crate::ensemble::EnsembleView;
use crate::ensemble::LocalEnsemble;
use crate::error::LocalError;
use crate::importance::FieldImportance;
use crate::importance::average_pairs;
use crate::model::LocalModel;

/// Local wrapper chosen by resource kind.
#[derive(Debug, Clone)]
pub enum SupervisedModel {
    /// Wrapped ensemble.
    Ensemble(LocalEnsemble),
    /// Wrapped single model.
    Model(LocalModel),
}

impl SupervisedModel {
    /// Fetches a finished supervised resource and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError::Invalid`] for unsupported resource kinds and the
    /// wrapper's fetch errors otherwise.
    pub fn fetch(resource: &ResourceId, api: &dyn ResourceApi) -> Result<Self, LocalError> {
        match resource.resource_type() {
            ResourceType::Ensemble => LocalEnsemble::fetch(resource, api).map(Self::Ensemble),
            ResourceType::Model => LocalModel::fetch(resource, api).map(Self::Model),
            other => Err(LocalError::Invalid(format!(
                "{resource} is a {} resource, not a supervised model",
                other.as_str()
            ))),
        }
    }
}

impl EnsembleView for SupervisedModel {
    fn resource_id(&self) -> Option<&ResourceId> {
        match self {
            Self::Ensemble(ensemble) => ensemble.resource_id(),
            Self::Model(model) => Some(model.resource_id()),
        }
    }

    fn model_ids(&self) -> &[ResourceId] {
        match self {
            Self::Ensemble(ensemble) => ensemble.model_ids(),
            Self::Model(model) => slice::from_ref(model.resource_id()),
        }
    }

    fn field_importance_data(&self) -> Result<FieldImportance, LocalError> {
        match self {
            Self::Ensemble(ensemble) => ensemble.field_importance_data(),
            Self::Model(model) => Ok(FieldImportance {
                ranking: average_pairs(&[model.field_importance()]),
                names: model
                    .fields()
                    .iter()
                    .map(|(id, info)| (id.clone(), info.name.clone()))
                    .collect(),
            }),
        }
    }
}
