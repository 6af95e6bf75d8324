// crates/ensemble-harness-local/src/predictor.rs
// ============================================================================
// Module: Ensemble Predictor
// Description: Lightweight ensemble wrapper backed by an export directory.
// Purpose: Inspect an ensemble without loading its model bodies.
// Dependencies: ensemble-harness-core, serde_json
// ============================================================================

//! ## Overview
//! [`EnsemblePredictor`] keeps only the ensemble body and the directory the
//! model files live in. Model files are located on demand, never parsed at
//! construction. Field importance is available only when the ensemble body
//! publishes it.

use std::path::Path;
use std::path::PathBuf;

use ensemble_harness_core::ResourceId;
use serde_json::Value;

use crate::ensemble::EnsembleView;
use crate::ensemble::PublishedEnsemble;
use crate::error::LocalError;
use crate::importance::FieldImportance;
use crate::storage::read_ensemble_file;

/// Ensemble wrapper that defers model loading to its directory.
///
/// # Invariants
/// - Construction performs no model file reads.
#[derive(Debug, Clone)]
pub struct EnsemblePredictor {
    /// Published ensemble data.
    ensemble: PublishedEnsemble,
    /// Directory holding model files.
    directory: PathBuf,
}

impl EnsemblePredictor {
    /// Wraps an ensemble record or body with its model directory.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError`] when the value is not a finished ensemble.
    pub fn new(ensemble: &Value, directory: impl Into<PathBuf>) -> Result<Self, LocalError> {
        Ok(Self {
            ensemble: PublishedEnsemble::from_resource(ensemble)?,
            directory: directory.into(),
        })
    }

    /// Wraps the `ensemble.json` found in `directory`.
    ///
    /// # Errors
    ///
    /// Returns [`LocalError`] when the file is missing or not a finished ensemble.
    pub fn from_directory(directory: &Path) -> Result<Self, LocalError> {
        let ensemble = read_ensemble_file(directory)?;
        Self::new(&ensemble, directory)
    }

    /// Returns the model directory.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the expected path of each model file, in ensemble order.
    #[must_use]
    pub fn model_paths(&self) -> Vec<PathBuf> {
        self.ensemble.model_ids().iter().map(|id| self.directory.join(id.file_name())).collect()
    }
}

impl EnsembleView for EnsemblePredictor {
    fn resource_id(&self) -> Option<&ResourceId> {
        self.ensemble.resource_id()
    }

    fn model_ids(&self) -> &[ResourceId] {
        self.ensemble.model_ids()
    }

    fn field_importance_data(&self) -> Result<FieldImportance, LocalError> {
        self.ensemble.field_importance().ok_or_else(|| {
            LocalError::Invalid("ensemble publishes no field importance".to_string())
        })
    }
}
