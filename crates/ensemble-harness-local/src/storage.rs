// crates/ensemble-harness-local/src/storage.rs
// ============================================================================
// Module: Export Directory Storage
// Description: Readers for exported ensemble directories.
// Purpose: Load an ensemble record and its model records from disk.
// Dependencies: ensemble-harness-core, serde_json
// ============================================================================

//! ## Overview
//! An exported ensemble directory holds `ensemble.json` plus one file per
//! constituent model, named by [`ResourceId::file_name`]. These helpers read
//! that layout back into raw resource records.

use std::path::Path;

use ensemble_harness_core::ResourceId;
use ensemble_harness_core::component_ids;
use ensemble_harness_core::read_json_file;
use ensemble_harness_core::resource_body;
use serde_json::Value;

use crate::error::LocalError;

/// File name of the ensemble record inside an export directory.
pub const ENSEMBLE_FILE: &str = "ensemble.json";

/// Reads `ensemble.json` from an export directory.
///
/// # Errors
///
/// Returns [`LocalError::Io`] when the file is missing or not valid JSON.
pub fn read_ensemble_file(directory: &Path) -> Result<Value, LocalError> {
    read_record(&directory.join(ENSEMBLE_FILE))
}

/// Reads the ensemble record followed by every listed model record.
///
/// # Errors
///
/// Returns [`LocalError::Io`] when any file is missing or not valid JSON and
/// [`LocalError::Invalid`] when the ensemble lists no models.
pub fn load_full_ensemble(directory: &Path) -> Result<Vec<Value>, LocalError> {
    let ensemble = read_ensemble_file(directory)?;
    let model_ids: Vec<ResourceId> = component_ids(resource_body(&ensemble));
    if model_ids.is_empty() {
        return Err(LocalError::Invalid(format!(
            "{} lists no models",
            directory.join(ENSEMBLE_FILE).display()
        )));
    }
    let mut resources = Vec::with_capacity(model_ids.len() + 1);
    resources.push(ensemble);
    for id in &model_ids {
        resources.push(read_record(&directory.join(id.file_name()))?);
    }
    Ok(resources)
}

/// Reads one JSON record, naming the path on failure.
fn read_record(path: &Path) -> Result<Value, LocalError> {
    read_json_file(path).map_err(|err| LocalError::Io(format!("{}: {err}", path.display())))
}
