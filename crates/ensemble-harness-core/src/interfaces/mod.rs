// crates/ensemble-harness-core/src/interfaces/mod.rs
// ============================================================================
// Module: Remote API Interface
// Description: Backend-agnostic seam for the remote resource service.
// Purpose: Let steps and local wrappers run against HTTP or in-memory backends.
// Dependencies: crate::core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`ResourceApi`] is the contract the step definitions drive. The HTTP
//! client implements it for the live service; tests implement it in memory.
//! Export is provided once on top of [`ResourceApi::get_resource`] so every
//! backend writes the same directory layout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::ResourceId;
use crate::core::resource::ResourceEnvelope;
use crate::core::resource::write_json_file;
use crate::core::status::HTTP_OK;
use crate::core::status::HttpCode;
use crate::core::status::ResourceStatus;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while talking to the remote service.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - A rejected create call is not an error; it is an envelope with a non-2xx code.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("api transport error: {0}")]
    Transport(String),
    /// The response body could not be decoded.
    #[error("api decode error: {0}")]
    Decode(String),
    /// Local file I/O failed.
    #[error("api io error: {0}")]
    Io(String),
    /// A read call returned an unexpected HTTP code.
    #[error("api rejected {resource}: http {code}")]
    Rejected {
        /// Resource addressed by the call.
        resource: ResourceId,
        /// HTTP code returned.
        code: HttpCode,
    },
    /// The resource has not reached the finished status.
    #[error("resource {resource} is not finished (status {status})")]
    NotFinished {
        /// Resource addressed by the call.
        resource: ResourceId,
        /// Status observed.
        status: ResourceStatus,
    },
    /// The request arguments were invalid.
    #[error("invalid api request: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Resource API
// ============================================================================

/// Remote resource service used by the step definitions.
pub trait ResourceApi {
    /// Creates an ensemble from a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when no response could be obtained. Responses with
    /// non-2xx codes are returned as rejected envelopes.
    fn create_ensemble(
        &self,
        dataset: &ResourceId,
        args: &Map<String, Value>,
    ) -> Result<ResourceEnvelope, ApiError>;

    /// Clones an existing ensemble server-side.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when no response could be obtained.
    fn clone_ensemble(
        &self,
        ensemble: &ResourceId,
        args: &Map<String, Value>,
    ) -> Result<ResourceEnvelope, ApiError>;

    /// Reads the current state of a resource.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when no response could be obtained.
    fn get_resource(&self, resource: &ResourceId) -> Result<ResourceEnvelope, ApiError>;

    /// Writes a finished resource to `filename`.
    ///
    /// Composite resources also write each constituent model next to the
    /// file, named by [`ResourceId::file_name`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the resource cannot be read, is not finished,
    /// or the files cannot be written.
    fn export(&self, resource: &ResourceId, filename: &Path) -> Result<PathBuf, ApiError> {
        let envelope = self.get_finished(resource)?;
        write_json_file(filename, &envelope).map_err(|err| ApiError::Io(err.to_string()))?;
        if resource.resource_type().is_composite() {
            let directory = filename.parent().unwrap_or_else(|| Path::new(""));
            for model in component_ids(&envelope.object) {
                let model_envelope = self.get_finished(&model)?;
                write_json_file(&directory.join(model.file_name()), &model_envelope)
                    .map_err(|err| ApiError::Io(err.to_string()))?;
            }
        }
        Ok(filename.to_path_buf())
    }

    /// Reads a resource and requires it to be finished.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Rejected`] for non-200 reads and
    /// [`ApiError::NotFinished`] for resources still in progress or faulty.
    fn get_finished(&self, resource: &ResourceId) -> Result<ResourceEnvelope, ApiError> {
        let envelope = self.get_resource(resource)?;
        if envelope.code != HTTP_OK {
            return Err(ApiError::Rejected {
                resource: resource.clone(),
                code: envelope.code,
            });
        }
        let status = envelope.status().status;
        if status != ResourceStatus::Finished {
            return Err(ApiError::NotFinished {
                resource: resource.clone(),
                status,
            });
        }
        Ok(envelope)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the constituent model ids listed in a composite resource body.
#[must_use]
pub fn component_ids(object: &Value) -> Vec<ResourceId> {
    object
        .get("models")
        .and_then(Value::as_array)
        .map(|models| models.iter().filter_map(Value::as_str).map(ResourceId::new).collect())
        .unwrap_or_default()
}
