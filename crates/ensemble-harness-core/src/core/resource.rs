// crates/ensemble-harness-core/src/core/resource.rs
// ============================================================================
// Module: Resource Envelope
// Description: Response records returned by create, clone, and read calls.
// Purpose: Carry HTTP code, location, id, and body as one typed value.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every API call yields a [`ResourceEnvelope`], including calls the service
//! rejected: a rejected call carries the HTTP code and the `error` body while
//! `resource` and `location` stay empty. Callers decide whether a code is
//! acceptable. The same record shape is written to disk on export.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::ResourceId;
use crate::core::status::HTTP_CREATED;
use crate::core::status::HttpCode;
use crate::core::status::StatusInfo;
use crate::core::status::get_status;

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Response record for a single resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceEnvelope {
    /// HTTP status code of the call that produced the record.
    pub code: HttpCode,
    /// Resource identifier (absent when the call was rejected).
    #[serde(default)]
    pub resource: Option<ResourceId>,
    /// Canonical resource URL (absent when the call was rejected).
    #[serde(default)]
    pub location: Option<String>,
    /// Resource body (`Value::Null` when the call was rejected).
    #[serde(default)]
    pub object: Value,
    /// Error body reported by the service.
    #[serde(default)]
    pub error: Option<Value>,
}

impl ResourceEnvelope {
    /// Builds an envelope for an accepted call.
    #[must_use]
    pub fn accepted(
        code: HttpCode,
        resource: ResourceId,
        location: Option<String>,
        object: Value,
    ) -> Self {
        Self {
            code,
            resource: Some(resource),
            location,
            object,
            error: None,
        }
    }

    /// Builds an envelope for a call the service rejected.
    #[must_use]
    pub fn rejected(code: HttpCode, error: Value) -> Self {
        Self {
            code,
            resource: None,
            location: None,
            object: Value::Null,
            error: Some(error),
        }
    }

    /// Returns true when the call created a new resource.
    #[must_use]
    pub fn is_created(&self) -> bool {
        self.code == HTTP_CREATED
    }

    /// Returns the lifecycle status reported in the body.
    #[must_use]
    pub fn status(&self) -> StatusInfo {
        get_status(&self.object)
    }

    /// Returns the `origin` reference of a cloned resource.
    #[must_use]
    pub fn origin(&self) -> Option<ResourceId> {
        self.object.get("origin").and_then(Value::as_str).map(ResourceId::new)
    }
}

// ============================================================================
// SECTION: JSON Files
// ============================================================================

/// Returns the resource body of a stored record.
///
/// Stored records wrap the body under `object`; bare bodies are returned
/// unchanged.
#[must_use]
pub fn resource_body(value: &Value) -> &Value {
    match value.get("object") {
        Some(object @ Value::Object(_)) => object,
        _ => value,
    }
}

/// Reads and parses a JSON file.
///
/// # Errors
///
/// Returns an I/O error when the file cannot be read, or an
/// [`io::ErrorKind::InvalidData`] error when it is not valid JSON.
pub fn read_json_file(path: &Path) -> io::Result<Value> {
    let bytes = fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|err| {
        io::Error::new(io::ErrorKind::InvalidData, format!("{}: {err}", path.display()))
    })
}

/// Writes a value as pretty-printed JSON, creating parent directories.
///
/// # Errors
///
/// Returns an I/O error when the directory or file cannot be written.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err.to_string()))?;
    fs::write(path, bytes)
}
