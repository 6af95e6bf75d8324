// crates/ensemble-harness-local/src/error.rs
// ============================================================================
// Module: Local Wrapper Errors
// Description: Error type for building local wrappers.
// Purpose: Distinguish file, structure, lifecycle, and API failures.
// Dependencies: ensemble-harness-core, thiserror
// ============================================================================

//! ## Overview
//! [`LocalError`] covers every failure while building a local wrapper:
//! unreadable files, malformed resource bodies, resources that are not
//! finished, and errors surfaced by the remote API.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;

use ensemble_harness_core::ApiError;
use ensemble_harness_core::ResourceId;
use ensemble_harness_core::ResourceStatus;
use thiserror::Error;

/// Errors raised while building local wrappers.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum LocalError {
    /// A resource file could not be read.
    #[error("local io error: {0}")]
    Io(String),
    /// A resource body is missing required structure.
    #[error("invalid resource structure: {0}")]
    Invalid(String),
    /// The resource has not finished processing.
    #[error("resource {resource} is not finished (status {status})")]
    NotFinished {
        /// Resource that was not finished.
        resource: ResourceId,
        /// Status observed.
        status: ResourceStatus,
    },
    /// The remote API failed while fetching a resource.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<io::Error> for LocalError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
