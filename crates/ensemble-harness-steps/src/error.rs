// crates/ensemble-harness-steps/src/error.rs
// ============================================================================
// Module: Step Errors
// Description: Failure type returned by every step definition.
// Purpose: Report assertion, lifecycle, and collaborator failures to the runner.
// Dependencies: ensemble-harness-core, ensemble-harness-local, thiserror
// ============================================================================

//! ## Overview
//! [`StepError`] is the single failure type a step returns. Assertion
//! mismatches carry the expected and observed values; API and local
//! wrapper errors convert with `?`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use ensemble_harness_core::ApiError;
use ensemble_harness_core::ResourceId;
use ensemble_harness_core::ResourceStatus;
use ensemble_harness_local::LocalError;
use thiserror::Error;

/// Errors returned by step definitions.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum StepError {
    /// An HTTP or resource status code differed from the expected one.
    #[error("unexpected status: expected {expected}, got {actual}")]
    UnexpectedStatus {
        /// Expected code.
        expected: i64,
        /// Observed code.
        actual: i64,
    },
    /// A compared value differed from the expected one.
    #[error("{what} mismatch: expected {expected}, got {actual}")]
    Mismatch {
        /// Name of the compared value.
        what: &'static str,
        /// Expected value rendering.
        expected: String,
        /// Observed value rendering.
        actual: String,
    },
    /// Step parameters could not be interpreted.
    #[error("invalid step configuration: {0}")]
    InvalidConfiguration(String),
    /// A resource did not reach a terminal status in time.
    #[error("timed out after {seconds}s waiting for {resource} (last status {status})")]
    Timeout {
        /// Resource being polled.
        resource: ResourceId,
        /// Effective timeout in seconds.
        seconds: u64,
        /// Last observed status.
        status: ResourceStatus,
    },
    /// A resource ended in the faulty status.
    #[error("resource {resource} is faulty: {message}")]
    Faulty {
        /// Faulty resource.
        resource: ResourceId,
        /// Status message reported by the service.
        message: String,
    },
    /// A step ran before the state it depends on was produced.
    #[error("missing scenario state: {0}")]
    MissingState(&'static str),
    /// The remote API failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// A local wrapper could not be built.
    #[error(transparent)]
    Local(#[from] LocalError),
    /// Local file I/O failed.
    #[error("step io error: {0}")]
    Io(String),
}
