// crates/ensemble-harness-core/src/core/status.rs
// ============================================================================
// Module: Resource Status
// Description: Lifecycle status codes and HTTP status constants.
// Purpose: Classify remote resources as pending, finished, or faulty.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Remote resources move through numeric lifecycle codes until they reach
//! either [`ResourceStatus::Finished`] or [`ResourceStatus::Faulty`]. The
//! HTTP constants cover the codes the service returns for create and read
//! calls.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: HTTP Codes
// ============================================================================

/// HTTP status code returned by the remote service.
pub type HttpCode = u16;

/// Successful read.
pub const HTTP_OK: HttpCode = 200;
/// Resource created.
pub const HTTP_CREATED: HttpCode = 201;
/// Request accepted for asynchronous processing.
pub const HTTP_ACCEPTED: HttpCode = 202;
/// Malformed request.
pub const HTTP_BAD_REQUEST: HttpCode = 400;
/// Missing or wrong credentials.
pub const HTTP_UNAUTHORIZED: HttpCode = 401;
/// Account quota exhausted.
pub const HTTP_PAYMENT_REQUIRED: HttpCode = 402;
/// Access denied.
pub const HTTP_FORBIDDEN: HttpCode = 403;
/// Unknown resource.
pub const HTTP_NOT_FOUND: HttpCode = 404;
/// Method not supported by the endpoint.
pub const HTTP_METHOD_NOT_ALLOWED: HttpCode = 405;
/// Request body length missing.
pub const HTTP_LENGTH_REQUIRED: HttpCode = 411;
/// Rate limit reached.
pub const HTTP_TOO_MANY_REQUESTS: HttpCode = 429;
/// Server-side failure.
pub const HTTP_INTERNAL_SERVER_ERROR: HttpCode = 500;

// ============================================================================
// SECTION: Lifecycle Status
// ============================================================================

/// Lifecycle status of a remote resource.
///
/// # Invariants
/// - [`ResourceStatus::code`] and [`ResourceStatus::from_code`] round-trip for
///   every known code; unknown codes map to [`ResourceStatus::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Waiting for resources to be assigned.
    Waiting,
    /// Queued for processing.
    Queued,
    /// Processing started.
    Started,
    /// Processing in progress.
    InProgress,
    /// Summary available, details pending.
    Summarized,
    /// Processing finished; the resource is usable.
    Finished,
    /// Upload in progress.
    Uploading,
    /// Processing failed.
    Faulty,
    /// Status could not be determined.
    Unknown,
    /// Resource can be run on demand.
    Runnable,
}

impl ResourceStatus {
    /// Returns the wire code for the status.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Waiting => 0,
            Self::Queued => 1,
            Self::Started => 2,
            Self::InProgress => 3,
            Self::Summarized => 4,
            Self::Finished => 5,
            Self::Uploading => 6,
            Self::Faulty => -1,
            Self::Unknown => -2,
            Self::Runnable => -3,
        }
    }

    /// Maps a wire code to a status.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Waiting,
            1 => Self::Queued,
            2 => Self::Started,
            3 => Self::InProgress,
            4 => Self::Summarized,
            5 => Self::Finished,
            6 => Self::Uploading,
            -1 => Self::Faulty,
            -3 => Self::Runnable,
            _ => Self::Unknown,
        }
    }

    /// Returns true once the resource will not change status again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Faulty)
    }

    /// Returns a stable label for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Queued => "queued",
            Self::Started => "started",
            Self::InProgress => "in_progress",
            Self::Summarized => "summarized",
            Self::Finished => "finished",
            Self::Uploading => "uploading",
            Self::Faulty => "faulty",
            Self::Unknown => "unknown",
            Self::Runnable => "runnable",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.code())
    }
}

// ============================================================================
// SECTION: Status Extraction
// ============================================================================

/// Status block extracted from a resource body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusInfo {
    /// Classified lifecycle status.
    pub status: ResourceStatus,
    /// Raw wire code as reported by the service.
    pub code: i64,
    /// Human-readable status message.
    pub message: String,
    /// Completion ratio in `[0, 1]` when reported.
    pub progress: Option<f64>,
    /// Elapsed processing time in milliseconds when reported.
    pub elapsed_ms: Option<u64>,
}

/// Extracts the status block from a resource body or a full resource record.
///
/// Accepts either the resource body itself or a record wrapping it under
/// `object`. A missing or malformed status maps to [`ResourceStatus::Unknown`].
#[must_use]
pub fn get_status(resource: &Value) -> StatusInfo {
    let body = match resource.get("object") {
        Some(object @ Value::Object(_)) => object,
        _ => resource,
    };
    let Some(status) = body.get("status").and_then(Value::as_object) else {
        return StatusInfo {
            status: ResourceStatus::Unknown,
            code: ResourceStatus::Unknown.code(),
            message: "status unavailable".to_string(),
            progress: None,
            elapsed_ms: None,
        };
    };
    let code = status.get("code").and_then(Value::as_i64).unwrap_or(ResourceStatus::Unknown.code());
    StatusInfo {
        status: ResourceStatus::from_code(code),
        code,
        message: status.get("message").and_then(Value::as_str).unwrap_or_default().to_string(),
        progress: status.get("progress").and_then(Value::as_f64),
        elapsed_ms: status.get("elapsed").and_then(Value::as_u64),
    }
}
