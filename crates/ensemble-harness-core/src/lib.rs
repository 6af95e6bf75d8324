// crates/ensemble-harness-core/src/lib.rs
// ============================================================================
// Module: Ensemble Harness Core
// Description: Shared identifiers, status codes, and the remote API seam.
// Purpose: Give every harness crate one vocabulary for remote resources.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Core types for driving a remote machine-learning service: opaque resource
//! identifiers, lifecycle status codes, the response envelope returned by
//! create/read calls, and the [`ResourceApi`] trait that step definitions and
//! local wrappers consume. The crate performs no network I/O itself; it only
//! writes export files through the default [`ResourceApi::export`].
//! Invariants:
//! - Resource identifiers are opaque `"<type>/<id>"` strings.
//! - Status extraction never fails; missing status maps to `UNKNOWN`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::identifiers::ResourceId;
pub use crate::core::identifiers::ResourceType;
pub use crate::core::resource::ResourceEnvelope;
pub use crate::core::resource::read_json_file;
pub use crate::core::resource::resource_body;
pub use crate::core::resource::write_json_file;
pub use crate::core::status::*;
pub use crate::interfaces::ApiError;
pub use crate::interfaces::ResourceApi;
pub use crate::interfaces::component_ids;
