// crates/ensemble-harness-client/src/lib.rs
// ============================================================================
// Module: Ensemble Harness Client
// Description: HTTP client for the remote resource service.
// Purpose: Provide the live backend behind the resource API seam.
// Dependencies: ensemble-harness-core, ensemble-harness-config, reqwest
// ============================================================================

//! ## Overview
//! This crate ships [`HttpResourceApi`], a blocking implementation of
//! [`ensemble_harness_core::ResourceApi`] configured from
//! [`ensemble_harness_config::ApiConfig`].
//! Invariants:
//! - Non-2xx responses are returned as rejected envelopes, not errors.
//! - Response bodies are bounded by [`http::MAX_RESPONSE_BYTES`] by default.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod http;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use http::HttpResourceApi;
