// crates/ensemble-harness-config/src/lib.rs
// ============================================================================
// Module: Ensemble Harness Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for ensemble-harness.toml semantics.
// Dependencies: serde, toml, thiserror
// ============================================================================

//! ## Overview
//! `ensemble-harness-config` defines the configuration shared by the HTTP
//! client and the step runner: API endpoint and credentials, polling
//! cadence, and where step file arguments resolve.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
