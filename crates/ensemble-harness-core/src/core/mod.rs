// crates/ensemble-harness-core/src/core/mod.rs
// ============================================================================
// Module: Core Resource Model
// Description: Identifier, status, and envelope types for remote resources.
// Purpose: Group the data model shared by client, local, and step crates.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Data model for remote resources. Types here are plain values with no I/O
//! beyond the JSON file helpers in [`resource`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod identifiers;
pub mod resource;
pub mod status;
