// crates/ensemble-harness-steps/src/steps/mod.rs
// ============================================================================
// Module: Step Definitions
// Description: Step functions grouped by resource kind.
// Purpose: Expose the step surface a scenario runner binds to.
// ============================================================================

//! ## Overview
//! Step functions take an explicit [`crate::ScenarioContext`] and return
//! [`crate::StepError`] on failure.

pub mod ensemble;
