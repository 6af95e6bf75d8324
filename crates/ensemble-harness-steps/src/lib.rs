// crates/ensemble-harness-steps/src/lib.rs
// ============================================================================
// Module: Ensemble Harness Steps
// Description: Behaviour-driven step definitions for ensemble scenarios.
// Purpose: Drive create, wait, local-build, and assertion steps end to end.
// Dependencies: ensemble-harness-{core,config,client,local}, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Each step is a plain function taking an explicit [`ScenarioContext`].
//! Steps that can reuse work across scenarios also take the
//! [`SharedResources`] memo, which outlives [`ScenarioContext::reset`].
//! Every step records started/succeeded/failed events through the
//! context's [`StepAuditSink`].
//! Invariants:
//! - Steps are strictly sequential; the context is borrowed mutably.
//! - Assertion failures are returned as [`StepError`], never panics.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod context;
pub mod error;
pub mod shared;
pub mod steps;
pub mod wait;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::StepAuditEvent;
pub use audit::StepAuditSink;
pub use audit::StepFileAuditSink;
pub use audit::StepMemoryAuditSink;
pub use audit::StepNoopAuditSink;
pub use audit::StepOutcome;
pub use audit::StepStderrAuditSink;
pub use context::FaultyResource;
pub use context::LocalEnsembleHandle;
pub use context::ScenarioContext;
pub use error::StepError;
pub use shared::SharedResources;
pub use wait::WaitOutcome;
pub use wait::wait_until_status_code_is;
