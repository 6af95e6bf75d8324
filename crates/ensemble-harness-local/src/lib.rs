// crates/ensemble-harness-local/src/lib.rs
// ============================================================================
// Module: Ensemble Harness Local Wrappers
// Description: In-process reconstructions of finished remote resources.
// Purpose: Inspect ensembles and models offline after they finish remotely.
// Dependencies: ensemble-harness-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Local wrappers rebuild finished resources from the live API, from export
//! files, or from in-memory lists, and expose the derived data the steps
//! assert on: constituent model ids, field importance, and the source
//! resource id. Prediction itself is not implemented here.
//! Invariants:
//! - Wrappers are immutable after construction.
//! - Only finished resources can be wrapped.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod ensemble;
pub mod error;
pub mod importance;
pub mod model;
pub mod predictor;
pub mod storage;
pub mod supervised;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use ensemble::EnsembleView;
pub use ensemble::LocalEnsemble;
pub use ensemble::MultiModel;
pub use error::LocalError;
pub use importance::FieldImportance;
pub use model::FieldInfo;
pub use model::LocalModel;
pub use predictor::EnsemblePredictor;
pub use storage::ENSEMBLE_FILE;
pub use storage::load_full_ensemble;
pub use storage::read_ensemble_file;
pub use supervised::SupervisedModel;
