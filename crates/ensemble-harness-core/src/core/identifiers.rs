// crates/ensemble-harness-core/src/core/identifiers.rs
// ============================================================================
// Module: Resource Identifiers
// Description: Opaque identifiers for remote resources.
// Purpose: Provide typed access to resource kind and on-disk file names.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Remote resources are addressed by `"<type>/<id>"` strings such as
//! `ensemble/5143a51a37203f2cf7020351`. [`ResourceId`] keeps the raw string
//! and derives the resource kind and the flat file name used when a resource
//! is exported next to its parent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Resource Types
// ============================================================================

/// Resource kinds the harness interacts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// Project grouping resources.
    Project,
    /// Uploaded data source.
    Source,
    /// Dataset built from a source.
    Dataset,
    /// Single decision-tree model.
    Model,
    /// Ensemble of models.
    Ensemble,
    /// Any other resource kind.
    Other,
}

impl ResourceType {
    /// Returns the URL path segment for the resource kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Source => "source",
            Self::Dataset => "dataset",
            Self::Model => "model",
            Self::Ensemble => "ensemble",
            Self::Other => "other",
        }
    }

    /// Maps a URL path segment to a resource kind.
    #[must_use]
    pub fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "project" => Self::Project,
            "source" => Self::Source,
            "dataset" => Self::Dataset,
            "model" => Self::Model,
            "ensemble" => Self::Ensemble,
            _ => Self::Other,
        }
    }

    /// Returns true for resources composed of other model resources.
    #[must_use]
    pub const fn is_composite(self) -> bool {
        matches!(self, Self::Ensemble)
    }
}

// ============================================================================
// SECTION: Resource Identifier
// ============================================================================

/// Identifier of a remote resource.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Creates a new resource identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the resource kind encoded in the identifier prefix.
    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        self.0.split_once('/').map_or(ResourceType::Other, |(prefix, _)| {
            ResourceType::from_prefix(prefix)
        })
    }

    /// Returns the file name used for the resource inside an export directory.
    ///
    /// Every `/` is replaced by `_`, so `model/abc` becomes `model_abc`.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.0.replace('/', "_")
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ResourceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
