//! Per-candidate outcomes of the loading pipeline
//!
//! A candidate package either loads, is skipped (expected, e.g. no manifest),
//! or fails (unexpected, e.g. the entry point cannot be resolved). Neither of
//! the latter two aborts discovery.

use std::path::PathBuf;

use thiserror::Error;

/// Expected reason for leaving a candidate out of the registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("manifest resource `{resource}` not found")]
    MissingManifest { resource: &'static str },

    #[error("manifest does not declare `{key}`")]
    MissingEntryPoint { key: &'static str },
}

/// Unexpected failure while loading a candidate
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("not a readable plugin archive: {reason}")]
    Archive { reason: String },

    #[error("invalid manifest: {reason}")]
    Manifest { reason: String },

    #[error("type `{type_name}` not found")]
    TypeNotFound { type_name: String },

    #[error("type `{type_name}` depends on `{dependency}`, which was not found")]
    DependencyNotFound {
        type_name: String,
        dependency: String,
    },

    #[error("type `{type_name}` has a cyclic dependency through `{dependency}`")]
    DependencyCycle {
        type_name: String,
        dependency: String,
    },

    #[error("type `{type_name}` failed to compile: {reason}")]
    Compile { type_name: String, reason: String },

    #[error("type `{type_name}` failed to construct: {reason}")]
    Construct { type_name: String, reason: String },

    #[error("type `{type_name}` does not implement the operation capability: {reason}")]
    MissingCapability { type_name: String, reason: String },

    #[error("type `{type_name}` declared an invalid name: {reason}")]
    InvalidName { type_name: String, reason: String },

    #[error("type `{type_name}` was resolved by another scope")]
    ScopeMismatch { type_name: String },
}

impl LoadError {
    /// The type the failure is about, if any
    pub fn type_name(&self) -> Option<&str> {
        match self {
            LoadError::Archive { .. } | LoadError::Manifest { .. } => None,
            LoadError::TypeNotFound { type_name }
            | LoadError::DependencyNotFound { type_name, .. }
            | LoadError::DependencyCycle { type_name, .. }
            | LoadError::Compile { type_name, .. }
            | LoadError::Construct { type_name, .. }
            | LoadError::MissingCapability { type_name, .. }
            | LoadError::InvalidName { type_name, .. }
            | LoadError::ScopeMismatch { type_name } => Some(type_name),
        }
    }
}

/// Why a candidate did not produce a plugin
#[derive(Debug, Error)]
pub enum CandidateError {
    #[error("skipped: {0}")]
    Skipped(#[from] SkipReason),

    #[error("failed: {0}")]
    Failed(#[from] LoadError),
}

impl CandidateError {
    pub fn is_skip(&self) -> bool {
        matches!(self, CandidateError::Skipped(_))
    }
}

/// Fatal error for a whole discovery pass
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("plugin directory does not exist: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("plugin path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("plugin directory could not be read: {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
