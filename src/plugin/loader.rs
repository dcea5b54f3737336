//! Isolated plugin loading
//!
//! Loads one candidate package: opens a fresh [`PackageScope`] for it, reads
//! its manifest, resolves the entry-point type and constructs it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use super::error::CandidateError;
use super::manifest::read_manifest;
use super::operation::BinaryOperation;
use super::scope::{BaseScope, PackageScope, TypeOrigin};

/// A successfully constructed plugin, ready for registration
#[derive(Clone)]
pub struct LoadedPlugin {
    /// Name the operation declared for itself
    pub name: String,

    /// Entry-point type named by the manifest
    pub entry_point: String,

    /// Package the plugin came from
    pub source: PathBuf,

    /// Whether the entry point resolved from the base scope or the package
    pub origin: TypeOrigin,

    /// The constructed operation
    pub operation: Arc<dyn BinaryOperation>,
}

impl fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("name", &self.name)
            .field("entry_point", &self.entry_point)
            .field("source", &self.source)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Loads the package at `path` in its own scope chained to `base`
pub fn load_plugin(path: &Path, base: &BaseScope) -> Result<LoadedPlugin, CandidateError> {
    info!(package = %path.display(), "initialising plugin");

    let mut scope = PackageScope::open(path, base)?;
    let entry_point = read_manifest(&mut scope)?;
    info!(package = %path.display(), entry_point = %entry_point, "loading plugin type");

    let handle = scope.resolve_type(&entry_point)?;
    debug!(
        scope = %scope.id(),
        entry_point = %entry_point,
        origin = ?handle.origin(),
        "resolved entry point"
    );
    let operation = scope.instantiate(&handle)?;

    Ok(LoadedPlugin {
        name: operation.name().to_string(),
        entry_point,
        source: path.to_path_buf(),
        origin: handle.origin(),
        operation,
    })
}
