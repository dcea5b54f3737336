//! # Plugin System
//!
//! Discovers binary operation plugins, loads each one in isolation and runs
//! them all against the same operands.
//!
//! ## Overview
//!
//! A plugin package is a zip archive of WebAssembly modules plus a manifest.
//! Packages are discovered as direct children of a plugin directory by file
//! extension (`.zip` by default, matched case-insensitively).
//!
//! ```text
//! add.zip
//! ├── plugin.properties        # entrypoint=calc.ops.Addition
//! └── calc/ops/Addition.wat    # or Addition.wasm
//! ```
//!
//! ## Pipeline
//!
//! ```text
//! discover(dir)
//!  ├── find_candidates        sorted *.zip files
//!  └── for each candidate
//!       ├── PackageScope::open     own scope, parent = BaseScope
//!       ├── read_manifest          Skip if missing manifest / entrypoint
//!       ├── resolve_type           base first, then the package
//!       ├── instantiate            link imports, construct, check exports
//!       └── PluginRegistry::register   last registration wins
//! ```
//!
//! Skips and load failures are recorded in the [`DiscoveryReport`] and never
//! abort the pass. Only a missing or unreadable plugin directory is fatal.
//!
//! ## Key Types
//!
//! - [`BinaryOperation`] - Capability every plugin implements
//! - [`BaseScope`] / [`PackageScope`] - Two-level type resolution chain
//! - [`PluginRegistry`] - Name to plugin table
//! - [`PluginHost`] - Owns scope and registry, runs the fan-out

mod discovery;
mod error;
mod host;
mod invoke;
mod loader;
mod manifest;
mod operation;
mod registry;
mod scope;
mod wasm;

pub use discovery::{
    discover, discover_into, find_candidates, CandidateOutcome, CandidateStatus, Discovery,
    DiscoveryReport,
};
pub use error::{CandidateError, DiscoveryError, LoadError, SkipReason};
pub use host::{PluginHost, DEFAULT_PACKAGE_EXTENSION};
pub use invoke::{invoke_all, Invocation, InvocationError, InvocationRow};
pub use loader::{load_plugin, LoadedPlugin};
pub use manifest::{read_manifest, Manifest, ENTRY_POINT_KEY, MANIFEST_RESOURCE};
pub use operation::{BinaryOperation, FnOperation, OperationError};
pub use registry::{PluginRegistry, RegisteredPlugin, Registration};
pub use scope::{
    BaseScope, NativeConstructor, PackageScope, PluginLimits, ScopeError, ScopeId, TypeHandle,
    TypeOrigin, DEFAULT_MAX_ENTRY_SIZE, HOST_MODULE,
};
pub use wasm::WasmOperation;
