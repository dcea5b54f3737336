//! Plugin host
//!
//! Owns the base scope and the registry for the lifetime of the application:
//! built empty, filled by [`PluginHost::init`], emptied by [`PluginHost::close`].

use std::path::Path;

use tracing::info;

use super::discovery::{discover_into, DiscoveryReport};
use super::error::DiscoveryError;
use super::invoke::{invoke_all, Invocation};
use super::registry::PluginRegistry;
use super::scope::{BaseScope, PluginLimits, ScopeError};
use crate::config::HostConfig;

/// Default package file extension
pub const DEFAULT_PACKAGE_EXTENSION: &str = "zip";

/// Application object tying discovery, registry and invocation together
pub struct PluginHost {
    base: BaseScope,
    registry: PluginRegistry,
    extension: String,
}

impl PluginHost {
    /// Creates a host with an empty registry
    pub fn new(limits: PluginLimits, extension: impl Into<String>) -> Result<Self, ScopeError> {
        Ok(Self {
            base: BaseScope::new(limits)?,
            registry: PluginRegistry::new(),
            extension: extension.into(),
        })
    }

    /// Creates a host from configuration
    pub fn from_config(config: &HostConfig) -> Result<Self, ScopeError> {
        Self::new(config.limits, config.package_extension.trim())
    }

    /// Discovers the packages in `plugin_dir` into the registry
    pub fn init(&mut self, plugin_dir: &Path) -> Result<DiscoveryReport, DiscoveryError> {
        info!(dir = %plugin_dir.display(), "initialising plugin host");
        discover_into(plugin_dir, &self.base, &self.extension, &mut self.registry)
    }

    /// Runs every registered plugin
    pub fn run_all(&self, lhs: f64, rhs: f64) -> Invocation {
        invoke_all(&self.registry, lhs, rhs)
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Base scope, for registering native types and shared modules before `init`
    pub fn base_scope_mut(&mut self) -> &mut BaseScope {
        &mut self.base
    }

    pub fn base_scope(&self) -> &BaseScope {
        &self.base
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Releases every registered plugin
    pub fn close(&mut self) {
        info!(plugins = self.registry.len(), "closing plugin host");
        self.registry.clear();
    }
}
