//! Plugin registry
//!
//! Maps operation names to loaded plugins. Registering a name that is already
//! present replaces the earlier plugin; the caller learns about it through the
//! returned [`Registration`] and decides how loudly to report it.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use super::loader::LoadedPlugin;
use super::operation::BinaryOperation;

/// A plugin held by the registry
#[derive(Clone)]
pub struct RegisteredPlugin {
    pub name: String,
    pub entry_point: String,

    /// Package the plugin came from, `None` for plugins registered directly
    pub source: Option<PathBuf>,

    pub operation: Arc<dyn BinaryOperation>,
}

impl RegisteredPlugin {
    /// Wraps an operation that did not come from a package
    pub fn direct(operation: Arc<dyn BinaryOperation>) -> Self {
        Self {
            name: operation.name().to_string(),
            entry_point: String::new(),
            source: None,
            operation,
        }
    }
}

impl From<LoadedPlugin> for RegisteredPlugin {
    fn from(plugin: LoadedPlugin) -> Self {
        Self {
            name: plugin.name,
            entry_point: plugin.entry_point,
            source: Some(plugin.source),
            operation: plugin.operation,
        }
    }
}

impl fmt::Debug for RegisteredPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredPlugin")
            .field("name", &self.name)
            .field("entry_point", &self.entry_point)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Result of [`PluginRegistry::register`]
#[derive(Debug)]
pub enum Registration {
    /// The name was free
    Inserted,

    /// The name was taken; the previous plugin was replaced and is returned
    Replaced(RegisteredPlugin),
}

impl Registration {
    pub fn is_replace(&self) -> bool {
        matches!(self, Registration::Replaced(_))
    }
}

/// Name to plugin table
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, RegisteredPlugin>,
}

impl PluginRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a plugin under its name, replacing any previous holder
    pub fn register(&mut self, plugin: impl Into<RegisteredPlugin>) -> Registration {
        let plugin = plugin.into();
        match self.plugins.insert(plugin.name.clone(), plugin) {
            Some(previous) => Registration::Replaced(previous),
            None => Registration::Inserted,
        }
    }

    /// Gets a plugin by name
    pub fn get(&self, name: &str) -> Option<&RegisteredPlugin> {
        self.plugins.get(name)
    }

    /// Iterates over all plugins in no particular order
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredPlugin> {
        self.plugins.values()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Drops every plugin
    pub fn clear(&mut self) {
        self.plugins.clear();
    }
}
