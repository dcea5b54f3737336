//! Invocation fan-out
//!
//! Calls every registered plugin with the same operands. A plugin that fails,
//! or returns a value that is not a finite number, gets an error in its own
//! slot; the remaining plugins are unaffected.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::operation::OperationError;
use super::registry::PluginRegistry;

/// Why a plugin has no result
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvocationError {
    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error("result is not a finite number: {0}")]
    NonFinite(f64),
}

/// Per-plugin results of one fan-out
#[derive(Debug, Default)]
pub struct Invocation {
    results: HashMap<String, Result<f64, InvocationError>>,
}

/// One row of an [`Invocation`], for structured output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationRow<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Invocation {
    /// Gets the slot of one plugin
    pub fn get(&self, name: &str) -> Option<&Result<f64, InvocationError>> {
        self.results.get(name)
    }

    /// Gets the value of one plugin, `None` when absent or failed
    pub fn value(&self, name: &str) -> Option<f64> {
        self.results.get(name)?.as_ref().ok().copied()
    }

    /// Iterates over slots in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Result<f64, InvocationError>)> {
        self.results.iter().map(|(name, slot)| (name.as_str(), slot))
    }

    /// Slots sorted by plugin name
    pub fn sorted(&self) -> Vec<(&str, &Result<f64, InvocationError>)> {
        let mut slots: Vec<_> = self.iter().collect();
        slots.sort_unstable_by(|a, b| a.0.cmp(b.0));
        slots
    }

    /// Rows sorted by plugin name
    pub fn rows(&self) -> Vec<InvocationRow<'_>> {
        self.sorted()
            .into_iter()
            .map(|(name, slot)| InvocationRow {
                name,
                result: slot.as_ref().ok().copied(),
                error: slot.as_ref().err().map(ToString::to_string),
            })
            .collect()
    }

    /// Failed slots, sorted by plugin name
    pub fn errors(&self) -> Vec<(&str, &InvocationError)> {
        self.sorted()
            .into_iter()
            .filter_map(|(name, slot)| slot.as_ref().err().map(|e| (name, e)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Runs every plugin in `registry` against `lhs` and `rhs`
pub fn invoke_all(registry: &PluginRegistry, lhs: f64, rhs: f64) -> Invocation {
    let mut results = HashMap::with_capacity(registry.len());

    for plugin in registry.iter() {
        let slot = match plugin.operation.operate(lhs, rhs) {
            Ok(value) if value.is_finite() => Ok(value),
            Ok(value) => Err(InvocationError::NonFinite(value)),
            Err(e) => Err(InvocationError::Operation(e)),
        };

        match &slot {
            Ok(value) => debug!(name = %plugin.name, lhs, rhs, value, "plugin invoked"),
            Err(e) => warn!(name = %plugin.name, lhs, rhs, error = %e, "plugin invocation failed"),
        }
        results.insert(plugin.name.clone(), slot);
    }

    Invocation { results }
}
