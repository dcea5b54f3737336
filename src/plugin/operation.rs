//! Binary operation capability
//!
//! Every plugin, whether it comes from a package or is linked into the host,
//! implements [`BinaryOperation`].

use thiserror::Error;

/// Failure raised by a single `operate` call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// The plugin trapped while computing the result
    #[error("plugin trapped: {0}")]
    Trap(String),

    /// The plugin exceeded its execution budget
    #[error("plugin ran out of fuel")]
    OutOfFuel,

    /// Any other host-side failure while calling the plugin
    #[error("{0}")]
    Host(String),
}

/// A named operation over two numeric operands
///
/// `name` must be non-empty and must not change for the lifetime of the
/// instance. `operate` must be safe to call repeatedly and from several
/// threads at once.
pub trait BinaryOperation: Send + Sync {
    /// Name the operation is registered under
    fn name(&self) -> &str;

    /// Applies the operation to `lhs` and `rhs`
    fn operate(&self, lhs: f64, rhs: f64) -> Result<f64, OperationError>;
}

/// A [`BinaryOperation`] backed by a plain function
///
/// Used for operations linked into the host and registered on the base scope.
#[derive(Debug, Clone)]
pub struct FnOperation {
    name: String,
    op: fn(f64, f64) -> f64,
}

impl FnOperation {
    pub fn new(name: impl Into<String>, op: fn(f64, f64) -> f64) -> Self {
        Self {
            name: name.into(),
            op,
        }
    }
}

impl BinaryOperation for FnOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn operate(&self, lhs: f64, rhs: f64) -> Result<f64, OperationError> {
        Ok((self.op)(lhs, rhs))
    }
}
