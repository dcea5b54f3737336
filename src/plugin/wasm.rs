//! Wasm-backed binary operations
//!
//! A module satisfies the operation capability when its instance exports:
//!
//! | Export | Signature | Meaning |
//! |--------|-----------|---------|
//! | `memory` | memory | holds the name string |
//! | `name` | `() -> (i32, i32)` | pointer and length of a UTF-8 name |
//! | `operate` | `(f64, f64) -> f64` | the operation itself |
//! | `_initialize` | `() -> ()` | optional, run once after instantiation |

use std::sync::Mutex;

use wasmtime::{Linker, Module, Store, Trap, TypedFunc};

use super::error::LoadError;
use super::operation::{BinaryOperation, OperationError};
use super::scope::ScopeState;

const INITIALIZE_EXPORT: &str = "_initialize";

struct Bound {
    store: Store<ScopeState>,
    operate: TypedFunc<(f64, f64), f64>,
}

/// An operation implemented by a wasm instance
///
/// The instance lives in its own store; calls are serialized through a mutex.
pub struct WasmOperation {
    name: String,
    type_name: String,
    invoke_fuel: u64,
    bound: Mutex<Bound>,
}

impl WasmOperation {
    /// Instantiates `module` in `store`, runs its initializer and checks its exports
    pub(crate) fn construct(
        type_name: &str,
        module: &Module,
        linker: &Linker<ScopeState>,
        mut store: Store<ScopeState>,
        invoke_fuel: u64,
    ) -> Result<Self, LoadError> {
        let instance = linker
            .instantiate(&mut store, module)
            .map_err(|e| construct_error(type_name, e))?;

        if let Some(initialize) = instance.get_func(&mut store, INITIALIZE_EXPORT) {
            let initialize = initialize
                .typed::<(), ()>(&store)
                .map_err(|e| missing_capability(type_name, INITIALIZE_EXPORT, e))?;
            initialize
                .call(&mut store, ())
                .map_err(|e| construct_error(type_name, e))?;
        }

        let memory =
            instance
                .get_memory(&mut store, "memory")
                .ok_or_else(|| LoadError::MissingCapability {
                    type_name: type_name.to_string(),
                    reason: "no `memory` export".to_string(),
                })?;
        let name_fn = instance
            .get_typed_func::<(), (i32, i32)>(&mut store, "name")
            .map_err(|e| missing_capability(type_name, "name", e))?;
        let operate = instance
            .get_typed_func::<(f64, f64), f64>(&mut store, "operate")
            .map_err(|e| missing_capability(type_name, "operate", e))?;

        let (ptr, len) = name_fn
            .call(&mut store, ())
            .map_err(|e| construct_error(type_name, e))?;
        let name = read_str(memory.data(&store), ptr, len)
            .map_err(|reason| LoadError::InvalidName {
                type_name: type_name.to_string(),
                reason,
            })?
            .to_string();

        Ok(Self {
            name,
            type_name: type_name.to_string(),
            invoke_fuel,
            bound: Mutex::new(Bound { store, operate }),
        })
    }

    /// Entry-point type this operation was built from
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

impl BinaryOperation for WasmOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn operate(&self, lhs: f64, rhs: f64) -> Result<f64, OperationError> {
        let mut bound = self
            .bound
            .lock()
            .map_err(|_| OperationError::Host("plugin state is poisoned".to_string()))?;
        let Bound { store, operate } = &mut *bound;

        store
            .set_fuel(self.invoke_fuel)
            .map_err(|e| OperationError::Host(format!("{e:#}")))?;
        operate
            .call(&mut *store, (lhs, rhs))
            .map_err(operation_error)
    }
}

/// Reads `len` bytes at `ptr` from linear memory as UTF-8
pub(crate) fn read_str(memory: &[u8], ptr: i32, len: i32) -> Result<&str, String> {
    let start = usize::try_from(ptr).map_err(|_| format!("negative pointer {ptr}"))?;
    let len = usize::try_from(len).map_err(|_| format!("negative length {len}"))?;
    let bytes = start
        .checked_add(len)
        .and_then(|end| memory.get(start..end))
        .ok_or_else(|| format!("range {start}+{len} is outside of memory"))?;
    std::str::from_utf8(bytes).map_err(|e| format!("not UTF-8: {e}"))
}

pub(crate) fn construct_error(type_name: &str, err: wasmtime::Error) -> LoadError {
    LoadError::Construct {
        type_name: type_name.to_string(),
        reason: format!("{err:#}"),
    }
}

fn missing_capability(type_name: &str, export: &str, err: wasmtime::Error) -> LoadError {
    LoadError::MissingCapability {
        type_name: type_name.to_string(),
        reason: format!("`{export}`: {err:#}"),
    }
}

fn operation_error(err: wasmtime::Error) -> OperationError {
    match err.downcast_ref::<Trap>() {
        Some(Trap::OutOfFuel) => OperationError::OutOfFuel,
        Some(trap) => OperationError::Trap(trap.to_string()),
        None => OperationError::Trap(format!("{err:#}")),
    }
}
