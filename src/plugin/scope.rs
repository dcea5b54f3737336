//! Loading scopes
//!
//! Types are resolved through a two-level chain:
//!
//! ```text
//! BaseScope (shared, read-only)
//!  ├── engine + `host` import module
//!  ├── native types linked into the host
//!  └── shared compiled modules
//!        ▲             ▲
//!        │ parent      │ parent
//! PackageScope(a.zip)  PackageScope(b.zip)
//! ```
//!
//! A [`PackageScope`] asks its parent first and falls back to the modules in
//! its own archive. Each package gets its own scope, and every instance it
//! creates lives in its own wasm store, so one package can never see another
//! package's types or state.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use wasmtime::{Caller, Config, Engine, Extern, Linker, Module, Store};
use zip::result::ZipError;
use zip::ZipArchive;

use super::error::LoadError;
use super::operation::BinaryOperation;
use super::wasm::{construct_error, read_str, WasmOperation};

/// Import module name served by the base scope
pub const HOST_MODULE: &str = "host";

const MODULE_EXTENSIONS: &[&str] = &["wasm", "wat"];

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// Errors building the base scope
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("failed to create wasm engine: {0}")]
    Engine(String),

    #[error("failed to define host import `{name}`: {reason}")]
    HostImport { name: &'static str, reason: String },

    #[error("shared module `{type_name}` failed to compile: {reason}")]
    SharedModule { type_name: String, reason: String },
}

/// Default cap on a single archive entry (16 MiB)
pub const DEFAULT_MAX_ENTRY_SIZE: u64 = 16 * 1024 * 1024;

/// Resource budget for plugin packages and plugin code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginLimits {
    /// Fuel for instantiating a plugin and reading its name
    pub instantiate_fuel: u64,

    /// Fuel for a single `operate` call
    pub invoke_fuel: u64,

    /// Largest uncompressed archive entry that will be read, in bytes
    pub max_entry_size: u64,
}

impl Default for PluginLimits {
    fn default() -> Self {
        Self {
            instantiate_fuel: 10_000_000,
            invoke_fuel: 1_000_000,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
        }
    }
}

/// Process-unique identity of a package scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u64);

impl ScopeId {
    fn next() -> Self {
        Self(NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope-{}", self.0)
    }
}

/// Constructor of a native type linked into the host
pub type NativeConstructor = Arc<dyn Fn() -> Arc<dyn BinaryOperation> + Send + Sync>;

/// Per-store state seen by host imports
pub(crate) struct ScopeState {
    scope: ScopeId,
    package: String,
}

/// Shared parent of every package scope
pub struct BaseScope {
    engine: Engine,
    linker: Linker<ScopeState>,
    natives: HashMap<String, NativeConstructor>,
    shared: HashMap<String, Module>,
    limits: PluginLimits,
}

impl BaseScope {
    /// Creates a base scope with the `host` import module defined
    pub fn new(limits: PluginLimits) -> Result<Self, ScopeError> {
        let mut config = Config::new();
        config.consume_fuel(true);
        let engine = Engine::new(&config).map_err(|e| ScopeError::Engine(format!("{e:#}")))?;

        let mut linker = Linker::new(&engine);
        linker
            .func_wrap(HOST_MODULE, "log", host_log)
            .map_err(|e| ScopeError::HostImport {
                name: "log",
                reason: format!("{e:#}"),
            })?;

        Ok(Self {
            engine,
            linker,
            natives: HashMap::new(),
            shared: HashMap::new(),
            limits,
        })
    }

    /// Makes a native type resolvable from every package
    pub fn register_native<F>(&mut self, type_name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Arc<dyn BinaryOperation> + Send + Sync + 'static,
    {
        self.natives.insert(type_name.into(), Arc::new(constructor));
    }

    /// Compiles a module that every package may resolve or depend on
    ///
    /// `bytes` may be a binary module or its text format.
    pub fn register_shared_module(
        &mut self,
        type_name: impl Into<String>,
        bytes: impl AsRef<[u8]>,
    ) -> Result<(), ScopeError> {
        let type_name = type_name.into();
        let module =
            Module::new(&self.engine, bytes.as_ref()).map_err(|e| ScopeError::SharedModule {
                type_name: type_name.clone(),
                reason: format!("{e:#}"),
            })?;
        self.shared.insert(type_name, module);
        Ok(())
    }

    pub fn limits(&self) -> PluginLimits {
        self.limits
    }

    /// Names of all types the base scope provides, sorted
    pub fn type_names(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self.natives.keys().chain(self.shared.keys()).collect();
        names.into_iter().cloned().collect()
    }

    fn resolve(&self, type_name: &str) -> Option<TypeKind> {
        if let Some(constructor) = self.natives.get(type_name) {
            return Some(TypeKind::Native(constructor.clone()));
        }
        self.shared
            .get(type_name)
            .map(|module| TypeKind::Module(module.clone()))
    }
}

/// Where a resolved type came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOrigin {
    Base,
    Package,
}

#[derive(Clone)]
enum TypeKind {
    Native(NativeConstructor),
    Module(Module),
}

/// A type resolved by one package scope
///
/// Handles are only valid in the scope that produced them.
#[derive(Clone)]
pub struct TypeHandle {
    scope: ScopeId,
    name: String,
    origin: TypeOrigin,
    kind: TypeKind,
}

impl TypeHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn origin(&self) -> TypeOrigin {
        self.origin
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            TypeKind::Native(_) => "native",
            TypeKind::Module(_) => "module",
        };
        f.debug_struct("TypeHandle")
            .field("scope", &self.scope)
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("kind", &kind)
            .finish()
    }
}

/// Isolation scope over one package archive
pub struct PackageScope<'base> {
    id: ScopeId,
    base: &'base BaseScope,
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
    compiled: HashMap<String, Module>,
}

impl<'base> PackageScope<'base> {
    /// Opens the package at `path` as a new scope parented to `base`
    pub fn open(path: impl AsRef<Path>, base: &'base BaseScope) -> Result<Self, LoadError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| LoadError::Archive {
            reason: e.to_string(),
        })?;
        let archive = ZipArchive::new(BufReader::new(file)).map_err(|e| LoadError::Archive {
            reason: e.to_string(),
        })?;

        let id = ScopeId::next();
        debug!(scope = %id, package = %path.display(), "opened package scope");

        Ok(Self {
            id,
            base,
            path,
            archive,
            compiled: HashMap::new(),
        })
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads a resource from the package itself
    ///
    /// Returns `Ok(None)` when the package has no such entry.
    pub fn read_resource(&mut self, name: &str) -> Result<Option<Vec<u8>>, LoadError> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => {
                return Err(LoadError::Archive {
                    reason: format!("{name}: {e}"),
                })
            }
        };

        let max_size = self.base.limits.max_entry_size;
        let too_large = || LoadError::Archive {
            reason: format!("{name}: entry too large (max {max_size} bytes)"),
        };
        if entry.size() > max_size {
            return Err(too_large());
        }

        // The declared size comes from the archive itself, so the read is capped too
        let mut bytes = Vec::new();
        entry
            .by_ref()
            .take(max_size.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(|e| LoadError::Archive {
                reason: format!("{name}: {e}"),
            })?;
        if bytes.len() as u64 > max_size {
            return Err(too_large());
        }
        Ok(Some(bytes))
    }

    /// Names of the module types packaged in the archive, sorted
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .archive
            .file_names()
            .filter_map(|entry| {
                let (stem, ext) = entry.rsplit_once('.')?;
                MODULE_EXTENSIONS
                    .contains(&ext)
                    .then(|| stem.replace('/', "."))
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Resolves a dotted type name, parent first
    pub fn resolve_type(&mut self, type_name: &str) -> Result<TypeHandle, LoadError> {
        if let Some(kind) = self.base.resolve(type_name) {
            return Ok(self.handle(type_name, TypeOrigin::Base, kind));
        }

        if let Some(module) = self.compiled.get(type_name) {
            let kind = TypeKind::Module(module.clone());
            return Ok(self.handle(type_name, TypeOrigin::Package, kind));
        }

        let Some(stem) = entry_stem(type_name) else {
            return Err(LoadError::TypeNotFound {
                type_name: type_name.to_string(),
            });
        };

        for ext in MODULE_EXTENSIONS {
            let entry = format!("{stem}.{ext}");
            let Some(bytes) = self.read_resource(&entry)? else {
                continue;
            };

            let module =
                Module::new(&self.base.engine, &bytes).map_err(|e| LoadError::Compile {
                    type_name: type_name.to_string(),
                    reason: format!("{e:#}"),
                })?;
            debug!(scope = %self.id, type_name, entry = %entry, "compiled package type");
            self.compiled.insert(type_name.to_string(), module.clone());
            return Ok(self.handle(type_name, TypeOrigin::Package, TypeKind::Module(module)));
        }

        Err(LoadError::TypeNotFound {
            type_name: type_name.to_string(),
        })
    }

    /// Constructs an instance of a type resolved by this scope
    pub fn instantiate(
        &mut self,
        handle: &TypeHandle,
    ) -> Result<Arc<dyn BinaryOperation>, LoadError> {
        if handle.scope != self.id {
            return Err(LoadError::ScopeMismatch {
                type_name: handle.name.clone(),
            });
        }

        let operation = match &handle.kind {
            TypeKind::Native(constructor) => constructor(),
            TypeKind::Module(module) => {
                let module = module.clone();
                Arc::new(self.instantiate_module(&handle.name, &module)?)
            }
        };

        if operation.name().trim().is_empty() {
            return Err(LoadError::InvalidName {
                type_name: handle.name.clone(),
                reason: "name is empty".to_string(),
            });
        }
        Ok(operation)
    }

    fn instantiate_module(
        &mut self,
        type_name: &str,
        module: &Module,
    ) -> Result<WasmOperation, LoadError> {
        let limits = self.base.limits;
        let mut store = Store::new(
            &self.base.engine,
            ScopeState {
                scope: self.id,
                package: self.path.display().to_string(),
            },
        );
        store
            .set_fuel(limits.instantiate_fuel)
            .map_err(|e| construct_error(type_name, e))?;

        let mut linker = self.base.linker.clone();
        let mut visiting = vec![type_name.to_string()];
        let mut linked = HashSet::new();
        self.link_dependencies(
            type_name,
            module,
            &mut linker,
            &mut store,
            &mut visiting,
            &mut linked,
        )?;

        WasmOperation::construct(type_name, module, &linker, store, limits.invoke_fuel)
    }

    /// Instantiates every type `module` imports into `store` and defines it on `linker`
    fn link_dependencies(
        &mut self,
        type_name: &str,
        module: &Module,
        linker: &mut Linker<ScopeState>,
        store: &mut Store<ScopeState>,
        visiting: &mut Vec<String>,
        linked: &mut HashSet<String>,
    ) -> Result<(), LoadError> {
        let dependencies: BTreeSet<String> = module
            .imports()
            .map(|import| import.module().to_string())
            .filter(|name| name != HOST_MODULE)
            .collect();

        for dependency in dependencies {
            if linked.contains(&dependency) {
                continue;
            }
            if visiting.contains(&dependency) {
                return Err(LoadError::DependencyCycle {
                    type_name: type_name.to_string(),
                    dependency,
                });
            }

            let dependency_module = match self.resolve_type(&dependency) {
                Ok(TypeHandle {
                    kind: TypeKind::Module(module),
                    ..
                }) => module,
                Ok(_) | Err(LoadError::TypeNotFound { .. }) => {
                    return Err(LoadError::DependencyNotFound {
                        type_name: type_name.to_string(),
                        dependency,
                    })
                }
                Err(e) => return Err(e),
            };

            visiting.push(dependency.clone());
            self.link_dependencies(
                &dependency,
                &dependency_module,
                linker,
                store,
                visiting,
                linked,
            )?;
            visiting.pop();

            let instance = linker
                .instantiate(&mut *store, &dependency_module)
                .map_err(|e| construct_error(&dependency, e))?;
            linker
                .instance(&mut *store, &dependency, instance)
                .map_err(|e| construct_error(&dependency, e))?;
            debug!(scope = %self.id, type_name, dependency = %dependency, "linked dependency");
            linked.insert(dependency);
        }

        Ok(())
    }

    fn handle(&self, type_name: &str, origin: TypeOrigin, kind: TypeKind) -> TypeHandle {
        TypeHandle {
            scope: self.id,
            name: type_name.to_string(),
            origin,
            kind,
        }
    }
}

/// Maps `a.b.Type` to the archive path stem `a/b/Type`
fn entry_stem(type_name: &str) -> Option<String> {
    let valid = !type_name.is_empty()
        && type_name.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '$')
        });
    valid.then(|| type_name.replace('.', "/"))
}

fn host_log(mut caller: Caller<'_, ScopeState>, ptr: i32, len: i32) {
    let Some(Extern::Memory(memory)) = caller.get_export("memory") else {
        return;
    };
    let Ok(message) = read_str(memory.data(&caller), ptr, len) else {
        return;
    };
    let state = caller.data();
    debug!(scope = %state.scope, package = %state.package, "{message}");
}
