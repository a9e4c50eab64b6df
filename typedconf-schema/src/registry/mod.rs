//! Named type and validator registry
//!
//! Rule documents refer to types and validators by name. The registry maps
//! those names to [`TypeEntry`] values and validator functions, gathered from
//! an ordered list of modules:
//!
//! ```text
//! catalog (every known module)
//!     │
//!     ├── type modules       [builtins, typing, constrained, units, ...]
//!     ├── validator modules  [validators, ...]
//!     └── local module       register_type / register_validator
//!             ↓  (lazy, memoized; later modules shadow earlier ones)
//! types() / validators()
//! ```
//!
//! A module must carry an export manifest; only exported names are imported.
//! Population happens on first lookup and is memoized until [`Registry::reset`]
//! or any change to the module lists.

mod types;
mod validators;

use crate::types::{TypeArg, TypeDescriptor};
use crate::value::ConfigValue;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;
use typedconf_core::{DocumentError, Mapping, RegistryError};

pub use self::types::{builtins_module, constrained_module, typing_module, units_module};
pub use self::validators::validators_module;

/// Name of the module holding caller registrations.
pub const LOCAL_MODULE: &str = "local";

/// Default type modules, in import order.
pub const DEFAULT_TYPE_MODULES: [&str; 4] = ["builtins", "typing", "constrained", "units"];

/// Default validator modules, in import order.
pub const DEFAULT_VALIDATOR_MODULES: [&str; 1] = ["validators"];

// ============================================================================
// ENTRIES
// ============================================================================

pub type GenericFactory =
    Arc<dyn Fn(&[TypeArg]) -> Result<TypeDescriptor, String> + Send + Sync>;
pub type ConstrainedFactory =
    Arc<dyn Fn(&Mapping) -> Result<TypeDescriptor, String> + Send + Sync>;

/// A named type: a ready descriptor or a factory building one from options.
#[derive(Clone)]
pub enum TypeEntry {
    /// Used as is; takes no options.
    Type(TypeDescriptor),
    /// Parameterized by a sequence of arguments (`List[int]`).
    Generic(GenericFactory),
    /// Built from keyword constraints (`conint(gt=0)`).
    Constrained(ConstrainedFactory),
}

impl TypeEntry {
    pub fn generic<F>(factory: F) -> Self
    where
        F: Fn(&[TypeArg]) -> Result<TypeDescriptor, String> + Send + Sync + 'static,
    {
        TypeEntry::Generic(Arc::new(factory))
    }

    pub fn constrained<F>(factory: F) -> Self
    where
        F: Fn(&Mapping) -> Result<TypeDescriptor, String> + Send + Sync + 'static,
    {
        TypeEntry::Constrained(Arc::new(factory))
    }

    /// The type referenced without options.
    pub fn plain(&self) -> Result<TypeDescriptor, String> {
        match self {
            TypeEntry::Type(ty) => Ok(ty.clone()),
            TypeEntry::Generic(factory) => factory(&[]),
            TypeEntry::Constrained(factory) => factory(&Mapping::new()),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            TypeEntry::Type(_) => "type",
            TypeEntry::Generic(_) => "generic type",
            TypeEntry::Constrained(_) => "constrained type factory",
        }
    }
}

impl fmt::Debug for TypeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeEntry::Type(ty) => f.debug_tuple("Type").field(ty).finish(),
            TypeEntry::Generic(_) => f.write_str("Generic(..)"),
            TypeEntry::Constrained(_) => f.write_str("Constrained(..)"),
        }
    }
}

impl From<TypeDescriptor> for TypeEntry {
    fn from(ty: TypeDescriptor) -> Self {
        TypeEntry::Type(ty)
    }
}

/// Arguments a validator is invoked with.
#[derive(Debug, Clone, Copy)]
pub struct ValidatorArgs<'a> {
    /// The validated value; `None` for record-level validators.
    pub value: Option<&'a ConfigValue>,
    /// The validated field; `None` for record-level validators.
    pub field: Option<&'a str>,
    /// Sibling values available so far, in field order. For a field
    /// validator these are the fields declared before it.
    pub values: &'a IndexMap<String, ConfigValue>,
    /// Parameters bound from `validator_params`.
    pub params: &'a Mapping,
}

impl<'a> ValidatorArgs<'a> {
    /// A bound parameter, failing with a readable message when absent.
    pub fn param(&self, name: &str) -> Result<&'a typedconf_core::Document, String> {
        self.params
            .get(name)
            .ok_or_else(|| format!("missing validator parameter '{}'", name))
    }

    /// The validated field value, failing for record-level invocations.
    pub fn field_value(&self) -> Result<&'a ConfigValue, String> {
        self.value
            .ok_or_else(|| "validator needs a field value".to_string())
    }
}

pub type ValidatorFn = Arc<dyn Fn(&ValidatorArgs<'_>) -> Result<(), String> + Send + Sync>;

// ============================================================================
// MODULES
// ============================================================================

/// Kind of module list a module name is added to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Type,
    Validator,
}

impl FromStr for ModuleKind {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "type" | "types" => Ok(ModuleKind::Type),
            "validator" | "validators" => Ok(ModuleKind::Validator),
            _ => Err(RegistryError::UnknownModuleKind {
                kind: s.to_string(),
            }),
        }
    }
}

/// A named source of types and validators.
#[derive(Clone)]
pub struct Module {
    name: String,
    exports: Option<Vec<String>>,
    types: IndexMap<String, TypeEntry>,
    validators: IndexMap<String, ValidatorFn>,
}

impl Module {
    /// An empty module with an (empty) export manifest.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exports: Some(Vec::new()),
            types: IndexMap::new(),
            validators: IndexMap::new(),
        }
    }

    /// A module with no export manifest; importing it fails.
    pub fn without_manifest(name: impl Into<String>) -> Self {
        Self {
            exports: None,
            ..Self::new(name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Define and export a type.
    pub fn export_type(mut self, name: impl Into<String>, entry: impl Into<TypeEntry>) -> Self {
        let name = name.into();
        self.export(&name);
        self.types.insert(name, entry.into());
        self
    }

    /// Define and export a validator.
    pub fn export_validator<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&ValidatorArgs<'_>) -> Result<(), String> + Send + Sync + 'static,
    {
        let name = name.into();
        self.export(&name);
        self.validators.insert(name, Arc::new(func));
        self
    }

    /// Define a type without exporting it.
    pub fn define_type(mut self, name: impl Into<String>, entry: impl Into<TypeEntry>) -> Self {
        self.types.insert(name.into(), entry.into());
        self
    }

    /// Replace the export manifest.
    pub fn with_exports<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exports = Some(names.into_iter().map(Into::into).collect());
        self
    }

    fn export(&mut self, name: &str) {
        if let Some(exports) = &mut self.exports {
            if !exports.iter().any(|e| e == name) {
                exports.push(name.to_string());
            }
        }
    }

    /// Exported names, checked against the module's definitions.
    fn manifest(&self) -> Result<&[String], RegistryError> {
        let exports = self
            .exports
            .as_deref()
            .ok_or_else(|| RegistryError::NonConformantSource {
                module: self.name.clone(),
                reason: "no export manifest".to_string(),
            })?;
        if let Some(missing) = exports
            .iter()
            .find(|n| !self.types.contains_key(*n) && !self.validators.contains_key(*n))
        {
            return Err(RegistryError::NonConformantSource {
                module: self.name.clone(),
                reason: format!("exports '{}' which it does not define", missing),
            });
        }
        Ok(exports)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("exports", &self.exports)
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .field("validators", &self.validators.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Module lists a registry imports from.
///
/// ```toml
/// type_modules = ["builtins", "typing", "constrained", "units", "grid"]
/// validator_modules = ["validators", "grid_checks"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub type_modules: Vec<String>,
    pub validator_modules: Vec<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            type_modules: DEFAULT_TYPE_MODULES.iter().map(|s| s.to_string()).collect(),
            validator_modules: DEFAULT_VALIDATOR_MODULES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl RegistryConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, DocumentError> {
        toml::from_str(content).map_err(|e| DocumentError::Toml {
            reason: e.to_string(),
        })
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, DocumentError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| DocumentError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Create RegistryConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `TYPEDCONF_TYPE_MODULES`: comma-separated type modules appended to the defaults
    /// - `TYPEDCONF_VALIDATOR_MODULES`: comma-separated validator modules appended to the defaults
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Append the modules named in the environment.
    pub fn with_env(mut self) -> Self {
        self.type_modules
            .extend(env_list(std::env::var("TYPEDCONF_TYPE_MODULES").ok()));
        self.validator_modules
            .extend(env_list(std::env::var("TYPEDCONF_VALIDATOR_MODULES").ok()));
        self
    }
}

fn env_list(value: Option<String>) -> Vec<String> {
    value
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Name → type/validator resolution service.
///
/// Compilers only read from a registry. Register every custom name before
/// compiling: registration invalidates the memoized namespaces and needs
/// `&mut self`.
pub struct Registry {
    catalog: IndexMap<String, Module>,
    type_modules: Vec<String>,
    validator_modules: Vec<String>,
    local: Module,
    types: OnceCell<IndexMap<String, TypeEntry>>,
    validators: OnceCell<IndexMap<String, ValidatorFn>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// A registry over the builtin modules with the default module lists.
    pub fn new() -> Self {
        Self::from_config(&RegistryConfig::default())
    }

    /// A registry with no modules at all.
    pub fn empty() -> Self {
        Self {
            catalog: IndexMap::new(),
            type_modules: Vec::new(),
            validator_modules: Vec::new(),
            local: Module::new(LOCAL_MODULE),
            types: OnceCell::new(),
            validators: OnceCell::new(),
        }
    }

    /// Builtin modules, imported in the order the config lists them.
    ///
    /// Names are not checked here; an unknown module fails on first lookup.
    pub fn from_config(config: &RegistryConfig) -> Self {
        let mut registry = Self::empty();
        for module in [
            builtins_module(),
            typing_module(),
            constrained_module(),
            units_module(),
            validators_module(),
        ] {
            registry.catalog.insert(module.name().to_string(), module);
        }
        registry.type_modules = config.type_modules.clone();
        registry.validator_modules = config.validator_modules.clone();
        registry
    }

    /// Make a module available for import. It is only imported once its name
    /// is in a module list.
    pub fn add_module(&mut self, module: Module) {
        self.catalog.insert(module.name().to_string(), module);
        self.reset();
    }

    /// Append module names to the type or validator list.
    pub fn add_modules<S: AsRef<str>>(
        &mut self,
        kind: &str,
        modules: &[S],
    ) -> Result<(), RegistryError> {
        let names = modules.iter().map(|m| m.as_ref().to_string());
        match kind.parse::<ModuleKind>()? {
            ModuleKind::Type => self.type_modules.extend(names),
            ModuleKind::Validator => self.validator_modules.extend(names),
        }
        self.reset();
        Ok(())
    }

    pub fn type_modules(&self) -> &[String] {
        &self.type_modules
    }

    pub fn validator_modules(&self) -> &[String] {
        &self.validator_modules
    }

    /// Register a type under `name`, shadowing any imported one.
    pub fn register_type(&mut self, name: impl Into<String>, entry: impl Into<TypeEntry>) {
        let local = std::mem::replace(&mut self.local, Module::new(LOCAL_MODULE));
        self.local = local.export_type(name, entry);
        self.reset();
    }

    /// Register a validator under `name`, shadowing any imported one.
    pub fn register_validator<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&ValidatorArgs<'_>) -> Result<(), String> + Send + Sync + 'static,
    {
        let local = std::mem::replace(&mut self.local, Module::new(LOCAL_MODULE));
        self.local = local.export_validator(name, func);
        self.reset();
    }

    /// Drop the memoized namespaces; the next lookup re-imports.
    pub fn reset(&mut self) {
        self.types.take();
        self.validators.take();
    }

    /// Every importable type name, populating on first access.
    pub fn types(&self) -> Result<&IndexMap<String, TypeEntry>, RegistryError> {
        self.types.get_or_try_init(|| {
            let mut out = IndexMap::new();
            for module in self.resolve_modules(&self.type_modules)? {
                let exports = module.manifest()?;
                let mut count = 0;
                for name in exports {
                    if let Some(entry) = module.types.get(name) {
                        out.insert(name.clone(), entry.clone());
                        count += 1;
                    }
                }
                debug!(module = %module.name, exports = count, "imported type module");
            }
            for (name, entry) in &self.local.types {
                out.insert(name.clone(), entry.clone());
            }
            Ok(out)
        })
    }

    /// Every importable validator name, populating on first access.
    pub fn validators(&self) -> Result<&IndexMap<String, ValidatorFn>, RegistryError> {
        self.validators.get_or_try_init(|| {
            let mut out = IndexMap::new();
            for module in self.resolve_modules(&self.validator_modules)? {
                let exports = module.manifest()?;
                let mut count = 0;
                for name in exports {
                    if let Some(func) = module.validators.get(name) {
                        out.insert(name.clone(), Arc::clone(func));
                        count += 1;
                    }
                }
                debug!(module = %module.name, exports = count, "imported validator module");
            }
            for (name, func) in &self.local.validators {
                out.insert(name.clone(), Arc::clone(func));
            }
            Ok(out)
        })
    }

    pub fn lookup_type(&self, name: &str) -> Result<Option<&TypeEntry>, RegistryError> {
        Ok(self.types()?.get(name))
    }

    pub fn lookup_validator(&self, name: &str) -> Result<Option<&ValidatorFn>, RegistryError> {
        Ok(self.validators()?.get(name))
    }

    fn resolve_modules<'a>(&'a self, names: &[String]) -> Result<Vec<&'a Module>, RegistryError> {
        names
            .iter()
            .map(|name| {
                self.catalog
                    .get(name)
                    .ok_or_else(|| RegistryError::UnregisteredModule {
                        module: name.clone(),
                    })
            })
            .collect()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("catalog", &self.catalog.keys().collect::<Vec<_>>())
            .field("type_modules", &self.type_modules)
            .field("validator_modules", &self.validator_modules)
            .field("local", &self.local)
            .field("populated", &(self.types.get().is_some(), self.validators.get().is_some()))
            .finish()
    }
}

// ============================================================================
// TESTS
// ============================================================================
