//! Type and validator resolution
//!
//! Turns the name references of a rule leaf into resolved values:
//!
//! ```text
//! { type: conint, opts: {gt: 0} }            → TypeDescriptor::Int(gt=0)
//! { type: List, opts: [int] }                → TypeDescriptor::List(int)
//! { validator: [a, b],
//!   validator_params: [{..}, {..}],
//!   validator_opts: {pre: true},
//!   root_validator: true }                   → [ValidatorRef(a), ValidatorRef(b)]
//! ```

use crate::classify::{
    OPTS_KEY, ROOT_VALIDATOR_KEY, TYPE_KEY, VALIDATOR_KEY, VALIDATOR_OPTS_KEY,
    VALIDATOR_PARAMS_KEY,
};
use crate::registry::{Registry, TypeEntry, ValidatorArgs, ValidatorFn};
use crate::types::{render_scalar, TypeArg, TypeDescriptor};
use crate::value::ConfigValue;
use indexmap::IndexMap;
use std::fmt;
use tracing::warn;
use typedconf_core::{truthy, CompileError, CompileResult, DocPath, Document, Mapping};

// ============================================================================
// WARNINGS
// ============================================================================

/// Non-fatal findings recorded while compiling.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileWarning {
    /// `opts` was neither a sequence nor a mapping and has been ignored.
    AmbiguousTypeOptions { path: DocPath, opts: Document },
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileWarning::AmbiguousTypeOptions { path, opts } => {
                write!(f, "ambiguous option ignored at {}: {}", path, render_scalar(opts))
            }
        }
    }
}

// ============================================================================
// VALIDATOR REFERENCES
// ============================================================================

/// What a validator checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValidatorTarget {
    /// One field, seen together with the fields declared before it.
    Field(String),
    /// The whole record.
    Root,
}

impl fmt::Display for ValidatorTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorTarget::Field(name) => write!(f, "field '{}'", name),
            ValidatorTarget::Root => f.write_str("the record"),
        }
    }
}

/// Execution options from `validator_opts`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidatorOptions {
    /// Run on the raw document value, before coercion.
    pub pre: bool,
    /// Also run when the field falls back to its default.
    pub always: bool,
    /// Run once per element of a list value.
    pub each_item: bool,
}

impl ValidatorOptions {
    pub fn from_opts(opts: &Mapping) -> Result<Self, String> {
        let mut out = Self::default();
        for (key, value) in opts {
            let name = key
                .as_str()
                .ok_or_else(|| "validator option names must be strings".to_string())?;
            let flag = value
                .as_bool()
                .ok_or_else(|| format!("validator option '{}' must be a boolean", name))?;
            match name {
                "pre" => out.pre = flag,
                "always" => out.always = flag,
                "each_item" => out.each_item = flag,
                _ => return Err(format!("unknown validator option '{}'", name)),
            }
        }
        Ok(out)
    }
}

/// Namespace key of a validator: its target and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValidatorKey {
    pub target: ValidatorTarget,
    pub name: String,
}

/// A registered validator bound to its target, parameters and options.
#[derive(Clone)]
pub struct ValidatorRef {
    pub name: String,
    pub func: ValidatorFn,
    pub target: ValidatorTarget,
    pub params: Mapping,
    pub options: ValidatorOptions,
}

impl ValidatorRef {
    pub fn key(&self) -> ValidatorKey {
        ValidatorKey {
            target: self.target.clone(),
            name: self.name.clone(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.target == ValidatorTarget::Root
    }

    /// Invoke the validator.
    pub fn call(
        &self,
        value: Option<&ConfigValue>,
        values: &IndexMap<String, ConfigValue>,
    ) -> Result<(), String> {
        let field = match &self.target {
            ValidatorTarget::Field(name) => Some(name.as_str()),
            ValidatorTarget::Root => None,
        };
        (self.func)(&ValidatorArgs {
            value,
            field,
            values,
            params: &self.params,
        })
    }
}

impl fmt::Debug for ValidatorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRef")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("params", &self.params)
            .field("options", &self.options)
            .finish()
    }
}

impl PartialEq for ValidatorRef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.target == other.target
            && self.params == other.params
            && self.options == other.options
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Resolves rule references against a registry, collecting warnings.
#[derive(Debug)]
pub struct Resolver<'r> {
    registry: &'r Registry,
    warnings: Vec<CompileWarning>,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            warnings: Vec::new(),
        }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn warnings(&self) -> &[CompileWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<CompileWarning> {
        self.warnings
    }

    /// Resolve the `type`/`opts` pair of the leaf at `path`.
    pub fn resolve_type(&mut self, path: &DocPath, spec: &Mapping) -> CompileResult<TypeDescriptor> {
        let name = spec
            .get(TYPE_KEY)
            .ok_or_else(|| invalid_type(path, "missing 'type'"))?
            .as_str()
            .ok_or_else(|| invalid_type(path, "'type' must be a type name"))?;
        let registry = self.registry;
        let entry = registry
            .lookup_type(name)?
            .ok_or_else(|| CompileError::UnknownTypeName {
                name: name.to_string(),
                path: path.clone(),
            })?;

        let opts = spec.get(OPTS_KEY).filter(|opts| truthy(opts));
        match opts {
            Some(Document::Sequence(args)) => {
                let TypeEntry::Generic(factory) = entry else {
                    return Err(invalid_type(
                        path,
                        format!("{} is a {} and takes no type arguments", name, entry.kind_name()),
                    ));
                };
                let args = args
                    .iter()
                    .map(|raw| self.type_arg(raw))
                    .collect::<CompileResult<Vec<_>>>()?;
                factory(args.as_slice()).map_err(|reason| invalid_type(path, reason))
            }
            Some(Document::Mapping(kwargs)) => {
                let TypeEntry::Constrained(factory) = entry else {
                    return Err(invalid_type(
                        path,
                        format!("{} is a {} and takes no keyword options", name, entry.kind_name()),
                    ));
                };
                factory(kwargs).map_err(|reason| invalid_type(path, reason))
            }
            Some(other) => {
                warn!(path = %path, "ambiguous option ignored: {}", render_scalar(other));
                self.warnings.push(CompileWarning::AmbiguousTypeOptions {
                    path: path.clone(),
                    opts: other.clone(),
                });
                entry.plain().map_err(|reason| invalid_type(path, reason))
            }
            None => entry.plain().map_err(|reason| invalid_type(path, reason)),
        }
    }

    /// An option of a parametric type: a registered type when it names one,
    /// kept literally otherwise.
    fn type_arg(&self, raw: &Document) -> CompileResult<TypeArg> {
        let ty = match raw.as_str() {
            Some(name) => match self.registry.lookup_type(name)? {
                Some(entry) => entry.plain().ok(),
                None => None,
            },
            None => None,
        };
        Ok(TypeArg {
            raw: raw.clone(),
            ty,
        })
    }

    /// Resolve the validators declared on `spec`.
    ///
    /// `field` is the key the spec sits under; validators bind to it unless
    /// `root_validator` is set. The document root has no key and only
    /// accepts root validators.
    pub fn resolve_validators(
        &self,
        path: &DocPath,
        field: Option<&str>,
        spec: &Mapping,
    ) -> CompileResult<Vec<ValidatorRef>> {
        let Some(names) = spec.get(VALIDATOR_KEY) else {
            return Ok(Vec::new());
        };
        let names: Vec<&str> = match names {
            Document::String(name) => vec![name.as_str()],
            Document::Sequence(items) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .ok_or_else(|| invalid_validator(path, "validator names must be strings"))
                })
                .collect::<CompileResult<_>>()?,
            _ => {
                return Err(invalid_validator(
                    path,
                    "'validator' must be a name or a list of names",
                ))
            }
        };
        let params = bind_params(path, &names, spec.get(VALIDATOR_PARAMS_KEY))?;

        let options = match spec.get(VALIDATOR_OPTS_KEY) {
            None | Some(Document::Null) => ValidatorOptions::default(),
            Some(Document::Mapping(opts)) => {
                ValidatorOptions::from_opts(opts).map_err(|reason| invalid_validator(path, reason))?
            }
            Some(_) => return Err(invalid_validator(path, "'validator_opts' must be a mapping")),
        };

        let root = spec.get(ROOT_VALIDATOR_KEY).map_or(false, truthy);
        let target = match (root, field) {
            (true, _) => ValidatorTarget::Root,
            (false, Some(field)) => ValidatorTarget::Field(field.to_string()),
            (false, None) => {
                return Err(invalid_validator(
                    path,
                    "validators at the document root need 'root_validator: true'",
                ))
            }
        };

        names
            .into_iter()
            .zip(params)
            .map(|(name, params)| {
                let func = self.registry.lookup_validator(name)?.ok_or_else(|| {
                    CompileError::UnknownValidatorName {
                        name: name.to_string(),
                        path: path.clone(),
                    }
                })?;
                Ok(ValidatorRef {
                    name: name.to_string(),
                    func: func.clone(),
                    target: target.clone(),
                    params,
                    options,
                })
            })
            .collect()
    }
}

/// Pair validator names with their parameter mappings; missing trailing
/// parameters are empty.
fn bind_params(
    path: &DocPath,
    names: &[&str],
    params: Option<&Document>,
) -> CompileResult<Vec<Mapping>> {
    let as_mapping = |doc: &Document| match doc {
        Document::Null => Ok(Mapping::new()),
        Document::Mapping(map) => Ok(map.clone()),
        _ => Err(invalid_validator(path, "validator parameters must be mappings")),
    };
    let mut bound = match (names.len(), params) {
        (_, None) => Vec::new(),
        (1, Some(doc @ (Document::Mapping(_) | Document::Null))) => vec![as_mapping(doc)?],
        (_, Some(Document::Sequence(items))) => {
            if items.len() > names.len() {
                return Err(invalid_validator(
                    path,
                    format!(
                        "{} parameter sets for {} validator(s)",
                        items.len(),
                        names.len()
                    ),
                ));
            }
            items.iter().map(as_mapping).collect::<CompileResult<_>>()?
        }
        (_, Some(_)) => {
            return Err(invalid_validator(
                path,
                "'validator_params' must be a mapping, or a list with one mapping per validator",
            ))
        }
    };
    bound.resize_with(names.len(), Mapping::new);
    Ok(bound)
}

fn invalid_type(path: &DocPath, reason: impl Into<String>) -> CompileError {
    CompileError::InvalidTypeSpec {
        path: path.clone(),
        reason: reason.into(),
    }
}

fn invalid_validator(path: &DocPath, reason: impl Into<String>) -> CompileError {
    CompileError::InvalidValidatorSpec {
        path: path.clone(),
        reason: reason.into(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
