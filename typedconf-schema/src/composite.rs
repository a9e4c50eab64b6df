//! Composite record types
//!
//! A [`CompositeType`] is a record type synthesized from one level of a rule
//! document. It is plain data: an ordered field list, a validator namespace
//! and the bases it extends. Instantiation (see `instance.rs`) interprets it
//! against a user document.
//!
//! ```text
//! LevelSpec { b: int = 0, a: int }          bases: [parent_t]
//!        │
//!        ├── names checked (identifier, keyword, duplicate)
//!        ├── base fields first, overridden in place
//!        ├── stable partition: required before defaulted
//!        └── validators keyed by (target, name)
//!        ↓
//! CompositeType "name_t" { a: int, b: int = 0 }
//! ```

use crate::resolve::{ValidatorKey, ValidatorRef, ValidatorTarget};
use crate::rewrite::LevelSpec;
use crate::types::TypeDescriptor;
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use typedconf_core::{CompileError, CompileResult, DocPath, Document};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid identifier regex"));

/// Names that cannot be used as field names.
pub const RESERVED_NAMES: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield", "_",
];

// ============================================================================
// TYPES
// ============================================================================

/// One field of a composite type.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeDescriptor,
    pub default: Option<Document>,
    /// An optional field may be absent from an instance.
    pub optional: bool,
    pub doc: Option<String>,
}

impl FieldDef {
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// A synthesized record type.
///
/// Fields and validators of the bases are merged in at build time, so a
/// composite is self-contained; `bases` is kept for introspection.
pub struct CompositeType {
    pub name: String,
    pub fields: Vec<FieldDef>,
    pub validators: IndexMap<ValidatorKey, ValidatorRef>,
    pub bases: Vec<Arc<CompositeType>>,
}

impl CompositeType {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// Validators of one field, in namespace order.
    pub fn field_validators<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ValidatorRef> {
        self.validators
            .values()
            .filter(move |v| matches!(&v.target, ValidatorTarget::Field(f) if f == field))
    }

    /// Record validators, in namespace order.
    pub fn root_validators(&self) -> impl Iterator<Item = &ValidatorRef> {
        self.validators.values().filter(|v| v.is_root())
    }

    /// True when `name` is this type or one of its (transitive) bases.
    pub fn extends(&self, name: &str) -> bool {
        self.name == name || self.bases.iter().any(|b| b.extends(name))
    }
}

impl fmt::Debug for CompositeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeType")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("validators", &self.validators.keys().collect::<Vec<_>>())
            .field(
                "bases",
                &self.bases.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Reject names that cannot be record fields.
pub(crate) fn check_field_name(type_name: &str, field: &str) -> CompileResult<()> {
    if !IDENTIFIER.is_match(field) {
        return Err(CompileError::InvalidFieldName {
            type_name: type_name.to_string(),
            field: field.to_string(),
        });
    }
    if RESERVED_NAMES.contains(&field) {
        return Err(CompileError::ReservedFieldName {
            type_name: type_name.to_string(),
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Build the composite type `{name_hint}_t` for one level.
///
/// Every name is checked before anything is assembled, so a failure never
/// leaves a partially built type behind. `path` locates the level for
/// diagnostics.
pub fn build_composite(
    name_hint: &str,
    level: LevelSpec,
    bases: &[Arc<CompositeType>],
    path: &DocPath,
) -> CompileResult<Arc<CompositeType>> {
    let name = format!("{}_t", name_hint);

    let mut seen = HashSet::new();
    for (field, _) in &level.fields {
        check_field_name(&name, field)?;
        if !seen.insert(field.as_str()) {
            return Err(CompileError::DuplicateFieldName {
                type_name: name,
                field: field.clone(),
            });
        }
    }

    // Own validators: the level's, then each field's. Root-targeted field
    // validators belong to this record.
    let mut own: IndexMap<ValidatorKey, ValidatorRef> = IndexMap::new();
    let declared = level
        .validators
        .into_iter()
        .chain(level.fields.iter().flat_map(|(_, f)| f.validators.iter().cloned()));
    for validator in declared {
        let key = validator.key();
        if own.contains_key(&key) {
            return Err(CompileError::DuplicateValidator {
                name: key.name,
                target: key.target.to_string(),
                path: path.clone(),
            });
        }
        own.insert(key, validator);
    }

    let mut fields: Vec<FieldDef> = Vec::new();
    let mut validators: IndexMap<ValidatorKey, ValidatorRef> = IndexMap::new();
    for base in bases {
        for field in &base.fields {
            upsert_field(&mut fields, field.clone());
        }
        for (key, validator) in &base.validators {
            validators.insert(key.clone(), validator.clone());
        }
    }
    for (field_name, spec) in level.fields {
        upsert_field(
            &mut fields,
            FieldDef {
                name: field_name,
                ty: spec.ty,
                default: spec.default,
                optional: spec.optional,
                doc: spec.doc,
            },
        );
    }
    validators.extend(own);

    let (mut ordered, defaulted): (Vec<_>, Vec<_>) =
        fields.into_iter().partition(|f| !f.has_default());
    ordered.extend(defaulted);

    debug!(
        type_name = %name,
        fields = ordered.len(),
        validators = validators.len(),
        bases = bases.len(),
        "built composite type"
    );
    Ok(Arc::new(CompositeType {
        name,
        fields: ordered,
        validators,
        bases: bases.to_vec(),
    }))
}

/// Replace a field of the same name in place, or append.
fn upsert_field(fields: &mut Vec<FieldDef>, field: FieldDef) {
    match fields.iter_mut().find(|f| f.name == field.name) {
        Some(slot) => *slot = field,
        None => fields.push(field),
    }
}

// ============================================================================
// TESTS
// ============================================================================
