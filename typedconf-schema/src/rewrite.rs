//! Spec rewriting
//!
//! A rule leaf is rewritten once into a [`FieldSpec`]: its type and validator
//! references resolved, its default/optional/doc metadata carried along.
//! Branches are rewritten after their children: the branch's own validators
//! are resolved first, then the children's field specs become one
//! [`LevelSpec`] the composite builder turns into a record type.

use crate::classify::{DEFAULT_KEY, DOC_KEY, OPTIONAL_KEY, TYPE_SPEC_KEYS};
use crate::composite::{build_composite, CompositeType};
use crate::resolve::{Resolver, ValidatorRef, ValidatorTarget};
use crate::types::TypeDescriptor;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;
use typedconf_core::{truthy, CompileError, CompileResult, DocPath, Document, Mapping, PathKey};

/// One resolved field of a record level.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub ty: TypeDescriptor,
    /// Validators declared on the field. Root-targeted ones are hoisted to
    /// the enclosing record when the level is built.
    pub validators: Vec<ValidatorRef>,
    pub default: Option<Document>,
    pub optional: bool,
    pub doc: Option<String>,
}

impl FieldSpec {
    pub fn new(ty: TypeDescriptor) -> Self {
        Self {
            ty,
            validators: Vec::new(),
            default: None,
            optional: false,
            doc: None,
        }
    }
}

/// Every field of one nesting level, in declaration order, plus the
/// record validators declared on the level itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelSpec {
    pub fields: Vec<(String, FieldSpec)>,
    pub validators: Vec<ValidatorRef>,
}

/// Resolve the rule leaf at `path`.
pub fn rewrite_leaf(
    resolver: &mut Resolver<'_>,
    path: &DocPath,
    spec: &Mapping,
) -> CompileResult<FieldSpec> {
    let key = field_key(path)?;
    let ty = resolver.resolve_type(path, spec)?;
    let validators = resolver.resolve_validators(path, Some(&key), spec)?;
    trace!(path = %path, ty = %ty, validators = validators.len(), "rewrote leaf");
    Ok(FieldSpec {
        ty,
        validators,
        default: spec.get(DEFAULT_KEY).cloned(),
        optional: spec.get(OPTIONAL_KEY).map_or(false, truthy),
        doc: doc_string(spec),
    })
}

/// Resolve the branch at `path` into a record-typed field.
///
/// Field specs of the branch's children are looked up in `resolved`; every
/// child must already have been rewritten.
pub fn rewrite_branch(
    resolver: &mut Resolver<'_>,
    path: &DocPath,
    spec: &Mapping,
    resolved: &BTreeMap<DocPath, FieldSpec>,
) -> CompileResult<FieldSpec> {
    let key = field_key(path)?;
    let own = resolver.resolve_validators(path, Some(&key), spec)?;
    let (record, field): (Vec<_>, Vec<_>) = own
        .into_iter()
        .partition(|v| v.target == ValidatorTarget::Root);

    let mut level = collect_level(path, spec, resolved)?;
    level.validators = record;
    let composite: Arc<CompositeType> = build_composite(&key, level, &[], path)?;
    Ok(FieldSpec {
        ty: TypeDescriptor::Composite(composite),
        validators: field,
        default: None,
        optional: false,
        doc: doc_string(spec),
    })
}

/// Field specs of the children of the mapping at `path`, in mapping order.
/// Reserved keys are level metadata, not fields.
pub fn collect_level(
    path: &DocPath,
    spec: &Mapping,
    resolved: &BTreeMap<DocPath, FieldSpec>,
) -> CompileResult<LevelSpec> {
    let mut level = LevelSpec::default();
    for key in spec.keys() {
        let key = PathKey::from_mapping_key(key);
        if key.as_str().map_or(false, |k| TYPE_SPEC_KEYS.contains(&k)) {
            continue;
        }
        let child = path.child(key.clone());
        let field = resolved
            .get(&child)
            .ok_or_else(|| CompileError::InvalidTypeSpec {
                path: child.clone(),
                reason: "expected a mapping with a 'type' key".to_string(),
            })?;
        level.fields.push((key.to_string(), field.clone()));
    }
    Ok(level)
}

fn field_key(path: &DocPath) -> CompileResult<String> {
    match path.last() {
        Some(key) => Ok(key.to_string()),
        None => Err(CompileError::InvalidTypeSpec {
            path: path.clone(),
            reason: "the document root cannot be a field".to_string(),
        }),
    }
}

fn doc_string(spec: &Mapping) -> Option<String> {
    spec.get(DOC_KEY).and_then(Document::as_str).map(str::to_string)
}

// ============================================================================
// TESTS
// ============================================================================
