//! Rule Compiler - Fold a rule document into a composite type tree
//!
//! # Pipeline
//!
//! ```text
//! rule document
//!     ↓  classify: nodes, leaves, branches (stray nodes rejected)
//! leaves rewritten → FieldSpec
//!     ↓
//! remaining = leaf_subset(branches)
//! while remaining:                       deepest levels first
//!     rewrite_branch(p) → FieldSpec { type: p_t }
//!     remaining = leaf_subset(parents of remaining)
//!     ↓
//! build_composite("config", root level) → config_t
//! ```
//!
//! Each level's composite becomes the field type of the level above, so the
//! fold terminates after at most `depth` rounds.

use crate::classify::{
    branches, filter, filter_ordered, has_leaf_ancestor, is_leaf, is_node, is_optional,
    leaf_subset, TYPE_KEY, TYPE_SPEC_KEYS,
};
use crate::composite::{build_composite, CompositeType};
use crate::registry::Registry;
use crate::resolve::{CompileWarning, Resolver};
use crate::rewrite::{collect_level, rewrite_branch, rewrite_leaf, FieldSpec};
use crate::value::ConfigInstance;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use typedconf_core::{
    document_digest, merge_documents, merge_files, CompileError, CompileResult, DocPath, Document,
    Mapping, PathKey, TypedConfResult, ValidationError,
};

/// Name hint of the top-level composite type.
pub const ROOT_TYPE_HINT: &str = "config";

/// Output of a successful compilation.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    /// The top-level type, `config_t`.
    pub config_t: Arc<CompositeType>,
    /// Non-fatal findings, in discovery order.
    pub warnings: Vec<CompileWarning>,
    /// SHA-256 of the rule document the schema was built from.
    pub digest: String,
}

impl CompiledSchema {
    /// Validate a configuration document against the schema.
    pub fn from_document(&self, doc: &Document) -> Result<ConfigInstance, ValidationError> {
        self.config_t.from_document(doc)
    }
}

/// Compiles rule documents against a registry.
#[derive(Debug, Clone, Copy)]
pub struct Compiler<'r> {
    registry: &'r Registry,
}

impl<'r> Compiler<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Compile a rule document. The input is never modified.
    pub fn compile(&self, rules: &Document) -> CompileResult<CompiledSchema> {
        let root = rules.as_mapping().ok_or_else(|| CompileError::InvalidTypeSpec {
            path: DocPath::root(),
            reason: "a rule document must be a mapping".to_string(),
        })?;
        if root.contains_key(TYPE_KEY) {
            return Err(CompileError::InvalidTypeSpec {
                path: DocPath::root(),
                reason: "the document root cannot be a leaf".to_string(),
            });
        }

        let leaf_paths = filter_ordered(rules, is_leaf);
        let leaf_set: BTreeSet<DocPath> = leaf_paths.iter().cloned().collect();
        let branch_set = branches(rules);
        check_structure(rules, &leaf_set, &branch_set)?;

        let mut resolver = Resolver::new(self.registry);
        let mut resolved: BTreeMap<DocPath, FieldSpec> = BTreeMap::new();
        for path in &leaf_paths {
            let spec = mapping_at(rules, path)?;
            let field = rewrite_leaf(&mut resolver, path, spec)?;
            resolved.insert(path.clone(), field);
        }
        debug!(leaves = resolved.len(), branches = branch_set.len(), "rewrote leaves");

        let mut remaining = leaf_subset(&branch_set);
        let mut round = 0;
        while !remaining.is_empty() {
            round += 1;
            debug!(
                round,
                levels = ?remaining.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "assembling levels"
            );
            for path in &remaining {
                if resolved.contains_key(path) || !is_ready(path, &branch_set, &resolved) {
                    continue;
                }
                let spec = mapping_at(rules, path)?;
                let field = rewrite_branch(&mut resolver, path, spec, &resolved)?;
                resolved.insert(path.clone(), field);
            }
            let parents: BTreeSet<DocPath> = remaining
                .iter()
                .filter_map(DocPath::parent)
                .filter(|p| !p.is_root())
                .collect();
            let mut next = leaf_subset(&parents);
            // key sets hide a branch whose keys reappear in a deeper sibling
            next.extend(
                branch_set
                    .iter()
                    .filter(|p| is_ready(p, &branch_set, &resolved))
                    .cloned(),
            );
            next.retain(|p| !resolved.contains_key(p));
            remaining = next;
        }

        let root_path = DocPath::root();
        let mut level = collect_level(&root_path, root, &resolved)?;
        level.validators = resolver.resolve_validators(&root_path, None, root)?;
        let config_t = build_composite(ROOT_TYPE_HINT, level, &[], &root_path)?;

        let digest = document_digest(rules);
        debug!(type_name = %config_t.name, rounds = round, digest = %digest, "compiled rule document");
        Ok(CompiledSchema {
            config_t,
            warnings: resolver.into_warnings(),
            digest,
        })
    }
}

/// True when every branch below `path` has been assembled.
fn is_ready(
    path: &DocPath,
    branches: &BTreeSet<DocPath>,
    resolved: &BTreeMap<DocPath, FieldSpec>,
) -> bool {
    branches
        .iter()
        .filter(|b| path.is_ancestor_of(b))
        .all(|b| resolved.contains_key(b))
}

/// Every node must be a leaf, a branch, or sit inside a leaf.
fn check_structure(
    rules: &Document,
    leaves: &BTreeSet<DocPath>,
    branches: &BTreeSet<DocPath>,
) -> CompileResult<()> {
    for node in filter_ordered(rules, is_node) {
        if leaves.contains(&node) || branches.contains(&node) || has_leaf_ancestor(&node, leaves) {
            continue;
        }
        return Err(CompileError::InvalidTypeSpec {
            path: node,
            reason: "expected a mapping with a 'type' key".to_string(),
        });
    }
    Ok(())
}

fn mapping_at<'a>(rules: &'a Document, path: &DocPath) -> CompileResult<&'a Mapping> {
    path.get(rules)
        .and_then(Document::as_mapping)
        .ok_or_else(|| CompileError::InvalidTypeSpec {
            path: path.clone(),
            reason: "expected a mapping".to_string(),
        })
}

// ============================================================================
// OPTIONAL RULES & LOADING
// ============================================================================

/// Drop optional leaves the configuration does not mention.
///
/// Records left without any field are dropped as well.
pub fn resolve_optional(rules: &Document, conf: &Document) -> Document {
    let present: BTreeSet<DocPath> = filter(conf, is_node);
    let mut out = rules.clone();
    for leaf in filter_ordered(rules, is_optional) {
        if present.contains(&leaf) {
            continue;
        }
        leaf.remove(&mut out);
        let mut parent = leaf.parent();
        while let Some(path) = parent.filter(|p| !p.is_root()) {
            let emptied = path
                .get(&out)
                .and_then(Document::as_mapping)
                .map_or(false, |map| map.keys().all(is_reserved_key));
            if !emptied {
                break;
            }
            path.remove(&mut out);
            parent = path.parent();
        }
    }
    out
}

fn is_reserved_key(key: &Document) -> bool {
    PathKey::from_mapping_key(key)
        .as_str()
        .map_or(false, |k| TYPE_SPEC_KEYS.contains(&k))
}

/// Merge rules and configurations, drop unused optional rules, compile and
/// instantiate.
pub fn load_config(
    registry: &Registry,
    rule_docs: &[Document],
    conf_docs: &[Document],
) -> TypedConfResult<ConfigInstance> {
    let rules = merge_documents(rule_docs);
    let conf = merge_documents(conf_docs);
    let rules = resolve_optional(&rules, &conf);
    let schema = Compiler::new(registry).compile(&rules)?;
    Ok(schema.from_document(&conf)?)
}

/// [`load_config`] over files; formats follow the file extensions.
pub fn load_config_files<P: AsRef<Path>, Q: AsRef<Path>>(
    registry: &Registry,
    rule_paths: &[P],
    conf_paths: &[Q],
) -> TypedConfResult<ConfigInstance> {
    let rules = merge_files(rule_paths, None)?;
    let conf = merge_files(conf_paths, None)?;
    load_config(registry, &[rules], &[conf])
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ConfigValue;
    use typedconf_core::ViolationKind;
    use typedconf_test_utils::yaml;

    fn compile(src: &str) -> CompileResult<CompiledSchema> {
        let registry = Registry::new();
        Compiler::new(&registry).compile(&yaml(src))
    }

    #[test]
    fn test_flat_rules() {
        let schema = compile("{foo: {type: int}, bar: {type: str, default: x}}").unwrap();
        assert_eq!(schema.config_t.name, "config_t");
        assert_eq!(
            schema.config_t.field_names().collect::<Vec<_>>(),
            vec!["foo", "bar"]
        );
        assert_eq!(schema.digest.len(), 64);
    }

    #[test]
    fn test_nested_records() {
        let schema = compile("{a: {b: {c: {type: int}}, d: {type: float}}, e: {type: bool}}").unwrap();
        let a = schema.config_t.field("a").unwrap().ty.as_composite().unwrap().clone();
        assert_eq!(a.name, "a_t");
        let b = a.field("b").unwrap().ty.as_composite().unwrap();
        assert_eq!(b.name, "b_t");

        let instance = schema
            .from_document(&yaml("{a: {b: {c: 3}, d: 1.5}, e: true}"))
            .unwrap();
        assert_eq!(
            instance.get_path(&DocPath::from_keys(["a", "b", "c"])),
            Some(&ConfigValue::Int(3))
        );
    }

    #[test]
    fn test_nested_violation_paths() {
        let schema = compile("{a: {b: {c: {type: PositiveInt}}}}").unwrap();
        let err = schema.from_document(&yaml("{a: {b: {c: -1}}}")).unwrap_err();
        assert_eq!(err.type_name, "config_t");
        assert!(err.has_violation_at(&DocPath::from_keys(["a", "b", "c"])));
    }

    #[test]
    fn test_input_is_not_modified() {
        let rules = yaml("{foo: {type: int, validator: threshold, validator_params: {threshold: 1}}}");
        let before = rules.clone();
        let registry = Registry::new();
        Compiler::new(&registry).compile(&rules).unwrap();
        assert_eq!(rules, before);
    }

    #[test]
    fn test_branch_named_like_a_deeper_key() {
        let schema = compile("{a: {b: {x: {type: int}}}, b: {y: {type: int}}}").unwrap();
        assert_eq!(
            schema.config_t.field_names().collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        let b = schema.config_t.field("b").unwrap().ty.as_composite().unwrap();
        assert_eq!(b.field_names().collect::<Vec<_>>(), vec!["y"]);
    }

    #[test]
    fn test_sibling_waits_for_shadowed_branch() {
        // a.b has the keys of a.c.b, so it only appears once a.c.b is built
        let schema = compile("{a: {b: {x: {type: int}}, c: {b: {y: {type: int}}}}}").unwrap();
        let a = schema.config_t.field("a").unwrap().ty.as_composite().unwrap();
        assert_eq!(a.field_names().collect::<Vec<_>>(), vec!["b", "c"]);
        let instance = schema
            .from_document(&yaml("{a: {b: {x: 1}, c: {b: {y: 2}}}}"))
            .unwrap();
        assert_eq!(
            instance.get_path(&DocPath::from_keys(["a", "c", "b", "y"])),
            Some(&ConfigValue::Int(2))
        );
    }

    #[test]
    fn test_stray_scalar_is_rejected() {
        let err = compile("{foo: {type: int}, bar: 3}").unwrap_err();
        assert_eq!(
            err,
            CompileError::InvalidTypeSpec {
                path: DocPath::from_keys(["bar"]),
                reason: "expected a mapping with a 'type' key".to_string(),
            }
        );
    }

    #[test]
    fn test_extra_leaf_keys_are_ignored() {
        let schema = compile("{cost: {type: float, scaling_label: currency}}").unwrap();
        assert_eq!(schema.config_t.fields.len(), 1);
    }

    #[test]
    fn test_root_cannot_be_leaf() {
        assert!(compile("{type: int}").is_err());
        assert!(compile("[1, 2]").is_err());
    }

    #[test]
    fn test_branch_field_validator_binds_in_parent() {
        let schema = compile(
            "{outer: {inner: {x: {type: int}}, validator: zero_sum, validator_params: {total: 0}, root_validator: true}}",
        )
        .unwrap();
        let outer = schema.config_t.field("outer").unwrap().ty.as_composite().unwrap();
        assert_eq!(outer.root_validators().count(), 1);
        assert_eq!(schema.config_t.root_validators().count(), 0);
    }

    #[test]
    fn test_document_root_validators() {
        let schema = compile(
            "{a: {type: int}, b: {type: int}, validator: zero_sum, validator_params: {total: 0}, root_validator: true}",
        )
        .unwrap();
        assert!(schema.from_document(&yaml("{a: 2, b: -2}")).is_ok());
        let err = schema.from_document(&yaml("{a: 2, b: 2}")).unwrap_err();
        assert_eq!(err.violations[0].kind, ViolationKind::ValidatorFailed);
        assert_eq!(err.violations[0].path, DocPath::root());
    }

    #[test]
    fn test_ambiguous_opts_reach_schema_warnings() {
        let schema = compile("{foo: {type: int, opts: maybe}}").unwrap();
        assert_eq!(schema.warnings.len(), 1);
    }

    #[test]
    fn test_resolve_optional_drops_unused_leaves() {
        let rules = yaml(
            "{name: {type: str}, tags: {type: List, opts: [str], optional: true}, extra: {cost: {type: float, optional: true}}}",
        );
        let resolved = resolve_optional(&rules, &yaml("{name: x}"));
        assert_eq!(resolved, yaml("{name: {type: str}}"));

        let kept = resolve_optional(&rules, &yaml("{name: x, tags: [a], extra: {cost: 1.0}}"));
        assert_eq!(kept, rules);
    }

    #[test]
    fn test_load_config() {
        let registry = Registry::new();
        let rules = [
            yaml("{foo: {type: int}}"),
            yaml("{bar: {type: str, optional: true}}"),
        ];
        let confs = [yaml("{foo: 1}"), yaml("{foo: 2}")];
        let instance = load_config(&registry, &rules, &confs).unwrap();
        assert_eq!(instance.get("foo"), Some(&ConfigValue::Int(2)));
        assert_eq!(instance.get("bar"), None);
    }
}
