//! Path classification
//!
//! Pure functions deciding what each location of a rule document means:
//!
//! ```text
//! (root)                      not a node (no key)
//! top                         node, branch
//! top.first                   node, leaf      { type: PositiveInt }
//! top.first.type              not a node (reserved key on the path)
//! top.nest                    node, branch
//! top.nest.leaf               node, leaf
//! top.nest.leaf.opts.multiple_of   not a node
//! ```
//!
//! Every predicate takes the `(parent_path, key, value)` triple produced by
//! [`walk`], so the same predicates drive whole-document filters.

use std::collections::BTreeSet;
use typedconf_core::{truthy, walk, DocPath, Document, PathKey};

/// Reserved keys of a rule leaf, in precedence order.
pub const TYPE_SPEC_KEYS: [&str; 9] = [
    "type",
    "opts",
    "validator",
    "validator_opts",
    "validator_params",
    "root_validator",
    "default",
    "optional",
    "doc",
];

pub const TYPE_KEY: &str = TYPE_SPEC_KEYS[0];
pub const OPTS_KEY: &str = TYPE_SPEC_KEYS[1];
pub const VALIDATOR_KEY: &str = TYPE_SPEC_KEYS[2];
pub const VALIDATOR_OPTS_KEY: &str = TYPE_SPEC_KEYS[3];
pub const VALIDATOR_PARAMS_KEY: &str = TYPE_SPEC_KEYS[4];
pub const ROOT_VALIDATOR_KEY: &str = TYPE_SPEC_KEYS[5];
pub const DEFAULT_KEY: &str = TYPE_SPEC_KEYS[6];
pub const OPTIONAL_KEY: &str = TYPE_SPEC_KEYS[7];
pub const DOC_KEY: &str = TYPE_SPEC_KEYS[8];

fn is_reserved(key: &PathKey) -> bool {
    key.as_str().map_or(false, |k| TYPE_SPEC_KEYS.contains(&k))
}

// ============================================================================
// PREDICATES
// ============================================================================

/// A structural point of the configuration shape.
///
/// The root visit (no key) is never a node. Any location with a reserved key
/// on its full path sits inside a leaf's metadata and is not a node either.
pub fn is_node(path: &DocPath, key: Option<&PathKey>, _value: &Document) -> bool {
    match key {
        None => false,
        Some(key) => !is_reserved(key) && !path.keys().iter().any(is_reserved),
    }
}

/// A node whose value is a mapping with a `type` key.
pub fn is_leaf(path: &DocPath, key: Option<&PathKey>, value: &Document) -> bool {
    is_node(path, key, value)
        && value
            .as_mapping()
            .map_or(false, |map| map.contains_key(TYPE_KEY))
}

/// A leaf flagged `optional`.
pub fn is_optional(path: &DocPath, key: Option<&PathKey>, value: &Document) -> bool {
    is_leaf(path, key, value) && value.get(OPTIONAL_KEY).map_or(false, truthy)
}

/// A leaf not flagged `optional`. Non-leaves are neither optional nor
/// mandatory.
pub fn is_mandatory(path: &DocPath, key: Option<&PathKey>, value: &Document) -> bool {
    is_leaf(path, key, value) && !value.get(OPTIONAL_KEY).map_or(false, truthy)
}

// ============================================================================
// FILTERS
// ============================================================================

/// Full paths of every location passing `test`.
pub fn filter<F>(doc: &Document, test: F) -> BTreeSet<DocPath>
where
    F: Fn(&DocPath, Option<&PathKey>, &Document) -> bool,
{
    filter_ordered(doc, test).into_iter().collect()
}

/// Like [`filter`], in document order.
pub fn filter_ordered<F>(doc: &Document, test: F) -> Vec<DocPath>
where
    F: Fn(&DocPath, Option<&PathKey>, &Document) -> bool,
{
    let mut found = Vec::new();
    walk(doc, |path, key, value| {
        if test(path, key, value) {
            found.push(match key {
                Some(key) => path.child(key.clone()),
                None => path.clone(),
            });
        }
    });
    found
}

pub fn nodes(doc: &Document) -> BTreeSet<DocPath> {
    filter(doc, is_node)
}

pub fn leaves(doc: &Document) -> BTreeSet<DocPath> {
    filter(doc, is_leaf)
}

/// Nested records of a rule document.
///
/// A branch is a node that is not a leaf, does not sit below a leaf, holds a
/// mapping and has at least one leaf below it.
pub fn branches(doc: &Document) -> BTreeSet<DocPath> {
    let leaves = leaves(doc);
    nodes(doc)
        .into_iter()
        .filter(|path| !leaves.contains(path))
        .filter(|path| !has_leaf_ancestor(path, &leaves))
        .filter(|path| path.get(doc).map_or(false, Document::is_mapping))
        .filter(|path| leaves.iter().any(|leaf| path.is_ancestor_of(leaf)))
        .collect()
}

/// True when some leaf is a strict prefix of `path`.
pub fn has_leaf_ancestor(path: &DocPath, leaves: &BTreeSet<DocPath>) -> bool {
    leaves.iter().any(|leaf| leaf.is_ancestor_of(path))
}

/// The deepest paths of a set.
///
/// A path is dropped when its keys are a subset of another path's keys. This
/// compares key sets, not prefixes, so it assumes no key repeats along one
/// path; `a.b.a` and `a.b` are indistinguishable here, and `b` is dropped
/// next to `a.b`. The compiler queues such branches itself.
pub fn leaf_subset(paths: &BTreeSet<DocPath>) -> BTreeSet<DocPath> {
    let key_sets: Vec<(&DocPath, BTreeSet<&PathKey>)> = paths
        .iter()
        .map(|p| (p, p.keys().iter().collect()))
        .collect();
    key_sets
        .iter()
        .filter(|(p, keys)| {
            !key_sets
                .iter()
                .any(|(q, other)| p != q && keys.is_subset(other))
        })
        .map(|(p, _)| (*p).clone())
        .collect()
}

// ============================================================================
// LEAF HELPERS
// ============================================================================

/// Pick `keys` out of every leaf, keeping the hierarchy.
///
/// Leaves holding none of the keys are left out of the result.
pub fn get_from_leaf(doc: &Document, keys: &[&str]) -> Document {
    let mut out = Document::Mapping(Default::default());
    for path in filter_ordered(doc, is_leaf) {
        let Some(leaf) = path.get(doc).and_then(Document::as_mapping) else {
            continue;
        };
        let picked: typedconf_core::Mapping = keys
            .iter()
            .filter_map(|k| leaf.get(*k).map(|v| (Document::from(*k), v.clone())))
            .collect();
        if !picked.is_empty() {
            path.assign(&mut out, Document::Mapping(picked));
        }
    }
    out
}

/// Remove `keys` from every leaf.
pub fn del_from_leaf(doc: &Document, keys: &[&str]) -> Document {
    let mut out = doc.clone();
    for path in filter_ordered(doc, is_leaf) {
        if let Some(Document::Mapping(leaf)) = path.get_mut(&mut out) {
            for key in keys {
                leaf.shift_remove(*key);
            }
        }
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================
