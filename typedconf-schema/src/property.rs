//! Property Sets - Inheritable bundles of attribute values
//!
//! Attributes are leaf rules describing the values a graph element may
//! carry. A property is a named set of attribute values that may inherit from
//! one parent property:
//!
//! ```text
//! generator { capacity: 100, technology: gas }
//!     └── wind_farm { technology: wind, efficiency: 0.4 }
//!             └── offshore { capacity: 400 }
//! ```
//!
//! Every property gets its own composite type extending its parent's type,
//! or `baseprop_t` (the mandatory attributes) when it has no parent. Values
//! are resolved with increasing precedence: inherited, attribute default,
//! declared locally.

use crate::classify::{
    del_from_leaf, filter_ordered, has_leaf_ancestor, is_leaf, is_node, DEFAULT_KEY, DOC_KEY,
};
use crate::composite::{build_composite, check_field_name, CompositeType};
use crate::registry::Registry;
use crate::resolve::{CompileWarning, Resolver};
use crate::rewrite::{rewrite_leaf, FieldSpec, LevelSpec};
use crate::value::ConfigInstance;
use indexmap::IndexMap;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use typedconf_core::{CompileError, CompileResult, DocPath, Document, Mapping, PathKey};

/// Key naming the property a declaration inherits from.
pub const PARENT_KEY: &str = "parent";

/// Presentation metadata carried by attribute leaves.
pub const SCALING_LABEL_KEY: &str = "scaling_label";

/// Name hint of the composite shared by every parentless property.
pub const BASEPROP_HINT: &str = "baseprop";

// ============================================================================
// ATTRIBUTES
// ============================================================================

/// Split attribute rules into the rules proper and their defaults.
///
/// Defaults are keyed by the last key of the leaf path. `default`, `doc` and
/// `scaling_label` are stripped from the returned rules.
pub fn attr_defaults(attrs: &Document) -> (Document, IndexMap<String, Document>) {
    let defaults = filter_ordered(attrs, is_leaf)
        .into_iter()
        .filter_map(|path| {
            let default = path.get(attrs)?.get(DEFAULT_KEY)?.clone();
            Some((path.last()?.to_string(), default))
        })
        .collect();
    let stripped = del_from_leaf(attrs, &[DEFAULT_KEY, DOC_KEY, SCALING_LABEL_KEY]);
    (stripped, defaults)
}

/// One compiled attribute leaf.
#[derive(Debug, Clone)]
pub struct Attribute {
    /// Location of the leaf in the attribute rules.
    pub path: DocPath,
    pub spec: FieldSpec,
}

/// Attribute leaves compiled once, keyed by the last key of their path.
///
/// Last keys must be unique across the whole attribute tree.
#[derive(Debug, Clone)]
pub struct AttributeSet {
    attributes: IndexMap<String, Attribute>,
    leaf_paths: BTreeSet<DocPath>,
    base: Arc<CompositeType>,
    warnings: Vec<CompileWarning>,
}

impl AttributeSet {
    pub fn compile(registry: &Registry, attrs: &Document) -> CompileResult<Self> {
        if !attrs.is_mapping() {
            return Err(CompileError::InvalidTypeSpec {
                path: DocPath::root(),
                reason: "attribute rules must be a mapping".to_string(),
            });
        }

        let mut resolver = Resolver::new(registry);
        let mut attributes = IndexMap::new();
        for path in filter_ordered(attrs, is_leaf) {
            let Some(spec) = path.get(attrs).and_then(Document::as_mapping) else {
                continue;
            };
            let spec = rewrite_leaf(&mut resolver, &path, spec)?;
            let key = path.last().map(ToString::to_string).unwrap_or_default();
            if attributes.contains_key(&key) {
                return Err(CompileError::DuplicateFieldName {
                    type_name: "attributes".to_string(),
                    field: key,
                });
            }
            attributes.insert(key, Attribute { path, spec });
        }

        let mandatory = LevelSpec {
            fields: attributes
                .iter()
                .filter(|(_, attr)| !attr.spec.optional)
                .map(|(key, attr)| (key.clone(), attr.spec.clone()))
                .collect(),
            validators: Vec::new(),
        };
        let base = build_composite(BASEPROP_HINT, mandatory, &[], &DocPath::root())?;
        let leaf_paths = attributes.values().map(|a| a.path.clone()).collect();
        debug!(
            attributes = attributes.len(),
            mandatory = base.fields.len(),
            "compiled attribute rules"
        );
        Ok(Self {
            attributes,
            leaf_paths,
            base,
            warnings: resolver.into_warnings(),
        })
    }

    pub fn get(&self, key: &str) -> Option<&Attribute> {
        self.attributes.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// The composite of the mandatory attributes, `baseprop_t`.
    pub fn base(&self) -> &Arc<CompositeType> {
        &self.base
    }

    pub fn warnings(&self) -> &[CompileWarning] {
        &self.warnings
    }

    fn at_path(&self, path: &DocPath) -> Option<(&String, &Attribute)> {
        self.attributes.iter().find(|(_, attr)| &attr.path == path)
    }

    /// Pick the attribute values out of a property declaration, in
    /// declaration order.
    ///
    /// Grouping keys above attribute leaves and values nested inside them are
    /// accepted; any other key is an undefined attribute.
    pub fn select_values(&self, values: &Document) -> CompileResult<Vec<(String, Document)>> {
        let mut selected = Vec::new();
        for path in filter_ordered(values, is_node) {
            if let Some((key, _)) = self.at_path(&path) {
                if let Some(value) = path.get(values) {
                    selected.push((key.clone(), value.clone()));
                }
                continue;
            }
            let grouping = self.leaf_paths.iter().any(|leaf| path.is_ancestor_of(leaf));
            if grouping || has_leaf_ancestor(&path, &self.leaf_paths) {
                continue;
            }
            return Err(CompileError::UndefinedReference {
                kind: "attribute".to_string(),
                name: path.to_string(),
            });
        }
        Ok(selected)
    }

    /// The record level for a set of selected attribute keys.
    pub fn level_for<'a, I>(&self, keys: I) -> LevelSpec
    where
        I: IntoIterator<Item = &'a str>,
    {
        LevelSpec {
            fields: keys
                .into_iter()
                .filter_map(|key| {
                    self.attributes
                        .get(key)
                        .map(|attr| (key.to_string(), attr.spec.clone()))
                })
                .collect(),
            validators: Vec::new(),
        }
    }
}

/// The composite of the mandatory attribute leaves, `baseprop_t`.
pub fn make_baseprop_t(registry: &Registry, attrs: &Document) -> CompileResult<Arc<CompositeType>> {
    Ok(AttributeSet::compile(registry, attrs)?.base)
}

// ============================================================================
// PROPERTIES
// ============================================================================

/// Validated properties, parents before children.
#[derive(Debug, Clone)]
pub struct PropertySet {
    /// `baseprop_t`, the root of every inheritance chain.
    pub base: Arc<CompositeType>,
    pub properties: IndexMap<String, ConfigInstance>,
}

impl PropertySet {
    pub fn get(&self, name: &str) -> Option<&ConfigInstance> {
        self.properties.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// The composite type synthesized for `name`.
    pub fn type_of(&self, name: &str) -> Option<&Arc<CompositeType>> {
        self.properties.get(name).map(ConfigInstance::composite)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

struct PropertyDecl<'a> {
    parent: Option<&'a str>,
    values: Document,
}

/// Compile attribute rules and resolve a set of property declarations.
pub fn compose_properties(
    registry: &Registry,
    attrs: &Document,
    defaults: &IndexMap<String, Document>,
    props: &Document,
) -> CompileResult<PropertySet> {
    let attributes = AttributeSet::compile(registry, attrs)?;
    compose_with(&attributes, defaults, props)
}

/// [`compose_properties`] over an already compiled attribute set.
pub fn compose_with(
    attributes: &AttributeSet,
    defaults: &IndexMap<String, Document>,
    props: &Document,
) -> CompileResult<PropertySet> {
    let decls = parse_decls(props)?;
    // nodes and edges take property names as field names
    for name in decls.keys() {
        check_field_name("properties", name)?;
    }

    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();
    for name in decls.keys() {
        index.insert(name.as_str(), graph.add_node(name.as_str()));
    }
    for (name, decl) in &decls {
        if let Some(parent) = decl.parent {
            let Some(&from) = index.get(parent) else {
                return Err(CompileError::UndefinedReference {
                    kind: "property".to_string(),
                    name: parent.to_string(),
                });
            };
            graph.add_edge(from, index[name.as_str()], ());
        }
    }
    let order = toposort(&graph, None).map_err(|_| CompileError::CyclicPropertyDependency {
        edges: cyclic_edges(&graph),
    })?;

    let mut properties: IndexMap<String, ConfigInstance> = IndexMap::new();
    for node in order {
        let name = graph[node];
        let decl = &decls[name];
        let current = attributes.select_values(&decl.values)?;

        let parent = decl.parent.and_then(|p| properties.get(p));
        let bases = match parent {
            Some(instance) => vec![Arc::clone(instance.composite())],
            None => vec![Arc::clone(attributes.base())],
        };
        let level = attributes.level_for(current.iter().map(|(k, _)| k.as_str()));
        let prop_t = build_composite(name, level, &bases, &DocPath::from_keys([name]))?;

        let mut kwargs = Mapping::new();
        if let Some(instance) = parent {
            for (field, value) in instance.values() {
                kwargs.insert(Document::from(field.as_str()), value.to_document());
            }
        }
        for field in prop_t.field_names() {
            if let Some(default) = defaults.get(field) {
                if !kwargs.contains_key(field) {
                    kwargs.insert(Document::from(field), default.clone());
                }
            }
        }
        for (field, value) in current {
            kwargs.insert(Document::from(field), value);
        }

        let instance =
            prop_t
                .from_mapping(&kwargs)
                .map_err(|source| CompileError::PropertyValidation {
                    property: name.to_string(),
                    source,
                })?;
        debug!(
            property = name,
            parent = decl.parent.unwrap_or(BASEPROP_HINT),
            fields = instance.values().len(),
            "composed property"
        );
        properties.insert(name.to_string(), instance);
    }

    Ok(PropertySet {
        base: Arc::clone(attributes.base()),
        properties,
    })
}

fn parse_decls(props: &Document) -> CompileResult<IndexMap<String, PropertyDecl<'_>>> {
    let map = props.as_mapping().ok_or_else(|| CompileError::InvalidTypeSpec {
        path: DocPath::root(),
        reason: "property declarations must be a mapping".to_string(),
    })?;
    let mut decls = IndexMap::new();
    for (key, value) in map {
        let name = PathKey::from_mapping_key(key).to_string();
        let path = DocPath::from_keys([name.as_str()]);
        let mut values = match value {
            Document::Null => Mapping::new(),
            Document::Mapping(m) => m.clone(),
            _ => {
                return Err(CompileError::InvalidTypeSpec {
                    path,
                    reason: "a property declaration must be a mapping".to_string(),
                })
            }
        };
        values.shift_remove(PARENT_KEY);
        let parent = match value.get(PARENT_KEY) {
            None => None,
            Some(Document::String(parent)) => Some(parent.as_str()),
            Some(_) => {
                return Err(CompileError::InvalidTypeSpec {
                    path: path.child(PARENT_KEY),
                    reason: "a parent must name a property".to_string(),
                })
            }
        };
        decls.insert(
            name,
            PropertyDecl {
                parent,
                values: Document::Mapping(values),
            },
        );
    }
    Ok(decls)
}

/// Edges lying on a cycle, in insertion order.
fn cyclic_edges(graph: &DiGraph<&str, ()>) -> Vec<(String, String)> {
    let mut cyclic: HashSet<NodeIndex> = HashSet::new();
    for component in tarjan_scc(graph) {
        let looped = component.len() == 1 && graph.contains_edge(component[0], component[0]);
        if component.len() > 1 || looped {
            cyclic.extend(component);
        }
    }
    graph
        .edge_references()
        .filter(|e| cyclic.contains(&e.source()) && cyclic.contains(&e.target()))
        .map(|e| (graph[e.source()].to_string(), graph[e.target()].to_string()))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ConfigValue;
    use typedconf_test_utils::fixtures::*;
    use typedconf_test_utils::yaml;

    fn compose(props: &Document) -> CompileResult<PropertySet> {
        let registry = Registry::new();
        let (attrs, defaults) = attr_defaults(&attribute_rules());
        compose_properties(&registry, &attrs, &defaults, props)
    }

    #[test]
    fn test_attr_defaults_strips_metadata() {
        let (attrs, defaults) = attr_defaults(&attribute_rules());
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults["efficiency"], Document::from(1.0));

        let efficiency = DocPath::from_keys(["efficiency"]).get(&attrs).unwrap();
        assert!(efficiency.get("default").is_none());
        let capacity = DocPath::from_keys(["capacity"]).get(&attrs).unwrap();
        assert!(capacity.get("doc").is_none());
        let cost = DocPath::from_keys(["economics", "cost"]).get(&attrs).unwrap();
        assert!(cost.get("scaling_label").is_none());
        assert!(cost.get("optional").is_some());
    }

    #[test]
    fn test_baseprop_holds_mandatory_attributes() {
        let registry = Registry::new();
        let (attrs, _) = attr_defaults(&attribute_rules());
        let base = make_baseprop_t(&registry, &attrs).unwrap();
        assert_eq!(base.name, "baseprop_t");
        assert_eq!(
            base.field_names().collect::<Vec<_>>(),
            vec!["capacity", "technology", "efficiency"]
        );
    }

    #[test]
    fn test_duplicate_last_key_is_rejected() {
        let registry = Registry::new();
        let attrs = yaml("{a: {cost: {type: float}}, b: {cost: {type: int}}}");
        let err = AttributeSet::compile(&registry, &attrs).unwrap_err();
        assert!(matches!(err, CompileError::DuplicateFieldName { ref field, .. } if field == "cost"));
    }

    #[test]
    fn test_inheritance_chain_values() {
        let set = compose(&property_decls()).unwrap();
        assert_eq!(set.len(), 3);

        let generator = set.get("generator").unwrap();
        assert_eq!(generator.get("capacity"), Some(&ConfigValue::Float(100.0)));
        assert_eq!(generator.get("efficiency"), Some(&ConfigValue::Float(1.0)));

        let wind_farm = set.get("wind_farm").unwrap();
        assert_eq!(wind_farm.get("capacity"), Some(&ConfigValue::Float(100.0)));
        assert_eq!(wind_farm.get("technology").and_then(ConfigValue::as_str), Some("wind"));
        assert_eq!(wind_farm.get("efficiency"), Some(&ConfigValue::Float(0.4)));

        let offshore = set.get("offshore").unwrap();
        assert_eq!(offshore.get("capacity"), Some(&ConfigValue::Float(400.0)));
        assert_eq!(offshore.get("technology").and_then(ConfigValue::as_str), Some("wind"));
        assert_eq!(offshore.get("efficiency"), Some(&ConfigValue::Float(0.4)));
        assert_eq!(offshore.get("cost"), Some(&ConfigValue::Float(12.5)));
    }

    #[test]
    fn test_property_types_extend_parents() {
        let set = compose(&property_decls()).unwrap();
        let offshore_t = set.type_of("offshore").unwrap();
        assert_eq!(offshore_t.name, "offshore_t");
        assert!(offshore_t.extends("wind_farm_t"));
        assert!(offshore_t.extends("generator_t"));
        assert!(offshore_t.extends("baseprop_t"));
    }

    #[test]
    fn test_parents_precede_children() {
        let props = yaml("{child: {parent: root, capacity: 2}, root: {capacity: 1, technology: gas}}");
        let set = compose(&props).unwrap();
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["root", "child"]);
    }

    #[test]
    fn test_cycle_reports_edges() {
        let err = compose(&cyclic_property_decls()).unwrap_err();
        match err {
            CompileError::CyclicPropertyDependency { edges } => {
                assert_eq!(edges.len(), 2);
                assert!(edges.contains(&("base".to_string(), "derived".to_string())));
                assert!(edges.contains(&("derived".to_string(), "base".to_string())));
            }
            other => panic!("Expected a cycle, got: {:?}", other),
        }
    }

    #[test]
    fn test_self_parent_is_a_cycle() {
        let err = compose(&yaml("{ring: {parent: ring, capacity: 1}}")).unwrap_err();
        assert_eq!(
            err,
            CompileError::CyclicPropertyDependency {
                edges: vec![("ring".to_string(), "ring".to_string())],
            }
        );
    }

    #[test]
    fn test_unknown_parent() {
        let err = compose(&yaml("{orphan: {parent: ghost}}")).unwrap_err();
        assert_eq!(
            err,
            CompileError::UndefinedReference {
                kind: "property".to_string(),
                name: "ghost".to_string(),
            }
        );
    }

    #[test]
    fn test_unknown_attribute() {
        let err = compose(&yaml("{odd: {capacity: 1, technology: gas, colour: red}}")).unwrap_err();
        assert_eq!(
            err,
            CompileError::UndefinedReference {
                kind: "attribute".to_string(),
                name: "colour".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_values_are_tagged_with_property() {
        let err = compose(&yaml("{bad: {capacity: -5, technology: gas}}")).unwrap_err();
        match err {
            CompileError::PropertyValidation { property, source } => {
                assert_eq!(property, "bad");
                assert_eq!(source.type_name, "bad_t");
                assert!(source.has_violation_at(&DocPath::from_keys(["capacity"])));
            }
            other => panic!("Expected PropertyValidation, got: {:?}", other),
        }
    }

    #[test]
    fn test_property_names_must_be_identifiers() {
        let err = compose(&yaml("{wind-farm: {capacity: 1, technology: wind}}")).unwrap_err();
        assert_eq!(
            err,
            CompileError::InvalidFieldName {
                type_name: "properties".to_string(),
                field: "wind-farm".to_string(),
            }
        );

        let err = compose(&yaml("{type: {capacity: 1, technology: wind}}")).unwrap_err();
        assert!(matches!(err, CompileError::ReservedFieldName { ref field, .. } if field == "type"));
    }

    #[test]
    fn test_missing_mandatory_attribute() {
        let err = compose(&yaml("{bare: {capacity: 5}}")).unwrap_err();
        assert!(matches!(
            err,
            CompileError::PropertyValidation { ref property, .. } if property == "bare"
        ));
    }
}
