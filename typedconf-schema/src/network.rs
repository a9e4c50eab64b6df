//! Network Builder - Nodes and edges carrying validated properties
//!
//! ```text
//! attribute rules ──► AttributeSet + defaults
//! property decls  ──► PropertySet (inheritance resolved)
//! edge decls      ──► one record type per edge, "{source}_{target}_t"
//!                       attribute fields + property fields
//!     ↓
//! graph() / digraph()  (memoized until the next change or reset())
//! ```
//!
//! Edge declarations are grouped by source. A `properties` block at the
//! source level is shared by every edge of that source; an edge's own
//! `properties` block is merged over it. A property reference maps to
//! overrides applied on top of the named property's values. Property names
//! become field names of those records, so they must be identifiers.

use crate::composite::build_composite;
use crate::property::{attr_defaults, compose_with, AttributeSet, PropertySet};
use crate::registry::Registry;
use crate::rewrite::{FieldSpec, LevelSpec};
use crate::types::TypeDescriptor;
use crate::value::ConfigInstance;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use petgraph::graph::{DiGraph, Graph, UnGraph};
use petgraph::EdgeType;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;
use typedconf_core::{
    merge_documents, merge_files, CompileError, DocPath, Document, Mapping, PathKey,
    TypedConfResult,
};

/// Key of the property block on sources, edges and nodes.
pub const PROPERTIES_KEY: &str = "properties";

/// One validated connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub source: String,
    pub target: String,
    /// Attribute values and resolved properties, as a `{source}_{target}_t`
    /// record.
    pub values: ConfigInstance,
}

/// Assembles a network from attribute rules, properties, nodes and edges.
#[derive(Debug)]
pub struct NetworkBuilder {
    attributes: AttributeSet,
    defaults: IndexMap<String, Document>,
    properties: Option<PropertySet>,
    nodes: IndexMap<String, ConfigInstance>,
    edges: Vec<Edge>,
    graph: OnceCell<UnGraph<String, ConfigInstance>>,
    digraph: OnceCell<DiGraph<String, ConfigInstance>>,
}

impl NetworkBuilder {
    /// Compile the merged attribute rules.
    pub fn new(registry: &Registry, rule_docs: &[Document]) -> TypedConfResult<Self> {
        let (attrs, defaults) = attr_defaults(&merge_documents(rule_docs));
        let attributes = AttributeSet::compile(registry, &attrs)?;
        Ok(Self {
            attributes,
            defaults,
            properties: None,
            nodes: IndexMap::new(),
            edges: Vec::new(),
            graph: OnceCell::new(),
            digraph: OnceCell::new(),
        })
    }

    pub fn from_files<P: AsRef<Path>>(registry: &Registry, rule_paths: &[P]) -> TypedConfResult<Self> {
        let rules = merge_files(rule_paths, None)?;
        Self::new(registry, &[rules])
    }

    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    pub fn defaults(&self) -> &IndexMap<String, Document> {
        &self.defaults
    }

    /// Resolve property declarations, replacing any earlier set.
    pub fn make_properties(&mut self, prop_docs: &[Document]) -> TypedConfResult<&PropertySet> {
        let props = merge_documents(prop_docs);
        let set = compose_with(&self.attributes, &self.defaults, &props)?;
        debug!(properties = set.len(), "made properties");
        Ok(&*self.properties.insert(set))
    }

    pub fn properties(&self) -> Option<&PropertySet> {
        self.properties.as_ref()
    }

    /// Validate node declarations: `name -> { attribute values, properties }`.
    pub fn add_nodes(&mut self, node_docs: &[Document]) -> TypedConfResult<()> {
        let decls = merge_documents(node_docs);
        let mut added = IndexMap::new();
        for (name, decl) in entries(&decls, &DocPath::root())? {
            let path = DocPath::from_keys([name.as_str()]);
            let decl = as_mapping(decl, &path)?;
            let props = decl.get(PROPERTIES_KEY).cloned().unwrap_or(Document::Null);
            let values = self.validate_element(&name, &path, &decl, &props)?;
            added.insert(name, values);
        }
        debug!(nodes = added.len(), "added nodes");
        self.nodes.extend(added);
        self.reset();
        Ok(())
    }

    /// Validate edge declarations: `source -> { properties?, target -> decl }`.
    pub fn add_edges(&mut self, edge_docs: &[Document]) -> TypedConfResult<()> {
        let decls = merge_documents(edge_docs);
        let mut added = Vec::new();
        for (source, targets) in entries(&decls, &DocPath::root())? {
            let source_path = DocPath::from_keys([source.as_str()]);
            let shared = targets
                .get(PROPERTIES_KEY)
                .cloned()
                .unwrap_or(Document::Null);
            for (target, decl) in entries(targets, &source_path)? {
                if target == PROPERTIES_KEY {
                    continue;
                }
                let path = source_path.child(target.as_str());
                let decl = as_mapping(decl, &path)?;
                let own = decl.get(PROPERTIES_KEY).cloned().unwrap_or(Document::Null);
                let props = merge_documents(&[non_null(shared.clone()), non_null(own)]);
                let name = format!("{}_{}", source, target);
                let values = self.validate_element(&name, &path, &decl, &props)?;
                added.push(Edge {
                    source: source.clone(),
                    target,
                    values,
                });
            }
        }
        debug!(edges = added.len(), "added edges");
        self.edges.extend(added);
        self.reset();
        Ok(())
    }

    pub fn node(&self, name: &str) -> Option<&ConfigInstance> {
        self.nodes.get(name)
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// The undirected network. Declared nodes come first, then edge
    /// endpoints in order of appearance.
    pub fn graph(&self) -> &UnGraph<String, ConfigInstance> {
        self.graph.get_or_init(|| self.build())
    }

    /// The directed network, edges pointing from source to target.
    pub fn digraph(&self) -> &DiGraph<String, ConfigInstance> {
        self.digraph.get_or_init(|| self.build())
    }

    /// Drop the memoized graphs.
    pub fn reset(&mut self) {
        self.graph = OnceCell::new();
        self.digraph = OnceCell::new();
    }

    fn build<Ty: EdgeType>(&self) -> Graph<String, ConfigInstance, Ty> {
        let mut graph = Graph::default();
        let mut index = HashMap::new();
        for name in self.nodes.keys() {
            index.insert(name.clone(), graph.add_node(name.clone()));
        }
        for edge in &self.edges {
            let a = *index
                .entry(edge.source.clone())
                .or_insert_with(|| graph.add_node(edge.source.clone()));
            let b = *index
                .entry(edge.target.clone())
                .or_insert_with(|| graph.add_node(edge.target.clone()));
            graph.add_edge(a, b, edge.values.clone());
        }
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            directed = Ty::is_directed(),
            "built network graph"
        );
        graph
    }

    /// Type-check one element's attribute values and property references
    /// through a record type synthesized for it.
    fn validate_element(
        &self,
        name: &str,
        path: &DocPath,
        decl: &Mapping,
        props: &Document,
    ) -> TypedConfResult<ConfigInstance> {
        let mut level = LevelSpec::default();
        let mut kwargs = Mapping::new();

        for (key, value) in decl {
            let key = PathKey::from_mapping_key(key).to_string();
            if key == PROPERTIES_KEY {
                continue;
            }
            let attribute = self.attributes.get(&key).ok_or_else(|| CompileError::UndefinedReference {
                kind: "attribute".to_string(),
                name: key.clone(),
            })?;
            level.fields.push((key.clone(), attribute.spec.clone()));
            kwargs.insert(Document::from(key), value.clone());
        }

        for (prop, overrides) in entries(props, path)? {
            let instance = self
                .properties
                .as_ref()
                .and_then(|set| set.get(&prop))
                .ok_or_else(|| CompileError::UndefinedReference {
                    kind: "property".to_string(),
                    name: prop.clone(),
                })?;
            let mut values = instance.to_document();
            if overrides.as_mapping().map_or(false, |m| !m.is_empty()) {
                values = merge_documents(&[values, overrides.clone()]);
            }
            let ty = TypeDescriptor::Composite(instance.composite().clone());
            level.fields.push((prop.clone(), FieldSpec::new(ty)));
            kwargs.insert(Document::from(prop), values);
        }

        let element_t = build_composite(name, level, &[], path)?;
        Ok(element_t.from_mapping(&kwargs)?)
    }
}

/// Entries of a mapping with stringified keys; null counts as empty.
fn entries<'a>(doc: &'a Document, path: &DocPath) -> TypedConfResult<Vec<(String, &'a Document)>> {
    match doc {
        Document::Null => Ok(Vec::new()),
        Document::Mapping(map) => Ok(map
            .iter()
            .map(|(k, v)| (PathKey::from_mapping_key(k).to_string(), v))
            .collect()),
        _ => Err(CompileError::InvalidTypeSpec {
            path: path.clone(),
            reason: "expected a mapping".to_string(),
        }
        .into()),
    }
}

fn as_mapping(doc: &Document, path: &DocPath) -> TypedConfResult<Mapping> {
    match doc {
        Document::Null => Ok(Mapping::new()),
        Document::Mapping(map) => Ok(map.clone()),
        _ => Err(CompileError::InvalidTypeSpec {
            path: path.clone(),
            reason: "expected a mapping".to_string(),
        }
        .into()),
    }
}

fn non_null(doc: Document) -> Document {
    match doc {
        Document::Null => Document::Mapping(Mapping::new()),
        other => other,
    }
}

// ============================================================================
// TESTS
// ============================================================================
