//! Integration tests for property sets and network assembly
//!
//! Tests verify:
//! - Property inheritance: inherited < attribute default < local value
//! - Cycle and undefined-parent detection
//! - File-based network building
//! - Edge validation through per-edge record types

use std::fs;
use tempfile::TempDir;
use typedconf_core::{CompileError, TypedConfError};
use typedconf_schema::*;
use typedconf_test_utils::fixtures::*;
use typedconf_test_utils::{yaml, DocPath};

fn float(instance: &ConfigInstance, field: &str) -> Option<f64> {
    instance.get(field).and_then(ConfigValue::as_f64)
}

// ============================================================================
// PROPERTIES
// ============================================================================

#[test]
fn test_property_chain_precedence() {
    let registry = Registry::new();
    let (attrs, defaults) = attr_defaults(&attribute_rules());
    let set = compose_properties(&registry, &attrs, &defaults, &property_decls()).unwrap();

    assert_eq!(set.base.name, "baseprop_t");
    let names: Vec<&str> = set.names().collect();
    assert_eq!(names.len(), 3);
    let position = |name: &str| names.iter().position(|n| *n == name).unwrap();
    assert!(position("generator") < position("wind_farm"));
    assert!(position("wind_farm") < position("offshore"));

    // default applied where nothing was inherited
    assert_eq!(float(set.get("generator").unwrap(), "efficiency"), Some(1.0));
    // local value beats the inherited one and the default
    assert_eq!(float(set.get("wind_farm").unwrap(), "efficiency"), Some(0.4));
    // inherited value beats the default
    assert_eq!(float(set.get("offshore").unwrap(), "efficiency"), Some(0.4));
    assert_eq!(float(set.get("offshore").unwrap(), "capacity"), Some(400.0));
    assert_eq!(float(set.get("offshore").unwrap(), "cost"), Some(12.5));
    assert!(set.get("wind_farm").unwrap().get("cost").is_none());
}

#[test]
fn test_property_cycle() {
    let registry = Registry::new();
    let (attrs, defaults) = attr_defaults(&attribute_rules());
    let err = compose_properties(&registry, &attrs, &defaults, &cyclic_property_decls())
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("cyclic property dependency"));
    assert!(message.contains("base -> derived"));
    assert!(message.contains("derived -> base"));
}

#[test]
fn test_cycle_report_leaves_out_acyclic_edges() {
    let registry = Registry::new();
    let (attrs, defaults) = attr_defaults(&attribute_rules());
    let props = yaml(
        r#"
root: {capacity: 1, technology: gas}
a: {parent: b}
b: {parent: a}
leaf: {parent: root}
"#,
    );
    let err = compose_properties(&registry, &attrs, &defaults, &props).unwrap_err();
    match err {
        CompileError::CyclicPropertyDependency { edges } => {
            assert_eq!(edges.len(), 2);
            assert!(edges.iter().all(|(from, to)| from != "root" && to != "leaf"));
        }
        other => panic!("Expected a cycle, got: {:?}", other),
    }
}

#[test]
fn test_defaults_without_stripping() {
    // Defaults left on the rules still reach baseprop_t fields
    let registry = Registry::new();
    let base = make_baseprop_t(&registry, &attribute_rules()).unwrap();
    assert!(base.field("efficiency").unwrap().has_default());
    assert!(base.field("cost").is_none());
}

// ============================================================================
// NETWORK
// ============================================================================

#[test]
fn test_network_from_files() {
    let dir = TempDir::new().unwrap();
    let attrs = dir.path().join("attributes.yaml");
    let props = dir.path().join("properties.yaml");
    fs::write(&attrs, ATTRIBUTE_RULES).unwrap();
    fs::write(&props, PROPERTY_DECLS).unwrap();

    let registry = Registry::new();
    let mut builder = NetworkBuilder::from_files(&registry, &[&attrs]).unwrap();
    assert_eq!(builder.defaults().len(), 1);
    assert_eq!(
        builder.attributes().keys().collect::<Vec<_>>(),
        vec!["capacity", "technology", "efficiency", "cost"]
    );

    let props = typedconf_core::read_document(&props).unwrap();
    builder.make_properties(&[props]).unwrap();
    builder.add_edges(&[edge_decls()]).unwrap();

    let graph = builder.graph();
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 2);

    let storage = &builder.edges()[1];
    assert_eq!(storage.target, "storage");
    let wind_farm = storage
        .values
        .get_path(&DocPath::from_keys(["wind_farm", "capacity"]))
        .and_then(ConfigValue::as_f64);
    assert_eq!(wind_farm, Some(20.0));
}

#[test]
fn test_edge_files_merge_before_validation() {
    let registry = Registry::new();
    let mut builder = NetworkBuilder::new(&registry, &[attribute_rules()]).unwrap();
    builder.make_properties(&[property_decls()]).unwrap();
    builder
        .add_edges(&[
            yaml("{a: {b: {capacity: 1}}}"),
            yaml("{a: {b: {technology: solar}}}"),
        ])
        .unwrap();
    let edge = &builder.edges()[0];
    assert_eq!(edge.values.type_name(), "a_b_t");
    assert_eq!(edge.values.values().len(), 2);
}

#[test]
fn test_edge_attribute_type_errors() {
    let registry = Registry::new();
    let mut builder = NetworkBuilder::new(&registry, &[attribute_rules()]).unwrap();
    let err = builder
        .add_edges(&[yaml("{a: {b: {technology: coal}}}")])
        .unwrap_err();
    match err {
        TypedConfError::Validation(err) => {
            assert_eq!(err.type_name, "a_b_t");
            assert!(err.has_violation_at(&DocPath::from_keys(["technology"])));
        }
        other => panic!("Expected Validation error, got: {:?}", other),
    }
}

#[test]
fn test_reset_rebuilds_graph() {
    let registry = Registry::new();
    let mut builder = NetworkBuilder::new(&registry, &[attribute_rules()]).unwrap();
    builder
        .add_edges(&[yaml("{a: {b: {capacity: 1}, c: {capacity: 2}}}")])
        .unwrap();
    assert_eq!(builder.digraph().edge_count(), 2);
    builder.reset();
    assert_eq!(builder.digraph().edge_count(), 2);
    assert_eq!(builder.graph().node_count(), 3);
}
