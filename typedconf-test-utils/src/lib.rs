//! typedconf Test Utilities
//!
//! Centralized test infrastructure for the typedconf workspace:
//! - Rule and configuration fixtures shared by the crate test suites
//! - Proptest generators for documents, paths and rule trees
//! - Custom assertions for documents and validation errors

pub use typedconf_core::{
    parse_yaml, DocPath, Document, Mapping, PathKey, TypedConfError, TypedConfResult,
    ValidationError, Violation, ViolationKind,
};

/// Parse an inline YAML fixture.
///
/// Panics on malformed YAML: fixtures are trusted test input.
#[track_caller]
pub fn yaml(src: &str) -> Document {
    match parse_yaml(src) {
        Ok(doc) => doc,
        Err(e) => panic!("bad YAML fixture: {}\n{}", e, src),
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Rule documents used across the test suites.

    use super::*;

    /// One leaf with a field validator bound to a threshold.
    pub const THRESHOLD_RULES: &str = r#"
foo:
  type: PositiveInt
  validator: threshold
  validator_params:
    threshold: 5
"#;

    /// A record-level validator declared on a leaf of a two-level tree.
    pub const NESTED_SUM_RULES: &str = r#"
top:
  first:
    type: PositiveInt
  second:
    type: PositiveInt
    validator: sum_by_name
    validator_params:
      total: 15
    root_validator: true
  nest:
    leaf:
      type: conint
      opts:
        multiple_of: 5
"#;

    pub const ZERO_SUM_RULES: &str = r#"
zero_sum_total:
  foo:
    type: PositiveInt
  bar:
    type: PositiveInt
    validator: zero_sum
    validator_params:
      total: 15
    root_validator: true
"#;

    /// `b` has a default and is declared first.
    pub const DEFAULT_ORDERING_RULES: &str = r#"
b:
  type: int
  default: 0
a:
  type: int
"#;

    /// A broader schema touching most builtin types.
    pub const SERVICE_RULES: &str = r#"
run:
  name:
    type: str
    doc: Name of the run
  mode:
    type: Literal
    opts: [fast, thorough]
    default: fast
  retries:
    type: conint
    opts:
      ge: 0
      le: 10
    default: 3
  tags:
    type: List
    opts: [str]
    optional: true
model:
  range:
    low:
      type: float
    high:
      type: float
      validator: range_check
      validator_params:
        min_key: low
  step:
    type: PositiveInt
    validator: mult_of
    validator_params:
      factor: 2
"#;

    pub const SERVICE_CONFIG: &str = r#"
run:
  name: nightly
  retries: 5
model:
  range:
    low: 0.5
    high: 2.5
  step: 4
"#;

    /// Attribute rules for the property subsystem.
    pub const ATTRIBUTE_RULES: &str = r#"
capacity:
  type: unitfloat
  opts:
    unit: MW
    ge: 0
  doc: Installed capacity
technology:
  type: Literal
  opts: [wind, solar, gas]
efficiency:
  type: confloat
  opts:
    gt: 0
    le: 1
  default: 1.0
economics:
  cost:
    type: NonNegativeFloat
    optional: true
    scaling_label: currency
"#;

    /// Three properties in one inheritance chain.
    pub const PROPERTY_DECLS: &str = r#"
generator:
  capacity: 100
  technology: gas
wind_farm:
  parent: generator
  technology: wind
  efficiency: 0.4
offshore:
  parent: wind_farm
  capacity: 400
  economics:
    cost: 12.5
"#;

    /// `base` and `derived` inherit from each other.
    pub const CYCLIC_PROPERTY_DECLS: &str = r#"
base:
  parent: derived
  capacity: 1
derived:
  parent: base
  technology: solar
"#;

    pub const EDGE_DECLS: &str = r#"
plant:
  properties:
    generator: {}
  grid:
    capacity: 50
    technology: gas
  storage:
    properties:
      wind_farm:
        capacity: 20
"#;

    pub const MERGE_FIRST: &str = "a: 1\nb: {c: 3, d: 4}\ne: true\n";
    pub const MERGE_SECOND: &str = "c: 3\nb: {e: 5, d: 40}\ne: {g: true, h: foo}\n";

    pub fn threshold_rules() -> Document {
        yaml(THRESHOLD_RULES)
    }

    pub fn nested_sum_rules() -> Document {
        yaml(NESTED_SUM_RULES)
    }

    pub fn zero_sum_rules() -> Document {
        yaml(ZERO_SUM_RULES)
    }

    pub fn default_ordering_rules() -> Document {
        yaml(DEFAULT_ORDERING_RULES)
    }

    pub fn service_rules() -> Document {
        yaml(SERVICE_RULES)
    }

    pub fn service_config() -> Document {
        yaml(SERVICE_CONFIG)
    }

    pub fn attribute_rules() -> Document {
        yaml(ATTRIBUTE_RULES)
    }

    pub fn property_decls() -> Document {
        yaml(PROPERTY_DECLS)
    }

    pub fn cyclic_property_decls() -> Document {
        yaml(CYCLIC_PROPERTY_DECLS)
    }

    pub fn edge_decls() -> Document {
        yaml(EDGE_DECLS)
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for documents, paths and rule trees.

    use super::*;
    use proptest::prelude::*;

    const RESERVED: [&str; 9] = [
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

    // === Keys and Paths ===

    /// A lowercase identifier that is not a reserved rule key.
    pub fn arb_key() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_]{0,7}".prop_filter("reserved rule key", |k| {
            !RESERVED.contains(&k.as_str())
        })
    }

    /// Generate a random document path of up to four keys.
    pub fn arb_doc_path() -> impl Strategy<Value = DocPath> {
        prop::collection::vec(
            prop_oneof![
                3 => arb_key().prop_map(PathKey::Key),
                1 => (0usize..4).prop_map(PathKey::Index),
            ],
            0..5,
        )
        .prop_map(DocPath::from)
    }

    /// A chain of paths of strictly increasing depth, each extending the
    /// previous one by a key not already on the path.
    pub fn arb_path_chain() -> impl Strategy<Value = Vec<DocPath>> {
        prop::collection::btree_set(arb_key(), 1..6).prop_map(|keys| {
            let keys: Vec<String> = keys.into_iter().collect();
            (1..=keys.len())
                .map(|n| DocPath::from_keys(keys[..n].iter().cloned()))
                .collect()
        })
    }

    /// Sibling paths below a shared prefix: no path's keys are contained in
    /// another's.
    pub fn arb_path_antichain() -> impl Strategy<Value = Vec<DocPath>> {
        (
            prop::collection::vec(arb_key(), 0..3),
            prop::collection::btree_set(arb_key(), 1..6),
        )
            .prop_filter("prefix and leaves overlap", |(prefix, leaves)| {
                !prefix.iter().any(|k| leaves.contains(k))
            })
            .prop_map(|(prefix, leaves)| {
                let base = DocPath::from_keys(prefix);
                leaves.into_iter().map(|leaf| base.child(leaf)).collect()
            })
    }

    // === Documents ===

    pub fn arb_scalar() -> impl Strategy<Value = Document> {
        prop_oneof![
            any::<bool>().prop_map(Document::from),
            (-1000i64..1000).prop_map(Document::from),
            "[a-z ]{0,12}".prop_map(Document::from),
        ]
    }

    /// Nested mappings with scalar and sequence values.
    pub fn arb_document() -> impl Strategy<Value = Document> {
        arb_scalar().prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Document::Sequence),
                prop::collection::btree_map(arb_key(), inner, 0..5).prop_map(|entries| {
                    Document::Mapping(
                        entries
                            .into_iter()
                            .map(|(k, v)| (Document::from(k), v))
                            .collect(),
                    )
                }),
            ]
        })
    }

    /// A leaf rule: a builtin type name, optionally with a default.
    pub fn arb_leaf_rule() -> impl Strategy<Value = Document> {
        (
            prop_oneof![Just("int"), Just("float"), Just("str"), Just("bool")],
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(ty, with_default, optional)| {
                let mut leaf = Mapping::new();
                leaf.insert("type".into(), ty.into());
                if with_default {
                    let default = match ty {
                        "int" => Document::from(0),
                        "float" => Document::from(0.5),
                        "str" => Document::from("x"),
                        _ => Document::from(false),
                    };
                    leaf.insert("default".into(), default);
                }
                if optional {
                    leaf.insert("optional".into(), true.into());
                }
                Document::Mapping(leaf)
            })
    }

    /// A rule tree whose branches always bottom out in leaf rules.
    pub fn arb_rule_document() -> impl Strategy<Value = Document> {
        arb_leaf_rule().prop_recursive(3, 32, 4, |inner| {
            prop::collection::btree_map(arb_key(), inner, 1..4).prop_map(|entries| {
                Document::Mapping(
                    entries
                        .into_iter()
                        .map(|(k, v)| (Document::from(k), v))
                        .collect(),
                )
            })
        })
        .prop_filter("root must be a branch", |doc| {
            doc.as_mapping().map_or(false, |m| !m.contains_key("type"))
        })
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Custom assertion functions for typedconf-specific validation.

    use super::*;

    /// Assert the top-level keys of a mapping, in order.
    #[track_caller]
    pub fn assert_keys_in_order(doc: &Document, expected: &[&str]) {
        let keys: Vec<String> = match doc.as_mapping() {
            Some(map) => map
                .keys()
                .map(|k| PathKey::from_mapping_key(k).to_string())
                .collect(),
            None => panic!("Expected a mapping, got: {:?}", doc),
        };
        assert_eq!(keys, expected, "Key order mismatch");
    }

    /// Assert a validation error holds a violation of `kind` at `path`.
    #[track_caller]
    pub fn assert_violation(err: &ValidationError, path: &DocPath, kind: ViolationKind) {
        assert!(
            err.violations
                .iter()
                .any(|v| &v.path == path && v.kind == kind),
            "Expected {} at {}, got: {}",
            kind,
            path,
            err
        );
    }

    /// Assert some violation message contains `needle`.
    #[track_caller]
    pub fn assert_violation_message(err: &ValidationError, needle: &str) {
        assert!(
            err.violations.iter().any(|v| v.message.contains(needle)),
            "No violation mentions {:?}: {}",
            needle,
            err
        );
    }

    /// Assert that a TypedConfResult is a Validation error and return it.
    #[track_caller]
    pub fn expect_validation_error<T: std::fmt::Debug>(
        result: TypedConfResult<T>,
    ) -> ValidationError {
        match result {
            Err(TypedConfError::Validation(err)) => err,
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that a TypedConfResult is a Compile error.
    #[track_caller]
    pub fn assert_compile_error<T: std::fmt::Debug>(result: &TypedConfResult<T>) {
        match result {
            Err(TypedConfError::Compile(_)) => {}
            other => panic!("Expected Compile error, got: {:?}", other),
        }
    }
}
