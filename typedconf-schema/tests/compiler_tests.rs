//! Integration tests for rule compilation and instantiation
//!
//! Tests verify:
//! - Field validators and their parameters
//! - Record validators declared on leaves (sum_by_name, zero_sum)
//! - Required fields ordered before defaulted ones
//! - Violation paths across nested records
//! - File-based loading with optional rule resolution
//! - Registry configuration failures

use std::fs;
use tempfile::TempDir;
use typedconf_core::{CompileError, RegistryError};
use typedconf_schema::*;
use typedconf_test_utils::assertions::*;
use typedconf_test_utils::fixtures::*;
use typedconf_test_utils::{yaml, DocPath, Document, ViolationKind};

fn compile(rules: &Document) -> CompiledSchema {
    let registry = Registry::new();
    match Compiler::new(&registry).compile(rules) {
        Ok(schema) => schema,
        Err(e) => panic!("rules failed to compile: {}", e),
    }
}

fn path(keys: &[&str]) -> DocPath {
    DocPath::from_keys(keys.iter().copied())
}

// ============================================================================
// FIELD VALIDATORS
// ============================================================================

#[test]
fn test_threshold_validator() {
    let schema = compile(&threshold_rules());

    let err = schema.from_document(&yaml("foo: 6")).unwrap_err();
    assert_eq!(err.type_name, "config_t");
    assert_violation(&err, &path(&["foo"]), ViolationKind::ValidatorFailed);
    assert_violation_message(&err, "above threshold: 6 > 5");

    let ok = schema.from_document(&yaml("foo: 2")).unwrap();
    assert_eq!(ok.get("foo"), Some(&ConfigValue::Int(2)));

    // The type check runs before the validator
    let err = schema.from_document(&yaml("foo: -1")).unwrap_err();
    assert_eq!(err.len(), 1);
    assert_violation(&err, &path(&["foo"]), ViolationKind::FieldTypeMismatch);
}

#[test]
fn test_missing_and_unexpected_fields() {
    let schema = compile(&threshold_rules());
    let err = schema.from_document(&yaml("bar: 1")).unwrap_err();
    assert_violation(&err, &path(&["foo"]), ViolationKind::MissingField);
    assert_violation(&err, &path(&["bar"]), ViolationKind::UnexpectedField);
    assert_violation_message(&err, "field required");
    assert_violation_message(&err, "extra fields not permitted");
}

// ============================================================================
// RECORD VALIDATORS
// ============================================================================

#[test]
fn test_nested_record_validator() {
    let schema = compile(&nested_sum_rules());
    let top = schema.config_t.field("top").unwrap().ty.as_composite().unwrap();
    assert_eq!(top.name, "top_t");
    assert_eq!(top.root_validators().count(), 1);

    let err = schema
        .from_document(&yaml("top: {first: 5, second: 1, nest: {leaf: 5}}"))
        .unwrap_err();
    assert_violation(&err, &path(&["top"]), ViolationKind::ValidatorFailed);
    assert_violation_message(&err, "do not add up to 15");

    let ok = schema
        .from_document(&yaml("top: {first: 10, second: 5, nest: {leaf: 10}}"))
        .unwrap();
    assert_eq!(
        ok.get_path(&path(&["top", "nest", "leaf"])),
        Some(&ConfigValue::Int(10))
    );
}

#[test]
fn test_record_validator_skipped_after_field_failure() {
    let schema = compile(&nested_sum_rules());
    let err = schema
        .from_document(&yaml("top: {first: 5, second: 1, nest: {leaf: 7}}"))
        .unwrap_err();
    assert_eq!(err.len(), 1);
    assert_violation(
        &err,
        &path(&["top", "nest", "leaf"]),
        ViolationKind::FieldTypeMismatch,
    );
    assert!(!err.has_violation_at(&path(&["top"])));
}

#[test]
fn test_zero_sum_validator() {
    let schema = compile(&zero_sum_rules());
    assert!(schema
        .from_document(&yaml("zero_sum_total: {foo: 10, bar: 5}"))
        .is_ok());

    let err = schema
        .from_document(&yaml("zero_sum_total: {foo: 1, bar: 1}"))
        .unwrap_err();
    assert_violation(&err, &path(&["zero_sum_total"]), ViolationKind::ValidatorFailed);
    assert_violation_message(&err, "[1, 1] do not add up to 15");
}

// ============================================================================
// FIELD ORDER AND DEFAULTS
// ============================================================================

#[test]
fn test_defaulted_fields_follow_required() {
    let schema = compile(&default_ordering_rules());
    assert_eq!(
        schema.config_t.field_names().collect::<Vec<_>>(),
        vec!["a", "b"]
    );

    let instance = schema.from_document(&yaml("a: 1")).unwrap();
    assert_eq!(instance.get("b"), Some(&ConfigValue::Int(0)));
    assert_keys_in_order(&instance.to_document(), &["a", "b"]);
}

#[test]
fn test_service_schema() {
    let schema = compile(&service_rules());
    let run = schema.config_t.field("run").unwrap().ty.as_composite().unwrap();
    assert_eq!(
        run.field_names().collect::<Vec<_>>(),
        vec!["name", "tags", "mode", "retries"]
    );
    assert_eq!(run.field("name").unwrap().doc.as_deref(), Some("Name of the run"));

    let instance = schema.from_document(&service_config()).unwrap();
    assert_eq!(
        instance.get_path(&path(&["run", "mode"])).and_then(ConfigValue::as_str),
        Some("fast")
    );
    assert_eq!(
        instance.get_path(&path(&["run", "retries"])),
        Some(&ConfigValue::Int(5))
    );
    assert!(instance.get_path(&path(&["run", "tags"])).is_none());
    assert_eq!(
        instance.get_path(&path(&["model", "range", "high"])),
        Some(&ConfigValue::Float(2.5))
    );

    let rendered = instance.to_yaml().unwrap();
    assert!(rendered.contains("nightly"));
    assert!(!rendered.contains("tags"));
}

#[test]
fn test_service_violations_accumulate() {
    let schema = compile(&service_rules());
    let conf = yaml(
        r#"
run:
  name: nightly
  retries: 11
  colour: blue
model:
  range:
    low: 0.5
    high: 0.1
  step: 3
"#,
    );
    let err = schema.from_document(&conf).unwrap_err();
    assert_eq!(err.len(), 4);
    assert_violation(&err, &path(&["run", "retries"]), ViolationKind::FieldTypeMismatch);
    assert_violation(&err, &path(&["run", "colour"]), ViolationKind::UnexpectedField);
    assert_violation(&err, &path(&["model", "range", "high"]), ViolationKind::ValidatorFailed);
    assert_violation(&err, &path(&["model", "step"]), ViolationKind::ValidatorFailed);
    assert_violation_message(&err, "bad range");
    assert_violation_message(&err, "3 is not a multiple of 2");
    assert!(err.to_string().starts_with("4 validation errors for config_t"));
}

#[test]
fn test_schema_digest_tracks_rules() {
    let a = compile(&service_rules());
    let b = compile(&service_rules());
    let c = compile(&threshold_rules());
    assert_eq!(a.digest, b.digest);
    assert_ne!(a.digest, c.digest);
}

#[test]
fn test_records_sharing_a_name_at_different_depths() {
    let schema = compile(&yaml(
        r#"
a:
  b:
    x: {type: int}
b:
  y: {type: PositiveInt}
"#,
    ));
    let instance = schema.from_document(&yaml("{a: {b: {x: -3}}, b: {y: 4}}")).unwrap();
    assert_eq!(
        instance.get_path(&path(&["a", "b", "x"])),
        Some(&ConfigValue::Int(-3))
    );
    assert_eq!(instance.get_path(&path(&["b", "y"])), Some(&ConfigValue::Int(4)));

    let err = schema.from_document(&yaml("{a: {b: {x: 1}}, b: {y: 0}}")).unwrap_err();
    assert_violation(&err, &path(&["b", "y"]), ViolationKind::FieldTypeMismatch);
}

// ============================================================================
// LOADING
// ============================================================================

const LAYERED_RULES: &str = r#"
a:
  type: int
extras:
  note:
    type: str
    optional: true
"#;

const LAYERED_OVERRIDE: &str = r#"
b:
  type: str
  default: hello
"#;

#[test]
fn test_load_config_files_drops_unused_optional_rules() {
    let dir = TempDir::new().unwrap();
    let rules = dir.path().join("rules.yaml");
    let extra = dir.path().join("extra.yaml");
    let conf = dir.path().join("conf.json");
    fs::write(&rules, LAYERED_RULES).unwrap();
    fs::write(&extra, LAYERED_OVERRIDE).unwrap();
    fs::write(&conf, "{\"a\": 1}").unwrap();

    let registry = Registry::new();
    let instance = load_config_files(&registry, &[&rules, &extra], &[&conf]).unwrap();
    assert_eq!(instance.get("a"), Some(&ConfigValue::Int(1)));
    assert_eq!(instance.get("b").and_then(ConfigValue::as_str), Some("hello"));
    assert!(instance.get("extras").is_none());

    // Without resolution the emptied record would be required
    let schema = compile(&yaml(LAYERED_RULES));
    let err = schema.from_document(&yaml("a: 1")).unwrap_err();
    assert_violation(&err, &path(&["extras"]), ViolationKind::MissingField);
}

#[test]
fn test_load_config_keeps_used_optional_rules() {
    let registry = Registry::new();
    let instance = load_config(
        &registry,
        &[yaml(LAYERED_RULES)],
        &[yaml("a: 1"), yaml("extras: {note: hi}")],
    )
    .unwrap();
    assert_eq!(
        instance.get_path(&path(&["extras", "note"])).and_then(ConfigValue::as_str),
        Some("hi")
    );
}

#[test]
fn test_load_config_reports_validation_errors() {
    let registry = Registry::new();
    let result = load_config(&registry, &[threshold_rules()], &[yaml("foo: 9")]);
    let err = expect_validation_error(result);
    assert_violation(&err, &path(&["foo"]), ViolationKind::ValidatorFailed);
}

#[test]
fn test_instance_written_to_file() {
    let dir = TempDir::new().unwrap();
    let schema = compile(&service_rules());
    let instance = schema.from_document(&service_config()).unwrap();
    let out = dir.path().join("resolved.json");
    instance.write(&out).unwrap();

    let written = typedconf_core::read_document(&out).unwrap();
    assert_eq!(written, instance.to_document());
    assert!(schema.from_document(&written).is_ok());
}

// ============================================================================
// REGISTRY
// ============================================================================

#[test]
fn test_unregistered_module() {
    let mut registry = Registry::new();
    registry.add_modules("type", &["nope"]).unwrap();
    let result = Compiler::new(&registry).compile(&threshold_rules());
    assert_eq!(
        result.unwrap_err(),
        CompileError::Registry(RegistryError::UnregisteredModule {
            module: "nope".to_string(),
        })
    );
}

#[test]
fn test_unknown_module_kind() {
    let mut registry = Registry::new();
    let err = registry.add_modules("widgets", &["x"]).unwrap_err();
    assert!(matches!(err, RegistryError::UnknownModuleKind { .. }));
}

#[test]
fn test_module_without_manifest() {
    let mut registry = Registry::new();
    registry.add_module(Module::without_manifest("loose"));
    registry.add_modules("validator", &["loose"]).unwrap();
    let err = Compiler::new(&registry).compile(&threshold_rules()).unwrap_err();
    assert!(matches!(
        err,
        CompileError::Registry(RegistryError::NonConformantSource { .. })
    ));
}

#[test]
fn test_registry_config_restricts_types() {
    let config = RegistryConfig::from_toml_str("type_modules = [\"builtins\"]\n").unwrap();
    assert_eq!(config.validator_modules, vec!["validators"]);

    let registry = Registry::from_config(&config);
    let err = Compiler::new(&registry)
        .compile(&yaml("{a: {type: PositiveInt}}"))
        .unwrap_err();
    assert!(matches!(err, CompileError::UnknownTypeName { ref name, .. } if name == "PositiveInt"));
    assert!(Compiler::new(&registry).compile(&yaml("{a: {type: int}}")).is_ok());
}

#[test]
fn test_custom_validator_shadows_builtin() {
    let mut registry = Registry::new();
    registry.register_validator("threshold", |args: &ValidatorArgs<'_>| {
        match args.field_value()?.as_i64() {
            Some(v) if v % 2 == 0 => Ok(()),
            _ => Err("odd".to_string()),
        }
    });
    let schema = Compiler::new(&registry).compile(&threshold_rules()).unwrap();
    assert!(schema.from_document(&yaml("foo: 8")).is_ok());
    let err = schema.from_document(&yaml("foo: 3")).unwrap_err();
    assert_violation_message(&err, "odd");
}

#[test]
fn test_compile_errors_surface_through_load_config() {
    let registry = Registry::new();
    let result = load_config(&registry, &[yaml("{a: {type: Bogus}}")], &[yaml("a: 1")]);
    assert_compile_error(&result);
}
