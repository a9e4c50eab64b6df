//! Error types for typedconf operations

use crate::{DocPath, Document};
use std::fmt;
use thiserror::Error;

/// Document I/O errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("YAML parse error: {reason}")]
    Yaml { reason: String },

    #[error("JSON parse error: {reason}")]
    Json { reason: String },

    #[error("TOML parse error: {reason}")]
    Toml { reason: String },

    #[error("Unsupported document format for {path}: expected .yaml, .yml or .json")]
    UnsupportedFormat { path: String },
}

/// Registry population errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Module not registered: {module}")]
    UnregisteredModule { module: String },

    #[error("Module {module} is not a conformant source: {reason}")]
    NonConformantSource { module: String, reason: String },

    #[error("Unknown module kind: {kind} (expected 'type' or 'validator')")]
    UnknownModuleKind { kind: String },
}

/// Rule compilation errors.
///
/// Every variant is fatal: compilation aborts and no partially built type
/// escapes.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    /// A leaf names a type the registry does not know
    #[error("unknown type name '{name}' at {path}")]
    UnknownTypeName { name: String, path: DocPath },

    /// A leaf names a validator the registry does not know
    #[error("unknown validator name '{name}' at {path}")]
    UnknownValidatorName { name: String, path: DocPath },

    /// A type reference is malformed, or its factory rejected the options
    #[error("invalid type spec at {path}: {reason}")]
    InvalidTypeSpec { path: DocPath, reason: String },

    /// Validator names, params or options are malformed
    #[error("invalid validator spec at {path}: {reason}")]
    InvalidValidatorSpec { path: DocPath, reason: String },

    /// Two validators with one name bound to the same target on one level
    #[error("duplicate validator '{name}' for {target} at {path}")]
    DuplicateValidator {
        name: String,
        target: String,
        path: DocPath,
    },

    /// Property inheritance is not acyclic
    #[error("cyclic property dependency: {}", format_edges(.edges))]
    CyclicPropertyDependency { edges: Vec<(String, String)> },

    /// Reference to undefined entity
    #[error("undefined reference: {kind} '{name}' is not defined")]
    UndefinedReference { kind: String, name: String },

    #[error("duplicate field name '{field}' in {type_name}")]
    DuplicateFieldName { type_name: String, field: String },

    #[error("reserved field name '{field}' in {type_name}")]
    ReservedFieldName { type_name: String, field: String },

    #[error("invalid field name '{field}' in {type_name}: not an identifier")]
    InvalidFieldName { type_name: String, field: String },

    /// Instantiating a property set from its merged values failed
    #[error("property '{property}' failed validation: {source}")]
    PropertyValidation {
        property: String,
        source: ValidationError,
    },

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("document error: {0}")]
    Document(#[from] DocumentError),
}

pub type CompileResult<T> = Result<T, CompileError>;

fn format_edges(edges: &[(String, String)]) -> String {
    edges
        .iter()
        .map(|(from, to)| format!("{} -> {}", from, to))
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// INSTANTIATION ERRORS
// ============================================================================

/// Category of a single instantiation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    MissingField,
    UnexpectedField,
    FieldTypeMismatch,
    ValidatorFailed,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::MissingField => "missing_field",
            ViolationKind::UnexpectedField => "unexpected_field",
            ViolationKind::FieldTypeMismatch => "type_mismatch",
            ViolationKind::ValidatorFailed => "validator_failed",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rejected location in a user document.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Location relative to the document being instantiated; the root path
    /// marks a record-level failure.
    pub path: DocPath,
    pub kind: ViolationKind,
    /// The offending value, when there is one.
    pub value: Option<Document>,
    pub message: String,
}

impl Violation {
    pub fn new(
        path: DocPath,
        kind: ViolationKind,
        value: Option<Document>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path,
            kind,
            value,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n  {} ({})", self.path, self.message, self.kind)
    }
}

/// Rejection of a user document by a compiled type.
///
/// Violations are accumulated: every failing field is reported, not only the
/// first one.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{}", render_violations(.type_name, .violations))]
pub struct ValidationError {
    pub type_name: String,
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            violations: Vec::new(),
        }
    }

    pub fn push(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    /// Absorb the violations of a nested record, re-rooted under `prefix`.
    pub fn absorb(&mut self, prefix: &DocPath, nested: ValidationError) {
        for mut violation in nested.violations {
            violation.path = prefix.join(&violation.path);
            self.violations.push(violation);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// True when any violation sits exactly at `path`.
    pub fn has_violation_at(&self, path: &DocPath) -> bool {
        self.violations.iter().any(|v| &v.path == path)
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn render_violations(type_name: &str, violations: &[Violation]) -> String {
    let count = violations.len();
    let mut out = format!(
        "{} validation error{} for {}",
        count,
        if count == 1 { "" } else { "s" },
        type_name
    );
    for violation in violations {
        out.push('\n');
        out.push_str(&violation.to_string());
    }
    out
}

/// Master error type for all typedconf errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypedConfError {
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type alias for typedconf operations.
pub type TypedConfResult<T> = Result<T, TypedConfError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_error_display_unsupported_format() {
        let err = DocumentError::UnsupportedFormat {
            path: "rules.toml".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Unsupported document format"));
        assert!(msg.contains("rules.toml"));
    }

    #[test]
    fn test_registry_error_display_non_conformant() {
        let err = RegistryError::NonConformantSource {
            module: "custom".to_string(),
            reason: "no export manifest".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("custom"));
        assert!(msg.contains("no export manifest"));
    }

    #[test]
    fn test_compile_error_display_unknown_type() {
        let err = CompileError::UnknownTypeName {
            name: "Bogus".to_string(),
            path: DocPath::from_keys(["top", "first"]),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("unknown type name 'Bogus'"));
        assert!(msg.contains("top.first"));
    }

    #[test]
    fn test_compile_error_display_cycle_lists_edges() {
        let err = CompileError::CyclicPropertyDependency {
            edges: vec![
                ("base".to_string(), "derived".to_string()),
                ("derived".to_string(), "base".to_string()),
            ],
        };
        let msg = format!("{}", err);
        assert!(msg.contains("cyclic property dependency"));
        assert!(msg.contains("base -> derived"));
        assert!(msg.contains("derived -> base"));
    }

    #[test]
    fn test_compile_error_display_undefined_reference() {
        let err = CompileError::UndefinedReference {
            kind: "property".to_string(),
            name: "ghost".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("undefined reference"));
        assert!(msg.contains("property 'ghost'"));
    }

    #[test]
    fn test_validation_error_display_counts_and_paths() {
        let mut err = ValidationError::new("config_t");
        err.push(Violation::new(
            DocPath::from_keys(["foo"]),
            ViolationKind::ValidatorFailed,
            Some(Document::from(6)),
            "above threshold: 6 > 5",
        ));
        let msg = format!("{}", err);
        assert!(msg.starts_with("1 validation error for config_t"));
        assert!(msg.contains("foo\n  above threshold: 6 > 5 (validator_failed)"));

        err.push(Violation::new(
            DocPath::root(),
            ViolationKind::MissingField,
            None,
            "field required",
        ));
        assert!(format!("{}", err).starts_with("2 validation errors"));
        assert!(format!("{}", err).contains("(root)"));
    }

    #[test]
    fn test_validation_error_absorb_prefixes_paths() {
        let mut inner = ValidationError::new("top_t");
        inner.push(Violation::new(
            DocPath::from_keys(["second"]),
            ViolationKind::FieldTypeMismatch,
            None,
            "value is not a valid integer",
        ));
        let mut outer = ValidationError::new("config_t");
        outer.absorb(&DocPath::from_keys(["top"]), inner);
        assert!(outer.has_violation_at(&DocPath::from_keys(["top", "second"])));
        assert!(outer.into_result().is_err());
        assert!(ValidationError::new("x").into_result().is_ok());
    }

    #[test]
    fn test_typedconf_error_from_variants() {
        let document = TypedConfError::from(DocumentError::Yaml {
            reason: "bad indent".to_string(),
        });
        assert!(matches!(document, TypedConfError::Document(_)));

        let registry = TypedConfError::from(RegistryError::UnregisteredModule {
            module: "nope".to_string(),
        });
        assert!(matches!(registry, TypedConfError::Registry(_)));

        let compile = TypedConfError::from(CompileError::UndefinedReference {
            kind: "attribute".to_string(),
            name: "x".to_string(),
        });
        assert!(matches!(compile, TypedConfError::Compile(_)));

        let validation = TypedConfError::from(ValidationError::new("config_t"));
        assert!(matches!(validation, TypedConfError::Validation(_)));
    }

    #[test]
    fn test_compile_error_from_registry_error() {
        let err: CompileError = RegistryError::UnknownModuleKind {
            kind: "widgets".to_string(),
        }
        .into();
        assert!(matches!(err, CompileError::Registry(_)));
        assert!(format!("{}", err).contains("widgets"));
    }
}
