//! Instantiation
//!
//! Interprets a [`CompositeType`] against a user document. For one record:
//!
//! ```text
//! raw mapping
//!     ├── unexpected keys            → UnexpectedField
//!     ├── root validators (pre)      on the raw mapping; a failure stops here
//!     ├── per field, in field order:
//!     │     pre validators           on the raw value
//!     │     coercion                 → FieldTypeMismatch
//!     │     post validators          sees the fields validated so far
//!     │     absent: default | omitted (optional) | MissingField
//!     └── root validators (post)     skipped when any field failed
//!     ↓
//! ConfigInstance
//! ```
//!
//! Violations are accumulated across the whole document; nested records
//! report with their full path.

use crate::composite::{CompositeType, FieldDef};
use crate::resolve::ValidatorRef;
use crate::value::{ConfigInstance, ConfigValue};
use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;
use typedconf_core::{
    merge_files, DocPath, Document, DocumentFormat, Mapping, PathKey, TypedConfResult,
    ValidationError, Violation, ViolationKind,
};

impl CompositeType {
    /// Validate a document and build an instance of this type.
    pub fn from_document(self: &Arc<Self>, doc: &Document) -> Result<ConfigInstance, ValidationError> {
        let mut errors = ValidationError::new(&self.name);
        let instance = self.instantiate_at(doc, &DocPath::root(), &mut errors);
        match instance {
            Some(instance) if errors.is_empty() => Ok(instance),
            _ => Err(errors),
        }
    }

    /// Construct from named field values.
    pub fn from_mapping(self: &Arc<Self>, kwargs: &Mapping) -> Result<ConfigInstance, ValidationError> {
        self.from_document(&Document::Mapping(kwargs.clone()))
    }

    /// Construct from already typed values, re-validating them.
    pub fn construct<I, K>(self: &Arc<Self>, kwargs: I) -> Result<ConfigInstance, ValidationError>
    where
        I: IntoIterator<Item = (K, ConfigValue)>,
        K: Into<String>,
    {
        let map: Mapping = kwargs
            .into_iter()
            .map(|(k, v)| (Document::String(k.into()), v.to_document()))
            .collect();
        self.from_mapping(&map)
    }

    /// Merge YAML files in order and instantiate the result.
    pub fn from_yaml_files<P: AsRef<Path>>(self: &Arc<Self>, paths: &[P]) -> TypedConfResult<ConfigInstance> {
        let doc = merge_files(paths, Some(DocumentFormat::Yaml))?;
        Ok(self.from_document(&doc)?)
    }

    /// Merge JSON files in order and instantiate the result.
    pub fn from_json_files<P: AsRef<Path>>(self: &Arc<Self>, paths: &[P]) -> TypedConfResult<ConfigInstance> {
        let doc = merge_files(paths, Some(DocumentFormat::Json))?;
        Ok(self.from_document(&doc)?)
    }

    /// Instantiate the record at `path`, pushing violations onto `errors`.
    pub(crate) fn instantiate_at(
        self: &Arc<Self>,
        raw: &Document,
        path: &DocPath,
        errors: &mut ValidationError,
    ) -> Option<ConfigInstance> {
        let raw = match raw {
            Document::Tagged(tagged) => &tagged.value,
            other => other,
        };
        let Some(input) = raw.as_mapping() else {
            errors.push(Violation::new(
                path.clone(),
                ViolationKind::FieldTypeMismatch,
                Some(raw.clone()),
                "value is not a valid dict",
            ));
            return None;
        };
        let input: IndexMap<String, &Document> = input
            .iter()
            .map(|(k, v)| (PathKey::from_mapping_key(k).to_string(), v))
            .collect();
        let before = errors.len();

        for (key, value) in &input {
            if self.field(key).is_none() {
                errors.push(Violation::new(
                    path.child(key.as_str()),
                    ViolationKind::UnexpectedField,
                    Some((*value).clone()),
                    "extra fields not permitted",
                ));
            }
        }

        let raw_values: IndexMap<String, ConfigValue> = input
            .iter()
            .map(|(k, v)| (k.clone(), ConfigValue::from_document(v)))
            .collect();
        let mut pre_failed = false;
        for validator in self.root_validators().filter(|v| v.options.pre) {
            if let Err(message) = validator.call(None, &raw_values) {
                validator_failed(errors, path, None, message);
                pre_failed = true;
            }
        }
        if pre_failed {
            return None;
        }

        let mut values: IndexMap<String, ConfigValue> = IndexMap::new();
        for field in &self.fields {
            let field_path = path.child(field.name.as_str());
            let value = match input.get(&field.name) {
                Some(raw_value) => self.field_from_input(field, raw_value, &field_path, &values, errors),
                None => match &field.default {
                    Some(default) => self.field_from_default(field, default, &field_path, &values, errors),
                    None if field.optional => continue,
                    None => {
                        errors.push(Violation::new(
                            field_path,
                            ViolationKind::MissingField,
                            None,
                            "field required",
                        ));
                        continue;
                    }
                },
            };
            if let Some(value) = value {
                values.insert(field.name.clone(), value);
            }
        }

        if errors.len() > before {
            return None;
        }
        for validator in self.root_validators().filter(|v| !v.options.pre) {
            if let Err(message) = validator.call(None, &values) {
                validator_failed(errors, path, None, message);
            }
        }
        if errors.len() > before {
            return None;
        }
        Some(ConfigInstance::new(Arc::clone(self), values))
    }

    fn field_from_input(
        &self,
        field: &FieldDef,
        raw: &Document,
        path: &DocPath,
        values: &IndexMap<String, ConfigValue>,
        errors: &mut ValidationError,
    ) -> Option<ConfigValue> {
        let (pre, post): (Vec<&ValidatorRef>, Vec<&ValidatorRef>) = self
            .field_validators(&field.name)
            .partition(|v| v.options.pre);

        let raw_value = ConfigValue::from_document(raw);
        if !run_field_validators(&pre, &raw_value, path, values, errors) {
            return None;
        }
        let value = field.ty.coerce(raw, path, errors)?;
        run_field_validators(&post, &value, path, values, errors).then_some(value)
    }

    /// A default is coerced like input but only `always` validators see it.
    fn field_from_default(
        &self,
        field: &FieldDef,
        default: &Document,
        path: &DocPath,
        values: &IndexMap<String, ConfigValue>,
        errors: &mut ValidationError,
    ) -> Option<ConfigValue> {
        let (pre, post): (Vec<&ValidatorRef>, Vec<&ValidatorRef>) = self
            .field_validators(&field.name)
            .filter(|v| v.options.always)
            .partition(|v| v.options.pre);

        if !run_field_validators(&pre, &ConfigValue::from_document(default), path, values, errors) {
            return None;
        }
        let value = field.ty.coerce(default, path, errors)?;
        run_field_validators(&post, &value, path, values, errors).then_some(value)
    }
}

/// Run field validators, per element for `each_item` on lists. Returns
/// false when any failed.
fn run_field_validators(
    validators: &[&ValidatorRef],
    value: &ConfigValue,
    path: &DocPath,
    values: &IndexMap<String, ConfigValue>,
    errors: &mut ValidationError,
) -> bool {
    let mut ok = true;
    for validator in validators {
        match (validator.options.each_item, value) {
            (true, ConfigValue::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    if let Err(message) = validator.call(Some(item), values) {
                        validator_failed(errors, &path.child(i), Some(item), message);
                        ok = false;
                    }
                }
            }
            (true, ConfigValue::Map(entries)) => {
                for (key, item) in entries {
                    if let Err(message) = validator.call(Some(item), values) {
                        validator_failed(errors, &path.child(key.as_str()), Some(item), message);
                        ok = false;
                    }
                }
            }
            _ => {
                if let Err(message) = validator.call(Some(value), values) {
                    validator_failed(errors, path, Some(value), message);
                    ok = false;
                }
            }
        }
    }
    ok
}

fn validator_failed(
    errors: &mut ValidationError,
    path: &DocPath,
    value: Option<&ConfigValue>,
    message: String,
) {
    errors.push(Violation::new(
        path.clone(),
        ViolationKind::ValidatorFailed,
        value.map(ConfigValue::to_document),
        message,
    ));
}

// ============================================================================
// TESTS
// ============================================================================
