//! Validated configuration values

use crate::composite::CompositeType;
use indexmap::IndexMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use typedconf_core::{
    write_document, write_document_as, DocPath, Document, DocumentError, DocumentFormat,
    Mapping, PathKey,
};

/// A coerced field value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Path(PathBuf),
    List(Vec<ConfigValue>),
    Map(IndexMap<String, ConfigValue>),
    Record(ConfigInstance),
}

impl ConfigValue {
    /// Lossless conversion of an untyped document value.
    pub fn from_document(doc: &Document) -> Self {
        match doc {
            Document::Null => ConfigValue::Null,
            Document::Bool(b) => ConfigValue::Bool(*b),
            Document::Number(n) => match n.as_i64() {
                Some(i) => ConfigValue::Int(i),
                None => ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Document::String(s) => ConfigValue::Str(s.clone()),
            Document::Sequence(seq) => {
                ConfigValue::List(seq.iter().map(ConfigValue::from_document).collect())
            }
            Document::Mapping(map) => ConfigValue::Map(
                map.iter()
                    .map(|(k, v)| {
                        (
                            PathKey::from_mapping_key(k).to_string(),
                            ConfigValue::from_document(v),
                        )
                    })
                    .collect(),
            ),
            Document::Tagged(tagged) => ConfigValue::from_document(&tagged.value),
        }
    }

    pub fn to_document(&self) -> Document {
        match self {
            ConfigValue::Null => Document::Null,
            ConfigValue::Bool(b) => Document::Bool(*b),
            ConfigValue::Int(i) => Document::from(*i),
            ConfigValue::Float(f) => Document::from(*f),
            ConfigValue::Str(s) => Document::String(s.clone()),
            ConfigValue::Path(p) => Document::String(p.display().to_string()),
            ConfigValue::List(items) => {
                Document::Sequence(items.iter().map(ConfigValue::to_document).collect())
            }
            ConfigValue::Map(map) => Document::Mapping(
                map.iter()
                    .map(|(k, v)| (Document::from(k.as_str()), v.to_document()))
                    .collect(),
            ),
            ConfigValue::Record(record) => record.to_document(),
        }
    }

    /// Text form used when the value is a mapping key.
    pub(crate) fn render_key(&self) -> String {
        match self {
            ConfigValue::Str(s) => s.clone(),
            ConfigValue::Path(p) => p.display().to_string(),
            other => match other.to_document() {
                Document::Null => "null".to_string(),
                doc => PathKey::from_mapping_key(&doc).to_string(),
            },
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of ints and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Int(i) => Some(*i as f64),
            ConfigValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            ConfigValue::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, ConfigValue>> {
        match self {
            ConfigValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&ConfigInstance> {
        match self {
            ConfigValue::Record(record) => Some(record),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Null => write!(f, "None"),
            ConfigValue::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            ConfigValue::Int(i) => write!(f, "{}", i),
            ConfigValue::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            ConfigValue::Float(x) => write!(f, "{}", x),
            ConfigValue::Str(s) => write!(f, "'{}'", s),
            ConfigValue::Path(p) => write!(f, "'{}'", p.display()),
            ConfigValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            ConfigValue::Map(map) => fmt_entries(f, map),
            ConfigValue::Record(record) => fmt_entries(f, &record.values),
        }
    }
}

fn fmt_entries(f: &mut fmt::Formatter<'_>, map: &IndexMap<String, ConfigValue>) -> fmt::Result {
    write!(f, "{{")?;
    for (i, (k, v)) in map.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "'{}': {}", k, v)?;
    }
    write!(f, "}}")
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Int(i)
    }
}

impl From<f64> for ConfigValue {
    fn from(f: f64) -> Self {
        ConfigValue::Float(f)
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Str(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::Str(s)
    }
}

// ============================================================================
// INSTANCES
// ============================================================================

/// A validated record: one value per field of its composite type, in field
/// order. Optional fields absent from the input are omitted.
#[derive(Debug, Clone)]
pub struct ConfigInstance {
    ty: Arc<CompositeType>,
    values: IndexMap<String, ConfigValue>,
}

impl PartialEq for ConfigInstance {
    fn eq(&self, other: &Self) -> bool {
        self.ty.name == other.ty.name && self.values == other.values
    }
}

impl ConfigInstance {
    pub(crate) fn new(ty: Arc<CompositeType>, values: IndexMap<String, ConfigValue>) -> Self {
        Self { ty, values }
    }

    pub fn type_name(&self) -> &str {
        &self.ty.name
    }

    pub fn composite(&self) -> &Arc<CompositeType> {
        &self.ty
    }

    pub fn get(&self, field: &str) -> Option<&ConfigValue> {
        self.values.get(field)
    }

    /// Follow a dotted path through nested records, maps and lists.
    pub fn get_path(&self, path: &DocPath) -> Option<&ConfigValue> {
        let (first, rest) = path.keys().split_first()?;
        let mut current = self.values.get(first.as_str()?)?;
        for key in rest {
            current = match (current, key) {
                (ConfigValue::Record(record), PathKey::Key(k)) => record.values.get(k)?,
                (ConfigValue::Map(map), PathKey::Key(k)) => map.get(k)?,
                (ConfigValue::List(items), PathKey::Index(i)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn values(&self) -> &IndexMap<String, ConfigValue> {
        &self.values
    }

    pub fn into_values(self) -> IndexMap<String, ConfigValue> {
        self.values
    }

    /// The record as a plain nested document.
    pub fn to_document(&self) -> Document {
        let map: Mapping = self
            .values
            .iter()
            .map(|(k, v)| (Document::from(k.as_str()), v.to_document()))
            .collect();
        Document::Mapping(map)
    }

    pub fn to_yaml(&self) -> Result<String, DocumentError> {
        DocumentFormat::Yaml.render(&self.to_document())
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        DocumentFormat::Json.render(&self.to_document())
    }

    /// Serialise to a file, the format following the extension.
    ///
    /// Reading the file back needs the rules it was validated against; the
    /// output is plain data, not a rule document.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        write_document(&self.to_document(), path)
    }

    pub fn write_as(
        &self,
        path: impl AsRef<Path>,
        format: DocumentFormat,
    ) -> Result<(), DocumentError> {
        write_document_as(&self.to_document(), path, format)
    }
}
