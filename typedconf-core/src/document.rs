//! Document I/O, deep merge and digests
//!
//! Rule and configuration documents are stored as YAML or JSON. Several
//! sources can be layered with [`merge_documents`]: later sources override
//! earlier ones key by key, while the first-seen key order is kept.

use crate::{Document, DocumentError, Mapping};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// On-disk serialization format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => Ok(DocumentFormat::Yaml),
            Some("json") => Ok(DocumentFormat::Json),
            _ => Err(DocumentError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }

    pub fn parse(&self, content: &str) -> Result<Document, DocumentError> {
        match self {
            DocumentFormat::Yaml => parse_yaml(content),
            DocumentFormat::Json => parse_json(content),
        }
    }

    pub fn render(&self, doc: &Document) -> Result<String, DocumentError> {
        match self {
            DocumentFormat::Yaml => to_yaml_string(doc),
            DocumentFormat::Json => to_json_string(doc),
        }
    }
}

// ============================================================================
// PARSING AND RENDERING
// ============================================================================

/// Parse a YAML document. An empty input is an empty mapping.
pub fn parse_yaml(content: &str) -> Result<Document, DocumentError> {
    if content.trim().is_empty() {
        return Ok(Document::Mapping(Mapping::new()));
    }
    serde_yaml::from_str(content).map_err(|e| DocumentError::Yaml {
        reason: e.to_string(),
    })
}

pub fn parse_json(content: &str) -> Result<Document, DocumentError> {
    serde_json::from_str(content).map_err(|e| DocumentError::Json {
        reason: e.to_string(),
    })
}

pub fn to_yaml_string(doc: &Document) -> Result<String, DocumentError> {
    serde_yaml::to_string(doc).map_err(|e| DocumentError::Yaml {
        reason: e.to_string(),
    })
}

pub fn to_json_string(doc: &Document) -> Result<String, DocumentError> {
    serde_json::to_string_pretty(doc).map_err(|e| DocumentError::Json {
        reason: e.to_string(),
    })
}

// ============================================================================
// FILES
// ============================================================================

/// Read a document, picking the format from the file extension.
pub fn read_document(path: impl AsRef<Path>) -> Result<Document, DocumentError> {
    let path = path.as_ref();
    read_document_as(path, DocumentFormat::from_path(path)?)
}

pub fn read_document_as(
    path: impl AsRef<Path>,
    format: DocumentFormat,
) -> Result<Document, DocumentError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| DocumentError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    format.parse(&content)
}

/// Write a document, picking the format from the file extension.
pub fn write_document(doc: &Document, path: impl AsRef<Path>) -> Result<(), DocumentError> {
    let path = path.as_ref();
    write_document_as(doc, path, DocumentFormat::from_path(path)?)
}

pub fn write_document_as(
    doc: &Document,
    path: impl AsRef<Path>,
    format: DocumentFormat,
) -> Result<(), DocumentError> {
    let path = path.as_ref();
    let content = format.render(doc)?;
    fs::write(path, content).map_err(|e| DocumentError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Read several documents and merge them in order.
///
/// With `format` unset each file's format comes from its extension.
pub fn merge_files<P: AsRef<Path>>(
    paths: &[P],
    format: Option<DocumentFormat>,
) -> Result<Document, DocumentError> {
    let docs = paths
        .iter()
        .map(|path| match format {
            Some(format) => read_document_as(path, format),
            None => read_document(path),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(merge_documents(&docs))
}

// ============================================================================
// MERGING
// ============================================================================

/// Deep-merge documents, later documents taking precedence.
///
/// - If any input is not a mapping, the last input wins outright.
/// - Otherwise the result holds every key in order of first appearance. A key
///   found in a single input keeps that value; a key found in several inputs
///   is merged recursively from those values, in input order.
///
/// Merging no documents yields an empty mapping.
pub fn merge_documents(docs: &[Document]) -> Document {
    let Some(last) = docs.last() else {
        return Document::Mapping(Mapping::new());
    };
    if !docs.iter().all(Document::is_mapping) {
        return last.clone();
    }

    let maps: Vec<&Mapping> = docs.iter().filter_map(Document::as_mapping).collect();
    let mut keys: Vec<&Document> = Vec::new();
    for map in &maps {
        for key in map.keys() {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }

    let mut merged = Mapping::new();
    for key in keys {
        let matches: Vec<Document> = maps
            .iter()
            .filter_map(|map| map.get(key).cloned())
            .collect();
        let value = if matches.len() > 1 {
            merge_documents(&matches)
        } else {
            matches.into_iter().next().unwrap_or(Document::Null)
        };
        merged.insert(key.clone(), value);
    }
    Document::Mapping(merged)
}

// ============================================================================
// MISC
// ============================================================================

/// SHA-256 hex digest of a document's canonical JSON rendering.
///
/// Mapping order is part of the digest, so reordering keys in a rule file
/// changes it.
pub fn document_digest(doc: &Document) -> String {
    let bytes = serde_json::to_vec(doc)
        .or_else(|_| serde_yaml::to_string(doc).map(String::into_bytes))
        .unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hex::encode(hasher.finalize())
}

/// Truthiness of a document value: null, `false`, zero and empty
/// strings/containers are false.
pub fn truthy(doc: &Document) -> bool {
    match doc {
        Document::Null => false,
        Document::Bool(b) => *b,
        Document::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Document::String(s) => !s.is_empty(),
        Document::Sequence(seq) => !seq.is_empty(),
        Document::Mapping(map) => !map.is_empty(),
        Document::Tagged(tagged) => truthy(&tagged.value),
    }
}

// ============================================================================
// TESTS
// ============================================================================
