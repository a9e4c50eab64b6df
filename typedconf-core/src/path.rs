//! Document paths
//!
//! A [`DocPath`] addresses a location inside a nested [`Document`]: an ordered
//! sequence of mapping keys and sequence indices. Paths are ordered and
//! hashable so they can live in sets, and their ancestors are exactly their
//! prefixes.

use crate::{Document, Mapping};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// PATH KEYS
// ============================================================================

/// One step of a [`DocPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathKey {
    /// Position inside a sequence.
    Index(usize),
    /// Key of a mapping entry.
    Key(String),
}

impl PathKey {
    /// Build a key from a mapping key of a document.
    ///
    /// Non-string scalar keys are rendered to their YAML scalar text, so a
    /// mapping keyed by `1` is addressed by `Key("1")`.
    pub fn from_mapping_key(key: &Document) -> Self {
        match key {
            Document::String(s) => PathKey::Key(s.clone()),
            Document::Number(n) => PathKey::Key(n.to_string()),
            Document::Bool(b) => PathKey::Key(b.to_string()),
            Document::Null => PathKey::Key("null".to_string()),
            other => PathKey::Key(
                serde_yaml::to_string(other)
                    .unwrap_or_default()
                    .trim_end()
                    .to_string(),
            ),
        }
    }

    /// The key text, if this is a mapping key.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PathKey::Key(k) => Some(k),
            PathKey::Index(_) => None,
        }
    }

    /// Look this key up in a mapping, matching rendered non-string keys too.
    fn find_in<'a>(&self, map: &'a Mapping) -> Option<&'a Document> {
        let PathKey::Key(k) = self else {
            return None;
        };
        map.get(k.as_str()).or_else(|| {
            map.iter()
                .find(|(key, _)| !key.is_string() && PathKey::from_mapping_key(key) == *self)
                .map(|(_, v)| v)
        })
    }

    fn find_in_mut<'a>(&self, map: &'a mut Mapping) -> Option<&'a mut Document> {
        let PathKey::Key(k) = self else {
            return None;
        };
        if map.contains_key(k.as_str()) {
            return map.get_mut(k.as_str());
        }
        map.iter_mut()
            .find(|(key, _)| !key.is_string() && PathKey::from_mapping_key(key) == *self)
            .map(|(_, v)| v)
    }

    fn mapping_key_in(&self, map: &Mapping) -> Option<Document> {
        let PathKey::Key(k) = self else {
            return None;
        };
        if map.contains_key(k.as_str()) {
            return Some(Document::String(k.clone()));
        }
        map.keys()
            .find(|key| !key.is_string() && PathKey::from_mapping_key(key) == *self)
            .cloned()
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Index(i) => write!(f, "{}", i),
            PathKey::Key(k) => write!(f, "{}", k),
        }
    }
}

impl From<&str> for PathKey {
    fn from(key: &str) -> Self {
        PathKey::Key(key.to_string())
    }
}

impl From<String> for PathKey {
    fn from(key: String) -> Self {
        PathKey::Key(key)
    }
}

impl From<usize> for PathKey {
    fn from(index: usize) -> Self {
        PathKey::Index(index)
    }
}

// ============================================================================
// PATHS
// ============================================================================

/// Location inside a nested document.
///
/// The empty path is the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocPath(Vec<PathKey>);

impl DocPath {
    /// The document root.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Build a path from anything convertible to keys.
    pub fn from_keys<K, I>(keys: I) -> Self
    where
        K: Into<PathKey>,
        I: IntoIterator<Item = K>,
    {
        Self(keys.into_iter().map(Into::into).collect())
    }

    pub fn keys(&self) -> &[PathKey] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Final key of the path, `None` at the root.
    pub fn last(&self) -> Option<&PathKey> {
        self.0.last()
    }

    /// The path with its final key removed, `None` at the root.
    pub fn parent(&self) -> Option<DocPath> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// A new path one level deeper.
    pub fn child(&self, key: impl Into<PathKey>) -> DocPath {
        let mut keys = self.0.clone();
        keys.push(key.into());
        Self(keys)
    }

    /// Join another path below this one.
    pub fn join(&self, other: &DocPath) -> DocPath {
        let mut keys = self.0.clone();
        keys.extend(other.0.iter().cloned());
        Self(keys)
    }

    /// True when `self` is a prefix of `other`, including equality.
    pub fn starts(&self, other: &DocPath) -> bool {
        other.0.len() >= self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// True when `self` is a strict prefix of `other`.
    pub fn is_ancestor_of(&self, other: &DocPath) -> bool {
        other.0.len() > self.0.len() && self.starts(other)
    }

    /// Resolve this path against a document.
    pub fn get<'a>(&self, doc: &'a Document) -> Option<&'a Document> {
        self.0.iter().try_fold(doc, |node, key| match (node, key) {
            (Document::Mapping(map), key) => key.find_in(map),
            (Document::Sequence(seq), PathKey::Index(i)) => seq.get(*i),
            _ => None,
        })
    }

    /// Resolve this path against a document, mutably.
    pub fn get_mut<'a>(&self, doc: &'a mut Document) -> Option<&'a mut Document> {
        let mut node = doc;
        for key in &self.0 {
            node = match (node, key) {
                (Document::Mapping(map), key) => key.find_in_mut(map)?,
                (Document::Sequence(seq), PathKey::Index(i)) => seq.get_mut(*i)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Replace the value at this path. Missing intermediate mappings are
    /// created; returns `false` when the path runs through a scalar or an
    /// out-of-range index.
    pub fn assign(&self, doc: &mut Document, value: Document) -> bool {
        let Some((last, init)) = self.0.split_last() else {
            *doc = value;
            return true;
        };
        let mut node = doc;
        for key in init {
            if node.is_null() {
                *node = Document::Mapping(Mapping::new());
            }
            node = match (node, key) {
                (Document::Mapping(map), PathKey::Key(k)) => {
                    let slot = key
                        .mapping_key_in(map)
                        .unwrap_or_else(|| Document::String(k.clone()));
                    map.entry(slot)
                        .or_insert_with(|| Document::Mapping(Mapping::new()))
                }
                (Document::Sequence(seq), PathKey::Index(i)) => match seq.get_mut(*i) {
                    Some(item) => item,
                    None => return false,
                },
                _ => return false,
            };
        }
        if node.is_null() {
            *node = Document::Mapping(Mapping::new());
        }
        match (node, last) {
            (Document::Mapping(map), PathKey::Key(k)) => {
                let slot = last
                    .mapping_key_in(map)
                    .unwrap_or_else(|| Document::String(k.clone()));
                map.insert(slot, value);
                true
            }
            (Document::Sequence(seq), PathKey::Index(i)) if *i < seq.len() => {
                seq[*i] = value;
                true
            }
            _ => false,
        }
    }

    /// Remove and return the value at this path.
    pub fn remove(&self, doc: &mut Document) -> Option<Document> {
        let (last, init) = self.0.split_last()?;
        let parent = DocPath(init.to_vec()).get_mut(doc)?;
        match (parent, last) {
            (Document::Mapping(map), key) => {
                let slot = key.mapping_key_in(map)?;
                map.shift_remove(&slot)
            }
            (Document::Sequence(seq), PathKey::Index(i)) if *i < seq.len() => {
                Some(seq.remove(*i))
            }
            _ => None,
        }
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(root)");
        }
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", key)?;
        }
        Ok(())
    }
}

impl From<Vec<PathKey>> for DocPath {
    fn from(keys: Vec<PathKey>) -> Self {
        Self(keys)
    }
}

impl FromIterator<PathKey> for DocPath {
    fn from_iter<I: IntoIterator<Item = PathKey>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ============================================================================
// TRAVERSAL
// ============================================================================

/// Visit every location of a document in pre-order.
///
/// The visitor receives the path of the *parent* container, the key of the
/// visited item and its value. The document root is visited first with no
/// key. Mapping entries are visited in declaration order, sequence items in
/// index order.
pub fn walk<F>(doc: &Document, mut visit: F)
where
    F: FnMut(&DocPath, Option<&PathKey>, &Document),
{
    visit(&DocPath::root(), None, doc);
    walk_children(&DocPath::root(), doc, &mut visit);
}

fn walk_children<F>(path: &DocPath, doc: &Document, visit: &mut F)
where
    F: FnMut(&DocPath, Option<&PathKey>, &Document),
{
    match doc {
        Document::Mapping(map) => {
            for (k, v) in map {
                let key = PathKey::from_mapping_key(k);
                visit(path, Some(&key), v);
                walk_children(&path.child(key), v, visit);
            }
        }
        Document::Sequence(seq) => {
            for (i, v) in seq.iter().enumerate() {
                let key = PathKey::Index(i);
                visit(path, Some(&key), v);
                walk_children(&path.child(key), v, visit);
            }
        }
        Document::Tagged(tagged) => walk_children(path, &tagged.value, visit),
        _ => {}
    }
}

// ============================================================================
// TESTS
// ============================================================================
