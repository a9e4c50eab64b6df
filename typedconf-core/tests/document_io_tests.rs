//! Integration tests for document files and merging
//!
//! Tests verify:
//! - Format selection by extension, and explicit formats
//! - Write → read preserves mapping order
//! - Layered files merge key by key
//! - Merge properties over generated documents

use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;
use typedconf_core::*;

const FIRST: &str = "a: 1\nb: {c: 3, d: 4}\ne: true\n";
const SECOND: &str = "c: 3\nb: {e: 5, d: 40}\ne: {g: true, h: foo}\n";

fn doc(src: &str) -> Document {
    match parse_yaml(src) {
        Ok(doc) => doc,
        Err(e) => panic!("bad YAML fixture: {}", e),
    }
}

fn keys(doc: &Document) -> Vec<String> {
    doc.as_mapping()
        .map(|m| m.keys().map(|k| PathKey::from_mapping_key(k).to_string()).collect())
        .unwrap_or_default()
}

// ============================================================================
// FILES
// ============================================================================

#[test]
fn test_yaml_and_json_files_round_trip() {
    let dir = TempDir::new().unwrap();
    let original = doc("zeta: 1\nalpha: {nested: [1, 2, 3]}\nmid: text\n");

    for name in ["out.yaml", "out.yml", "out.json"] {
        let path = dir.path().join(name);
        write_document(&original, &path).unwrap();
        let read = read_document(&path).unwrap();
        assert_eq!(read, original, "round trip through {}", name);
        assert_eq!(keys(&read), vec!["zeta", "alpha", "mid"]);
    }
}

#[test]
fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rules.toml");
    fs::write(&path, "a = 1\n").unwrap();
    let err = read_document(&path).unwrap_err();
    assert!(matches!(err, DocumentError::UnsupportedFormat { .. }));

    // An explicit format ignores the extension
    let path = dir.path().join("rules.txt");
    fs::write(&path, "{\"a\": 1}").unwrap();
    let read = read_document_as(&path, DocumentFormat::Json).unwrap();
    assert_eq!(read, doc("a: 1"));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = read_document(dir.path().join("absent.yaml")).unwrap_err();
    match err {
        DocumentError::Io { path, .. } => assert!(path.ends_with("absent.yaml")),
        other => panic!("Expected Io error, got: {:?}", other),
    }
}

#[test]
fn test_merge_files_layers_in_order() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("first.yaml");
    let second = dir.path().join("second.json");
    fs::write(&first, FIRST).unwrap();
    write_document(&doc(SECOND), &second).unwrap();

    let merged = merge_files(&[&first, &second], None).unwrap();
    assert_eq!(keys(&merged), vec!["a", "b", "e", "c"]);
    assert_eq!(
        merged,
        doc("a: 1\nb: {c: 3, d: 40, e: 5}\ne: {g: true, h: foo}\nc: 3\n")
    );

    let forced = merge_files(&[&first], Some(DocumentFormat::Yaml)).unwrap();
    assert_eq!(forced, doc(FIRST));
}

#[test]
fn test_merge_files_propagates_parse_errors() {
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("bad.json");
    fs::write(&bad, "{not json").unwrap();
    let err = merge_files(&[&bad], None).unwrap_err();
    assert!(matches!(err, DocumentError::Json { .. }));
}

// ============================================================================
// PROPERTY TESTS
// ============================================================================

fn arb_key() -> impl Strategy<Value = String> {
    "[a-z]{1,4}"
}

fn arb_flat_mapping() -> impl Strategy<Value = Document> {
    prop::collection::btree_map(arb_key(), -100i64..100, 0..6).prop_map(|entries| {
        Document::Mapping(
            entries
                .into_iter()
                .map(|(k, v)| (Document::from(k), Document::from(v)))
                .collect(),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every key of every input survives, and scalars come from the last
    /// input holding them.
    #[test]
    fn prop_merge_last_scalar_wins(
        first in arb_flat_mapping(),
        second in arb_flat_mapping(),
    ) {
        let merged = merge_documents(&[first.clone(), second.clone()]);
        let merged = merged.as_mapping().unwrap();
        for (k, v) in first.as_mapping().unwrap() {
            let expected = second.get(k).unwrap_or(v);
            prop_assert_eq!(merged.get(k), Some(expected));
        }
        for (k, v) in second.as_mapping().unwrap() {
            prop_assert_eq!(merged.get(k), Some(v));
        }
    }

    /// Keys keep the order of first appearance.
    #[test]
    fn prop_merge_keeps_first_seen_order(
        first in arb_flat_mapping(),
        second in arb_flat_mapping(),
    ) {
        let merged = merge_documents(&[first.clone(), second.clone()]);
        let mut expected = keys(&first);
        for key in keys(&second) {
            if !expected.contains(&key) {
                expected.push(key);
            }
        }
        prop_assert_eq!(keys(&merged), expected);
    }

    /// Merging a document with itself changes nothing.
    #[test]
    fn prop_merge_idempotent(first in arb_flat_mapping()) {
        let merged = merge_documents(&[first.clone(), first.clone()]);
        prop_assert_eq!(merged, first);
    }

    /// A scalar anywhere in the inputs makes the last input win.
    #[test]
    fn prop_merge_with_scalar_last_wins(first in arb_flat_mapping(), n in -5i64..5) {
        let scalar = Document::from(n);
        prop_assert_eq!(merge_documents(&[first.clone(), scalar.clone()]), scalar);
        prop_assert_eq!(merge_documents(&[Document::from(n), first.clone()]), first);
    }
}
