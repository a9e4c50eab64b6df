//! typedconf Core - Documents, Paths and Errors
//!
//! Pure data structures shared by every typedconf crate. This crate contains
//! no compiler logic: it knows how to read, write, merge and address nested
//! documents, and it defines the error taxonomy the compiler reports with.

pub mod document;
pub mod error;
pub mod path;

pub use document::*;
pub use error::*;
pub use path::*;

/// A nested, ordered YAML/JSON-like document.
///
/// Mappings preserve insertion order, which the compiler relies on: field
/// declaration order in a rule document is significant.
pub type Document = serde_yaml::Value;

/// Ordered mapping node of a [`Document`].
pub type Mapping = serde_yaml::Mapping;
