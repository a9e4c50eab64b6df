//! typedconf Schema - Rule-Tree to Type-Tree Compiler
//!
//! Builds validating configuration types from declarative rule documents.
//! A rule document mirrors the shape of the configuration it describes:
//! every leaf names a type (plus options, validators, default), every
//! mapping above the leaves becomes a nested record.
//!
//! Architecture:
//! ```text
//! Rule documents (.yaml / .json)
//!     ↓  merge, resolve_optional
//! Classifier (nodes, leaves, branches)
//!     ↓
//! Resolver (type & validator names → Registry entries)
//!     ↓
//! Rewriter (leaf → FieldSpec, branch → LevelSpec)
//!     ↓
//! Composite builder, deepest levels first
//!     ↓
//! CompiledSchema { config_t }
//!     ↓  from_document(config)
//! ConfigInstance (validated values)
//! ```
//!
//! The property subsystem reuses the same pipeline on attribute rules:
//! properties inherit from each other (`property`), and graph elements
//! carrying them are validated by `network`.

pub mod classify;
pub mod compiler;
pub mod composite;
mod instance;
pub mod network;
pub mod property;
pub mod registry;
pub mod resolve;
pub mod rewrite;
pub mod types;
pub mod value;

// Re-export key types for convenience
pub use compiler::{load_config, load_config_files, resolve_optional, CompiledSchema, Compiler};
pub use composite::{CompositeType, FieldDef};
pub use network::{Edge, NetworkBuilder};
pub use property::{attr_defaults, compose_properties, make_baseprop_t, AttributeSet, PropertySet};
pub use registry::{Module, ModuleKind, Registry, RegistryConfig, TypeEntry, ValidatorArgs};
pub use resolve::{CompileWarning, ValidatorOptions, ValidatorRef, ValidatorTarget};
pub use types::TypeDescriptor;
pub use value::{ConfigInstance, ConfigValue};
