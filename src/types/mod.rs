//! Core types for the fragment engine.

pub mod exposure;
pub mod version;
pub mod document;
pub mod field;

pub use exposure::ExposureLevel;
pub use version::{ApiVersion, VersionSet, UNSPECIFIED_VERSION};
pub use document::{Document, DocumentRef, InstanceId, MemoryDocument, ObjectKey, Resolved};
pub use field::{DefinitionFn, FieldDefinition, FieldKind, FieldSpec, ResolveError};

/// A rendered JSON object, keys in declaration order.
pub type Fragment = serde_json::Map<String, serde_json::Value>;
