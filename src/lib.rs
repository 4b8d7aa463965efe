//! # fragment-cache
//!
//! Cached JSON fragment rendering and composition for object graphs.
//!
//! The engine answers one question:
//!
//! > Given an instance, a version and an exposure level, which JSON does a
//! > consumer see?
//!
//! ## Core Contract
//!
//! 1. Each class declares its fields once in a [`ClassSchema`]
//! 2. An instance's scalar fields render into a cached [`Fragment`]
//! 3. Reference fields are composed recursively from each referenced
//!    instance's own cached fragment, with cycle protection
//!
//! ## Architecture
//!
//! ```text
//! render(doc) → Composer → CacheManager → render_fragment → TransformPipeline
//!                  ↓             ↓
//!            SchemaRegistry  CacheStore (memory or external)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same instance state + same declarations + same request → identical JSON
//! - Keys appear in declaration order
//! - Cached fragments hold scalar fields only, so a referenced instance's
//!   change never stales its parent's entry

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod canonical;
pub mod schema;
pub mod transform;
pub mod renderer;
pub mod composer;
pub mod cache;
pub mod store;
pub mod metrics;
pub mod config;
pub mod error;
pub mod engine;

// Re-exports
pub use types::{
    ApiVersion, Document, DocumentRef, ExposureLevel, FieldDefinition, FieldKind, FieldSpec,
    Fragment, InstanceId, MemoryDocument, ObjectKey, ResolveError, Resolved, VersionSet,
    UNSPECIFIED_VERSION,
};
pub use schema::{ClassSchema, SchemaRegistry};
pub use transform::{html_to_markdown, TransformError, TransformPipeline};
pub use renderer::render_fragment;
pub use composer::{Composer, VisitPath};
pub use cache::{CacheManager, FragmentKey};
pub use store::{CacheStore, InMemoryCacheStore, MemoryStoreConfig, StoreError, StoreStats};
pub use metrics::{NoOpMetrics, RenderMetrics, TestMetrics};
pub use config::{EngineConfig, DEFAULT_KEY_NAMESPACE};
pub use error::{CacheError, RenderError};
pub use engine::{FragmentEngine, RenderOptions};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};
