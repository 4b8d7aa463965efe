//! Document types: the instances a schema renders.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier of an instance within its class.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Create an id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the id as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for InstanceId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }
}

impl From<u64> for InstanceId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for InstanceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for InstanceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Stable `(class, id)` identity of an instance.
///
/// Ordered by class then id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    /// Class identifier.
    pub class: String,
    /// Instance id within the class.
    pub id: InstanceId,
}

impl ObjectKey {
    /// Create a new object key.
    pub fn new(class: impl Into<String>, id: impl Into<InstanceId>) -> Self {
        Self {
            class: class.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.class, self.id)
    }
}

/// Shared handle to a document.
pub type DocumentRef = Arc<dyn Document>;

/// Result of reading a field from a document.
#[derive(Clone)]
pub enum Resolved {
    /// A plain JSON value.
    Value(Value),
    /// A single related document.
    One(DocumentRef),
    /// An ordered collection of related documents.
    Many(Vec<DocumentRef>),
    /// An absent association.
    Nil,
}

impl Resolved {
    /// Short description of the variant for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::One(_) => "document",
            Self::Many(_) => "document collection",
            Self::Nil => "nil",
        }
    }
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Documents may form cycles, so only their keys are printed.
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::One(doc) => f.debug_tuple("One").field(&doc.key()).finish(),
            Self::Many(docs) => f
                .debug_tuple("Many")
                .field(&docs.iter().map(|d| d.key()).collect::<Vec<_>>())
                .finish(),
            Self::Nil => f.write_str("Nil"),
        }
    }
}

impl From<Value> for Resolved {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// An instance exposed by the surrounding document store.
///
/// Implementations supply identity and named field lookup. Association fields
/// resolve to [`Resolved::One`], [`Resolved::Many`] or [`Resolved::Nil`].
pub trait Document: Send + Sync {
    /// Class identifier used to find the schema.
    fn class_name(&self) -> &str;

    /// Instance id, stable for the lifetime of the persisted object.
    fn id(&self) -> InstanceId;

    /// Look up an attribute, method or association by name.
    ///
    /// Returns `None` when the document has no such field.
    fn read_field(&self, name: &str) -> Option<Resolved>;

    /// `(class, id)` identity.
    fn key(&self) -> ObjectKey {
        ObjectKey::new(self.class_name(), self.id())
    }

    /// Look up a plain JSON attribute.
    fn attribute(&self, name: &str) -> Option<Value> {
        match self.read_field(name)? {
            Resolved::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// In-memory document.
///
/// Fields can be linked after construction, which allows cyclic graphs.
pub struct MemoryDocument {
    key: ObjectKey,
    fields: RwLock<BTreeMap<String, Resolved>>,
}

impl MemoryDocument {
    /// Create an empty document.
    pub fn new(class: impl Into<String>, id: impl Into<InstanceId>) -> Self {
        Self {
            key: ObjectKey::new(class, id),
            fields: RwLock::new(BTreeMap::new()),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, Resolved::Value(value));
        self
    }

    /// Builder-style single association setter.
    pub fn with_one(self, name: impl Into<String>, doc: DocumentRef) -> Self {
        self.set(name, Resolved::One(doc));
        self
    }

    /// Builder-style collection association setter.
    pub fn with_many(self, name: impl Into<String>, docs: Vec<DocumentRef>) -> Self {
        self.set(name, Resolved::Many(docs));
        self
    }

    /// Wrap in a shared handle.
    pub fn into_ref(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Set or replace a field.
    pub fn set(&self, name: impl Into<String>, value: Resolved) {
        self.fields.write().insert(name.into(), value);
    }

    /// Remove a field.
    pub fn unset(&self, name: &str) {
        self.fields.write().remove(name);
    }

    /// Link a single association after construction.
    pub fn link(&self, name: impl Into<String>, doc: DocumentRef) {
        self.set(name, Resolved::One(doc));
    }
}

impl fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDocument")
            .field("key", &self.key)
            .field("fields", &self.fields.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Document for MemoryDocument {
    fn class_name(&self) -> &str {
        &self.key.class
    }

    fn id(&self) -> InstanceId {
        self.key.id.clone()
    }

    fn read_field(&self, name: &str) -> Option<Resolved> {
        self.fields.read().get(name).cloned()
    }

    fn key(&self) -> ObjectKey {
        self.key.clone()
    }
}
