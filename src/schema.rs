//! Schema registry: per-class field declarations.
//!
//! Schemas are registered once at startup and shared read-only afterward.
//! The registry is wrapped in an `Arc` by the engine and never mutated again,
//! so concurrent lookups need no locking.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::canonical::canonical_hash_hex;
use crate::error::RenderError;
use crate::types::field::FieldDescriptor;
use crate::types::{ApiVersion, Document, FieldSpec};

/// Predicate deciding whether an instance is hidden when rendered as a child.
pub type HidePredicate = Arc<dyn Fn(&dyn Document) -> bool + Send + Sync>;

/// Field declarations for one class.
#[derive(Clone)]
pub struct ClassSchema {
    class: String,
    fields: Vec<FieldSpec>,
    hide_as_child_when: Option<HidePredicate>,
    fingerprint: String,
}

impl ClassSchema {
    /// Create an empty schema for a class.
    pub fn new(class: impl Into<String>) -> Self {
        let mut schema = Self {
            class: class.into(),
            fields: Vec::new(),
            hide_as_child_when: None,
            fingerprint: String::new(),
        };
        schema.update_fingerprint();
        schema
    }

    /// Declare a field.
    ///
    /// Declaring a name twice replaces the earlier spec in its original
    /// position.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        match self.fields.iter_mut().find(|f| f.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.fields.push(spec),
        }
        self.update_fingerprint();
        self
    }

    /// Declare several fields in order.
    pub fn fields(self, specs: impl IntoIterator<Item = FieldSpec>) -> Self {
        specs.into_iter().fold(self, Self::field)
    }

    /// Hide instances of this class when they appear as a child for which
    /// `predicate` returns true. Top-level renders are never hidden.
    pub fn hide_as_child_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&dyn Document) -> bool + Send + Sync + 'static,
    {
        self.hide_as_child_when = Some(Arc::new(predicate));
        self.update_fingerprint();
        self
    }

    /// Class identifier.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// Fields in declaration order.
    pub fn field_specs(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether `doc` is hidden when expanded as a child.
    pub fn hides_as_child(&self, doc: &dyn Document) -> bool {
        self.hide_as_child_when
            .as_ref()
            .map(|predicate| predicate(doc))
            .unwrap_or(false)
    }

    /// Every version named by any field restriction.
    pub fn known_versions(&self) -> BTreeSet<ApiVersion> {
        self.fields
            .iter()
            .flat_map(|f| f.versions.named().cloned())
            .collect()
    }

    /// Whether any field restriction names `version`.
    pub fn mentions_version(&self, version: &ApiVersion) -> bool {
        self.fields.iter().any(|f| f.versions.named().any(|v| v == version))
    }

    /// Fingerprint of the declarations, stable across processes.
    ///
    /// Computed definitions contribute only their presence, not their code.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn update_fingerprint(&mut self) {
        #[derive(Serialize)]
        struct Descriptor<'a> {
            class: &'a str,
            fields: Vec<FieldDescriptor>,
            hides_children: bool,
        }

        self.fingerprint = canonical_hash_hex(&Descriptor {
            class: &self.class,
            fields: self.fields.iter().map(FieldSpec::descriptor).collect(),
            hides_children: self.hide_as_child_when.is_some(),
        });
    }
}

impl fmt::Debug for ClassSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassSchema")
            .field("class", &self.class)
            .field("fields", &self.fields)
            .field("hide_as_child_when", &self.hide_as_child_when.is_some())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

/// Registry of class schemas keyed by class identifier.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Arc<ClassSchema>>,
    registry_fingerprint: String,
}

impl SchemaRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.update_fingerprint();
        registry
    }

    /// Register a schema.
    ///
    /// Registering the same class again replaces its schema, so repeated
    /// registration of identical declarations is a no-op.
    pub fn register(&mut self, schema: ClassSchema) -> &mut Self {
        let class = schema.class.clone();
        if let Some(previous) = self.schemas.insert(class.clone(), Arc::new(schema)) {
            tracing::debug!(
                class = %class,
                previous_fingerprint = %previous.fingerprint(),
                "class schema re-registered"
            );
        }
        self.update_fingerprint();
        self
    }

    /// Builder-style registration.
    pub fn with(mut self, schema: ClassSchema) -> Self {
        self.register(schema);
        self
    }

    /// Look up the schema for a class.
    pub fn lookup(&self, class: &str) -> Result<Arc<ClassSchema>, RenderError> {
        self.schemas
            .get(class)
            .cloned()
            .ok_or_else(|| RenderError::schema_not_found(class))
    }

    /// Get a schema without cloning its handle.
    pub fn get(&self, class: &str) -> Option<&ClassSchema> {
        self.schemas.get(class).map(Arc::as_ref)
    }

    /// Registered class identifiers, sorted.
    pub fn classes(&self) -> Vec<&str> {
        self.schemas.keys().map(String::as_str).collect()
    }

    /// Fingerprint over every registered schema.
    pub fn fingerprint(&self) -> &str {
        &self.registry_fingerprint
    }

    /// Get the number of registered schemas.
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    fn update_fingerprint(&mut self) {
        let entries: Vec<(&str, &str)> = self
            .schemas
            .iter()
            .map(|(class, schema)| (class.as_str(), schema.fingerprint()))
            .collect();
        self.registry_fingerprint = canonical_hash_hex(&entries);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExposureLevel, MemoryDocument};
    use serde_json::json;

    fn person() -> ClassSchema {
        ClassSchema::new("Person")
            .field(FieldSpec::scalar("first").versions(["v2", "v3"]))
            .field(FieldSpec::scalar("born").versions(["v3"]))
            .field(FieldSpec::reference("friends").min_exposure(ExposureLevel::Public))
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = SchemaRegistry::new().with(person());
        let schema = registry.lookup("Person").unwrap();
        assert_eq!(schema.class(), "Person");
        assert_eq!(schema.field_specs().len(), 3);
        assert_eq!(registry.classes(), vec!["Person"]);
    }

    #[test]
    fn test_lookup_missing_class() {
        let registry = SchemaRegistry::new();
        let err = registry.lookup("Ghost").unwrap_err();
        assert!(matches!(err, RenderError::SchemaNotFound { ref class, object: None, .. } if class == "Ghost"));
    }

    #[test]
    fn test_registration_is_idempotent() {
        let mut registry = SchemaRegistry::new();
        registry.register(person());
        let fingerprint = registry.fingerprint().to_string();
        registry.register(person());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.fingerprint(), fingerprint);
    }

    #[test]
    fn test_redeclared_field_keeps_position() {
        let schema = person().field(FieldSpec::scalar("first").trusted());
        let names: Vec<_> = schema.field_specs().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["first", "born", "friends"]);
        assert!(schema.get("first").unwrap().trusted);
    }

    #[test]
    fn test_known_versions() {
        let schema = person();
        let versions: Vec<_> = schema.known_versions().into_iter().collect();
        assert_eq!(versions, vec![ApiVersion::new("v2"), ApiVersion::new("v3")]);
        assert!(schema.mentions_version(&ApiVersion::new("v2")));
        assert!(!schema.mentions_version(&ApiVersion::new("v1")));
    }

    #[test]
    fn test_fingerprint_tracks_declarations() {
        let a = person();
        let b = person().field(FieldSpec::scalar("last"));
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), person().fingerprint());
    }

    #[test]
    fn test_hide_predicate() {
        let schema = ClassSchema::new("Secret")
            .hide_as_child_when(|doc| doc.attribute("hidden") == Some(json!(true)));
        let hidden = MemoryDocument::new("Secret", 1u64).with_attr("hidden", json!(true));
        let shown = MemoryDocument::new("Secret", 2u64).with_attr("hidden", json!(false));
        assert!(schema.hides_as_child(&hidden));
        assert!(!schema.hides_as_child(&shown));
        assert!(!person().hides_as_child(&shown));
    }
}
