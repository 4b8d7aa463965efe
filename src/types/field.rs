//! Field specifications.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::document::{Document, Resolved};
use super::exposure::ExposureLevel;
use super::version::{ApiVersion, VersionSet};

/// Error raised by a computed field definition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ResolveError(pub String);

impl ResolveError {
    /// Create an error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Function computing a field's value from its instance.
pub type DefinitionFn = Arc<dyn Fn(&dyn Document) -> Result<Resolved, ResolveError> + Send + Sync>;

/// How a field obtains its value.
#[derive(Clone)]
pub enum FieldDefinition {
    /// Look up the named attribute, method or association on the instance.
    Attribute(String),
    /// Call a function with the instance.
    Computed(DefinitionFn),
}

impl FieldDefinition {
    /// Whether the definition is a computed function.
    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed(_))
    }
}

impl fmt::Debug for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attribute(name) => f.debug_tuple("Attribute").field(name).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Whether a field holds its own data or points at other documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Directly owned value; part of the cached fragment.
    Scalar,
    /// Reference to one document or an ordered collection of documents.
    Reference,
}

/// One declared field on a class.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Output key. Unique within a class.
    pub name: String,
    /// Value source.
    pub definition: FieldDefinition,
    /// Scalar or reference.
    pub kind: FieldKind,
    /// Lowest exposure level at which the field is rendered.
    pub min_exposure: ExposureLevel,
    /// Versions under which the field is rendered.
    pub versions: VersionSet,
    /// Bypass the transform pipeline.
    pub trusted: bool,
    /// Convert the resolved HTML to markdown before transforms.
    pub markdown: bool,
}

impl FieldSpec {
    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            definition: FieldDefinition::Attribute(name.clone()),
            name,
            kind,
            min_exposure: ExposureLevel::Short,
            versions: VersionSet::All,
            trusted: false,
            markdown: false,
        }
    }

    /// Scalar field read from the attribute of the same name.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Scalar)
    }

    /// Reference field read from the association of the same name.
    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Reference)
    }

    /// Read the value from a differently named attribute.
    pub fn from_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.definition = FieldDefinition::Attribute(attribute.into());
        self
    }

    /// Compute the value with a function.
    pub fn computed<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn Document) -> Result<Resolved, ResolveError> + Send + Sync + 'static,
    {
        self.definition = FieldDefinition::Computed(Arc::new(f));
        self
    }

    /// Set the minimum exposure level.
    pub fn min_exposure(mut self, level: ExposureLevel) -> Self {
        self.min_exposure = level;
        self
    }

    /// Restrict the field to the given versions.
    pub fn versions<I, V>(mut self, versions: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ApiVersion>,
    {
        self.versions = VersionSet::only(versions);
        self
    }

    /// Mark the field as trusted (no transforms).
    pub fn trusted(mut self) -> Self {
        self.trusted = true;
        self
    }

    /// Mark the field as HTML to be rendered as markdown.
    pub fn markdown(mut self) -> Self {
        self.markdown = true;
        self
    }

    /// Whether the field appears in a render at `version` and `level`.
    pub fn is_visible(&self, version: &ApiVersion, level: ExposureLevel) -> bool {
        level.admits(self.min_exposure) && self.versions.contains(version)
    }

    /// Whether this is a scalar field.
    pub fn is_scalar(&self) -> bool {
        self.kind == FieldKind::Scalar
    }

    /// Resolve the field's raw value against a document.
    ///
    /// Returns `Err` with a reason when the attribute is missing or the
    /// computed definition fails.
    pub fn resolve(&self, doc: &dyn Document) -> Result<Resolved, String> {
        match &self.definition {
            FieldDefinition::Attribute(attribute) => doc
                .read_field(attribute)
                .ok_or_else(|| format!("missing attribute `{attribute}`")),
            FieldDefinition::Computed(f) => f(doc).map_err(|e| e.to_string()),
        }
    }

    /// Canonical, hashable description of the declaration.
    pub(crate) fn descriptor(&self) -> FieldDescriptor {
        FieldDescriptor {
            name: self.name.clone(),
            source: match &self.definition {
                FieldDefinition::Attribute(a) => a.clone(),
                FieldDefinition::Computed(_) => "<computed>".to_string(),
            },
            kind: self.kind,
            min_exposure: self.min_exposure,
            versions: self.versions.clone(),
            trusted: self.trusted,
            markdown: self.markdown,
        }
    }
}

/// Serializable view of a [`FieldSpec`] used for schema fingerprints.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct FieldDescriptor {
    name: String,
    source: String,
    kind: FieldKind,
    min_exposure: ExposureLevel,
    versions: VersionSet,
    trusted: bool,
    markdown: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::document::MemoryDocument;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let f = FieldSpec::scalar("title");
        assert_eq!(f.kind, FieldKind::Scalar);
        assert_eq!(f.min_exposure, ExposureLevel::Short);
        assert_eq!(f.versions, VersionSet::All);
        assert!(!f.trusted);
        assert!(!f.markdown);
        assert!(matches!(&f.definition, FieldDefinition::Attribute(a) if a == "title"));
        assert!(!f.definition.is_computed());
    }

    #[test]
    fn test_visibility_filters() {
        let f = FieldSpec::scalar("born")
            .min_exposure(ExposureLevel::Public)
            .versions(["v3"]);
        let v3 = ApiVersion::new("v3");
        assert!(!f.is_visible(&v3, ExposureLevel::Short));
        assert!(f.is_visible(&v3, ExposureLevel::Public));
        assert!(f.is_visible(&v3, ExposureLevel::All));
        assert!(!f.is_visible(&ApiVersion::new("v2"), ExposureLevel::All));
    }

    #[test]
    fn test_resolve_attribute_and_computed() {
        let doc = MemoryDocument::new("Person", 1u64).with_attr("first", json!("Ada"));

        let first = FieldSpec::scalar("given").from_attribute("first");
        assert!(matches!(first.resolve(&doc), Ok(Resolved::Value(v)) if v == json!("Ada")));

        let missing = FieldSpec::scalar("last");
        assert_eq!(missing.resolve(&doc).unwrap_err(), "missing attribute `last`");

        let failing = FieldSpec::scalar("boom").computed(|_| Err(ResolveError::new("kaput")));
        assert!(failing.definition.is_computed());
        assert_eq!(failing.resolve(&doc).unwrap_err(), "kaput");
    }
}
