//! Reference composer.
//!
//! Expands reference fields recursively and merges each instance's cached
//! scalar fragment with its composed references.

use serde_json::Value;

use crate::cache::CacheManager;
use crate::error::RenderError;
use crate::metrics::REFERENCE_OMITTED;
use crate::renderer::render_fragment;
use crate::schema::{ClassSchema, SchemaRegistry};
use crate::transform::TransformPipeline;
use crate::types::{ApiVersion, Document, ExposureLevel, FieldSpec, Fragment, ObjectKey, Resolved};

/// Instances on the path from the top-level request to the current one.
///
/// Each recursive call extends its parent's path on the stack, so sibling
/// branches never observe each other's visits.
#[derive(Debug)]
pub struct VisitPath<'a> {
    key: ObjectKey,
    depth: usize,
    parent: Option<&'a VisitPath<'a>>,
}

impl<'a> VisitPath<'a> {
    /// Path holding only the top-level instance.
    pub fn root(key: ObjectKey) -> Self {
        Self {
            key,
            depth: 0,
            parent: None,
        }
    }

    /// Extend the path by one instance.
    pub fn child(&'a self, key: ObjectKey) -> VisitPath<'a> {
        VisitPath {
            key,
            depth: self.depth + 1,
            parent: Some(self),
        }
    }

    /// Whether `key` is on the path.
    pub fn contains(&self, key: &ObjectKey) -> bool {
        let mut node = Some(self);
        while let Some(path) = node {
            if &path.key == key {
                return true;
            }
            node = path.parent;
        }
        false
    }

    /// Number of references followed from the top-level instance.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Instance at the end of the path.
    pub fn key(&self) -> &ObjectKey {
        &self.key
    }
}

/// Why a reference was left out of its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Omission {
    Cycle,
    Depth,
    Hidden,
}

impl Omission {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Cycle => "cycle",
            Self::Depth => "depth",
            Self::Hidden => "hidden",
        }
    }
}

/// Recursive fragment composer for one engine.
pub struct Composer<'a> {
    registry: &'a SchemaRegistry,
    cache: &'a CacheManager,
    pipeline: &'a TransformPipeline,
    max_depth: Option<usize>,
}

impl<'a> Composer<'a> {
    /// Create a composer over shared engine state.
    pub fn new(
        registry: &'a SchemaRegistry,
        cache: &'a CacheManager,
        pipeline: &'a TransformPipeline,
        max_depth: Option<usize>,
    ) -> Self {
        Self {
            registry,
            cache,
            pipeline,
            max_depth,
        }
    }

    /// Compose the full fragment of `doc`.
    ///
    /// `parent` is `None` for a top-level request and the caller's path for a
    /// child expansion. Returns `Ok(None)` when the instance is omitted: it is
    /// already on the path, it lies beyond the depth limit, or its schema
    /// hides it as a child.
    ///
    /// ## Algorithm
    ///
    /// 1. Omit on cycle, hidden child or depth limit
    /// 2. Fetch the scalar fragment through the cache
    /// 3. For each visible reference field, resolve it and compose the
    ///    referenced instances at the cascaded exposure level
    /// 4. Merge scalars and references in declaration order
    pub fn compose(
        &self,
        doc: &dyn Document,
        version: &ApiVersion,
        exposure: ExposureLevel,
        parent: Option<&VisitPath<'_>>,
    ) -> Result<Option<Fragment>, RenderError> {
        let key = doc.key();

        if parent.is_some_and(|path| path.contains(&key)) {
            self.omitted(&key, Omission::Cycle);
            return Ok(None);
        }

        let schema = self.registry.lookup(&key.class)?;

        if parent.is_some() && schema.hides_as_child(doc) {
            self.omitted(&key, Omission::Hidden);
            return Ok(None);
        }

        let path = match parent {
            Some(path) => path.child(key.clone()),
            None => VisitPath::root(key.clone()),
        };
        if self.max_depth.is_some_and(|max| path.depth() > max) {
            self.omitted(&key, Omission::Depth);
            return Ok(None);
        }

        let scalars = self.cache.get_or_render(&schema, &key, version, exposure, || {
            render_fragment(doc, &schema, version, exposure, self.pipeline)
        })?;

        self.merge(doc, &schema, scalars, version, exposure, &path)
            .map(Some)
    }

    fn merge(
        &self,
        doc: &dyn Document,
        schema: &ClassSchema,
        mut scalars: Fragment,
        version: &ApiVersion,
        exposure: ExposureLevel,
        path: &VisitPath<'_>,
    ) -> Result<Fragment, RenderError> {
        let mut out = Fragment::new();

        for field in schema.field_specs() {
            if field.is_scalar() {
                if let Some(value) = scalars.remove(&field.name) {
                    out.insert(field.name.clone(), value);
                }
                continue;
            }
            if !field.is_visible(version, exposure) {
                continue;
            }
            if let Some(value) = self.compose_reference(doc, field, version, exposure, path)? {
                out.insert(field.name.clone(), value);
            }
        }

        Ok(out)
    }

    fn compose_reference(
        &self,
        doc: &dyn Document,
        field: &FieldSpec,
        version: &ApiVersion,
        exposure: ExposureLevel,
        path: &VisitPath<'_>,
    ) -> Result<Option<Value>, RenderError> {
        let child_exposure = exposure.cascade(field.min_exposure);
        let resolved = field
            .resolve(doc)
            .map_err(|reason| RenderError::resolution(path.key(), &field.name, reason))?;

        match resolved {
            Resolved::One(child) => Ok(self
                .compose_child(child.as_ref(), field, version, child_exposure, path)?
                .map(Value::Object)),
            Resolved::Many(children) => {
                let mut members = Vec::with_capacity(children.len());
                for child in &children {
                    if let Some(fragment) =
                        self.compose_child(child.as_ref(), field, version, child_exposure, path)?
                    {
                        members.push(Value::Object(fragment));
                    }
                }
                Ok(Some(Value::Array(members)))
            }
            Resolved::Nil | Resolved::Value(Value::Null) => Ok(Some(Value::Null)),
            Resolved::Value(_) => Err(RenderError::resolution(
                path.key(),
                &field.name,
                "reference field resolved to a plain value",
            )),
        }
    }

    fn compose_child(
        &self,
        child: &dyn Document,
        field: &FieldSpec,
        version: &ApiVersion,
        exposure: ExposureLevel,
        path: &VisitPath<'_>,
    ) -> Result<Option<Fragment>, RenderError> {
        self.compose(child, version, exposure, Some(path))
            .map_err(|e| e.referenced_from(path.key(), &field.name))
    }

    fn omitted(&self, key: &ObjectKey, reason: Omission) {
        tracing::debug!(object = %key, reason = reason.as_str(), "reference omitted");
        self.cache.metrics().increment(
            REFERENCE_OMITTED,
            &[("class", key.class.as_str()), ("reason", reason.as_str())],
        );
    }
}
