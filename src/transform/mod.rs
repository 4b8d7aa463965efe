//! Value transform pipeline.
//!
//! Transforms run on every resolved scalar of an untrusted field, in
//! registration order, each consuming the previous result. A failing
//! transform aborts the render: silently dropping the field could hide a
//! failed escape.

pub mod builtin;
pub mod markdown;

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::canonical::canonical_hash_hex;
use crate::types::FieldSpec;

pub use markdown::html_to_markdown;

/// Error type for transforms.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// A registered transform rejected the value.
    #[error("transform `{name}` failed: {reason}")]
    Failed {
        /// Transform name.
        name: String,
        /// Reason reported by the transform.
        reason: String,
    },
    /// HTML to markdown conversion failed.
    #[error("markdown conversion failed: {0}")]
    Markdown(String),
}

/// A transform function.
pub type TransformFn = Arc<dyn Fn(&FieldSpec, Value) -> Result<Value, String> + Send + Sync>;

#[derive(Clone)]
struct NamedTransform {
    name: String,
    apply: TransformFn,
}

/// Ordered chain of value transforms.
#[derive(Clone, Default)]
pub struct TransformPipeline {
    transforms: Vec<NamedTransform>,
}

impl TransformPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transform.
    pub fn add_transform<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&FieldSpec, Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.transforms.push(NamedTransform {
            name: name.into(),
            apply: Arc::new(f),
        });
        self
    }

    /// Builder-style [`add_transform`](Self::add_transform).
    pub fn with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&FieldSpec, Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.add_transform(name, f);
        self
    }

    /// Run every transform over `value`.
    ///
    /// Trusted fields are returned unchanged.
    pub fn apply(&self, field: &FieldSpec, value: Value) -> Result<Value, TransformError> {
        if field.trusted {
            return Ok(value);
        }
        self.transforms.iter().try_fold(value, |value, t| {
            (t.apply)(field, value).map_err(|reason| TransformError::Failed {
                name: t.name.clone(),
                reason,
            })
        })
    }

    /// Names of the registered transforms, in order.
    pub fn names(&self) -> Vec<&str> {
        self.transforms.iter().map(|t| t.name.as_str()).collect()
    }

    /// Get the number of transforms.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Check if the pipeline is empty.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Fingerprint of the transform chain, embedded in cache keys.
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(&self.names())
    }
}

impl fmt::Debug for TransformPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformPipeline")
            .field("transforms", &self.names())
            .finish()
    }
}

/// Apply `f` to every string leaf of `value`, recursing into arrays and
/// objects.
pub fn map_strings<F>(value: Value, f: &F) -> Result<Value, String>
where
    F: Fn(&str) -> Result<String, String>,
{
    Ok(match value {
        Value::String(s) => Value::String(f(&s)?),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| map_strings(item, f))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| map_strings(v, f).map(|v| (k, v)))
                .collect::<Result<_, _>>()?,
        ),
        other => other,
    })
}
