//! Error types surfaced by rendering and invalidation.

use crate::store::StoreError;
use crate::transform::TransformError;
use crate::types::ObjectKey;

/// Error type for render operations.
///
/// Every variant aborts the whole render call. Omitted references (cycles,
/// hidden children) are not errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RenderError {
    /// No schema is registered for the class.
    #[error("No schema registered for class `{class}`{}", referenced_from(.object, .field))]
    SchemaNotFound {
        /// Class without a schema.
        class: String,
        /// Instance whose reference led to the class; `None` at the top level.
        object: Option<ObjectKey>,
        /// Reference field on `object`.
        field: Option<String>,
    },
    /// A field's definition could not be resolved against an instance.
    #[error("Cannot resolve field `{field}` on {object}: {reason}")]
    FieldResolution {
        /// Instance being rendered.
        object: ObjectKey,
        /// Field name.
        field: String,
        /// What went wrong.
        reason: String,
    },
    /// The markdown conversion or a registered transform failed.
    #[error("Transform failed for field `{field}` on {object}: {source}")]
    Transform {
        /// Instance being rendered.
        object: ObjectKey,
        /// Field name.
        field: String,
        /// Underlying transform failure.
        #[source]
        source: TransformError,
    },
}

impl RenderError {
    /// Create a missing-schema error for a top-level render.
    pub fn schema_not_found(class: impl Into<String>) -> Self {
        Self::SchemaNotFound {
            class: class.into(),
            object: None,
            field: None,
        }
    }

    /// Attach the referencing instance and field to a missing-schema error
    /// that does not name one yet. Other errors are returned unchanged.
    pub fn referenced_from(self, parent: &ObjectKey, reference: &str) -> Self {
        match self {
            Self::SchemaNotFound {
                class,
                object: None,
                ..
            } => Self::SchemaNotFound {
                class,
                object: Some(parent.clone()),
                field: Some(reference.to_string()),
            },
            other => other,
        }
    }

    /// Create a field resolution error.
    pub fn resolution(object: &ObjectKey, field: &str, reason: impl Into<String>) -> Self {
        Self::FieldResolution {
            object: object.clone(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Instance the error refers to, if any.
    pub fn object(&self) -> Option<&ObjectKey> {
        match self {
            Self::SchemaNotFound { object, .. } => object.as_ref(),
            Self::FieldResolution { object, .. } | Self::Transform { object, .. } => Some(object),
        }
    }

    /// Field the error refers to, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::SchemaNotFound { field, .. } => field.as_deref(),
            Self::FieldResolution { field, .. } | Self::Transform { field, .. } => Some(field),
        }
    }
}

fn referenced_from(object: &Option<ObjectKey>, field: &Option<String>) -> String {
    match (object, field) {
        (Some(object), Some(field)) => format!(" (referenced by `{field}` on {object})"),
        _ => String::new(),
    }
}

/// Error type for cache invalidation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// One or more deletes failed; entries may still be readable.
    #[error("Failed to invalidate {object}: {failed} of {attempted} deletes failed ({source})")]
    Store {
        /// Instance being invalidated.
        object: ObjectKey,
        /// Number of keys whose delete failed.
        failed: usize,
        /// Number of keys attempted.
        attempted: usize,
        /// First failure observed.
        #[source]
        source: StoreError,
    },
}
