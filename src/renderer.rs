//! Fragment renderer: scalar-only projection of one instance.
//!
//! The renderer is pure given its inputs. It never caches and never follows
//! references; both are the composer's job.

use serde_json::Value;

use crate::error::RenderError;
use crate::schema::ClassSchema;
use crate::transform::{html_to_markdown, map_strings, TransformError, TransformPipeline};
use crate::types::{ApiVersion, Document, ExposureLevel, FieldSpec, Fragment, ObjectKey, Resolved};

/// Render the scalar fields of `doc` visible at `version` and `exposure`.
///
/// ## Algorithm
///
/// For each field in declaration order:
/// 1. Skip reference fields
/// 2. Skip fields above the requested exposure level
/// 3. Skip fields restricted to other versions
/// 4. Resolve the value (attribute lookup or computed definition)
/// 5. Convert HTML to markdown for `markdown` fields
/// 6. Run the transform pipeline unless the field is trusted
/// 7. Insert under the field name
pub fn render_fragment(
    doc: &dyn Document,
    schema: &ClassSchema,
    version: &ApiVersion,
    exposure: ExposureLevel,
    pipeline: &TransformPipeline,
) -> Result<Fragment, RenderError> {
    let object = doc.key();
    let mut fragment = Fragment::new();

    for field in schema.field_specs() {
        if !field.is_scalar() || !field.is_visible(version, exposure) {
            continue;
        }
        let value = render_scalar(doc, &object, field, pipeline)?;
        fragment.insert(field.name.clone(), value);
    }

    Ok(fragment)
}

fn render_scalar(
    doc: &dyn Document,
    object: &ObjectKey,
    field: &FieldSpec,
    pipeline: &TransformPipeline,
) -> Result<Value, RenderError> {
    let value = match field
        .resolve(doc)
        .map_err(|reason| RenderError::resolution(object, &field.name, reason))?
    {
        Resolved::Value(v) => v,
        Resolved::Nil => Value::Null,
        other => {
            return Err(RenderError::resolution(
                object,
                &field.name,
                format!("scalar field resolved to a {}", other.kind_name()),
            ))
        }
    };

    let transform_error = |source: TransformError| RenderError::Transform {
        object: object.clone(),
        field: field.name.clone(),
        source,
    };

    let value = if field.markdown {
        map_strings(value, &|html| {
            html_to_markdown(html).map_err(|e| match e {
                TransformError::Markdown(reason) => reason,
                other => other.to_string(),
            })
        })
        .map_err(|reason| transform_error(TransformError::Markdown(reason)))?
    } else {
        value
    };

    pipeline.apply(field, value).map_err(transform_error)
}
