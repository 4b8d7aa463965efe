//! Built-in transforms.
//!
//! Each constructor returns a closure suitable for
//! [`TransformPipeline::add_transform`](super::TransformPipeline::add_transform).
//! All of them act on string leaves only; numbers, booleans and nulls pass
//! through unchanged.

use serde_json::Value;

use super::map_strings;
use crate::types::FieldSpec;

/// Escape `&`, `<` and `>` in every string leaf, for text content.
pub fn escape_html() -> impl Fn(&FieldSpec, Value) -> Result<Value, String> + Send + Sync + 'static {
    |_, value| map_strings(value, &|s| Ok(html_escape::encode_text(s).into_owned()))
}

/// Escape every string leaf for use inside an unquoted HTML attribute.
///
/// Whitespace, quotes and `/` are escaped as well, so the output is only
/// meant for attribute context.
pub fn escape_attribute() -> impl Fn(&FieldSpec, Value) -> Result<Value, String> + Send + Sync + 'static {
    |_, value| map_strings(value, &|s| Ok(ammonia::clean_text(s)))
}

/// Strip unsafe markup from every string leaf, keeping safe HTML.
pub fn sanitize_html() -> impl Fn(&FieldSpec, Value) -> Result<Value, String> + Send + Sync + 'static {
    |_, value| map_strings(value, &|s| Ok(ammonia::clean(s)))
}

/// Normalize line endings (CRLF and lone CR become LF) and trim surrounding
/// whitespace in every string leaf.
pub fn normalize_text() -> impl Fn(&FieldSpec, Value) -> Result<Value, String> + Send + Sync + 'static {
    |_, value| map_strings(value, &|s| Ok(normalize(s)))
}

fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n").trim().to_string()
}
