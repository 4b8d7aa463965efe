//! HTML to markdown conversion for `markdown` fields.
//!
//! The conversion is a streaming rewrite: known block and inline elements get
//! their markdown markers inserted around them and every tag is unwrapped,
//! leaving its text content in place. Script and style elements are dropped
//! with their content.

use lol_html::html_content::{ContentType, Element};
use lol_html::{element, rewrite_str, RewriteStrSettings};
use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::TransformError;

static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").unwrap());
static TRAILING_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+\n").unwrap());

static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(?:#([0-9]{1,7})|#[xX]([0-9a-fA-F]{1,6})|([a-zA-Z]+));").unwrap());

/// Convert an HTML fragment into markdown-equivalent text.
pub fn html_to_markdown(html: &str) -> Result<String, TransformError> {
    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element!("*", |el| {
                let tag = el.tag_name();
                match tag.as_str() {
                    "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                        let level = tag[1..].parse::<usize>().unwrap_or(1);
                        el.before(&format!("\n\n{} ", "#".repeat(level)), ContentType::Html);
                        el.after("\n\n", ContentType::Html);
                    }
                    "p" | "div" => {
                        el.before("\n\n", ContentType::Html);
                        el.after("\n\n", ContentType::Html);
                    }
                    "br" => {
                        el.replace("\n", ContentType::Html);
                        return Ok(());
                    }
                    "hr" => {
                        el.replace("\n\n---\n\n", ContentType::Html);
                        return Ok(());
                    }
                    "script" | "style" => {
                        el.remove();
                        return Ok(());
                    }
                    "strong" | "b" => wrap(el, "**", "**"),
                    "em" | "i" => wrap(el, "_", "_"),
                    "code" => wrap(el, "`", "`"),
                    "a" => {
                        if let Some(href) = el.get_attribute("href") {
                            wrap(el, "[", &format!("]({href})"));
                        }
                    }
                    "li" => el.before("\n- ", ContentType::Html),
                    "ul" | "ol" => {
                        el.before("\n", ContentType::Html);
                        el.after("\n\n", ContentType::Html);
                    }
                    "blockquote" => {
                        el.before("\n\n> ", ContentType::Html);
                        el.after("\n\n", ContentType::Html);
                    }
                    _ => {}
                }
                el.remove_and_keep_content();
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| TransformError::Markdown(e.to_string()))?;

    let text = TRAILING_SPACE.replace_all(&rewritten, "\n");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    Ok(decode_entities(text.trim()))
}

fn wrap(el: &mut Element<'_, '_>, open: &str, close: &str) {
    el.before(open, ContentType::Html);
    el.after(close, ContentType::Html);
}

/// Decode numeric references and the common named entities in one pass.
/// Unknown names and invalid code points are left as written.
fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex_lite::Captures<'_>| {
            let decoded = if let Some(dec) = caps.get(1) {
                dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
            } else if let Some(hex) = caps.get(2) {
                u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
            } else {
                caps.get(3).and_then(|name| match name.as_str() {
                    "nbsp" => Some(' '),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "amp" => Some('&'),
                    _ => None,
                })
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
