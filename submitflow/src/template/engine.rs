//! `{{.path}}` placeholder rendering over submission data.

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Variables available to a template, keyed by top-level name.
pub type TemplateContext = Map<String, Value>;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\.([\w.]+)\}\}").expect("placeholder pattern is a valid regex")
    })
}

/// Returns true if `text` may contain a placeholder.
#[must_use]
pub fn contains_placeholder(text: &str) -> bool {
    text.contains("{{")
}

/// Renders every `{{.path}}` placeholder in `template`.
///
/// Text without `{{` is returned unchanged. Unresolvable or `null` values
/// render as the empty string.
///
/// # Examples
///
/// ```
/// use submitflow::template::{render, TemplateContext};
///
/// let mut ctx = TemplateContext::new();
/// ctx.insert("submissionId".into(), 29.into());
/// assert_eq!(render("/done?id={{.submissionId}}", &ctx), "/done?id=29");
/// ```
#[must_use]
pub fn render(template: &str, context: &TemplateContext) -> String {
    if !contains_placeholder(template) {
        return template.to_string();
    }

    placeholder_regex()
        .replace_all(template, |caps: &Captures<'_>| {
            resolve(context, &caps[1])
                .map(stringify_value)
                .unwrap_or_default()
        })
        .into_owned()
}

/// Lists the paths referenced by placeholders in `template`.
#[must_use]
pub fn placeholders(template: &str) -> Vec<String> {
    placeholder_regex()
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Resolves `path` against the context.
///
/// A literal key (which may itself contain dots) wins; otherwise the dotted
/// path is walked through nested objects, and numeric segments index arrays.
#[must_use]
pub fn resolve<'a>(context: &'a TemplateContext, path: &str) -> Option<&'a Value> {
    if let Some(value) = context.get(path) {
        return Some(value);
    }
    if !path.contains('.') {
        return None;
    }

    let mut segments = path.split('.');
    let mut current = context.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Converts an answer or context value into its display string.
///
/// Objects are interpreted by shape: phone (`e164`), choice with free text
/// (`value`/`other`), choice (`value`), location (`lat`/`lng`), file (`url`).
/// Any other object is emitted as compact JSON.
#[must_use]
pub fn stringify_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(stringify_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(map) => stringify_object(map),
    }
}

fn stringify_object(map: &Map<String, Value>) -> String {
    if let Some(e164) = map.get("e164").filter(|v| !v.is_null()) {
        return stringify_value(e164);
    }

    if let Some(value) = map.get("value") {
        if value.as_str() == Some("other") {
            if let Some(other) = map
                .get("other")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
            {
                return other.to_string();
            }
        }
        return stringify_value(value);
    }

    let lat = map.get("lat").and_then(Value::as_f64);
    let lng = map.get("lng").and_then(Value::as_f64);
    if let (Some(lat), Some(lng)) = (lat, lng) {
        return format!("{lat:.6},{lng:.6}");
    }

    if let Some(url) = map.get("url").and_then(Value::as_str) {
        return url.to_string();
    }

    serde_json::to_string(map).unwrap_or_default()
}
