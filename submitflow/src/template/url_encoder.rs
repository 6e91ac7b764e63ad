//! Placeholder rendering for URLs.
//!
//! A naive render over a whole URL breaks as soon as a substituted value
//! contains `?`, `=` or `&`. Here the path is rendered on its own and every
//! query parameter value is rendered and re-encoded individually.

use url::{form_urlencoded, Url};

use super::engine::{contains_placeholder, render, TemplateContext};

/// Renders the placeholders of `raw` as a URL.
///
/// Absolute URLs keep their origin; the path and query values are rendered
/// separately and the query is re-serialized as
/// `application/x-www-form-urlencoded`. Relative URLs are split on the first
/// `?`. URLs that cannot be a base fall back to a flat render. Never fails.
///
/// # Examples
///
/// ```
/// use submitflow::template::{encode_url, TemplateContext};
///
/// let mut ctx = TemplateContext::new();
/// ctx.insert("formSubmissionId".into(), 29.into());
/// assert_eq!(
///     encode_url("/ar/listing/booking?categoryId=1100&formSubmissionId={{.formSubmissionId}}", &ctx),
///     "/ar/listing/booking?categoryId=1100&formSubmissionId=29"
/// );
/// ```
#[must_use]
pub fn encode_url(raw: &str, context: &TemplateContext) -> String {
    if !contains_placeholder(raw) {
        return raw.to_string();
    }

    match Url::parse(raw) {
        Ok(parsed) if !parsed.cannot_be_a_base() => encode_absolute(parsed, context),
        Ok(_) => render(raw, context),
        Err(_) => encode_relative(raw, context),
    }
}

fn encode_absolute(mut url: Url, context: &TemplateContext) -> String {
    let path = render(&restore_braces(url.path()), context);
    let query = url.query().map(|q| render_query(q, context));

    url.set_path(&path);
    url.set_fragment(None);
    match query {
        Some(Some(query)) => url.set_query(Some(&query)),
        _ => url.set_query(None),
    }
    url.to_string()
}

fn encode_relative(raw: &str, context: &TemplateContext) -> String {
    match raw.split_once('?') {
        None => render(raw, context),
        Some((base, query)) => {
            let base = render(base, context);
            match render_query(query, context) {
                Some(query) => format!("{base}?{query}"),
                None => base,
            }
        }
    }
}

/// Re-serializes a query string, rendering values that hold placeholders.
/// Returns `None` when there are no parameters.
fn render_query(query: &str, context: &TemplateContext) -> Option<String> {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut any = false;

    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if contains_placeholder(&value) {
            serializer.append_pair(&key, &render(&value, context));
        } else {
            serializer.append_pair(&key, &value);
        }
        any = true;
    }

    any.then(|| serializer.finish())
}

// The URL parser percent-encodes braces in paths.
fn restore_braces(path: &str) -> String {
    path.replace("%7B", "{")
        .replace("%7b", "{")
        .replace("%7D", "}")
        .replace("%7d", "}")
}
