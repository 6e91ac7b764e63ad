//! Template rendering for redirect URLs, forwarded answers and webhook bodies.
//!
//! Placeholders take the form `{{.name}}` or `{{.path.to.value}}`.

mod engine;
mod url_encoder;

pub use engine::{
    contains_placeholder, placeholders, render, resolve, stringify_value, TemplateContext,
};
pub use url_encoder::encode_url;
