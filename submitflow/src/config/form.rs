//! Form definition as served by the forms API.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::PipelineConfig;

/// A string localized per locale code (`en`, `ar`, ...).
pub type LocaleString = HashMap<String, String>;

/// One question of a form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Question id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Attribute the question maps to.
    #[serde(default)]
    pub attribute_key: String,
    /// Field type (text, phone, location, ...).
    #[serde(rename = "type", default)]
    pub field_type: String,
    /// Answer key in the submission.
    pub name: String,
    /// Localized label.
    #[serde(default)]
    pub label: LocaleString,
    /// Renderer-specific properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<serde_json::Value>,
}

impl FieldDefinition {
    /// Creates a field with a name only.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Adds a localized label.
    #[must_use]
    pub fn with_label(mut self, locale: impl Into<String>, label: impl Into<String>) -> Self {
        self.label.insert(locale.into(), label.into());
        self
    }

    /// Label for `locale`, then `fallback_locale`, then the field name.
    #[must_use]
    pub fn label_for(&self, locale: &str, fallback_locale: &str) -> &str {
        [locale, fallback_locale]
            .iter()
            .find_map(|l| self.label.get(*l).filter(|s| !s.is_empty()))
            .map_or(self.name.as_str(), String::as_str)
    }
}

/// A published form with its submit pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDefinition {
    /// Form identifier.
    #[serde(rename = "formId")]
    pub form_id: String,
    /// Published version.
    pub version: i64,
    /// Localized title.
    #[serde(default)]
    pub title: LocaleString,
    /// Questions in display order.
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    /// Attribute keys attached to the form.
    #[serde(default)]
    pub attributes: Vec<String>,
    /// Submit pipeline, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submit: Option<PipelineConfig>,
    /// Locales the form supports.
    #[serde(default)]
    pub supported_locales: Vec<String>,
    /// Locale used when the submission carries none.
    #[serde(default = "default_locale")]
    pub default_locale: String,
}

fn default_locale() -> String {
    "en".to_string()
}

impl FormDefinition {
    /// Creates a form without fields or pipeline.
    #[must_use]
    pub fn new(form_id: impl Into<String>, version: i64) -> Self {
        Self {
            form_id: form_id.into(),
            version,
            title: LocaleString::new(),
            fields: Vec::new(),
            attributes: Vec::new(),
            submit: None,
            supported_locales: vec!["en".to_string(), "ar".to_string()],
            default_locale: default_locale(),
        }
    }

    /// Parses a form definition from JSON, validating its submit block.
    pub fn from_json(json: &str) -> crate::errors::Result<Self> {
        let form: Self = serde_json::from_str(json)?;
        if let Some(submit) = &form.submit {
            submit.validate()?;
        }
        Ok(form)
    }

    /// Adds a field.
    #[must_use]
    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Sets the submit pipeline.
    #[must_use]
    pub fn with_submit(mut self, submit: PipelineConfig) -> Self {
        self.submit = Some(submit);
        self
    }

    /// Looks up a field by answer name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }
}
