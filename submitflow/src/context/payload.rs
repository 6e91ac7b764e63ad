//! The submission shared read-only by every step of a run.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A completed form, as handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    /// Form identifier.
    pub form_id: String,
    /// Form version the user filled in.
    pub version: i64,
    /// Submission time, epoch milliseconds.
    #[serde(default = "now_millis")]
    pub submitted_at: i64,
    /// Answers keyed by field name.
    #[serde(default)]
    pub answers: Map<String, Value>,
    /// Free-form metadata: locale, device, session and user ids.
    #[serde(default)]
    pub meta: Map<String, Value>,
    /// Auth token supplied by the embedding app.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Set when a native app acknowledged the bridge message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridge_ack: Option<bool>,
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl SubmissionPayload {
    /// Creates a payload submitted now, with no answers.
    #[must_use]
    pub fn new(form_id: impl Into<String>, version: i64) -> Self {
        Self {
            form_id: form_id.into(),
            version,
            submitted_at: now_millis(),
            answers: Map::new(),
            meta: Map::new(),
            auth_token: None,
            bridge_ack: None,
        }
    }

    /// Adds an answer.
    #[must_use]
    pub fn with_answer(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.answers.insert(name.into(), value.into());
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Sets the auth token.
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Sets the submission time.
    #[must_use]
    pub fn with_submitted_at(mut self, millis: i64) -> Self {
        self.submitted_at = millis;
        self
    }

    /// Returns an answer by field name.
    #[must_use]
    pub fn answer(&self, name: &str) -> Option<&Value> {
        self.answers.get(name)
    }

    /// Returns a metadata entry if it is a non-empty string.
    #[must_use]
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.meta
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Locale the user filled the form in.
    #[must_use]
    pub fn locale(&self) -> Option<&str> {
        self.meta_str("locale")
    }

    /// Non-empty auth token supplied with the payload.
    #[must_use]
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|t| !t.is_empty())
    }
}
