//! Runtime settings for reaching the submitflow collaborators.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings shared by every pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitflowSettings {
    /// Base URL of the forms API (submissions, config, purchase proxy).
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Transport-level request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: f64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Alert text used for failures without field-level errors.
    #[serde(default = "default_alert_message")]
    pub default_alert_message: String,
}

fn default_api_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_request_timeout() -> f64 {
    30.0
}

fn default_user_agent() -> String {
    "submitflow/0.1".to_string()
}

fn default_alert_message() -> String {
    "Submit step failed".to_string()
}

impl Default for SubmitflowSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            request_timeout_seconds: default_request_timeout(),
            user_agent: default_user_agent(),
            default_alert_message: default_alert_message(),
        }
    }
}

impl SubmitflowSettings {
    /// Creates settings with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds settings from defaults overridden by `SUBMITFLOW_*` variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(url) = lookup("SUBMITFLOW_API_BASE_URL") {
            settings.api_base_url = url;
        }
        if let Some(raw) = lookup("SUBMITFLOW_REQUEST_TIMEOUT_SECONDS") {
            match raw.parse::<f64>() {
                Ok(secs) if secs > 0.0 => settings.request_timeout_seconds = secs,
                _ => tracing::warn!(value = %raw, "Ignoring invalid SUBMITFLOW_REQUEST_TIMEOUT_SECONDS"),
            }
        }
        if let Some(agent) = lookup("SUBMITFLOW_USER_AGENT") {
            settings.user_agent = agent;
        }

        settings
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.request_timeout_seconds = seconds;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout_seconds)
    }

    /// Joins a path onto the API base URL.
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        join_url(&self.api_base_url, path)
    }
}

/// Joins `base` and `path` with exactly one slash between them.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
