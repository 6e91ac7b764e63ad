//! The `nextjs_post` action: forward answers to an external endpoint.
//!
//! The endpoint is not part of the form definition. It is published by the
//! forms API at `GET {api_base_url}/config` and resolved once per cache.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{ActionHandler, ActionOutput};
use crate::config::{join_url, ActionKind, FormDefinition};
use crate::context::{StepContext, SubmissionPayload};
use crate::errors::{Result, SubmitflowError};
use crate::http::{HttpRequest, Transport};
use crate::template::stringify_value;

/// The external forwarding endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ForwardEndpoint {
    /// Whether forwarding is switched on.
    #[serde(default)]
    pub enabled: bool,
    /// Destination URL.
    #[serde(default)]
    pub url: String,
}

impl ForwardEndpoint {
    /// Creates an enabled endpoint.
    #[must_use]
    pub fn enabled(url: impl Into<String>) -> Self {
        Self {
            enabled: true,
            url: url.into(),
        }
    }

    fn is_usable(&self) -> bool {
        self.enabled && !self.url.trim().is_empty()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteConfig {
    #[serde(default)]
    nextjs_post: Option<ForwardEndpoint>,
}

/// Memoized forward endpoint.
///
/// Concurrent first callers share one config fetch. A failed fetch is not
/// remembered, so the next run tries again.
#[derive(Debug, Default)]
pub struct ForwardEndpointCache {
    cell: OnceCell<Option<ForwardEndpoint>>,
}

impl ForwardEndpointCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache that never fetches.
    #[must_use]
    pub fn preloaded(endpoint: Option<ForwardEndpoint>) -> Self {
        Self {
            cell: OnceCell::new_with(Some(endpoint)),
        }
    }

    /// Returns the usable endpoint, fetching the config on first use.
    pub async fn endpoint(
        &self,
        transport: &dyn Transport,
        config_url: &str,
    ) -> Result<Option<ForwardEndpoint>> {
        let endpoint = self
            .cell
            .get_or_try_init(|| fetch_endpoint(transport, config_url))
            .await?;
        Ok(endpoint.as_ref().filter(|e| e.is_usable()).cloned())
    }

    /// Returns true once a config fetch has succeeded.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.cell.initialized()
    }
}

async fn fetch_endpoint(
    transport: &dyn Transport,
    config_url: &str,
) -> Result<Option<ForwardEndpoint>> {
    let response = transport.send(HttpRequest::get(config_url)).await?;
    if !response.is_success() {
        return Err(response.into_error());
    }
    let config: RemoteConfig = response.json()?;
    debug!(configured = config.nextjs_post.is_some(), "Loaded forward endpoint config");
    Ok(config.nextjs_post)
}

/// One forwarded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardAnswer {
    /// Question label in the submission locale.
    pub question: String,
    /// Display string of the answer.
    pub answer: String,
}

/// Lists answers as `{question, answer}` pairs.
///
/// Answers to form fields come first, in field order; answers without a field
/// follow, sorted by name. Null answers are left out.
#[must_use]
pub fn build_forward_answers(form: &FormDefinition, payload: &SubmissionPayload) -> Vec<ForwardAnswer> {
    let locale = payload.locale().unwrap_or(&form.default_locale);
    let mut answers = Vec::with_capacity(payload.answers.len());

    for field in &form.fields {
        if let Some(value) = payload.answer(&field.name).filter(|v| !v.is_null()) {
            answers.push(ForwardAnswer {
                question: field.label_for(locale, &form.default_locale).to_string(),
                answer: stringify_value(value),
            });
        }
    }

    let mut extra: Vec<(&String, &Value)> = payload
        .answers
        .iter()
        .filter(|(name, value)| !value.is_null() && form.field(name).is_none())
        .collect();
    extra.sort_by(|a, b| a.0.cmp(b.0));
    answers.extend(extra.into_iter().map(|(name, value)| ForwardAnswer {
        question: name.clone(),
        answer: stringify_value(value),
    }));

    answers
}

/// Posts the labelled answers to the configured forward endpoint.
#[derive(Clone)]
pub struct ForwardAction {
    api_base_url: String,
    transport: Arc<dyn Transport>,
    cache: Arc<ForwardEndpointCache>,
}

impl ForwardAction {
    /// Creates the action with a shared endpoint cache.
    #[must_use]
    pub fn new(
        api_base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        cache: Arc<ForwardEndpointCache>,
    ) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            transport,
            cache,
        }
    }

    fn body(step: &StepContext<'_>) -> Value {
        let payload = step.payload;
        let locale = payload.locale().unwrap_or(&step.form.default_locale);

        let mut body = json!({
            "submissionId": step.execution.submission_id,
            "formId": payload.form_id,
            "version": payload.version,
            "submittedAt": payload.submitted_at,
            "locale": locale,
            "device": payload.meta.get("device").cloned().unwrap_or(Value::Null),
            "answers": build_forward_answers(step.form, payload),
        });
        if let Some(session_id) = payload.meta_str("sessionId") {
            body["sessionId"] = Value::from(session_id);
        }
        body
    }
}

impl fmt::Debug for ForwardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardAction")
            .field("api_base_url", &self.api_base_url)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ActionHandler for ForwardAction {
    fn kind(&self) -> ActionKind {
        ActionKind::NextjsPost
    }

    async fn execute(&self, step: &StepContext<'_>) -> Result<ActionOutput> {
        let config_url = join_url(&self.api_base_url, "config");
        let endpoint = match self.cache.endpoint(self.transport.as_ref(), &config_url).await {
            Ok(Some(endpoint)) => endpoint,
            Ok(None) => return Ok(ActionOutput::skip("forward endpoint not configured")),
            Err(err) => {
                warn!(error = %err, "Could not load forward endpoint config");
                return Ok(ActionOutput::skip("forward endpoint unavailable"));
            }
        };

        let response = self
            .transport
            .send(HttpRequest::post(&endpoint.url).with_json(Self::body(step)))
            .await?;
        if !response.is_success() {
            return Err(SubmitflowError::http(response.status, response.body));
        }

        info!(url = %endpoint.url, form_id = %step.payload.form_id, "Forwarded submission");
        Ok(ActionOutput::completed())
    }
}
