//! The `server_persist` action.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use super::{ActionHandler, ActionOutput};
use crate::config::{join_url, ActionKind};
use crate::context::StepContext;
use crate::errors::Result;
use crate::http::{HttpRequest, Transport};
use crate::pipeline::{resolve_idempotency_key, IDEMPOTENCY_HEADER};

/// Stores the submission through `POST {api_base_url}/submissions`.
#[derive(Clone)]
pub struct ServerPersistAction {
    api_base_url: String,
    transport: Arc<dyn Transport>,
}

impl ServerPersistAction {
    /// Creates the action.
    #[must_use]
    pub fn new(api_base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            transport,
        }
    }
}

impl fmt::Debug for ServerPersistAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerPersistAction")
            .field("api_base_url", &self.api_base_url)
            .finish_non_exhaustive()
    }
}

/// Reads the stored id from `id` or `submissionId`, as a number or a numeric
/// string.
fn submission_id_from(body: &Value) -> Option<i64> {
    ["id", "submissionId"].iter().find_map(|key| match body.get(*key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[async_trait]
impl ActionHandler for ServerPersistAction {
    fn kind(&self) -> ActionKind {
        ActionKind::ServerPersist
    }

    async fn execute(&self, step: &StepContext<'_>) -> Result<ActionOutput> {
        let mut request = HttpRequest::post(join_url(&self.api_base_url, "submissions"))
            .with_json(serde_json::to_value(step.payload)?);
        if let Some(key) = resolve_idempotency_key(step.pipeline, step.payload) {
            request = request.with_header(IDEMPOTENCY_HEADER, key);
        }

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(response.into_error());
        }

        match submission_id_from(&response.json_value()) {
            Some(id) => {
                info!(submission_id = id, form_id = %step.payload.form_id, "Submission persisted");
                Ok(ActionOutput::completed().with_submission_id(id))
            }
            None => {
                warn!(form_id = %step.payload.form_id, "Persistence response carried no submission id");
                Ok(ActionOutput::completed())
            }
        }
    }
}
