//! The `webhooks` action.

use async_trait::async_trait;
use tracing::debug;

use super::{ActionHandler, ActionOutput};
use crate::config::ActionKind;
use crate::context::StepContext;
use crate::errors::Result;

/// Form webhooks are dispatched by the persistence collaborator once the
/// submission is stored, so there is nothing to do client-side.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebhooksAction;

#[async_trait]
impl ActionHandler for WebhooksAction {
    fn kind(&self) -> ActionKind {
        ActionKind::Webhooks
    }

    async fn execute(&self, step: &StepContext<'_>) -> Result<ActionOutput> {
        debug!(form_id = %step.payload.form_id, "Webhooks are dispatched server-side");
        Ok(ActionOutput::completed())
    }
}
