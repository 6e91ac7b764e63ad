//! Delivery actions a submit pipeline can run.
//!
//! Each action kind has one [`ActionHandler`]. Handlers read the shared
//! payload and the live execution context through a [`StepContext`] and
//! report what they produced in an [`ActionOutput`]; the runner merges those
//! outputs so later steps can use them.

mod bridge;
mod forward;
mod persist;
mod purchase;
mod redirect;
mod webhooks;

pub use bridge::NativeBridgeAction;
pub use forward::{build_forward_answers, ForwardAction, ForwardAnswer, ForwardEndpoint, ForwardEndpointCache};
pub use persist::ServerPersistAction;
pub use purchase::PurchaseAction;
pub use redirect::RedirectAction;
pub use webhooks::WebhooksAction;

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

use crate::config::ActionKind;
use crate::context::StepContext;
use crate::errors::Result;

/// Whether a handler did its work or had nothing to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ActionStatus {
    /// The action ran.
    #[default]
    Completed,
    /// The action had nothing to do.
    Skipped,
}

/// What a step produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionOutput {
    /// Completion status.
    pub status: ActionStatus,
    /// Submission id assigned by persistence.
    pub submission_id: Option<i64>,
    /// Transaction id of a completed purchase.
    pub purchase_transaction_id: Option<String>,
    /// URL the step navigated to.
    pub navigated_to: Option<String>,
    /// Why the step was skipped.
    pub skip_reason: Option<String>,
}

impl ActionOutput {
    /// A completed step with no outputs.
    #[must_use]
    pub fn completed() -> Self {
        Self::default()
    }

    /// A step that had nothing to do.
    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self {
            status: ActionStatus::Skipped,
            skip_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Sets the submission id.
    #[must_use]
    pub fn with_submission_id(mut self, id: i64) -> Self {
        self.submission_id = Some(id);
        self
    }

    /// Sets the purchase transaction id.
    #[must_use]
    pub fn with_transaction_id(mut self, id: impl Into<String>) -> Self {
        self.purchase_transaction_id = Some(id.into());
        self
    }

    /// Records a navigation.
    #[must_use]
    pub fn with_navigation(mut self, url: impl Into<String>) -> Self {
        self.navigated_to = Some(url.into());
        self
    }

    /// Returns true if the step was skipped.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.status == ActionStatus::Skipped
    }
}

/// Executes one kind of delivery action.
#[async_trait]
pub trait ActionHandler: Send + Sync + Debug {
    /// The action kind this handler serves.
    fn kind(&self) -> ActionKind;

    /// Executes the action for one run.
    async fn execute(&self, step: &StepContext<'_>) -> Result<ActionOutput>;
}

/// One optional handler per action kind.
///
/// A kind without a handler is skipped by the runner.
#[derive(Debug, Clone, Default)]
pub struct ActionHandlers {
    native_bridge: Option<Arc<dyn ActionHandler>>,
    server_persist: Option<Arc<dyn ActionHandler>>,
    webhooks: Option<Arc<dyn ActionHandler>>,
    redirect: Option<Arc<dyn ActionHandler>>,
    nextjs_post: Option<Arc<dyn ActionHandler>>,
    purchase_authenticated: Option<Arc<dyn ActionHandler>>,
}

impl ActionHandlers {
    /// Creates an empty handler set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under its own kind, replacing any previous one.
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn ActionHandler>) -> Self {
        self.set(handler);
        self
    }

    /// Registers a handler under its own kind, replacing any previous one.
    pub fn set(&mut self, handler: Arc<dyn ActionHandler>) {
        let kind = handler.kind();
        *self.slot_mut(kind) = Some(handler);
    }

    /// Returns the handler for `kind`.
    #[must_use]
    pub fn get(&self, kind: ActionKind) -> Option<&Arc<dyn ActionHandler>> {
        match kind {
            ActionKind::NativeBridge => self.native_bridge.as_ref(),
            ActionKind::ServerPersist => self.server_persist.as_ref(),
            ActionKind::Webhooks => self.webhooks.as_ref(),
            ActionKind::Redirect => self.redirect.as_ref(),
            ActionKind::NextjsPost => self.nextjs_post.as_ref(),
            ActionKind::PurchaseAuthenticated => self.purchase_authenticated.as_ref(),
        }
    }

    /// Kinds that have a handler.
    #[must_use]
    pub fn registered(&self) -> Vec<ActionKind> {
        ActionKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind).is_some())
            .collect()
    }

    fn slot_mut(&mut self, kind: ActionKind) -> &mut Option<Arc<dyn ActionHandler>> {
        match kind {
            ActionKind::NativeBridge => &mut self.native_bridge,
            ActionKind::ServerPersist => &mut self.server_persist,
            ActionKind::Webhooks => &mut self.webhooks,
            ActionKind::Redirect => &mut self.redirect,
            ActionKind::NextjsPost => &mut self.nextjs_post,
            ActionKind::PurchaseAuthenticated => &mut self.purchase_authenticated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_builders() {
        let output = ActionOutput::completed()
            .with_submission_id(29)
            .with_navigation("/done");
        assert!(!output.is_skipped());
        assert_eq!(output.submission_id, Some(29));
        assert_eq!(output.navigated_to.as_deref(), Some("/done"));

        let skipped = ActionOutput::skip("nothing to do");
        assert!(skipped.is_skipped());
        assert_eq!(skipped.skip_reason.as_deref(), Some("nothing to do"));
    }

    #[test]
    fn test_set_replaces_handler_of_same_kind() {
        let mut handlers = ActionHandlers::new();
        handlers.set(Arc::new(WebhooksAction));
        handlers.set(Arc::new(WebhooksAction));

        assert_eq!(handlers.registered(), vec![ActionKind::Webhooks]);
        assert_eq!(
            handlers.get(ActionKind::Webhooks).map(|h| h.kind()),
            Some(ActionKind::Webhooks)
        );
    }

    #[test]
    fn test_handler_registry() {
        let handlers = ActionHandlers::new().with_handler(Arc::new(WebhooksAction));

        assert!(handlers.get(ActionKind::Webhooks).is_some());
        assert!(handlers.get(ActionKind::Redirect).is_none());
        assert_eq!(handlers.registered(), vec![ActionKind::Webhooks]);
    }
}
