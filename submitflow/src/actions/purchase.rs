//! The `purchase_authenticated` action.

use async_trait::async_trait;
use std::sync::Arc;

use super::{ActionHandler, ActionOutput};
use crate::config::{ActionKind, ActionSpec};
use crate::context::StepContext;
use crate::errors::{Result, SubmitflowError};
use crate::purchase::{PurchaseAuthFlow, PurchaseRequest};

/// Runs the authenticated purchase flow for the configured action.
#[derive(Debug, Clone)]
pub struct PurchaseAction {
    flow: Arc<PurchaseAuthFlow>,
}

impl PurchaseAction {
    /// Creates the action.
    #[must_use]
    pub fn new(flow: Arc<PurchaseAuthFlow>) -> Self {
        Self { flow }
    }
}

#[async_trait]
impl ActionHandler for PurchaseAction {
    fn kind(&self) -> ActionKind {
        ActionKind::PurchaseAuthenticated
    }

    async fn execute(&self, step: &StepContext<'_>) -> Result<ActionOutput> {
        let config = match &step.action.spec {
            ActionSpec::PurchaseAuthenticated {
                purchase_auth_config: Some(config),
            } => config,
            _ => {
                return Err(SubmitflowError::Configuration(
                    "purchase_authenticated requires purchase_auth_config".to_string(),
                ))
            }
        };

        let variables = step.template_variables();
        let receipt = self
            .flow
            .run(PurchaseRequest {
                config,
                payload: step.payload,
                submission_id: step.execution.submission_id,
                variables: &variables,
            })
            .await?;

        let mut output = ActionOutput::completed();
        output.purchase_transaction_id = receipt.transaction_id;
        output.navigated_to = receipt.navigated_to;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FormDefinition, PipelineConfig, PurchaseAuthConfig, SubmitAction};
    use crate::context::{ExecutionContext, SubmissionPayload};
    use crate::ports::{InMemoryTokenStore, NoOpPurchaseObserver};
    use crate::testing::{RecordingNavigator, ScriptedLoginPrompt, ScriptedTransport};
    use serde_json::json;

    fn action(transport: Arc<ScriptedTransport>, navigator: Arc<RecordingNavigator>) -> PurchaseAction {
        PurchaseAction::new(Arc::new(PurchaseAuthFlow::new(
            "https://forms.example/api",
            transport,
            Arc::new(InMemoryTokenStore::new()),
            Arc::new(ScriptedLoginPrompt::cancelling()),
            navigator,
            Arc::new(NoOpPurchaseObserver),
        )))
    }

    async fn run(action: &PurchaseAction, spec: ActionSpec) -> Result<ActionOutput> {
        let form = FormDefinition::new("promote", 1);
        let pipeline = PipelineConfig::new();
        let spec = SubmitAction::enabled(spec);
        let payload = SubmissionPayload::new("promote", 1).with_answer("adv_id", "12");
        let execution = ExecutionContext::new();
        let step = StepContext {
            form: &form,
            pipeline: &pipeline,
            action: &spec,
            payload: &payload,
            execution: &execution,
        };
        action.execute(&step).await
    }

    #[tokio::test]
    async fn test_outputs_transaction_and_navigation() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_json(
            "/purchase",
            200,
            json!({"transactionId": "txn-3", "payment_link": "https://pay.example/3"}),
        );
        let navigator = Arc::new(RecordingNavigator::new());

        let output = run(
            &action(transport, navigator.clone()),
            ActionSpec::PurchaseAuthenticated {
                purchase_auth_config: Some(PurchaseAuthConfig::new()),
            },
        )
        .await
        .unwrap();

        assert_eq!(output.purchase_transaction_id.as_deref(), Some("txn-3"));
        assert_eq!(output.navigated_to.as_deref(), Some("https://pay.example/3"));
        assert_eq!(navigator.urls().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_config_is_a_configuration_error() {
        let transport = Arc::new(ScriptedTransport::new());
        let err = run(
            &action(transport.clone(), Arc::new(RecordingNavigator::new())),
            ActionSpec::PurchaseAuthenticated {
                purchase_auth_config: None,
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.kind(), "ConfigurationError");
        assert!(transport.requests().is_empty());
    }
}
