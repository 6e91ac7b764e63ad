//! The `native_bridge` action.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use super::{ActionHandler, ActionOutput};
use crate::config::ActionKind;
use crate::context::StepContext;
use crate::errors::Result;
use crate::ports::{BridgeMessage, HostBridge};

/// Posts the submission to the first native bridge present in the host.
#[derive(Clone)]
pub struct NativeBridgeAction {
    bridges: Vec<Arc<dyn HostBridge>>,
}

impl NativeBridgeAction {
    /// Creates the action; bridges are tried in priority order.
    #[must_use]
    pub fn new(bridges: impl IntoIterator<Item = Arc<dyn HostBridge>>) -> Self {
        let mut bridges: Vec<_> = bridges.into_iter().collect();
        bridges.sort_by_key(|b| b.kind().priority());
        Self { bridges }
    }
}

impl fmt::Debug for NativeBridgeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeBridgeAction")
            .field(
                "bridges",
                &self.bridges.iter().map(|b| b.kind()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[async_trait]
impl ActionHandler for NativeBridgeAction {
    fn kind(&self) -> ActionKind {
        ActionKind::NativeBridge
    }

    async fn execute(&self, step: &StepContext<'_>) -> Result<ActionOutput> {
        let Some(bridge) = self.bridges.iter().find(|b| b.detect()) else {
            debug!("No native bridge detected");
            return Ok(ActionOutput::skip("no native bridge detected"));
        };

        let message = serde_json::to_string(&BridgeMessage::form_submit(step.payload))?;
        bridge.post_message(&message)?;

        info!(bridge = %bridge.kind(), "Posted submission to native bridge");
        Ok(ActionOutput::completed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActionSpec, FormDefinition, PipelineConfig, SubmitAction};
    use crate::context::{ExecutionContext, SubmissionPayload};
    use crate::errors::SubmitflowError;
    use crate::ports::{BridgeKind, MockHostBridge};
    use mockall::predicate::function;

    fn bridge(kind: BridgeKind, present: bool) -> MockHostBridge {
        let mut mock = MockHostBridge::new();
        mock.expect_kind().return_const(kind);
        mock.expect_detect().return_const(present);
        mock
    }

    async fn run(action: &NativeBridgeAction) -> Result<ActionOutput> {
        let form = FormDefinition::new("booking", 1);
        let pipeline = PipelineConfig::new();
        let spec = SubmitAction::enabled(ActionSpec::NativeBridge);
        let payload = SubmissionPayload::new("booking", 1).with_answer("name", "Sara");
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
    async fn test_posts_to_highest_priority_present_bridge() {
        let mut webkit = bridge(BridgeKind::WebKit, true);
        webkit
            .expect_post_message()
            .with(function(|msg: &str| {
                let value: serde_json::Value = serde_json::from_str(msg).unwrap();
                value["type"] == "form_submit" && value["payload"]["answers"]["name"] == "Sara"
            }))
            .times(1)
            .returning(|_| Ok(()));

        let mut android = bridge(BridgeKind::Android, true);
        android.expect_post_message().never();

        let mut react_native = bridge(BridgeKind::ReactNativeWebView, false);
        react_native.expect_post_message().never();

        let action = NativeBridgeAction::new([
            Arc::new(android) as Arc<dyn HostBridge>,
            Arc::new(webkit),
            Arc::new(react_native),
        ]);

        let output = run(&action).await.unwrap();
        assert!(!output.is_skipped());
    }

    #[tokio::test]
    async fn test_no_bridge_is_a_no_op() {
        let action = NativeBridgeAction::new([
            Arc::new(bridge(BridgeKind::Android, false)) as Arc<dyn HostBridge>,
        ]);
        assert!(run(&action).await.unwrap().is_skipped());
    }

    #[tokio::test]
    async fn test_send_failure_is_an_error() {
        let mut webkit = bridge(BridgeKind::WebKit, true);
        webkit
            .expect_post_message()
            .returning(|_| Err(SubmitflowError::Bridge("handler missing".into())));

        let action = NativeBridgeAction::new([Arc::new(webkit) as Arc<dyn HostBridge>]);
        let err = run(&action).await.unwrap_err();
        assert_eq!(err.kind(), "BridgeError");
    }
}
