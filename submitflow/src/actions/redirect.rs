//! The `redirect` action.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use super::{ActionHandler, ActionOutput};
use crate::config::{ActionKind, ActionSpec};
use crate::context::StepContext;
use crate::errors::Result;
use crate::ports::Navigator;
use crate::template::encode_url;

/// Navigates to the configured URL with its placeholders rendered.
#[derive(Clone)]
pub struct RedirectAction {
    navigator: Arc<dyn Navigator>,
}

impl RedirectAction {
    /// Creates the action.
    #[must_use]
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self { navigator }
    }
}

impl fmt::Debug for RedirectAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectAction").finish_non_exhaustive()
    }
}

fn is_navigable(url: &str) -> bool {
    url.starts_with('/') || Url::parse(url).is_ok()
}

#[async_trait]
impl ActionHandler for RedirectAction {
    fn kind(&self) -> ActionKind {
        ActionKind::Redirect
    }

    async fn execute(&self, step: &StepContext<'_>) -> Result<ActionOutput> {
        let raw = match &step.action.spec {
            ActionSpec::Redirect { url: Some(url) } if !url.trim().is_empty() => url,
            _ => return Ok(ActionOutput::skip("no redirect url configured")),
        };

        // A payment page opened by an earlier step must not be replaced.
        if let Some(current) = &step.execution.navigated_to {
            info!(navigated_to = %current, "Skipping redirect, navigation already in progress");
            return Ok(ActionOutput::skip("navigation already in progress"));
        }

        let rendered = encode_url(raw, &step.template_variables());
        let target = if is_navigable(&rendered) {
            rendered
        } else {
            warn!(rendered = %rendered, "Rendered redirect URL is invalid, using raw URL");
            raw.clone()
        };

        self.navigator.navigate(&target)?;
        info!(url = %target, "Redirecting");
        Ok(ActionOutput::completed().with_navigation(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FormDefinition, PipelineConfig, SubmitAction};
    use crate::context::{ExecutionContext, SubmissionPayload};
    use crate::ports::MockNavigator;
    use mockall::predicate::eq;

    async fn run(
        navigator: MockNavigator,
        url: Option<&str>,
        execution: &ExecutionContext,
    ) -> Result<ActionOutput> {
        let action = RedirectAction::new(Arc::new(navigator));
        let form = FormDefinition::new("booking", 1);
        let pipeline = PipelineConfig::new();
        let spec = SubmitAction::enabled(ActionSpec::Redirect {
            url: url.map(str::to_string),
        });
        let payload = SubmissionPayload::new("booking", 1).with_answer("city", "Kuwait City");
        let step = StepContext {
            form: &form,
            pipeline: &pipeline,
            action: &spec,
            payload: &payload,
            execution,
        };
        action.execute(&step).await
    }

    #[tokio::test]
    async fn test_redirect_reads_submission_id_from_context() {
        let mut navigator = MockNavigator::new();
        navigator
            .expect_navigate()
            .with(eq("/ar/listing/booking?categoryId=1100&formSubmissionId=29"))
            .times(1)
            .returning(|_| Ok(()));

        let mut execution = ExecutionContext::new();
        execution.submission_id = Some(29);

        let output = run(
            navigator,
            Some("/ar/listing/booking?categoryId=1100&formSubmissionId={{.formSubmissionId}}"),
            &execution,
        )
        .await
        .unwrap();
        assert_eq!(
            output.navigated_to.as_deref(),
            Some("/ar/listing/booking?categoryId=1100&formSubmissionId=29")
        );
    }

    #[tokio::test]
    async fn test_answers_are_top_level_variables() {
        let mut navigator = MockNavigator::new();
        navigator
            .expect_navigate()
            .with(eq("https://example.com/thanks?city=Kuwait+City"))
            .times(1)
            .returning(|_| Ok(()));

        run(
            navigator,
            Some("https://example.com/thanks?city={{.city}}"),
            &ExecutionContext::new(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_missing_url_is_a_no_op() {
        let mut navigator = MockNavigator::new();
        navigator.expect_navigate().never();

        let output = run(navigator, None, &ExecutionContext::new()).await.unwrap();
        assert!(output.is_skipped());
    }

    #[tokio::test]
    async fn test_skipped_after_payment_navigation() {
        let mut navigator = MockNavigator::new();
        navigator.expect_navigate().never();

        let mut execution = ExecutionContext::new();
        execution.navigated_to = Some("https://pay.example/link".into());

        let output = run(navigator, Some("/thanks"), &execution).await.unwrap();
        assert_eq!(
            output.skip_reason.as_deref(),
            Some("navigation already in progress")
        );
    }

    #[tokio::test]
    async fn test_unparseable_result_falls_back_to_raw() {
        let mut navigator = MockNavigator::new();
        navigator
            .expect_navigate()
            .with(eq("thanks?id={{.submissionId}}"))
            .times(1)
            .returning(|_| Ok(()));

        run(navigator, Some("thanks?id={{.submissionId}}"), &ExecutionContext::new())
            .await
            .unwrap();
    }
}
