//! Run-scoped state and the view each action handler receives.

use serde_json::Value;
use uuid::Uuid;

use super::SubmissionPayload;
use crate::config::{FormDefinition, PipelineConfig, SubmitAction};
use crate::template::TemplateContext;

/// Outputs accumulated across the steps of one run.
///
/// Owned by the runner and never persisted. Steps run sequentially, so a
/// step always sees everything written by the steps before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    run_id: Uuid,
    /// Id assigned by the persistence collaborator.
    pub submission_id: Option<i64>,
    /// Id of the completed purchase.
    pub purchase_transaction_id: Option<String>,
    /// URL this run navigated to, if any.
    pub navigated_to: Option<String>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    /// Creates an empty context with a fresh run id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_run_id(Uuid::new_v4())
    }

    /// Creates an empty context with the given run id.
    #[must_use]
    pub fn with_run_id(run_id: Uuid) -> Self {
        Self {
            run_id,
            submission_id: None,
            purchase_transaction_id: None,
            navigated_to: None,
        }
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Whether an earlier step has already navigated away.
    #[must_use]
    pub fn has_navigated(&self) -> bool {
        self.navigated_to.is_some()
    }

    /// Variables available to redirect URLs and webhook templates.
    ///
    /// Every answer is also exposed as a top-level variable; the fixed keys
    /// take precedence over answers with the same name.
    #[must_use]
    pub fn template_variables(&self, payload: &SubmissionPayload) -> TemplateContext {
        let mut vars = TemplateContext::new();

        for (name, value) in &payload.answers {
            vars.insert(name.clone(), value.clone());
        }

        vars.insert("formId".into(), Value::from(payload.form_id.clone()));
        vars.insert("version".into(), Value::from(payload.version));
        vars.insert("submittedAt".into(), Value::from(payload.submitted_at));
        vars.insert("answers".into(), Value::Object(payload.answers.clone()));
        vars.insert("meta".into(), Value::Object(payload.meta.clone()));

        let submission_id = self.submission_id.map_or(Value::Null, Value::from);
        vars.insert("submissionId".into(), submission_id.clone());
        vars.insert("formSubmissionId".into(), submission_id);

        if let Some(txn) = &self.purchase_transaction_id {
            vars.insert("purchaseTransactionId".into(), Value::from(txn.clone()));
            vars.insert("transactionId".into(), Value::from(txn.clone()));
        }

        vars
    }
}

/// Everything a handler may read while executing one step.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    /// The form being submitted.
    pub form: &'a FormDefinition,
    /// The form's submit pipeline.
    pub pipeline: &'a PipelineConfig,
    /// The action being executed.
    pub action: &'a SubmitAction,
    /// The submission.
    pub payload: &'a SubmissionPayload,
    /// Outputs of earlier steps.
    pub execution: &'a ExecutionContext,
}

impl StepContext<'_> {
    /// Shorthand for [`ExecutionContext::template_variables`].
    #[must_use]
    pub fn template_variables(&self) -> TemplateContext {
        self.execution.template_variables(self.payload)
    }
}
