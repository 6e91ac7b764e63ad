//! The submit pipeline runner.
//!
//! ```text
//! Idle ─► Running(0) ─► Running(1) ─► … ─► Completed
//!              │  step fails
//!              ├─ continue   ─► record, next step
//!              ├─ show_error ─► alert, record, next step
//!              └─ stop       ─► Aborted (error returned)
//! ```

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::failures::FailureRecord;
use super::ordering::execution_order;
use super::timeout::TimeoutGuard;
use crate::actions::{ActionHandlers, ActionOutput};
use crate::config::{ActionKind, FormDefinition, OnError, PipelineConfig, SubmitflowSettings};
use crate::context::{ExecutionContext, StepContext, SubmissionPayload};
use crate::errors::{Result, SubmitflowError};
use crate::events::{EventSink, NoOpEventSink, PipelineEvent};
use crate::ports::{AlertSink, TracingAlertSink};

/// What a run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutcome {
    /// The run id.
    pub run_id: Uuid,
    /// Id assigned by persistence.
    pub submission_id: Option<i64>,
    /// Id of the completed purchase.
    pub purchase_transaction_id: Option<String>,
    /// URL the run navigated to.
    pub navigated_to: Option<String>,
    /// Actions that ran to completion, in order.
    pub completed: Vec<ActionKind>,
    /// Actions that were skipped, in order.
    pub skipped: Vec<ActionKind>,
    /// Failures tolerated under `continue` or `show_error`.
    pub failures: Vec<FailureRecord>,
}

impl PipelineOutcome {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            submission_id: None,
            purchase_transaction_id: None,
            navigated_to: None,
            completed: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn finish(mut self, execution: ExecutionContext) -> Self {
        self.submission_id = execution.submission_id;
        self.purchase_transaction_id = execution.purchase_transaction_id;
        self.navigated_to = execution.navigated_to;
        self
    }

    /// Returns true if no step failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs a form's submit pipeline.
///
/// Steps run strictly one after another. Each step sees the outputs of every
/// step before it through the shared [`ExecutionContext`].
#[derive(Clone)]
pub struct PipelineRunner {
    handlers: ActionHandlers,
    events: Arc<dyn EventSink>,
    alerts: Arc<dyn AlertSink>,
    alert_message: String,
}

impl fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("handlers", &self.handlers.registered())
            .field("alert_message", &self.alert_message)
            .finish_non_exhaustive()
    }
}

impl PipelineRunner {
    /// Creates a runner with no event sink and a logging alert sink.
    #[must_use]
    pub fn new(handlers: ActionHandlers) -> Self {
        Self {
            handlers,
            events: Arc::new(NoOpEventSink),
            alerts: Arc::new(TracingAlertSink),
            alert_message: SubmitflowSettings::default().default_alert_message,
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Sets the alert sink used by the `show_error` policy.
    #[must_use]
    pub fn with_alert_sink(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    /// Sets the alert text for failures without field-level errors.
    #[must_use]
    pub fn with_alert_message(mut self, message: impl Into<String>) -> Self {
        self.alert_message = message.into();
        self
    }

    /// The registered handlers.
    #[must_use]
    pub fn handlers(&self) -> &ActionHandlers {
        &self.handlers
    }

    /// Runs the form's pipeline for one submission.
    ///
    /// A form without a `submit` block resolves to an empty outcome. Under
    /// the `stop` policy the first failing step's error is returned.
    pub async fn run(
        &self,
        form: &FormDefinition,
        payload: &SubmissionPayload,
    ) -> Result<PipelineOutcome> {
        self.run_with_context(form, payload, ExecutionContext::new())
            .await
    }

    /// Like [`run`](Self::run), starting from an existing context.
    pub async fn run_with_context(
        &self,
        form: &FormDefinition,
        payload: &SubmissionPayload,
        execution: ExecutionContext,
    ) -> Result<PipelineOutcome> {
        let span = info_span!(
            "submit_pipeline",
            run_id = %execution.run_id(),
            form_id = %payload.form_id,
        );

        match &form.submit {
            Some(pipeline) => {
                self.execute(form, pipeline, payload, execution)
                    .instrument(span)
                    .await
            }
            None => {
                span.in_scope(|| debug!("Form has no submit pipeline"));
                Ok(PipelineOutcome::new(execution.run_id()))
            }
        }
    }

    async fn execute(
        &self,
        form: &FormDefinition,
        pipeline: &PipelineConfig,
        payload: &SubmissionPayload,
        mut execution: ExecutionContext,
    ) -> Result<PipelineOutcome> {
        if let Err(err) = pipeline.validate() {
            warn!(error = %err, "Rejected invalid submit pipeline");
            return Err(err);
        }

        let run_id = execution.run_id();
        let order = execution_order(pipeline);
        let guard = TimeoutGuard::new(pipeline.step_timeout());
        let mut outcome = PipelineOutcome::new(run_id);
        let start = Instant::now();

        info!(actions = order.len(), on_error = ?pipeline.on_error, "Submit pipeline started");
        self.emit(
            PipelineEvent::PipelineStarted,
            json!({
                "run_id": run_id,
                "form_id": payload.form_id,
                "actions": order.iter().map(|k| k.as_str()).collect::<Vec<_>>(),
            }),
        )
        .await;

        for kind in order {
            let (Some(action), Some(handler)) =
                (pipeline.enabled_action(kind), self.handlers.get(kind))
            else {
                debug!(action = %kind, "No handler registered");
                self.emit(
                    PipelineEvent::ActionSkipped,
                    json!({"action": kind, "reason": "no handler registered"}),
                )
                .await;
                outcome.skipped.push(kind);
                continue;
            };

            self.emit(PipelineEvent::ActionStarted, json!({"action": kind}))
                .await;
            let step_start = Instant::now();

            let result = {
                let step = StepContext {
                    form,
                    pipeline,
                    action,
                    payload,
                    execution: &execution,
                };
                guard.guard(kind.as_str(), handler.execute(&step)).await
            };
            let duration_ms = step_start.elapsed().as_secs_f64() * 1000.0;

            match result {
                Ok(output) => {
                    let skipped = output.is_skipped();
                    let reason = output.skip_reason.clone();
                    merge(&mut execution, output);

                    if skipped {
                        debug!(action = %kind, reason = ?reason, "Action skipped");
                        self.emit(
                            PipelineEvent::ActionSkipped,
                            json!({"action": kind, "reason": reason}),
                        )
                        .await;
                        outcome.skipped.push(kind);
                    } else {
                        debug!(action = %kind, duration_ms, "Action completed");
                        self.emit(
                            PipelineEvent::ActionCompleted,
                            json!({"action": kind, "duration_ms": duration_ms}),
                        )
                        .await;
                        outcome.completed.push(kind);
                    }
                }
                Err(err) => {
                    warn!(action = %kind, error = %err, policy = ?pipeline.on_error, "Action failed");
                    self.emit(
                        PipelineEvent::ActionFailed,
                        json!({
                            "action": kind,
                            "error": err.to_string(),
                            "error_kind": err.kind(),
                            "duration_ms": duration_ms,
                        }),
                    )
                    .await;

                    match pipeline.on_error {
                        OnError::Stop => {
                            self.emit(
                                PipelineEvent::PipelineAborted,
                                json!({"run_id": run_id, "action": kind, "error": err.to_string()}),
                            )
                            .await;
                            return Err(err);
                        }
                        OnError::ShowError => {
                            self.raise_alert(kind, &err);
                            outcome.failures.push(FailureRecord::from_error(kind, &err));
                        }
                        OnError::Continue => {
                            outcome.failures.push(FailureRecord::from_error(kind, &err));
                        }
                    }
                }
            }
        }

        let outcome = outcome.finish(execution);
        info!(
            completed = outcome.completed.len(),
            skipped = outcome.skipped.len(),
            failed = outcome.failures.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Submit pipeline completed"
        );
        self.emit(
            PipelineEvent::PipelineCompleted,
            json!({
                "run_id": run_id,
                "submission_id": outcome.submission_id,
                "completed": outcome.completed,
                "failures": outcome.failures.len(),
            }),
        )
        .await;

        Ok(outcome)
    }

    /// Alerts the user. Server validation errors are passed through so the
    /// host can show them next to the inputs.
    fn raise_alert(&self, kind: ActionKind, err: &SubmitflowError) {
        match err {
            SubmitflowError::Http {
                message, errors, ..
            } if kind == ActionKind::ServerPersist && !errors.is_empty() => {
                self.alerts.alert(message, errors);
            }
            _ => self.alerts.alert(&self.alert_message, &[]),
        }
    }

    async fn emit(&self, event: PipelineEvent, data: serde_json::Value) {
        self.events.emit(event.as_str(), Some(data)).await;
    }
}

/// Folds a step's outputs into the run context. Later writes win.
fn merge(execution: &mut ExecutionContext, output: ActionOutput) {
    if let Some(id) = output.submission_id {
        execution.submission_id = Some(id);
    }
    if let Some(txn) = output.purchase_transaction_id {
        execution.purchase_transaction_id = Some(txn);
    }
    if let Some(url) = output.navigated_to {
        execution.navigated_to = Some(url);
    }
}
