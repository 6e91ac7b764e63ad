//! End-to-end runs of the submit pipeline.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::actions::{ActionHandlers, ActionOutput, ForwardEndpointCache};
use crate::config::{
    ActionKind, ActionSpec, OnError, PipelineConfig, SubmitAction, SubmitflowSettings,
    WebhookTarget,
};
use crate::errors::{FieldError, SubmitflowError};
use crate::events::CollectingEventSink;
use crate::pipeline::{PipelineBuilder, PipelineRunner};
use crate::ports::InMemoryTokenStore;
use crate::testing::{
    purchase_action, redirect_action, sample_form, sample_form_with, sample_payload,
    sample_purchase_config, CallLog, MockAction, RecordingAlertSink, RecordingNavigator,
    ScriptedLoginPrompt, ScriptedTransport,
};

const API: &str = "https://forms.example/api";

fn spec_for(kind: ActionKind) -> ActionSpec {
    match kind {
        ActionKind::NativeBridge => ActionSpec::NativeBridge,
        ActionKind::ServerPersist => ActionSpec::ServerPersist,
        ActionKind::Webhooks => ActionSpec::Webhooks,
        ActionKind::Redirect => ActionSpec::Redirect { url: None },
        ActionKind::NextjsPost => ActionSpec::NextjsPost,
        ActionKind::PurchaseAuthenticated => ActionSpec::PurchaseAuthenticated {
            purchase_auth_config: Some(sample_purchase_config()),
        },
    }
}

/// Every listed kind enabled, in the listed order.
fn pipeline(kinds: &[ActionKind]) -> PipelineConfig {
    kinds
        .iter()
        .fold(PipelineConfig::new(), |config, kind| {
            config.with_action(SubmitAction::enabled(spec_for(*kind)))
        })
        .with_ordering(kinds.iter().copied())
}

fn runner(mocks: &[&Arc<MockAction>]) -> PipelineRunner {
    let handlers = mocks
        .iter()
        .fold(ActionHandlers::new(), |handlers, mock| {
            handlers.with_handler((*mock).clone())
        });
    PipelineRunner::new(handlers)
}

fn logged(kind: ActionKind, log: &CallLog) -> Arc<MockAction> {
    Arc::new(MockAction::new(kind).with_log(log))
}

struct Wired {
    transport: Arc<ScriptedTransport>,
    navigator: Arc<RecordingNavigator>,
    prompt: Arc<ScriptedLoginPrompt>,
    runner: PipelineRunner,
}

fn wired(prompt: ScriptedLoginPrompt, tokens: InMemoryTokenStore) -> Wired {
    let transport = Arc::new(ScriptedTransport::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let prompt = Arc::new(prompt);
    let runner = PipelineBuilder::new(SubmitflowSettings::new().with_api_base_url(API))
        .transport(transport.clone())
        .navigator(navigator.clone())
        .login_prompt(prompt.clone())
        .token_store(Arc::new(tokens))
        .build()
        .unwrap();
    Wired {
        transport,
        navigator,
        prompt,
        runner,
    }
}

#[tokio::test]
async fn test_actions_run_in_declared_order() {
    let log = CallLog::new();
    let bridge = logged(ActionKind::NativeBridge, &log);
    let persist = logged(ActionKind::ServerPersist, &log);
    let redirect = logged(ActionKind::Redirect, &log);

    let form = sample_form_with(pipeline(&[
        ActionKind::Redirect,
        ActionKind::ServerPersist,
        ActionKind::NativeBridge,
    ]));
    let outcome = runner(&[&bridge, &persist, &redirect])
        .run(&form, &sample_payload())
        .await
        .unwrap();

    assert_eq!(
        log.entries(),
        vec![ActionKind::Redirect, ActionKind::ServerPersist, ActionKind::NativeBridge]
    );
    assert_eq!(outcome.completed, log.entries());
    assert!(outcome.is_clean());
}

#[tokio::test]
async fn test_form_without_submit_block_is_a_no_op() {
    let persist = Arc::new(MockAction::new(ActionKind::ServerPersist));
    let outcome = runner(&[&persist])
        .run(&sample_form(), &sample_payload())
        .await
        .unwrap();

    assert_eq!(persist.call_count(), 0);
    assert!(outcome.completed.is_empty());
    assert!(outcome.submission_id.is_none());
}

#[tokio::test]
async fn test_duplicate_action_types_are_rejected_before_any_step() {
    let persist = Arc::new(MockAction::new(ActionKind::ServerPersist));
    let events = Arc::new(CollectingEventSink::new());

    let pipeline = PipelineConfig::new()
        .with_action(SubmitAction::enabled(ActionSpec::ServerPersist))
        .with_action(SubmitAction::disabled(ActionSpec::ServerPersist))
        .with_ordering([ActionKind::ServerPersist]);
    let err = runner(&[&persist])
        .with_event_sink(events.clone())
        .run(&sample_form_with(pipeline), &sample_payload())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "ConfigurationError");
    assert_eq!(persist.call_count(), 0);
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_continue_policy_records_and_proceeds() {
    let log = CallLog::new();
    let persist = Arc::new(
        MockAction::new(ActionKind::ServerPersist)
            .with_log(&log)
            .failing(|| SubmitflowError::http(500, "database unavailable")),
    );
    let redirect = logged(ActionKind::Redirect, &log);

    let form = sample_form_with(
        pipeline(&[ActionKind::ServerPersist, ActionKind::Redirect]).with_on_error(OnError::Continue),
    );
    let outcome = runner(&[&persist, &redirect])
        .run(&form, &sample_payload())
        .await
        .unwrap();

    assert_eq!(log.entries(), vec![ActionKind::ServerPersist, ActionKind::Redirect]);
    assert_eq!(outcome.completed, vec![ActionKind::Redirect]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].action, ActionKind::ServerPersist);
    assert_eq!(outcome.failures[0].error_kind, "HttpError");
    assert_eq!(outcome.failures[0].status, Some(500));
}

#[tokio::test]
async fn test_stop_policy_aborts_with_step_error() {
    let bridge = Arc::new(
        MockAction::new(ActionKind::NativeBridge)
            .failing(|| SubmitflowError::Bridge("channel closed".into())),
    );
    let persist = Arc::new(MockAction::new(ActionKind::ServerPersist));
    let events = Arc::new(CollectingEventSink::new());

    let form = sample_form_with(
        pipeline(&[ActionKind::NativeBridge, ActionKind::ServerPersist]).with_on_error(OnError::Stop),
    );
    let err = runner(&[&bridge, &persist])
        .with_event_sink(events.clone())
        .run(&form, &sample_payload())
        .await
        .unwrap_err();

    assert!(matches!(err, SubmitflowError::Bridge(_)));
    assert_eq!(persist.call_count(), 0);
    assert_eq!(events.events_of_type("pipeline.aborted").len(), 1);
    assert!(events.events_of_type("pipeline.completed").is_empty());
}

#[tokio::test]
async fn test_show_error_alerts_and_continues() {
    let persist = Arc::new(MockAction::new(ActionKind::ServerPersist).failing(|| {
        SubmitflowError::Http {
            status: 422,
            message: "Validation failed".into(),
            errors: vec![FieldError::new("phone", "invalid", "Phone is invalid")],
        }
    }));
    let webhooks = Arc::new(
        MockAction::new(ActionKind::Webhooks).failing(|| SubmitflowError::Network("reset".into())),
    );
    let redirect = Arc::new(MockAction::new(ActionKind::Redirect));
    let alerts = Arc::new(RecordingAlertSink::new());

    let form = sample_form_with(
        pipeline(&[ActionKind::ServerPersist, ActionKind::Webhooks, ActionKind::Redirect])
            .with_on_error(OnError::ShowError),
    );
    let outcome = runner(&[&persist, &webhooks, &redirect])
        .with_alert_sink(alerts.clone())
        .run(&form, &sample_payload())
        .await
        .unwrap();

    let raised = alerts.alerts();
    assert_eq!(raised.len(), 2);
    assert_eq!(raised[0].0, "Validation failed");
    assert_eq!(raised[0].1[0].field, "phone");
    assert_eq!(raised[1].0, "Submit step failed");
    assert!(raised[1].1.is_empty());

    assert_eq!(redirect.call_count(), 1);
    assert_eq!(outcome.failures.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_step_times_out_and_run_continues() {
    let persist = Arc::new(
        MockAction::new(ActionKind::ServerPersist)
            .with_delay(Duration::from_millis(200))
            .returning(ActionOutput::completed().with_submission_id(1)),
    );
    let redirect = Arc::new(MockAction::new(ActionKind::Redirect));

    let form = sample_form_with(
        pipeline(&[ActionKind::ServerPersist, ActionKind::Redirect]).with_timeout_ms(50),
    );
    let outcome = runner(&[&persist, &redirect])
        .run(&form, &sample_payload())
        .await
        .unwrap();

    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures[0].is_timeout());
    assert_eq!(outcome.failures[0].error, "Action 'server_persist' timed out after 50ms");
    // The abandoned step's output is never merged.
    assert!(outcome.submission_id.is_none());
    assert!(redirect.seen_contexts()[0].submission_id.is_none());
}

#[tokio::test]
async fn test_purchase_is_hoisted_before_declared_order() {
    let log = CallLog::new();
    let persist = logged(ActionKind::ServerPersist, &log);
    let purchase = logged(ActionKind::PurchaseAuthenticated, &log);

    let pipeline = PipelineConfig::new()
        .with_action(SubmitAction::enabled(ActionSpec::ServerPersist))
        .with_action(purchase_action(sample_purchase_config()))
        .with_ordering([ActionKind::ServerPersist]);
    runner(&[&persist, &purchase])
        .run(&sample_form_with(pipeline), &sample_payload())
        .await
        .unwrap();

    assert_eq!(
        log.entries(),
        vec![ActionKind::PurchaseAuthenticated, ActionKind::ServerPersist]
    );
}

#[tokio::test]
async fn test_missing_handler_is_skipped_with_event() {
    let events = Arc::new(CollectingEventSink::new());
    let form = sample_form_with(pipeline(&[ActionKind::NextjsPost]));

    let outcome = runner(&[])
        .with_event_sink(events.clone())
        .run(&form, &sample_payload())
        .await
        .unwrap();

    assert_eq!(outcome.skipped, vec![ActionKind::NextjsPost]);
    let skipped = events.events_of_type("action.skipped");
    assert_eq!(skipped[0].1.as_ref().unwrap()["reason"], "no handler registered");
}

#[tokio::test]
async fn test_event_sequence() {
    let persist = Arc::new(MockAction::new(ActionKind::ServerPersist));
    let webhooks = Arc::new(
        MockAction::new(ActionKind::Webhooks).returning(ActionOutput::skip("handled server-side")),
    );
    let events = Arc::new(CollectingEventSink::new());

    runner(&[&persist, &webhooks])
        .with_event_sink(events.clone())
        .run(
            &sample_form_with(pipeline(&[ActionKind::ServerPersist, ActionKind::Webhooks])),
            &sample_payload(),
        )
        .await
        .unwrap();

    assert_eq!(
        events.event_types(),
        vec![
            "pipeline.started",
            "action.started",
            "action.completed",
            "action.started",
            "action.skipped",
            "pipeline.completed",
        ]
    );
}

#[tokio::test]
async fn test_redirect_reads_submission_id_from_same_run() {
    let w = wired(ScriptedLoginPrompt::cancelling(), InMemoryTokenStore::new());
    w.transport.respond_json("/submissions", 201, json!({"id": 29}));

    let pipeline = PipelineConfig::new()
        .with_action(SubmitAction::enabled(ActionSpec::ServerPersist))
        .with_action(redirect_action("/thanks?id={{.submissionId}}&name={{.name}}"))
        .with_ordering([ActionKind::ServerPersist, ActionKind::Redirect]);
    let outcome = w
        .runner
        .run(&sample_form_with(pipeline), &sample_payload())
        .await
        .unwrap();

    assert_eq!(outcome.submission_id, Some(29));
    assert_eq!(w.navigator.urls(), vec!["/thanks?id=29&name=Sara+Ali".to_string()]);
    assert_eq!(outcome.navigated_to.as_deref(), Some("/thanks?id=29&name=Sara+Ali"));
}

#[tokio::test]
async fn test_login_cancellation_aborts_purchase_only() {
    let w = wired(ScriptedLoginPrompt::cancelling(), InMemoryTokenStore::new());
    w.transport.respond_json("/submissions", 201, json!({"id": 5}));

    let config = sample_purchase_config().with_authentication("https://id.example");
    let pipeline = PipelineConfig::new()
        .with_action(purchase_action(config))
        .with_action(SubmitAction::enabled(ActionSpec::ServerPersist))
        .with_ordering([ActionKind::ServerPersist]);
    let outcome = w
        .runner
        .run(&sample_form_with(pipeline), &sample_payload())
        .await
        .unwrap();

    assert_eq!(w.prompt.calls(), 1);
    assert_eq!(outcome.failures[0].error_kind, "LoginCancelled");
    assert!(w.transport.requests_to("/purchase").is_empty());
    assert_eq!(outcome.submission_id, Some(5));
}

#[tokio::test]
async fn test_invalid_token_logs_in_then_purchases_and_redirects() {
    let w = wired(
        ScriptedLoginPrompt::providing("+96550000000", "pw"),
        InMemoryTokenStore::with_token("stale"),
    );
    w.transport.respond_json("/auth/validate", 401, json!({"error": "expired"}));
    w.transport.respond_json("/auth/login", 200, json!({"token": "fresh"}));
    w.transport.respond_json("/purchase", 200, json!({"transactionId": "T-1"}));
    w.transport.respond_json("/submissions", 201, json!({"submissionId": "7"}));

    let config = sample_purchase_config().with_authentication("https://id.example");
    let pipeline = PipelineConfig::new()
        .with_action(purchase_action(config))
        .with_action(SubmitAction::enabled(ActionSpec::ServerPersist))
        .with_action(redirect_action(
            "https://shop.example/done?txn={{.transactionId}}&sid={{.submissionId}}",
        ))
        .with_ordering([ActionKind::ServerPersist, ActionKind::Redirect]);
    let outcome = w
        .runner
        .run(&sample_form_with(pipeline), &sample_payload())
        .await
        .unwrap();

    assert!(outcome.is_clean());
    assert_eq!(w.prompt.calls(), 1);
    assert_eq!(outcome.purchase_transaction_id.as_deref(), Some("T-1"));
    assert_eq!(
        w.navigator.urls(),
        vec!["https://shop.example/done?txn=T-1&sid=7".to_string()]
    );

    let purchases = w.transport.requests_to("/purchase");
    let purchase = &purchases[0];
    let body = purchase.body.as_ref().unwrap();
    assert_eq!(body["auth_token"], "fresh");
    assert_eq!(body["adv_id"], "4411");
    assert_eq!(body["items"][0]["id"], "sticky_5_days");
}

#[tokio::test(start_paused = true)]
async fn test_payment_link_blocks_later_redirect() {
    let w = wired(ScriptedLoginPrompt::cancelling(), InMemoryTokenStore::new());
    w.transport.respond_json(
        "/purchase",
        200,
        json!({"transactionId": "T-2", "paymentLink": "https://pay.example/T-2"}),
    );
    w.transport.respond_json("/submissions", 201, json!({"id": 8}));
    w.transport.fail("hooks.example", "connection refused");

    let config =
        sample_purchase_config().with_webhook(WebhookTarget::new("https://hooks.example/paid"));
    let pipeline = PipelineConfig::new()
        .with_action(purchase_action(config))
        .with_action(SubmitAction::enabled(ActionSpec::ServerPersist))
        .with_action(redirect_action("/thanks"))
        .with_ordering([ActionKind::ServerPersist, ActionKind::Redirect]);
    let outcome = w
        .runner
        .run(&sample_form_with(pipeline), &sample_payload())
        .await
        .unwrap();

    assert!(outcome.is_clean());
    assert_eq!(outcome.submission_id, Some(8));
    assert_eq!(outcome.skipped, vec![ActionKind::Redirect]);
    assert_eq!(w.navigator.urls(), vec!["https://pay.example/T-2".to_string()]);

    // Webhooks are delivered off the pipeline; let the fan-out task finish.
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(w.transport.requests_to("hooks.example").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_purchase_webhook_does_not_fail_purchase_step() {
    let w = wired(ScriptedLoginPrompt::cancelling(), InMemoryTokenStore::new());
    w.transport.respond_json(
        "/purchase",
        200,
        json!({"transactionId": "T-9", "paymentLink": "https://pay.example/T-9"}),
    );
    w.transport.respond_json("hooks.example", 200, json!({}));
    w.transport.delay("hooks.example", Duration::from_millis(500));

    let config =
        sample_purchase_config().with_webhook(WebhookTarget::new("https://hooks.example/paid"));
    let pipeline = PipelineConfig::new()
        .with_action(purchase_action(config))
        .with_action(redirect_action("/thanks"))
        .with_ordering([ActionKind::Redirect])
        .with_timeout_ms(50);
    let outcome = w
        .runner
        .run(&sample_form_with(pipeline), &sample_payload())
        .await
        .unwrap();

    assert!(outcome.is_clean());
    assert_eq!(outcome.completed, vec![ActionKind::PurchaseAuthenticated]);
    assert_eq!(outcome.purchase_transaction_id.as_deref(), Some("T-9"));
    assert_eq!(outcome.navigated_to.as_deref(), Some("https://pay.example/T-9"));
    assert_eq!(outcome.skipped, vec![ActionKind::Redirect]);
    assert_eq!(w.navigator.urls(), vec!["https://pay.example/T-9".to_string()]);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(w.transport.requests_to("hooks.example").len(), 1);
}

#[tokio::test]
async fn test_forward_config_fetched_once_across_runs() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond_json(
        "/config",
        200,
        json!({"nextjsPost": {"enabled": true, "url": "https://site.example/lead"}}),
    );
    transport.respond_json("/lead", 200, json!({"ok": true}));

    let cache = Arc::new(ForwardEndpointCache::new());
    let build = || {
        PipelineBuilder::new(SubmitflowSettings::new().with_api_base_url(API))
            .transport(transport.clone())
            .forward_cache(cache.clone())
            .build()
            .unwrap()
    };
    let form = sample_form_with(pipeline(&[ActionKind::NextjsPost]));

    build().run(&form, &sample_payload()).await.unwrap();
    build().run(&form, &sample_payload()).await.unwrap();

    assert_eq!(transport.requests_to("/config").len(), 1);
    let posts = transport.requests_to("/lead");
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].body.as_ref().unwrap()["answers"][0]["question"], "Full name");
}
