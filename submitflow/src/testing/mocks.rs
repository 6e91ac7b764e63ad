//! Test doubles for the transport, the host ports and action handlers.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::actions::{ActionHandler, ActionOutput};
use crate::config::ActionKind;
use crate::context::{ExecutionContext, StepContext};
use crate::errors::{FieldError, Result, SubmitflowError};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::ports::{
    AlertSink, BridgeKind, Credentials, CredentialsPrompt, HostBridge, LoginPrompt, Navigator,
    PurchaseObserver,
};

#[derive(Debug, Clone)]
enum Scripted {
    Respond(HttpResponse),
    Fail(String),
}

#[derive(Debug)]
struct Route {
    pattern: String,
    replies: VecDeque<Scripted>,
    delay: Option<Duration>,
}

/// A transport that answers from a script and records every request.
///
/// Routes match when the request URL contains the pattern; the first
/// registered match wins. Replies for a route are consumed in order and the
/// last one repeats. Unmatched requests get a 404.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    /// Creates a transport with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, pattern: &str, reply: Scripted) {
        let mut routes = self.routes.lock();
        match routes.iter_mut().find(|r| r.pattern == pattern) {
            Some(route) => route.replies.push_back(reply),
            None => routes.push(Route {
                pattern: pattern.to_string(),
                replies: VecDeque::from([reply]),
                delay: None,
            }),
        }
    }

    /// Queues a response for URLs containing `pattern`.
    pub fn respond(&self, pattern: &str, response: HttpResponse) {
        self.push(pattern, Scripted::Respond(response));
    }

    /// Queues a JSON response.
    pub fn respond_json(&self, pattern: &str, status: u16, body: serde_json::Value) {
        self.respond(pattern, HttpResponse::json_body(status, &body));
    }

    /// Queues a plain-text response.
    pub fn respond_text(&self, pattern: &str, status: u16, body: &str) {
        self.respond(pattern, HttpResponse::new(status, body));
    }

    /// Queues a transport failure.
    pub fn fail(&self, pattern: &str, message: &str) {
        self.push(pattern, Scripted::Fail(message.to_string()));
    }

    /// Delays every reply on an already scripted route.
    pub fn delay(&self, pattern: &str, delay: Duration) {
        if let Some(route) = self.routes.lock().iter_mut().find(|r| r.pattern == pattern) {
            route.delay = Some(delay);
        }
    }

    /// Every request sent so far.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Requests whose URL contains `pattern`.
    #[must_use]
    pub fn requests_to(&self, pattern: &str) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.url.contains(pattern))
            .cloned()
            .collect()
    }

    fn next_reply(&self, url: &str) -> (Option<Scripted>, Option<Duration>) {
        let mut routes = self.routes.lock();
        let Some(route) = routes.iter_mut().find(|r| url.contains(&r.pattern)) else {
            return (None, None);
        };
        let reply = if route.replies.len() > 1 {
            route.replies.pop_front()
        } else {
            route.replies.front().cloned()
        };
        (reply, route.delay)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let (reply, delay) = self.next_reply(&request.url);
        self.requests.lock().push(request);

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Some(Scripted::Respond(response)) => Ok(response),
            Some(Scripted::Fail(message)) => Err(SubmitflowError::Network(message)),
            None => Ok(HttpResponse::new(404, "")),
        }
    }
}

/// Navigator that records target URLs.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    urls: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingNavigator {
    /// Creates a navigator that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a navigator whose every navigation fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// URLs navigated to, in order.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) -> Result<()> {
        if self.fail {
            return Err(SubmitflowError::Bridge("navigation blocked".to_string()));
        }
        self.urls.lock().push(url.to_string());
        Ok(())
    }
}

/// Alert sink that records alerts.
#[derive(Debug, Default)]
pub struct RecordingAlertSink {
    alerts: Mutex<Vec<(String, Vec<FieldError>)>>,
}

impl RecordingAlertSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raised alerts with their field errors.
    #[must_use]
    pub fn alerts(&self) -> Vec<(String, Vec<FieldError>)> {
        self.alerts.lock().clone()
    }

    /// Messages of the raised alerts.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.alerts.lock().iter().map(|(m, _)| m.clone()).collect()
    }
}

impl AlertSink for RecordingAlertSink {
    fn alert(&self, message: &str, field_errors: &[FieldError]) {
        self.alerts
            .lock()
            .push((message.to_string(), field_errors.to_vec()));
    }
}

/// Host bridge that records posted messages.
#[derive(Debug)]
pub struct RecordingBridge {
    kind: BridgeKind,
    detected: bool,
    failure: Option<String>,
    messages: Mutex<Vec<String>>,
}

impl RecordingBridge {
    /// Creates a detected bridge.
    #[must_use]
    pub fn new(kind: BridgeKind) -> Self {
        Self {
            kind,
            detected: true,
            failure: None,
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Creates a bridge that is not present.
    #[must_use]
    pub fn absent(kind: BridgeKind) -> Self {
        Self {
            detected: false,
            ..Self::new(kind)
        }
    }

    /// Creates a detected bridge whose sends fail.
    #[must_use]
    pub fn failing(kind: BridgeKind, message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(kind)
        }
    }

    /// Raw messages posted so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl HostBridge for RecordingBridge {
    fn kind(&self) -> BridgeKind {
        self.kind
    }

    fn detect(&self) -> bool {
        self.detected
    }

    fn post_message(&self, message: &str) -> Result<()> {
        if let Some(failure) = &self.failure {
            return Err(SubmitflowError::Bridge(failure.clone()));
        }
        self.messages.lock().push(message.to_string());
        Ok(())
    }
}

/// Login prompt with a fixed answer.
#[derive(Debug)]
pub struct ScriptedLoginPrompt {
    answer: CredentialsPrompt,
    calls: Mutex<usize>,
}

impl ScriptedLoginPrompt {
    /// A prompt where the user enters credentials.
    #[must_use]
    pub fn providing(phone: &str, password: &str) -> Self {
        Self {
            answer: CredentialsPrompt::Provided(Credentials::new(phone, password)),
            calls: Mutex::new(0),
        }
    }

    /// A prompt the user dismisses.
    #[must_use]
    pub fn cancelling() -> Self {
        Self {
            answer: CredentialsPrompt::Cancelled,
            calls: Mutex::new(0),
        }
    }

    /// Number of times the prompt was shown.
    #[must_use]
    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

#[async_trait]
impl LoginPrompt for ScriptedLoginPrompt {
    async fn request_credentials(&self) -> CredentialsPrompt {
        *self.calls.lock() += 1;
        self.answer.clone()
    }
}

/// Purchase observer that records callbacks.
#[derive(Debug, Default)]
pub struct RecordingPurchaseObserver {
    successes: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingPurchaseObserver {
    /// Creates an empty observer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Transaction ids reported as successful.
    #[must_use]
    pub fn successes(&self) -> Vec<String> {
        self.successes.lock().clone()
    }

    /// Display strings of reported errors.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }
}

impl PurchaseObserver for RecordingPurchaseObserver {
    fn on_purchase_success(&self, transaction_id: &str) {
        self.successes.lock().push(transaction_id.to_string());
    }

    fn on_purchase_error(&self, error: &SubmitflowError) {
        self.errors.lock().push(error.to_string());
    }
}

/// Shared record of the order in which mock actions ran.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<ActionKind>>>);

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, kind: ActionKind) {
        self.0.lock().push(kind);
    }

    /// Kinds in the order they were executed.
    #[must_use]
    pub fn entries(&self) -> Vec<ActionKind> {
        self.0.lock().clone()
    }
}

/// An action handler that records calls and returns a configurable result.
#[derive(Debug)]
pub struct MockAction {
    kind: ActionKind,
    output: Mutex<ActionOutput>,
    failure: Option<fn() -> SubmitflowError>,
    delay: Option<Duration>,
    log: Option<CallLog>,
    seen: Mutex<Vec<ExecutionContext>>,
}

impl MockAction {
    /// Creates a mock that completes with no outputs.
    #[must_use]
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            output: Mutex::new(ActionOutput::completed()),
            failure: None,
            delay: None,
            log: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Returns `output` on every call.
    #[must_use]
    pub fn returning(self, output: ActionOutput) -> Self {
        *self.output.lock() = output;
        self
    }

    /// Fails every call with the error `make` builds.
    #[must_use]
    pub fn failing(mut self, make: fn() -> SubmitflowError) -> Self {
        self.failure = Some(make);
        self
    }

    /// Sleeps before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Records each call in `log`.
    #[must_use]
    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = Some(log.clone());
        self
    }

    /// Number of times the action ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.seen.lock().len()
    }

    /// Execution context as seen by each call.
    #[must_use]
    pub fn seen_contexts(&self) -> Vec<ExecutionContext> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl ActionHandler for MockAction {
    fn kind(&self) -> ActionKind {
        self.kind
    }

    async fn execute(&self, step: &StepContext<'_>) -> Result<ActionOutput> {
        self.seen.lock().push(step.execution.clone());
        if let Some(log) = &self.log {
            log.record(self.kind);
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.failure {
            Some(make) => Err(make()),
            None => Ok(self.output.lock().clone()),
        }
    }
}
