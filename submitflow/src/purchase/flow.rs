//! The authenticated purchase sub-flow.
//!
//! ```text
//! CheckToken ─┬─ valid ─────────────────────┐
//!             └─ missing/invalid ─ NeedLogin ─ LoggedIn ─┴─ Purchasing ─┬─ Success
//!                                   └─ cancelled (abort)                 └─ Failed
//! ```

use futures::future::join_all;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

use super::identity::IdentityClient;
use super::placement::{resolve_item_id, unwrap_answer};
use crate::config::{join_url, PurchaseAuthConfig, WebhookTarget};
use crate::context::SubmissionPayload;
use crate::errors::{Result, SubmitflowError};
use crate::http::{HttpRequest, Method, Transport};
use crate::ports::{CredentialsPrompt, LoginPrompt, Navigator, PurchaseObserver, TokenStore};
use crate::template::{encode_url, TemplateContext};

/// What a successful purchase produced.
#[derive(Debug, Default)]
pub struct PurchaseReceipt {
    /// Transaction id reported by the purchase API.
    pub transaction_id: Option<String>,
    /// Payment page the user was sent to.
    pub navigated_to: Option<String>,
    /// Detached webhook fan-out, resolving to the number of webhooks
    /// delivered. Dropping the handle does not cancel delivery.
    pub webhooks: Option<JoinHandle<usize>>,
}

/// Inputs of one purchase.
#[derive(Debug, Clone, Copy)]
pub struct PurchaseRequest<'a> {
    /// Purchase configuration of the action.
    pub config: &'a PurchaseAuthConfig,
    /// The submission.
    pub payload: &'a SubmissionPayload,
    /// Submission id, if persistence already ran.
    pub submission_id: Option<i64>,
    /// Template variables for webhook URLs.
    pub variables: &'a TemplateContext,
}

/// Runs token resolution, login, the purchase call and webhook fan-out.
#[derive(Clone)]
pub struct PurchaseAuthFlow {
    api_base_url: String,
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenStore>,
    login_prompt: Arc<dyn LoginPrompt>,
    navigator: Arc<dyn Navigator>,
    observer: Arc<dyn PurchaseObserver>,
}

impl fmt::Debug for PurchaseAuthFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PurchaseAuthFlow")
            .field("api_base_url", &self.api_base_url)
            .finish_non_exhaustive()
    }
}

/// First non-empty string or number under any of `keys`, at the top level
/// or under `data`.
fn find_id(body: &Value, keys: &[&str]) -> Option<String> {
    let scopes = [Some(body), body.get("data")];
    scopes.into_iter().flatten().find_map(|scope| {
        keys.iter().find_map(|key| match scope.get(*key)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    })
}

impl PurchaseAuthFlow {
    /// Creates the flow.
    #[must_use]
    pub fn new(
        api_base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenStore>,
        login_prompt: Arc<dyn LoginPrompt>,
        navigator: Arc<dyn Navigator>,
        observer: Arc<dyn PurchaseObserver>,
    ) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            transport,
            tokens,
            login_prompt,
            navigator,
            observer,
        }
    }

    /// Runs the whole flow for one submission.
    pub async fn run(&self, request: PurchaseRequest<'_>) -> Result<PurchaseReceipt> {
        let token = self.resolve_token(request.config, request.payload).await?;

        let body = match self.purchase(&request, &token).await {
            Ok(body) => body,
            Err(err) => {
                self.observer.on_purchase_error(&err);
                return Err(err);
            }
        };

        let mut receipt = PurchaseReceipt {
            transaction_id: find_id(&body, &["transactionId", "transaction_id", "id"]),
            ..PurchaseReceipt::default()
        };
        match &receipt.transaction_id {
            Some(txn) => {
                info!(transaction_id = %txn, "Purchase completed");
                self.observer.on_purchase_success(txn);
            }
            None => warn!("Purchase completed without a transaction id"),
        }

        if let Some(link) = find_id(&body, &["paymentLink", "payment_link"]) {
            match self.navigator.navigate(&link) {
                Ok(()) => receipt.navigated_to = Some(link),
                Err(err) => warn!(error = %err, "Could not open payment link"),
            }
        }

        receipt.webhooks = self.notify_webhooks(&request, receipt.transaction_id.as_deref());

        Ok(receipt)
    }

    /// CheckToken → NeedLogin → LoggedIn.
    async fn resolve_token(
        &self,
        config: &PurchaseAuthConfig,
        payload: &SubmissionPayload,
    ) -> Result<String> {
        let supplied = payload.auth_token();
        let stored = self.tokens.get().filter(|t| !t.is_empty());

        if !config.require_authentication {
            return Ok(supplied.map(str::to_string).or(stored).unwrap_or_default());
        }

        let identity = IdentityClient::new(config, self.transport.clone());
        if let Some(token) = supplied {
            if identity.validate(token).await {
                debug!("Using auth token supplied with the submission");
                return Ok(token.to_string());
            }
            info!("Supplied auth token is no longer valid");
        }

        // The store is only cleared once its own token has been rejected.
        if let Some(token) = stored {
            if supplied != Some(token.as_str()) && identity.validate(&token).await {
                debug!("Using stored auth token");
                return Ok(token);
            }
            info!("Stored auth token is no longer valid");
            self.tokens.clear();
        }

        let credentials = match self.login_prompt.request_credentials().await {
            CredentialsPrompt::Provided(credentials) => credentials,
            CredentialsPrompt::Cancelled => {
                info!("Login cancelled by user");
                return Err(SubmitflowError::LoginCancelled);
            }
        };

        let token = identity.login(&credentials).await?;
        self.tokens.set(&token);
        info!("Logged in for purchase");
        Ok(token)
    }

    /// Calls the purchase proxy; returns the response body.
    async fn purchase(&self, request: &PurchaseRequest<'_>, token: &str) -> Result<Value> {
        let config = request.config;
        let answers = &request.payload.answers;
        let answer = |field: Option<&String>| {
            field
                .and_then(|f| unwrap_answer(answers.get(f)))
                .unwrap_or_default()
        };

        let adv_id = answer(Some(&config.adv_id_field));
        let placement = answer(Some(&config.item_id_field));
        let item_id = resolve_item_id(&placement, &config.placement_items);

        let body = json!({
            "items": [{
                "id": item_id,
                "category_id": answer(config.category_id_field.as_ref()),
                "district_id": answer(config.district_id_field.as_ref()),
            }],
            "adv_id": adv_id,
            "user_lang": config.user_lang,
            "payment_method": config.payment_method,
            "auth_token": token,
            "purchase_url": config.purchase_api_url,
        });

        debug!(adv_id = %adv_id, item_id = %item_id, "Calling purchase API");
        let response = self
            .transport
            .send(HttpRequest::post(join_url(&self.api_base_url, "purchase")).with_json(body))
            .await
            .map_err(|e| SubmitflowError::PurchaseFailed(e.to_string()))?;

        if !response.is_success() {
            let message = response
                .error_message()
                .unwrap_or_else(|| format!("status {}", response.status));
            return Err(SubmitflowError::PurchaseFailed(message));
        }

        Ok(response.json_value())
    }

    /// Starts the webhook fan-out on its own task so that webhook latency
    /// never counts against the purchase step. Failures are logged.
    fn notify_webhooks(
        &self,
        request: &PurchaseRequest<'_>,
        transaction_id: Option<&str>,
    ) -> Option<JoinHandle<usize>> {
        let hooks = request.config.additional_webhooks.clone();
        if hooks.is_empty() {
            return None;
        }

        let mut variables = request.variables.clone();
        if let Some(txn) = transaction_id {
            variables.insert("transactionId".into(), Value::from(txn));
            variables.insert("purchaseTransactionId".into(), Value::from(txn));
        }

        let config = request.config;
        let answers = &request.payload.answers;
        let body = json!({
            "transactionId": transaction_id,
            "formId": request.payload.form_id,
            "submissionId": request.submission_id,
            "advId": unwrap_answer(answers.get(&config.adv_id_field)),
            "itemId": unwrap_answer(answers.get(&config.item_id_field)),
            "answers": answers,
        });

        let transport = self.transport.clone();
        let fan_out = async move {
            let calls = hooks
                .iter()
                .map(|hook| send_webhook(transport.as_ref(), hook, &variables, body.clone()));
            let delivered = join_all(calls).await.into_iter().filter(|ok| *ok).count();
            info!(delivered, total = hooks.len(), "Purchase webhooks notified");
            delivered
        };

        Some(tokio::spawn(fan_out.in_current_span()))
    }
}

async fn send_webhook(
    transport: &dyn Transport,
    hook: &WebhookTarget,
    variables: &TemplateContext,
    body: Value,
) -> bool {
    let method = match Method::parse(&hook.method) {
        Ok(method) => method,
        Err(err) => {
            warn!(url = %hook.url, error = %err, "Skipping webhook");
            return false;
        }
    };

    let url = encode_url(&hook.url, variables);
    let mut request = HttpRequest::new(method, url.as_str());
    for (name, value) in &hook.headers {
        request = request.with_header(name.as_str(), value.as_str());
    }
    if method != Method::Get {
        request = request.with_json(body);
    }

    match transport.send(request).await {
        Ok(response) if response.is_success() => true,
        Ok(response) => {
            warn!(url = %url, status = response.status, "Webhook rejected");
            false
        }
        Err(err) => {
            warn!(url = %url, error = %err, "Webhook failed");
            false
        }
    }
}
