//! Wires the standard action handlers from host collaborators.

use std::sync::Arc;
use tracing::debug;

use super::PipelineRunner;
use crate::actions::{
    ActionHandlers, ForwardAction, ForwardEndpointCache, NativeBridgeAction, PurchaseAction,
    RedirectAction, ServerPersistAction, WebhooksAction,
};
use crate::config::SubmitflowSettings;
use crate::errors::Result;
use crate::events::EventSink;
use crate::http::Transport;
use crate::ports::{
    AlertSink, HostBridge, InMemoryTokenStore, LoginPrompt, Navigator, NoOpPurchaseObserver,
    PurchaseObserver, TokenStore,
};
use crate::purchase::PurchaseAuthFlow;

/// Builder for a [`PipelineRunner`] with the standard handlers.
///
/// `redirect` needs a navigator; `purchase_authenticated` needs a navigator
/// and a login prompt. Kinds whose collaborators are missing get no handler
/// and are skipped at run time.
#[derive(Default)]
pub struct PipelineBuilder {
    settings: SubmitflowSettings,
    transport: Option<Arc<dyn Transport>>,
    bridges: Vec<Arc<dyn HostBridge>>,
    navigator: Option<Arc<dyn Navigator>>,
    login_prompt: Option<Arc<dyn LoginPrompt>>,
    tokens: Option<Arc<dyn TokenStore>>,
    observer: Option<Arc<dyn PurchaseObserver>>,
    alerts: Option<Arc<dyn AlertSink>>,
    events: Option<Arc<dyn EventSink>>,
    forward_cache: Option<Arc<ForwardEndpointCache>>,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("settings", &self.settings)
            .field("bridges", &self.bridges.len())
            .field("has_transport", &self.transport.is_some())
            .field("has_navigator", &self.navigator.is_some())
            .field("has_login_prompt", &self.login_prompt.is_some())
            .finish_non_exhaustive()
    }
}

impl PipelineBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new(settings: SubmitflowSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Sets the HTTP transport.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Adds a native host bridge.
    #[must_use]
    pub fn bridge(mut self, bridge: Arc<dyn HostBridge>) -> Self {
        self.bridges.push(bridge);
        self
    }

    /// Sets the navigator.
    #[must_use]
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Sets the login prompt.
    #[must_use]
    pub fn login_prompt(mut self, prompt: Arc<dyn LoginPrompt>) -> Self {
        self.login_prompt = Some(prompt);
        self
    }

    /// Sets the token store. Defaults to an in-memory store.
    #[must_use]
    pub fn token_store(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Sets the purchase observer.
    #[must_use]
    pub fn purchase_observer(mut self, observer: Arc<dyn PurchaseObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Sets the alert sink.
    #[must_use]
    pub fn alert_sink(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = Some(alerts);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    /// Shares a forward endpoint cache with other runners.
    #[must_use]
    pub fn forward_cache(mut self, cache: Arc<ForwardEndpointCache>) -> Self {
        self.forward_cache = Some(cache);
        self
    }

    #[cfg(feature = "http")]
    fn resolve_transport(&self) -> Result<Arc<dyn Transport>> {
        match &self.transport {
            Some(transport) => Ok(transport.clone()),
            None => Ok(Arc::new(crate::http::ReqwestTransport::new(&self.settings)?)),
        }
    }

    #[cfg(not(feature = "http"))]
    fn resolve_transport(&self) -> Result<Arc<dyn Transport>> {
        self.transport.clone().ok_or_else(|| {
            crate::errors::SubmitflowError::Configuration("no transport configured".to_string())
        })
    }

    /// Builds the runner.
    ///
    /// Fails only when no transport is set and none can be created.
    pub fn build(self) -> Result<PipelineRunner> {
        let transport = self.resolve_transport()?;
        let api = self.settings.api_base_url.clone();

        let mut handlers = ActionHandlers::new()
            .with_handler(Arc::new(NativeBridgeAction::new(self.bridges)))
            .with_handler(Arc::new(ServerPersistAction::new(api.clone(), transport.clone())))
            .with_handler(Arc::new(WebhooksAction))
            .with_handler(Arc::new(ForwardAction::new(
                api.clone(),
                transport.clone(),
                self.forward_cache.unwrap_or_default(),
            )));

        if let Some(navigator) = &self.navigator {
            handlers.set(Arc::new(RedirectAction::new(navigator.clone())));
        }

        if let (Some(navigator), Some(prompt)) = (self.navigator, self.login_prompt) {
            let flow = PurchaseAuthFlow::new(
                api,
                transport,
                self.tokens
                    .unwrap_or_else(|| Arc::new(InMemoryTokenStore::new())),
                prompt,
                navigator,
                self.observer
                    .unwrap_or_else(|| Arc::new(NoOpPurchaseObserver)),
            );
            handlers.set(Arc::new(PurchaseAction::new(Arc::new(flow))));
        }

        debug!(handlers = ?handlers.registered(), "Built submit pipeline");

        let mut runner = PipelineRunner::new(handlers)
            .with_alert_message(self.settings.default_alert_message);
        if let Some(alerts) = self.alerts {
            runner = runner.with_alert_sink(alerts);
        }
        if let Some(events) = self.events {
            runner = runner.with_event_sink(events);
        }
        Ok(runner)
    }
}
