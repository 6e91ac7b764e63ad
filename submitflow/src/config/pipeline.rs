//! Pipeline configuration: the `submit` block of a form definition.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use super::PurchaseAuthConfig;
use crate::errors::{Result, SubmitflowError};

/// The closed set of delivery actions a pipeline can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Notify the embedding native app.
    NativeBridge,
    /// Persist the submission through the API.
    ServerPersist,
    /// Webhook delivery; performed server-side, a no-op here.
    Webhooks,
    /// Navigate the browser to a templated URL.
    Redirect,
    /// Forward the answers to an externally configured endpoint.
    NextjsPost,
    /// Complete an authenticated purchase.
    PurchaseAuthenticated,
}

impl ActionKind {
    /// Every action kind, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::NativeBridge,
        Self::ServerPersist,
        Self::Webhooks,
        Self::Redirect,
        Self::NextjsPost,
        Self::PurchaseAuthenticated,
    ];

    /// Returns the wire name of the action kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NativeBridge => "native_bridge",
            Self::ServerPersist => "server_persist",
            Self::Webhooks => "webhooks",
            Self::Redirect => "redirect",
            Self::NextjsPost => "nextjs_post",
            Self::PurchaseAuthenticated => "purchase_authenticated",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific configuration of an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionSpec {
    /// Native bridge notification.
    NativeBridge,
    /// Server persistence.
    ServerPersist,
    /// Server-side webhooks.
    Webhooks,
    /// Browser redirect.
    Redirect {
        /// Target URL, possibly containing `{{.name}}` placeholders.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    /// Forward to the configured external endpoint.
    NextjsPost,
    /// Authenticated purchase.
    PurchaseAuthenticated {
        /// Purchase flow configuration.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        purchase_auth_config: Option<PurchaseAuthConfig>,
    },
}

impl ActionSpec {
    /// Returns the kind of this action.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::NativeBridge => ActionKind::NativeBridge,
            Self::ServerPersist => ActionKind::ServerPersist,
            Self::Webhooks => ActionKind::Webhooks,
            Self::Redirect { .. } => ActionKind::Redirect,
            Self::NextjsPost => ActionKind::NextjsPost,
            Self::PurchaseAuthenticated { .. } => ActionKind::PurchaseAuthenticated,
        }
    }
}

/// One configured action with its enabled flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitAction {
    /// Whether the action runs.
    #[serde(default)]
    pub enabled: bool,
    /// Type tag plus type-specific fields.
    #[serde(flatten)]
    pub spec: ActionSpec,
}

impl SubmitAction {
    /// Creates an enabled action.
    #[must_use]
    pub fn enabled(spec: ActionSpec) -> Self {
        Self { enabled: true, spec }
    }

    /// Creates a disabled action.
    #[must_use]
    pub fn disabled(spec: ActionSpec) -> Self {
        Self {
            enabled: false,
            spec,
        }
    }

    /// Returns the action kind.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        self.spec.kind()
    }
}

/// What the runner does when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnError {
    /// Log the failure and run the next step.
    #[default]
    Continue,
    /// Abort the run with the failing step's error.
    Stop,
    /// Surface an alert to the user, then continue.
    ShowError,
}

/// Idempotency settings forwarded to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IdempotencyConfig {
    /// Whether an idempotency key is sent.
    #[serde(default)]
    pub enabled: bool,
    /// Name of the `meta` entry holding the key.
    #[serde(default)]
    pub key: String,
}

/// The full submit pipeline of a form.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Configured actions; each kind at most once.
    #[serde(default)]
    pub actions: Vec<SubmitAction>,
    /// Declared execution order.
    #[serde(default)]
    pub ordering: Vec<ActionKind>,
    /// Optional idempotency settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency: Option<IdempotencyConfig>,
    /// Per-step deadline; zero, negative or absent means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<i64>,
    /// Error policy.
    #[serde(default)]
    pub on_error: OnError,
}

impl PipelineConfig {
    /// Creates an empty pipeline configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a pipeline configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Adds an action.
    #[must_use]
    pub fn with_action(mut self, action: SubmitAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Sets the declared ordering.
    #[must_use]
    pub fn with_ordering(mut self, ordering: impl IntoIterator<Item = ActionKind>) -> Self {
        self.ordering = ordering.into_iter().collect();
        self
    }

    /// Sets the per-step timeout.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Sets the error policy.
    #[must_use]
    pub fn with_on_error(mut self, on_error: OnError) -> Self {
        self.on_error = on_error;
        self
    }

    /// Sets the idempotency configuration.
    #[must_use]
    pub fn with_idempotency(mut self, key: impl Into<String>) -> Self {
        self.idempotency = Some(IdempotencyConfig {
            enabled: true,
            key: key.into(),
        });
        self
    }

    /// Returns the first configured action of the given kind.
    #[must_use]
    pub fn action(&self, kind: ActionKind) -> Option<&SubmitAction> {
        self.actions.iter().find(|a| a.kind() == kind)
    }

    /// Returns the action of the given kind if it is enabled.
    #[must_use]
    pub fn enabled_action(&self, kind: ActionKind) -> Option<&SubmitAction> {
        self.action(kind).filter(|a| a.enabled)
    }

    /// Returns true if the given kind is configured and enabled.
    #[must_use]
    pub fn is_enabled(&self, kind: ActionKind) -> bool {
        self.enabled_action(kind).is_some()
    }

    /// Per-step deadline as a `Duration`, or `None` when unbounded.
    #[must_use]
    pub fn step_timeout(&self) -> Option<Duration> {
        match self.timeout_ms {
            Some(ms) if ms > 0 => Some(Duration::from_millis(ms.unsigned_abs())),
            _ => None,
        }
    }

    /// Checks structural invariants.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for action in &self.actions {
            if !seen.insert(action.kind()) {
                return Err(SubmitflowError::Configuration(format!(
                    "action type '{}' appears more than once",
                    action.kind()
                )));
            }

            if let ActionSpec::PurchaseAuthenticated {
                purchase_auth_config: None,
            } = &action.spec
            {
                if action.enabled {
                    return Err(SubmitflowError::Configuration(
                        "purchase_authenticated is enabled without purchase_auth_config"
                            .to_string(),
                    ));
                }
            }
        }

        if let Some(idem) = &self.idempotency {
            if idem.enabled && idem.key.trim().is_empty() {
                return Err(SubmitflowError::Configuration(
                    "idempotency is enabled without a key".to_string(),
                ));
            }
        }

        Ok(())
    }
}
