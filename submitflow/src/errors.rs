//! Error types for the submitflow pipeline.
//!
//! Every action handler reports failures through [`SubmitflowError`]. The
//! pipeline runner catches each error exactly once and applies the configured
//! error policy to it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for submitflow operations.
#[derive(Debug, Error)]
pub enum SubmitflowError {
    /// The transport could not complete the request.
    #[error("Network error: {0}")]
    Network(String),

    /// A collaborator answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// The response status code.
        status: u16,
        /// Server-provided or synthesized message.
        message: String,
        /// Structured validation errors, if the server sent any.
        errors: Vec<FieldError>,
    },

    /// A step exceeded its deadline.
    #[error("Action '{action}' timed out after {timeout_ms}ms")]
    Timeout {
        /// The action that timed out.
        action: String,
        /// The deadline that was exceeded.
        timeout_ms: u64,
    },

    /// The user declined the credential prompt.
    #[error("Login cancelled")]
    LoginCancelled,

    /// The identity collaborator rejected the login.
    #[error("Login failed: {0}")]
    LoginFailed(String),

    /// The purchase collaborator reported a failure.
    #[error("Purchase failed: {0}")]
    PurchaseFailed(String),

    /// A template produced an unusable result.
    #[error("Template error: {0}")]
    Template(String),

    /// A host bridge refused the message.
    #[error("Bridge error: {0}")]
    Bridge(String),

    /// The pipeline or an action is misconfigured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SubmitflowError {
    /// Creates an HTTP error without structured field errors.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(action: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            action: action.into(),
            timeout_ms,
        }
    }

    /// Short, stable name of the error class.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "NetworkError",
            Self::Http { .. } => "HttpError",
            Self::Timeout { .. } => "TimeoutError",
            Self::LoginCancelled => "LoginCancelled",
            Self::LoginFailed(_) => "LoginFailed",
            Self::PurchaseFailed(_) => "PurchaseFailed",
            Self::Template(_) => "TemplateError",
            Self::Bridge(_) => "BridgeError",
            Self::Configuration(_) => "ConfigurationError",
            Self::Serialization(_) => "SerializationError",
        }
    }

    /// Returns the HTTP status, if the error carries one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Field-level validation errors to re-display next to the form inputs.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Http { errors, .. } => errors,
            _ => &[],
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));

        match self {
            Self::Http { status, errors, .. } => {
                map.insert("status".to_string(), serde_json::json!(status));
                if !errors.is_empty() {
                    map.insert("errors".to_string(), serde_json::json!(errors));
                }
            }
            Self::Timeout { action, timeout_ms } => {
                map.insert("action".to_string(), serde_json::json!(action));
                map.insert("timeout_ms".to_string(), serde_json::json!(timeout_ms));
            }
            _ => {}
        }

        map
    }
}

/// A single server-side validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FieldError {
    /// The field name the error refers to.
    #[serde(default)]
    pub field: String,
    /// Machine-readable error code.
    #[serde(default)]
    pub code: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

impl FieldError {
    /// Creates a new field error.
    #[must_use]
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T, E = SubmitflowError> = std::result::Result<T, E>;
