//! Records of steps that failed in a run that kept going.

use serde::{Deserialize, Serialize};

use crate::config::ActionKind;
use crate::errors::SubmitflowError;

/// Record of an action failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// The action that failed.
    pub action: ActionKind,
    /// Error message.
    pub error: String,
    /// Error class, as [`SubmitflowError::kind`].
    pub error_kind: String,
    /// HTTP status, when the failure came from a collaborator response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl FailureRecord {
    /// Creates a new failure record.
    #[must_use]
    pub fn new(action: ActionKind, error: impl Into<String>) -> Self {
        Self {
            action,
            error: error.into(),
            error_kind: "Error".to_string(),
            status: None,
        }
    }

    /// Builds a record from a handler error.
    #[must_use]
    pub fn from_error(action: ActionKind, error: &SubmitflowError) -> Self {
        Self {
            status: error.status(),
            ..Self::new(action, error.to_string()).with_error_kind(error.kind())
        }
    }

    /// Sets the error kind.
    #[must_use]
    pub fn with_error_kind(mut self, kind: impl Into<String>) -> Self {
        self.error_kind = kind.into();
        self
    }

    /// Returns true if the step was cut off by its deadline.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.error_kind == "TimeoutError"
    }
}
