//! Navigation, alerts and purchase callbacks.

use tracing::warn;

use crate::errors::{FieldError, Result, SubmitflowError};

/// Performs top-level navigation.
#[cfg_attr(test, mockall::automock)]
pub trait Navigator: Send + Sync {
    /// Navigates to `url`.
    fn navigate(&self, url: &str) -> Result<()>;
}

/// Shows an error to the user.
pub trait AlertSink: Send + Sync {
    /// Raises an alert. `field_errors` is non-empty when the server rejected
    /// individual answers.
    fn alert(&self, message: &str, field_errors: &[FieldError]);
}

/// Alert sink that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn alert(&self, message: &str, field_errors: &[FieldError]) {
        warn!(
            message = %message,
            field_errors = field_errors.len(),
            "Submission alert"
        );
    }
}

/// Receives the result of the purchase call.
pub trait PurchaseObserver: Send + Sync {
    /// Called with the transaction id after a successful purchase.
    fn on_purchase_success(&self, _transaction_id: &str) {}

    /// Called before a purchase failure is reported.
    fn on_purchase_error(&self, _error: &SubmitflowError) {}
}

/// Observer that ignores every callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpPurchaseObserver;

impl PurchaseObserver for NoOpPurchaseObserver {}
