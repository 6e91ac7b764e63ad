//! Per-step deadlines.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::errors::{Result, SubmitflowError};

/// Result of a timed operation.
#[derive(Debug)]
pub enum TimedResult<T, E> {
    /// Operation completed successfully.
    Ok(T),
    /// Operation failed with an error.
    Err(E),
    /// Operation timed out.
    Timeout,
}

impl<T, E> TimedResult<T, E> {
    /// Returns true if the operation timed out.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, TimedResult::Timeout)
    }

    /// Converts to a standard Result, treating timeout as an error.
    pub fn into_result(self, timeout_error: impl FnOnce() -> E) -> std::result::Result<T, E> {
        match self {
            TimedResult::Ok(v) => Ok(v),
            TimedResult::Err(e) => Err(e),
            TimedResult::Timeout => Err(timeout_error()),
        }
    }
}

/// Races a step against an optional deadline.
///
/// When the deadline wins the step future is dropped; whatever it was doing
/// is abandoned and its result never observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeoutGuard {
    deadline: Option<Duration>,
}

impl TimeoutGuard {
    /// Creates a guard; `None` means unbounded.
    #[must_use]
    pub fn new(deadline: Option<Duration>) -> Self {
        Self { deadline }
    }

    /// A guard that never fires.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// The configured deadline.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Runs `future`, reporting a timeout separately from its own errors.
    pub async fn run<T, E, F>(&self, future: F) -> TimedResult<T, E>
    where
        F: Future<Output = std::result::Result<T, E>>,
    {
        let Some(deadline) = self.deadline else {
            return match future.await {
                Ok(value) => TimedResult::Ok(value),
                Err(error) => TimedResult::Err(error),
            };
        };

        match timeout(deadline, future).await {
            Ok(Ok(value)) => TimedResult::Ok(value),
            Ok(Err(error)) => TimedResult::Err(error),
            Err(_) => TimedResult::Timeout,
        }
    }

    /// Runs a step for `action`, mapping an expired deadline to
    /// [`SubmitflowError::Timeout`].
    pub async fn guard<T, F>(&self, action: &str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let deadline_ms = self
            .deadline
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        self.run(future)
            .await
            .into_result(|| SubmitflowError::timeout(action, deadline_ms))
    }
}
