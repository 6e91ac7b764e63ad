//! Pipeline lifecycle events.
//!
//! The runner reports each run through an injected [`EventSink`]. Events are
//! named `pipeline.*` for the run and `action.*` for each step.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

use std::fmt;

/// Events emitted by the pipeline runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineEvent {
    /// A run began.
    PipelineStarted,
    /// A run finished, possibly with recorded failures.
    PipelineCompleted,
    /// A run was aborted by the `stop` policy.
    PipelineAborted,
    /// A step began.
    ActionStarted,
    /// A step finished.
    ActionCompleted,
    /// A step failed or timed out.
    ActionFailed,
    /// A step had no handler or nothing to do.
    ActionSkipped,
}

impl PipelineEvent {
    /// Every event, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::PipelineStarted,
        Self::ActionStarted,
        Self::ActionCompleted,
        Self::ActionFailed,
        Self::ActionSkipped,
        Self::PipelineCompleted,
        Self::PipelineAborted,
    ];

    /// Dotted event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PipelineStarted => "pipeline.started",
            Self::PipelineCompleted => "pipeline.completed",
            Self::PipelineAborted => "pipeline.aborted",
            Self::ActionStarted => "action.started",
            Self::ActionCompleted => "action.completed",
            Self::ActionFailed => "action.failed",
            Self::ActionSkipped => "action.skipped",
        }
    }

    /// Looks an event up by name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == name)
    }

    /// Returns true for events that report a failure.
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::ActionFailed | Self::PipelineAborted)
    }
}

impl fmt::Display for PipelineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
