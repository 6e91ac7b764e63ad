//! Data flowing through a pipeline run.
//!
//! This module provides:
//! - The immutable submission payload shared by all steps
//! - The run-scoped execution context steps write their outputs to
//! - The per-step view handed to action handlers

mod execution;
mod payload;

pub use execution::{ExecutionContext, StepContext};
pub use payload::SubmissionPayload;
