//! Pipeline execution.
//!
//! This module provides:
//! - Execution order with purchase hoisting
//! - Per-step deadlines
//! - The runner and its error policies
//! - Idempotency keys for persistence
//! - A builder wiring the standard handlers

mod builder;
mod failures;
mod idempotency;
mod ordering;
mod runner;
mod timeout;

#[cfg(test)]
mod integration_tests;

pub use builder::PipelineBuilder;
pub use failures::FailureRecord;
pub use idempotency::{
    derive_submission_key, generate_idempotency_key, resolve_idempotency_key, IDEMPOTENCY_HEADER,
};
pub use ordering::execution_order;
pub use runner::{PipelineOutcome, PipelineRunner};
pub use timeout::{TimedResult, TimeoutGuard};
