//! Configuration types.
//!
//! This module provides:
//! - The form definition and its submit pipeline
//! - Purchase flow settings
//! - Runtime settings for the HTTP collaborators

mod form;
mod pipeline;
mod purchase;
mod settings;

pub use form::{FieldDefinition, FormDefinition, LocaleString};
pub use pipeline::{
    ActionKind, ActionSpec, IdempotencyConfig, OnError, PipelineConfig, SubmitAction,
};
pub use purchase::{PlacementItems, PurchaseAuthConfig, WebhookTarget};
pub use settings::{join_url, SubmitflowSettings};
