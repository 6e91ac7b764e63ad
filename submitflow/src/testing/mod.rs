//! Testing utilities for submit pipelines.
//!
//! This module provides:
//! - A scripted HTTP transport
//! - Recording doubles for the host ports
//! - A configurable mock action handler
//! - Sample forms and payloads

mod fixtures;
mod mocks;

pub use fixtures::{
    purchase_action, redirect_action, sample_form, sample_form_with, sample_payload,
    sample_purchase_config, sample_template_context, SAMPLE_FORM_ID,
};
pub use mocks::{
    CallLog, MockAction, RecordingAlertSink, RecordingBridge, RecordingNavigator,
    RecordingPurchaseObserver, ScriptedLoginPrompt, ScriptedTransport,
};
