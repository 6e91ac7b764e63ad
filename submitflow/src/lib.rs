//! # Submitflow
//!
//! The submission pipeline of a dynamically-defined form.
//!
//! Once a user submits a form, its `submit` block decides what happens next:
//!
//! - **Delivery actions**: notify a native host app, persist the submission,
//!   redirect the browser, forward answers to an external endpoint
//! - **Ordering and error policy**: declared order, per-step timeout and a
//!   `continue` / `stop` / `show_error` policy
//! - **URL templating**: `{{.name}}` placeholders rendered into paths and
//!   query values without breaking the URL
//! - **Authenticated purchase**: token validation, just-in-time login, the
//!   purchase call and post-purchase webhooks
//!
//! Every host surface (bridges, navigation, alerts, login prompt, token slot)
//! is an injected trait, and HTTP goes through an injected [`http::Transport`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use submitflow::prelude::*;
//!
//! let runner = PipelineBuilder::new(SubmitflowSettings::from_env())
//!     .navigator(navigator)
//!     .login_prompt(prompt)
//!     .build()?;
//!
//! let form = FormDefinition::from_json(&form_json)?;
//! let outcome = runner.run(&form, &payload).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod actions;
pub mod config;
pub mod context;
pub mod errors;
pub mod events;
pub mod http;
pub mod observability;
pub mod pipeline;
pub mod ports;
pub mod purchase;
pub mod template;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::actions::{ActionHandler, ActionHandlers, ActionOutput, ForwardEndpointCache};
    pub use crate::config::{
        ActionKind, ActionSpec, FormDefinition, OnError, PipelineConfig, PurchaseAuthConfig,
        SubmitAction, SubmitflowSettings,
    };
    pub use crate::context::{ExecutionContext, StepContext, SubmissionPayload};
    pub use crate::errors::{FieldError, Result, SubmitflowError};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::http::{HttpRequest, HttpResponse, Transport};
    pub use crate::pipeline::{PipelineBuilder, PipelineOutcome, PipelineRunner, TimeoutGuard};
    pub use crate::ports::{
        AlertSink, CredentialsPrompt, HostBridge, LoginPrompt, Navigator, PurchaseObserver,
        TokenStore,
    };
    pub use crate::template::{encode_url, render, TemplateContext};
}
