//! HTTP access to the submission collaborators.
//!
//! Handlers never talk to `reqwest` directly; they send [`HttpRequest`]s
//! through an injected [`Transport`]. [`ReqwestTransport`] is the production
//! implementation, enabled by the `http` feature.

#[cfg(feature = "http")]
mod client;
mod transport;

#[cfg(feature = "http")]
pub use client::ReqwestTransport;
pub use transport::{HttpRequest, HttpResponse, Method, Transport};
