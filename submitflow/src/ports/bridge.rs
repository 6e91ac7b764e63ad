//! Native-app bridges the form may be embedded behind.

use serde::Serialize;
use std::fmt;

use crate::errors::Result;

/// Known bridge channels, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BridgeKind {
    /// React-Native WebView `postMessage` channel.
    ReactNativeWebView,
    /// WebKit script message handler (iOS).
    WebKit,
    /// Android JavaScript interface.
    Android,
}

impl BridgeKind {
    /// Lower values are tried first.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::ReactNativeWebView => 0,
            Self::WebKit => 1,
            Self::Android => 2,
        }
    }

    /// Returns a short name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReactNativeWebView => "react_native_webview",
            Self::WebKit => "webkit",
            Self::Android => "android",
        }
    }
}

impl fmt::Display for BridgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Envelope posted to the native app.
#[derive(Debug, Serialize)]
pub struct BridgeMessage<'a, T: Serialize> {
    /// Always `form_submit`.
    #[serde(rename = "type")]
    pub message_type: &'static str,
    /// The submission.
    pub payload: &'a T,
}

impl<'a, T: Serialize> BridgeMessage<'a, T> {
    /// Wraps a payload in a `form_submit` envelope.
    #[must_use]
    pub const fn form_submit(payload: &'a T) -> Self {
        Self {
            message_type: "form_submit",
            payload,
        }
    }
}

/// A channel to the embedding native application.
#[cfg_attr(test, mockall::automock)]
pub trait HostBridge: Send + Sync {
    /// Which channel this is.
    fn kind(&self) -> BridgeKind;

    /// Whether the channel is present in the current host.
    fn detect(&self) -> bool;

    /// Posts a serialized message.
    fn post_message(&self, message: &str) -> Result<()>;
}
