//! Host capabilities injected into the pipeline.
//!
//! A library has no ambient browser or native shell. Everything the
//! submission flow needs from its host is expressed as a trait here:
//! - [`HostBridge`]: message channels to an embedding native app
//! - [`Navigator`]: top-level navigation
//! - [`AlertSink`]: user-visible error alerts
//! - [`TokenStore`]: the persisted auth token slot
//! - [`LoginPrompt`]: just-in-time credential entry
//! - [`PurchaseObserver`]: purchase success/failure callbacks

mod bridge;
mod host;
mod session;

pub use bridge::{BridgeKind, BridgeMessage, HostBridge};
pub use host::{AlertSink, Navigator, NoOpPurchaseObserver, PurchaseObserver, TracingAlertSink};
pub use session::{Credentials, CredentialsPrompt, InMemoryTokenStore, LoginPrompt, TokenStore};

#[cfg(test)]
pub use bridge::MockHostBridge;
#[cfg(test)]
pub use host::MockNavigator;
