//! Auth token storage and the login prompt.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// The persisted auth token slot.
///
/// One slot shared by every run; the last writer wins.
pub trait TokenStore: Send + Sync {
    /// Returns the stored token.
    fn get(&self) -> Option<String>;

    /// Replaces the stored token.
    fn set(&self, token: &str);

    /// Removes the stored token.
    fn clear(&self);
}

/// Process-local token store.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl InMemoryTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `token`.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for InMemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn set(&self, token: &str) {
        *self.token.write() = Some(token.to_string());
    }

    fn clear(&self) {
        *self.token.write() = None;
    }
}

/// Phone and password entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Phone number.
    pub phone: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials.
    #[must_use]
    pub fn new(phone: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            password: password.into(),
        }
    }
}

/// Outcome of asking the user to log in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsPrompt {
    /// The user entered credentials.
    Provided(Credentials),
    /// The user dismissed the prompt.
    Cancelled,
}

/// Asks the user for credentials when no valid token exists.
#[async_trait]
pub trait LoginPrompt: Send + Sync {
    /// Suspends until the user submits or dismisses the prompt.
    async fn request_credentials(&self) -> CredentialsPrompt;
}
