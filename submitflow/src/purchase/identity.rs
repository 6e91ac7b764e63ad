//! Client for the marketplace identity collaborator.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::{join_url, PurchaseAuthConfig};
use crate::errors::{Result, SubmitflowError};
use crate::http::{HttpRequest, Transport};
use crate::ports::Credentials;

/// Validates tokens and logs users in.
#[derive(Clone)]
pub struct IdentityClient {
    base_url: String,
    device_id: String,
    version_number: String,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for IdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityClient")
            .field("base_url", &self.base_url)
            .field("device_id", &self.device_id)
            .field("version_number", &self.version_number)
            .finish_non_exhaustive()
    }
}

impl IdentityClient {
    /// Creates a client for the identity API named in `config`.
    #[must_use]
    pub fn new(config: &PurchaseAuthConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: config.auth_api_base_url.clone(),
            device_id: config.device_id.clone(),
            version_number: config.version_number_or_default().to_string(),
            transport,
        }
    }

    /// Returns true if the identity API accepts `token`.
    ///
    /// Transport failures and non-2xx answers count as invalid.
    pub async fn validate(&self, token: &str) -> bool {
        let request = HttpRequest::get(join_url(&self.base_url, "auth/validate"))
            .with_header("Accept", "application/json")
            .with_bearer(token);

        match self.transport.send(request).await {
            Ok(response) if response.is_success() => {
                let valid = response
                    .json_value()
                    .get("valid")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                debug!(valid, "Token validated");
                valid
            }
            Ok(response) => {
                debug!(status = response.status, "Token rejected");
                false
            }
            Err(err) => {
                warn!(error = %err, "Token validation failed");
                false
            }
        }
    }

    /// Exchanges credentials for an access token.
    pub async fn login(&self, credentials: &Credentials) -> Result<String> {
        let request = HttpRequest::post(join_url(&self.base_url, "auth/login"))
            .with_header("Accept", "application/json")
            .with_header("Version-Number", self.version_number.as_str())
            .with_header("Device-Id", self.device_id.as_str())
            .with_header("Accept-Language", "en")
            .with_json(json!({
                "phone": credentials.phone,
                "password": credentials.password,
            }));

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| SubmitflowError::LoginFailed(e.to_string()))?;

        if !response.is_success() {
            let message = response
                .error_message()
                .unwrap_or_else(|| format!("status {}", response.status));
            return Err(SubmitflowError::LoginFailed(message));
        }

        extract_access_token(&response.json_value())
            .ok_or_else(|| SubmitflowError::LoginFailed("No access token in response".to_string()))
    }
}

/// Finds the access token in the shapes the identity API has used.
fn extract_access_token(body: &Value) -> Option<String> {
    const PATHS: [&[&str]; 5] = [
        &["data", "token", "access_token"],
        &["access_token"],
        &["accessToken"],
        &["token"],
        &["data", "access_token"],
    ];

    PATHS.iter().find_map(|path| {
        path.iter()
            .try_fold(body, |value, key| value.get(*key))
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;
    use crate::testing::ScriptedTransport;

    fn client(transport: &Arc<ScriptedTransport>) -> IdentityClient {
        let config = PurchaseAuthConfig::new().with_authentication("https://id.example/users");
        IdentityClient::new(&config, transport.clone())
    }

    #[test]
    fn test_token_shapes() {
        assert_eq!(
            extract_access_token(&json!({"data": {"token": {"access_token": "a"}}})).as_deref(),
            Some("a")
        );
        assert_eq!(extract_access_token(&json!({"accessToken": "b"})).as_deref(), Some("b"));
        assert_eq!(extract_access_token(&json!({"token": "c"})).as_deref(), Some("c"));
        assert_eq!(
            extract_access_token(&json!({"data": {"access_token": "d"}})).as_deref(),
            Some("d")
        );
        assert_eq!(extract_access_token(&json!({"token": {"nested": 1}})), None);
    }

    #[tokio::test]
    async fn test_validate() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_json("/auth/validate", 200, json!({"valid": true}));
        assert!(client(&transport).validate("tok").await);

        let requests = transport.requests();
        let request = &requests[0];
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.url, "https://id.example/users/auth/validate");
        assert_eq!(request.header("Authorization"), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn test_validate_rejections() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_json("/auth/validate", 401, json!({"error": "expired"}));
        assert!(!client(&transport).validate("tok").await);

        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_json("/auth/validate", 200, json!({"valid": false}));
        assert!(!client(&transport).validate("tok").await);

        let transport = Arc::new(ScriptedTransport::new());
        transport.fail("/auth/validate", "dns failure");
        assert!(!client(&transport).validate("tok").await);
    }

    #[tokio::test]
    async fn test_login_headers_and_token() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_json("/auth/login", 200, json!({"data": {"token": {"access_token": "fresh"}}}));

        let token = client(&transport)
            .login(&Credentials::new("+96550000000", "secret"))
            .await
            .unwrap();
        assert_eq!(token, "fresh");

        let requests = transport.requests();
        let request = &requests[0];
        assert_eq!(request.header("Version-Number"), Some("26.0.0"));
        assert_eq!(request.header("Accept-Language"), Some("en"));
        assert_eq!(request.body.as_ref().unwrap()["phone"], "+96550000000");
    }

    #[tokio::test]
    async fn test_login_error_messages() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_json("/auth/login", 401, json!({"message": "Wrong password"}));
        let err = client(&transport)
            .login(&Credentials::new("p", "x"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Login failed: Wrong password");

        let transport = Arc::new(ScriptedTransport::new());
        transport.respond_text("/auth/login", 500, "oops");
        let err = client(&transport)
            .login(&Credentials::new("p", "x"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Login failed: status 500");
    }
}
