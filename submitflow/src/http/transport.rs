//! Transport trait and request/response types.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;

use crate::errors::{FieldError, Result, SubmitflowError};

/// HTTP method of an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// GET
    Get,
    /// POST
    #[default]
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl Method {
    /// Parses a method name, case-insensitively.
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(SubmitflowError::Configuration(format!(
                "unsupported HTTP method '{other}'"
            ))),
        }
    }

    /// Returns the canonical method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outgoing request to one of the collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Headers in insertion order.
    pub headers: Vec<(String, String)>,
    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    /// Creates a request without headers or body.
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Creates a POST request.
    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds an `Authorization: Bearer` header.
    #[must_use]
    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("Authorization", format!("Bearer {token}"))
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Looks up a header value, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response from one of the collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl HttpResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Creates a response with a JSON body.
    #[must_use]
    pub fn json_body(status: u16, body: &serde_json::Value) -> Self {
        Self::new(status, body.to_string())
    }

    /// Whether the response is successful (2xx status).
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserializes the body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// The body as JSON, or `Null` when it is empty or not JSON.
    #[must_use]
    pub fn json_value(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }

    /// Server-provided error text from a JSON `message` or `error` field.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        let body = self.json_value();
        ["message", "error"].iter().find_map(|key| {
            body.get(*key)
                .and_then(serde_json::Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
    }

    /// Converts a non-2xx response into an [`SubmitflowError::Http`],
    /// keeping any structured field errors.
    #[must_use]
    pub fn into_error(self) -> SubmitflowError {
        let errors = self
            .json_value()
            .get("errors")
            .cloned()
            .and_then(|v| serde_json::from_value::<Vec<FieldError>>(v).ok())
            .unwrap_or_default();
        let message = self
            .error_message()
            .unwrap_or_else(|| format!("request failed with status {}", self.status));

        SubmitflowError::Http {
            status: self.status,
            message,
            errors,
        }
    }
}

/// Sends requests to the HTTP collaborators.
///
/// Implementations return `Ok` for every response that was received,
/// whatever its status; only transport failures are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and returns the response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}
