//! `reqwest`-backed transport.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Instant;
use tracing::{debug, warn};

use super::{HttpRequest, HttpResponse, Method, Transport};
use crate::config::SubmitflowSettings;
use crate::errors::{Result, SubmitflowError};

/// Transport that sends requests with a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a client from the settings' timeout and user agent.
    pub fn new(settings: &SubmitflowSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| SubmitflowError::Configuration(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn header_map(headers: &[(String, String)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => warn!(header = %key, "Dropping invalid header"),
        }
    }
    map
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let start = Instant::now();

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.url)
            .headers(header_map(&request.headers));
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SubmitflowError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| SubmitflowError::Network(e.to_string()))?;

        debug!(
            method = %request.method,
            url = %request.url,
            status,
            duration_ms = start.elapsed().as_millis() as u64,
            "HTTP request completed"
        );

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_from_settings() {
        let settings = SubmitflowSettings::default().with_timeout(2.5);
        assert!(ReqwestTransport::new(&settings).is_ok());
    }

    #[test]
    fn test_invalid_headers_dropped() {
        let headers = vec![
            ("X-Ok".to_string(), "1".to_string()),
            ("Bad Header".to_string(), "2".to_string()),
        ];
        let map = header_map(&headers);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("x-ok").unwrap(), "1");
    }
}
