//! HTTP transport backed by reqwest.
//!
//! Holds the cookie jar that carries server-issued sessions, so cookie-based
//! credentials are attached without the core ever seeing them.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method};
use secrecy::ExposeSecret;

use crate::errors::{PortalError, PortalResult};
use crate::gateway::{HttpMethod, HttpTransport, OutboundRequest, RawResponse};

pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> PortalResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| {
                PortalError::NetworkError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(ReqwestTransport {
            client,
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> PortalResult<RawResponse> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Patch => Method::PATCH,
        };
        let url = format!("{}{}", self.base_url, request.path);

        let mut builder = self
            .client
            .request(method, &url)
            .header(ACCEPT, "application/json");

        if let Some(authorization) = &request.authorization {
            let mut value = HeaderValue::from_str(authorization.expose_secret()).map_err(|_| {
                PortalError::ValidationError("Credential contains invalid characters".to_string())
            })?;
            value.set_sensitive(true);
            builder = builder.header(AUTHORIZATION, value);
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                PortalError::ConnectionTimeout
            } else {
                PortalError::NetworkError(format!("HTTP request failed: {}", e))
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| PortalError::NetworkError(format!("Failed to read response: {}", e)))?;

        Ok(RawResponse {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::gateway::RequestGateway;

    #[test]
    fn trailing_slash_is_trimmed() {
        let transport =
            ReqwestTransport::new("http://localhost:8080/", Duration::from_secs(5)).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8080");
    }

    #[tokio::test]
    #[ignore = "requires running portal backend at localhost:8080"]
    async fn test_real_me_call() {
        let transport =
            ReqwestTransport::new("http://localhost:8080", Duration::from_secs(5)).unwrap();
        let gateway = RequestGateway::new(transport);
        let failure = gateway
            .call(HttpMethod::Get, "/auth/me", None, None)
            .await
            .unwrap_err();
        assert_eq!(failure.status, Some(401));
    }
}
