//! Uniform outbound call path shared by every page role.
//!
//! The gateway attaches the caller's credential, decodes every body as JSON
//! and turns non-success statuses into [`GatewayFailure`]. It never touches
//! session or credential state; reacting to failures is the caller's job.

use std::fmt;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::classify::{classify, failure_message, ErrorOutcome};
use crate::credential::Credential;
use crate::errors::PortalResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request as handed to the transport. `path` includes any query string.
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<Value>,
    pub authorization: Option<SecretString>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Moves bytes; cookie-based sessions are the transport's concern.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: OutboundRequest) -> PortalResult<RawResponse>;
}

/// A call that did not produce a usable success body.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayFailure {
    /// `None` when no status was received (transport failure) or the
    /// success body did not match the expected shape.
    pub status: Option<u16>,
    pub body: Value,
    pub message: String,
}

impl GatewayFailure {
    fn transport(message: String) -> Self {
        Self {
            status: None,
            body: empty_body(),
            message,
        }
    }

    pub fn outcome(&self) -> ErrorOutcome {
        match self.status {
            Some(status) => classify(status, &self.body),
            None => ErrorOutcome::Generic(self.message.clone()),
        }
    }
}

impl fmt::Display for GatewayFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub struct RequestGateway<T> {
    transport: T,
}

impl<T: HttpTransport> RequestGateway<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn call(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        credential: Option<&Credential>,
    ) -> Result<Value, GatewayFailure> {
        let request = OutboundRequest {
            method,
            path: path.to_string(),
            body,
            authorization: credential.and_then(Credential::authorization_header),
        };

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(err) => {
                log::warn!("{} {} failed before a status was received: {}", method, path, err);
                return Err(GatewayFailure::transport(err.to_string()));
            }
        };

        let decoded = decode_body(&response.body);
        if response.is_success() {
            log::debug!("{} {} -> {}", method, path, response.status);
            return Ok(decoded);
        }

        log::debug!("{} {} -> {} (failure)", method, path, response.status);
        Err(GatewayFailure {
            status: Some(response.status),
            message: failure_message(&decoded),
            body: decoded,
        })
    }

    /// Like [`call`](Self::call) but deserializes the success body.
    pub async fn call_as<R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        credential: Option<&Credential>,
    ) -> Result<R, GatewayFailure> {
        let value = self.call(method, path, body, credential).await?;
        serde_json::from_value(value.clone()).map_err(|err| GatewayFailure {
            status: None,
            body: value,
            message: format!("Invalid response: {}", err),
        })
    }
}

/// Undecodable or empty bodies read as `{}`.
pub fn decode_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return empty_body();
    }
    serde_json::from_slice(bytes).unwrap_or_else(|_| empty_body())
}

fn empty_body() -> Value {
    Value::Object(Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PortalError;
    use parking_lot::Mutex;
    use secrecy::ExposeSecret;
    use serde_json::json;

    #[derive(Default)]
    struct OneShot {
        reply: Mutex<Option<PortalResult<RawResponse>>>,
        seen: Mutex<Vec<(HttpMethod, String, Option<String>)>>,
    }

    impl OneShot {
        fn replying(status: u16, body: &str) -> Self {
            let shot = Self::default();
            *shot.reply.lock() = Some(Ok(RawResponse {
                status,
                body: body.as_bytes().to_vec(),
            }));
            shot
        }
    }

    #[async_trait]
    impl HttpTransport for OneShot {
        async fn send(&self, request: OutboundRequest) -> PortalResult<RawResponse> {
            self.seen.lock().push((
                request.method,
                request.path.clone(),
                request
                    .authorization
                    .as_ref()
                    .map(|h| h.expose_secret().to_string()),
            ));
            self.reply
                .lock()
                .take()
                .unwrap_or_else(|| Err(PortalError::NetworkError("no reply".into())))
        }
    }

    #[tokio::test]
    async fn attaches_basic_header_when_credential_present() {
        let gateway = RequestGateway::new(OneShot::replying(200, r#"{"Current balance": 5}"#));
        let credential = Credential::basic("ann@example.com", "hunter2");
        let value = gateway
            .call(HttpMethod::Get, "/api/users/balance", None, Some(&credential))
            .await
            .unwrap();

        assert_eq!(value, json!({"Current balance": 5}));
        let seen = gateway.transport().seen.lock();
        assert_eq!(
            seen[0].2.as_deref(),
            Some("Basic YW5uQGV4YW1wbGUuY29tOmh1bnRlcjI=")
        );
    }

    #[tokio::test]
    async fn anonymous_calls_carry_no_header() {
        let gateway = RequestGateway::new(OneShot::replying(200, "{}"));
        gateway
            .call(HttpMethod::Post, "/api/users/signin", Some(json!({})), None)
            .await
            .unwrap();
        assert_eq!(gateway.transport().seen.lock()[0].2, None);
    }

    #[tokio::test]
    async fn failure_message_falls_back_through_detail_and_error() {
        let gateway = RequestGateway::new(OneShot::replying(400, r#"{"error": "bad login"}"#));
        let failure = gateway
            .call(HttpMethod::Post, "/auth/login", None, None)
            .await
            .unwrap_err();
        assert_eq!(failure.status, Some(400));
        assert_eq!(failure.message, "bad login");

        let gateway = RequestGateway::new(OneShot::replying(500, "<html>oops</html>"));
        let failure = gateway
            .call(HttpMethod::Get, "/auth/me", None, None)
            .await
            .unwrap_err();
        assert_eq!(failure.message, "Request failed");
        assert_eq!(failure.body, json!({}));
    }

    #[tokio::test]
    async fn transport_errors_become_generic() {
        let gateway = RequestGateway::new(OneShot::default());
        let failure = gateway
            .call(HttpMethod::Get, "/auth/me", None, None)
            .await
            .unwrap_err();
        assert_eq!(failure.status, None);
        assert_eq!(
            failure.outcome(),
            ErrorOutcome::Generic("Network error: no reply".into())
        );
    }

    #[tokio::test]
    async fn call_as_reports_shape_mismatch() {
        let gateway = RequestGateway::new(OneShot::replying(200, r#"{"user_id": "x"}"#));
        let failure = gateway
            .call_as::<crate::api::types::MeResponse>(HttpMethod::Get, "/auth/me", None, None)
            .await
            .unwrap_err();
        assert!(failure.message.starts_with("Invalid response"));
    }

    #[test]
    fn empty_and_garbage_bodies_decode_to_empty_object() {
        assert_eq!(decode_body(b""), json!({}));
        assert_eq!(decode_body(b"  \n"), json!({}));
        assert_eq!(decode_body(b"not json"), json!({}));
        assert_eq!(decode_body(b"null"), Value::Null);
        assert_eq!(decode_body(b"[1,2]"), json!([1, 2]));
    }
}
