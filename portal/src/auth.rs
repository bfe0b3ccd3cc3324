//! Backend calls that establish or end an identity.
//!
//! These only talk to the backend; recording the result in the session is
//! left to the caller.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::api::endpoints;
use crate::api::types::{CredentialsRequest, LoginRequest, LoginResponse, MeResponse};
use crate::classify::{ErrorOutcome, DEFAULT_FAILURE_MESSAGE};
use crate::config_store::AuthScheme;
use crate::credential::Credential;
use crate::gateway::{HttpMethod, HttpTransport, RequestGateway};
use crate::session::Identity;

/// A verified identity together with the credential proving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    pub credential: Credential,
    pub identity: Identity,
    /// Landing page suggested by `/auth/login`.
    pub redirect: Option<String>,
}

pub struct Authenticator<T> {
    gateway: Arc<RequestGateway<T>>,
    scheme: AuthScheme,
}

impl<T: HttpTransport> Authenticator<T> {
    pub fn new(gateway: Arc<RequestGateway<T>>, scheme: AuthScheme) -> Self {
        Self { gateway, scheme }
    }

    pub fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    /// Verify an email/password pair against `/api/users/signin`.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Authenticated, ErrorOutcome> {
        self.basic_call(endpoints::USERS_SIGNIN, email, password)
            .await
    }

    /// Register a new account; success signs the user in.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Authenticated, ErrorOutcome> {
        self.basic_call(endpoints::USERS_SIGNUP, email, password)
            .await
    }

    /// Cookie login followed by `/auth/me` to learn the account and role.
    pub async fn login(
        &self,
        login: &str,
        password: &SecretString,
    ) -> Result<Authenticated, ErrorOutcome> {
        let request = LoginRequest {
            login: login.to_string(),
            password: password.expose_secret().to_string(),
        };
        let response: LoginResponse = self
            .gateway
            .call_as(HttpMethod::Post, endpoints::AUTH_LOGIN, Some(to_body(&request)?), None)
            .await
            .map_err(|failure| failure.outcome())?;

        let credential = Credential::session(login);
        let me = self.me(Some(&credential)).await?;
        Ok(Authenticated {
            identity: Identity::named(login).with_account(me.user_id, me.role.or(response.role)),
            credential,
            redirect: response.redirect,
        })
    }

    pub async fn me(&self, credential: Option<&Credential>) -> Result<MeResponse, ErrorOutcome> {
        self.gateway
            .call_as(HttpMethod::Get, endpoints::AUTH_ME, None, credential)
            .await
            .map_err(|failure| failure.outcome())
    }

    /// Ask the backend to drop the session cookie.
    pub async fn logout(&self) -> Result<(), ErrorOutcome> {
        self.gateway
            .call(HttpMethod::Post, endpoints::AUTH_LOGOUT, None, None)
            .await
            .map(|_| ())
            .map_err(|failure| failure.outcome())
    }

    /// Verify a pair the way the configured scheme signs users in.
    pub async fn authenticate(
        &self,
        identity: &str,
        secret: &SecretString,
    ) -> Result<Authenticated, ErrorOutcome> {
        match self.scheme {
            AuthScheme::Basic => self.sign_in(identity, secret).await,
            AuthScheme::Cookie => self.login(identity, secret).await,
        }
    }

    async fn basic_call(
        &self,
        path: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<Authenticated, ErrorOutcome> {
        let request = CredentialsRequest {
            email: email.to_string(),
            password: password.expose_secret().to_string(),
        };
        self.gateway
            .call(HttpMethod::Post, path, Some(to_body(&request)?), None)
            .await
            .map_err(|failure| failure.outcome())?;

        Ok(Authenticated {
            credential: Credential::Basic {
                identity: email.to_string(),
                secret: SecretString::from(password.expose_secret().to_owned()),
            },
            identity: Identity::named(email),
            redirect: None,
        })
    }
}

/// User-facing text for a failed authentication call.
///
/// A rejected pair or a failure without a server message reads as
/// `fallback`; anything the server explained is shown as sent.
pub fn failure_text(outcome: &ErrorOutcome, fallback: &str) -> String {
    match outcome {
        ErrorOutcome::Unauthenticated => fallback.to_string(),
        ErrorOutcome::InsufficientFunds(message) | ErrorOutcome::Generic(message) => {
            if message.is_empty() || message == DEFAULT_FAILURE_MESSAGE {
                fallback.to_string()
            } else {
                message.clone()
            }
        }
    }
}

fn to_body<S: serde::Serialize>(request: &S) -> Result<Value, ErrorOutcome> {
    serde_json::to_value(request)
        .map_err(|err| ErrorOutcome::Generic(format!("Unable to encode request: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PortalResult;
    use crate::gateway::{OutboundRequest, RawResponse};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct Scripted {
        responses: Mutex<VecDeque<(u16, &'static str)>>,
        seen: Mutex<Vec<(HttpMethod, String, Option<Value>, bool)>>,
    }

    #[async_trait]
    impl HttpTransport for Scripted {
        async fn send(&self, request: OutboundRequest) -> PortalResult<RawResponse> {
            self.seen.lock().push((
                request.method,
                request.path.clone(),
                request.body.clone(),
                request.authorization.is_some(),
            ));
            let (status, body) = self.responses.lock().pop_front().unwrap_or((500, ""));
            Ok(RawResponse {
                status,
                body: body.as_bytes().to_vec(),
            })
        }
    }

    fn authenticator(
        scheme: AuthScheme,
        responses: Vec<(u16, &'static str)>,
    ) -> Authenticator<Scripted> {
        let transport = Scripted {
            responses: Mutex::new(responses.into()),
            ..Scripted::default()
        };
        Authenticator::new(Arc::new(RequestGateway::new(transport)), scheme)
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[tokio::test]
    async fn sign_in_posts_pair_without_authorization() {
        let auth = authenticator(AuthScheme::Basic, vec![(200, r#"{"ok":true}"#)]);
        let result = auth.sign_in("ann@example.com", &secret("pw")).await.unwrap();
        assert_eq!(result.credential, Credential::basic("ann@example.com", "pw"));
        assert_eq!(result.identity, Identity::named("ann@example.com"));

        let seen = auth.gateway.transport().seen.lock();
        assert_eq!(seen[0].0, HttpMethod::Post);
        assert_eq!(seen[0].1, endpoints::USERS_SIGNIN);
        assert_eq!(
            seen[0].2,
            Some(serde_json::json!({"email": "ann@example.com", "password": "pw"}))
        );
        assert!(!seen[0].3);
    }

    #[tokio::test]
    async fn rejected_sign_in_is_classified() {
        let auth = authenticator(AuthScheme::Basic, vec![(401, r#"{"detail":"bad"}"#)]);
        let err = auth.sign_in("a", &secret("b")).await.unwrap_err();
        assert_eq!(err, ErrorOutcome::Unauthenticated);
    }

    #[tokio::test]
    async fn cookie_login_reads_role_from_me() {
        let auth = authenticator(
            AuthScheme::Cookie,
            vec![
                (200, r#"{"redirect":"/manager","user_id":3,"role":"manager"}"#),
                (200, r#"{"user_id":3,"role":"manager"}"#),
            ],
        );
        let result = auth.authenticate("boss", &secret("pw")).await.unwrap();
        assert_eq!(result.credential, Credential::session("boss"));
        assert_eq!(result.identity.user_id, Some(3));
        assert_eq!(result.identity.role.as_deref(), Some("manager"));
        assert_eq!(result.redirect.as_deref(), Some("/manager"));

        let seen = auth.gateway.transport().seen.lock();
        assert_eq!(seen[1].1, endpoints::AUTH_ME);
    }

    #[test]
    fn failure_text_prefers_server_explanation() {
        assert_eq!(
            failure_text(&ErrorOutcome::Unauthenticated, "Signin failed"),
            "Signin failed"
        );
        assert_eq!(
            failure_text(&ErrorOutcome::Generic(DEFAULT_FAILURE_MESSAGE.into()), "Signup failed"),
            "Signup failed"
        );
        assert_eq!(
            failure_text(
                &ErrorOutcome::Generic("Email already registered".into()),
                "Signup failed"
            ),
            "Email already registered"
        );
    }

    #[tokio::test]
    async fn login_without_session_fails_on_me() {
        let auth = authenticator(
            AuthScheme::Cookie,
            vec![(200, r#"{"user_id":3}"#), (401, "")],
        );
        let err = auth.login("boss", &secret("pw")).await.unwrap_err();
        assert!(err.is_unauthenticated());
    }
}
