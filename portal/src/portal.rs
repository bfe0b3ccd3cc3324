//! Front-end facing entry point.
//!
//! A [`Portal`] owns one gateway, one session machine and one action
//! controller. Front ends call it for every user event and render
//! [`Portal::display`] afterwards.

use std::collections::BTreeSet;
use std::sync::Arc;

use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::{failure_text, Authenticated, Authenticator};
use crate::config_store::{AuthScheme, PortalConfig};
use crate::controller::{ActionController, ActionPayload, SubmitOutcome};
use crate::credential::{Credential, CredentialStore};
use crate::errors::{PortalError, PortalResult};
use crate::gateway::{HttpMethod, HttpTransport, RequestGateway};
use crate::pages::{ClientPage, ManagerPage};
use crate::reauth::{ReauthPrompt, SIGNIN_FAILED_MESSAGE};
use crate::session::{Identity, Region, SessionMachine, SessionState};
use crate::telegram;
use crate::validation::InputValidator;
use crate::view::{DisplayState, StatusLine};

pub const SIGNED_IN_MESSAGE: &str = "Signed in";
pub const SIGNED_UP_MESSAGE: &str = "Signed up";
pub const SIGNUP_FAILED_MESSAGE: &str = "Signup failed";
pub const LOGGED_IN_MESSAGE: &str = "Logged in";
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed";
pub const LOGGED_OUT_MESSAGE: &str = "Logged out";
pub const CREDENTIALS_FORGOTTEN_MESSAGE: &str = "Stored credentials removed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortalOptions {
    pub auth_scheme: AuthScheme,
    pub prediction_top: u32,
    pub persist_credentials: bool,
}

impl PortalOptions {
    pub fn from_config(config: &PortalConfig, persist_credentials: bool) -> Self {
        Self {
            auth_scheme: config.session.auth_scheme,
            prediction_top: config.prediction.top.max(1),
            persist_credentials,
        }
    }
}

impl Default for PortalOptions {
    fn default() -> Self {
        Self {
            auth_scheme: AuthScheme::Basic,
            prediction_top: 10,
            persist_credentials: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    SignedIn {
        identity: Identity,
        redirect: Option<String>,
    },
    /// Input was incomplete; nothing was sent.
    Rejected(String),
    Failed(String),
}

impl SignInOutcome {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, SignInOutcome::SignedIn { .. })
    }
}

#[derive(Debug, Clone, Copy)]
enum BasicFlow {
    SignIn,
    SignUp,
}

pub struct Portal<T, P> {
    gateway: Arc<RequestGateway<T>>,
    session: SessionMachine,
    auth: Arc<Authenticator<T>>,
    controller: ActionController<T, P>,
    validator: InputValidator,
    options: PortalOptions,
}

impl<T: HttpTransport, P: ReauthPrompt> Portal<T, P> {
    pub fn new(
        transport: T,
        prompt: P,
        credentials: CredentialStore,
        options: PortalOptions,
    ) -> PortalResult<Self> {
        let validator = InputValidator::new()?;
        let gateway = Arc::new(RequestGateway::new(transport));
        let session = SessionMachine::new(credentials, options.persist_credentials);
        let auth = Arc::new(Authenticator::new(gateway.clone(), options.auth_scheme));
        let controller = ActionController::new(
            gateway.clone(),
            session.clone(),
            auth.clone(),
            prompt,
            validator.clone(),
        );

        Ok(Self {
            gateway,
            session,
            auth,
            controller,
            validator,
            options,
        })
    }

    pub fn options(&self) -> PortalOptions {
        self.options
    }

    pub fn gateway(&self) -> &RequestGateway<T> {
        &self.gateway
    }

    pub fn session(&self) -> &SessionMachine {
        &self.session
    }

    pub fn controller(&self) -> &ActionController<T, P> {
        &self.controller
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn display(&self) -> DisplayState {
        self.controller.display()
    }

    pub fn visible_regions(&self) -> BTreeSet<Region> {
        self.session.visible_regions()
    }

    /// Derive the initial state: stored pair for Basic, `/auth/me` for cookies.
    pub async fn start(&self) -> SessionState {
        match self.auth.scheme() {
            AuthScheme::Basic => {
                let state = self.session.restore();
                if self.session.is_authenticated() {
                    self.controller.on_authenticated().await;
                } else {
                    self.controller.reset_display(StatusLine::default());
                }
                state
            }
            AuthScheme::Cookie => self.resume_session().await,
        }
    }

    /// Ask the backend whether the cookie jar still holds a live session.
    pub async fn resume_session(&self) -> SessionState {
        match self.auth.me(None).await {
            Ok(me) => {
                let name = me.user_id.to_string();
                let identity = Identity::named(name.clone()).with_account(me.user_id, me.role);
                self.session.establish(Credential::session(name), identity);
                self.controller.on_authenticated().await;
            }
            Err(outcome) => {
                if !outcome.is_unauthenticated() {
                    log::warn!("Unable to resume session: {}", outcome.message());
                }
                if self.session.is_authenticated() {
                    self.session.sign_out();
                }
                self.controller.reset_display(StatusLine::default());
            }
        }
        self.session.state()
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> SignInOutcome {
        self.basic_flow(BasicFlow::SignIn, email, password).await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> SignInOutcome {
        self.basic_flow(BasicFlow::SignUp, email, password).await
    }

    /// Cookie login used by the role pages.
    pub async fn login(&self, login: &str, password: &str) -> SignInOutcome {
        if let Err(err) = self.validator.validate_credentials(login, password) {
            return self.reject_auth(err.to_string());
        }
        let secret = SecretString::from(password.to_string());
        match self.auth.login(login.trim(), &secret).await {
            Ok(authenticated) => self.finish_auth(authenticated, LOGGED_IN_MESSAGE).await,
            Err(outcome) => self.fail_auth(failure_text(&outcome, LOGIN_FAILED_MESSAGE)),
        }
    }

    /// Explicit sign-out. Cookie sessions are also ended server-side and an
    /// open reauth prompt is closed without resuming its action.
    pub async fn sign_out(&self) {
        if let Some(credential) = self.session.credential() {
            if credential.is_session() {
                if let Err(outcome) = self.auth.logout().await {
                    log::warn!("Server logout failed: {}", outcome.message());
                }
            }
        }
        self.session.sign_out();
        self.controller.cancel_reauth();
        self.controller
            .reset_display(StatusLine::info(LOGGED_OUT_MESSAGE));
    }

    /// Remove the stored pair without ending the current session.
    pub fn forget_credentials(&self) {
        self.session.forget();
        self.controller.update_display(|display| {
            display.auth_message = StatusLine::info(CREDENTIALS_FORGOTTEN_MESSAGE)
        });
    }

    pub async fn refresh_balance(&self) -> Option<f64> {
        self.controller.refresh_balance().await
    }

    pub fn set_prompt_input(&self, text: &str) {
        let text = text.to_string();
        self.controller
            .update_display(|display| display.prompt_input = text);
    }

    pub fn set_top_up_input(&self, text: &str) {
        let text = text.to_string();
        self.controller
            .update_display(|display| display.top_up_input = text);
    }

    /// Send the prompt field as a prediction request.
    pub async fn submit_prediction(&self) -> SubmitOutcome {
        let raw = self.controller.display().prompt_input;
        let message = match self.validator.validate_prompt(&raw) {
            Ok(message) => message,
            Err(err) => {
                let text = err.to_string();
                self.controller.update_display(|display| {
                    display.prediction_message = StatusLine::error(text.clone())
                });
                return SubmitOutcome::Rejected(text);
            }
        };
        self.controller
            .submit(ActionPayload::Prediction {
                message,
                top: self.options.prediction_top,
            })
            .await
    }

    /// Fill the prompt field and submit it.
    pub async fn predict(&self, text: &str) -> SubmitOutcome {
        self.set_prompt_input(text);
        self.submit_prediction().await
    }

    /// Credit the amount in the top-up field to the signed-in account.
    pub async fn top_up(&self) -> SubmitOutcome {
        let raw = self.controller.display().top_up_input;
        let email = self
            .session
            .credential()
            .map(|credential| credential.identity().to_string());
        let amount = match self.validator.validate_top_up(&raw, email.as_deref()) {
            Ok(amount) => amount,
            Err(err) => {
                let text = err.to_string();
                self.controller.update_display(|display| {
                    display.balance_message = StatusLine::error(text.clone())
                });
                return SubmitOutcome::Rejected(text);
            }
        };
        let Some(email) = email else {
            return SubmitOutcome::Rejected(crate::validation::MSG_ENTER_AMOUNT.to_string());
        };
        self.controller
            .submit(ActionPayload::TopUp { email, amount })
            .await
    }

    pub async fn refresh_telegram_status(&self) {
        self.controller.refresh_telegram_status().await
    }

    /// Request a link token; the instructions are shown in the display.
    pub async fn link_telegram(&self, phone: &str) -> PortalResult<String> {
        let phone = self.validator.validate_phone(phone)?;
        let credential = self.session.credential();
        match telegram::init_link(&self.gateway, credential.as_ref(), &phone).await {
            Ok(token) => {
                let instructions = telegram::token_instructions(&token);
                self.controller
                    .update_display(|display| display.telegram_token = Some(instructions));
                Ok(token)
            }
            Err(failure) => {
                log::warn!("Telegram link token request failed: {}", failure);
                self.controller
                    .update_display(|display| display.telegram_token = None);
                Err(PortalError::Request(telegram::LINK_FAILED_TEXT.to_string()))
            }
        }
    }

    pub async fn unlink_telegram(&self) -> PortalResult<()> {
        let credential = self.session.credential();
        telegram::unlink(&self.gateway, credential.as_ref())
            .await
            .map_err(|failure| PortalError::from(failure.outcome()))?;
        self.controller.refresh_telegram_status().await;
        Ok(())
    }

    pub fn client_page(&self) -> ClientPage<'_, T, P> {
        ClientPage::new(self)
    }

    pub fn manager_page(&self) -> ManagerPage<'_, T, P> {
        ManagerPage::new(self)
    }

    /// Role page request; an expired session signs the user out.
    pub(crate) async fn page_call<R: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> PortalResult<R> {
        let credential = self.session.credential();
        match self
            .gateway
            .call_as(method, path, body, credential.as_ref())
            .await
        {
            Ok(value) => Ok(value),
            Err(failure) => {
                let outcome = failure.outcome();
                if outcome.is_unauthenticated() {
                    log::info!("{} {} rejected the session, signing out", method, path);
                    self.session.sign_out();
                    self.controller.cancel_reauth();
                    self.controller.reset_display(StatusLine::default());
                }
                Err(PortalError::from(outcome))
            }
        }
    }

    async fn basic_flow(&self, flow: BasicFlow, email: &str, password: &str) -> SignInOutcome {
        if let Err(err) = self.validator.validate_credentials(email, password) {
            return self.reject_auth(err.to_string());
        }
        let email = email.trim();
        let secret = SecretString::from(password.to_string());
        let (result, success, fallback) = match flow {
            BasicFlow::SignIn => (
                self.auth.sign_in(email, &secret).await,
                SIGNED_IN_MESSAGE,
                SIGNIN_FAILED_MESSAGE,
            ),
            BasicFlow::SignUp => (
                self.auth.sign_up(email, &secret).await,
                SIGNED_UP_MESSAGE,
                SIGNUP_FAILED_MESSAGE,
            ),
        };
        match result {
            Ok(authenticated) => self.finish_auth(authenticated, success).await,
            Err(outcome) => self.fail_auth(failure_text(&outcome, fallback)),
        }
    }

    async fn finish_auth(&self, authenticated: Authenticated, message: &str) -> SignInOutcome {
        let identity = authenticated.identity.clone();
        self.session
            .establish(authenticated.credential, authenticated.identity);
        self.controller.on_authenticated().await;
        self.controller
            .update_display(|display| display.auth_message = StatusLine::success(message));
        SignInOutcome::SignedIn {
            identity,
            redirect: authenticated.redirect,
        }
    }

    fn reject_auth(&self, text: String) -> SignInOutcome {
        self.controller
            .update_display(|display| display.auth_message = StatusLine::error(text.clone()));
        SignInOutcome::Rejected(text)
    }

    fn fail_auth(&self, text: String) -> SignInOutcome {
        self.controller.update_display(|display| {
            display.auth_message = StatusLine::error(text.clone());
            display.prediction_message.clear();
            display.balance_message.clear();
        });
        SignInOutcome::Failed(text)
    }
}
