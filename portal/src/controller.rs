//! Balance-gated action orchestration.
//!
//! Each user action occupies a slot while it is in flight; a second
//! submission into a busy slot is ignored. Failed calls are classified:
//! an expired session opens the reauth prompt and re-sends the same
//! payload once it is accepted, insufficient funds refreshes the balance
//! and stops, anything else is reported as-is.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::endpoints;
use crate::api::types::{BalanceResponse, Recommendation};
use crate::auth::{failure_text, Authenticator};
use crate::classify::ErrorOutcome;
use crate::gateway::{GatewayFailure, HttpMethod, HttpTransport, RequestGateway};
use crate::reauth::{
    PromptSubmission, ReauthCoordinator, ReauthPrompt, ReauthResult, SESSION_EXPIRED_MESSAGE,
    SIGNIN_FAILED_MESSAGE,
};
use crate::session::SessionMachine;
use crate::telegram;
use crate::validation::InputValidator;
use crate::view::{DisplayState, StatusLine};

pub const PROCESSING_MESSAGE: &str = "Processing...";
pub const RECOMMENDATIONS_READY_MESSAGE: &str = "Recommendations ready!";
pub const NO_RECOMMENDATIONS_MESSAGE: &str = "No recommendations found";
pub const BALANCE_UNAVAILABLE_MESSAGE: &str = "Unable to fetch balance";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionSlot {
    Prediction,
    TopUp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionPayload {
    Prediction { message: String, top: u32 },
    TopUp { email: String, amount: f64 },
}

impl ActionPayload {
    pub fn slot(&self) -> ActionSlot {
        match self {
            ActionPayload::Prediction { .. } => ActionSlot::Prediction,
            ActionPayload::TopUp { .. } => ActionSlot::TopUp,
        }
    }

    fn request(&self) -> (HttpMethod, String, Option<Value>) {
        match self {
            ActionPayload::Prediction { message, top } => (
                HttpMethod::Post,
                endpoints::new_prediction(message, *top),
                None,
            ),
            ActionPayload::TopUp { email, amount } => (
                HttpMethod::Post,
                endpoints::USERS_BALANCE_ADJUST.to_string(),
                Some(json!({ "email": email, "amount": amount })),
            ),
        }
    }
}

/// A submitted action that has not settled yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    pub id: Uuid,
    pub payload: ActionPayload,
}

impl PendingAction {
    fn new(payload: ActionPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionResult {
    Recommendations(Vec<Recommendation>),
    BalanceAdjusted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The slot already had an action in flight; nothing was sent.
    Ignored,
    /// Input was rejected before anything was sent.
    Rejected(String),
    Completed(ActionResult),
    InsufficientFunds(String),
    Failed(String),
    /// The reauth prompt was cancelled; the action was dropped.
    Abandoned,
    /// The session ended while the call was in flight.
    Discarded,
}

// Frees the slot when the submission settles or its future is dropped.
struct SlotGuard<'a> {
    pending: &'a Mutex<HashMap<ActionSlot, PendingAction>>,
    slot: ActionSlot,
    id: Uuid,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        let mut pending = self.pending.lock();
        if pending.get(&self.slot).map(|action| action.id) == Some(self.id) {
            pending.remove(&self.slot);
        }
    }
}

enum ReauthStep {
    /// Credentials were accepted; send the pending payload again.
    Resume,
    Stop(SubmitOutcome),
}

/// Single writer of pending actions, the balance cache and display state.
pub struct ActionController<T, P> {
    gateway: Arc<RequestGateway<T>>,
    session: SessionMachine,
    auth: Arc<Authenticator<T>>,
    reauth: ReauthCoordinator<P>,
    validator: InputValidator,
    pending: Mutex<HashMap<ActionSlot, PendingAction>>,
    display: RwLock<DisplayState>,
}

impl<T: HttpTransport, P: ReauthPrompt> ActionController<T, P> {
    pub fn new(
        gateway: Arc<RequestGateway<T>>,
        session: SessionMachine,
        auth: Arc<Authenticator<T>>,
        prompt: P,
        validator: InputValidator,
    ) -> Self {
        Self {
            gateway,
            session,
            auth,
            reauth: ReauthCoordinator::new(prompt),
            validator,
            pending: Mutex::new(HashMap::new()),
            display: RwLock::new(DisplayState::default()),
        }
    }

    pub fn display(&self) -> DisplayState {
        self.display.read().clone()
    }

    pub fn pending(&self, slot: ActionSlot) -> Option<PendingAction> {
        self.pending.lock().get(&slot).cloned()
    }

    pub fn is_pending(&self, slot: ActionSlot) -> bool {
        self.pending.lock().contains_key(&slot)
    }

    pub fn prompt(&self) -> &P {
        self.reauth.prompt()
    }

    pub(crate) fn update_display<F: FnOnce(&mut DisplayState)>(&self, update: F) {
        update(&mut *self.display.write());
    }

    /// Forget everything shown for the previous identity.
    pub(crate) fn reset_display(&self, message: StatusLine) {
        let mut display = self.display.write();
        display.reset();
        display.auth_message = message;
    }

    pub async fn submit(&self, payload: ActionPayload) -> SubmitOutcome {
        let slot = payload.slot();
        let action = {
            let mut pending = self.pending.lock();
            if pending.contains_key(&slot) {
                log::debug!("{:?} already in flight, ignoring submission", slot);
                return SubmitOutcome::Ignored;
            }
            let action = PendingAction::new(payload);
            pending.insert(slot, action.clone());
            action
        };
        let guard = SlotGuard {
            pending: &self.pending,
            slot,
            id: action.id,
        };

        self.update_display(|display| match slot {
            ActionSlot::Prediction => {
                display.prediction_message = StatusLine::info(PROCESSING_MESSAGE)
            }
            ActionSlot::TopUp => display.balance_message.clear(),
        });

        let epoch = self.session.epoch();
        loop {
            let result = self.dispatch(&action.payload).await;
            if self.session.epoch() != epoch {
                log::info!("Session ended while {:?} was in flight, dropping result", slot);
                return SubmitOutcome::Discarded;
            }

            let failure = match result {
                Ok(body) => {
                    drop(guard);
                    return self.settle_success(slot, body).await;
                }
                Err(failure) => failure,
            };

            match failure.outcome() {
                ErrorOutcome::Unauthenticated => match self.reauthenticate(epoch).await {
                    ReauthStep::Resume => {
                        log::info!("Re-sending action {} after reauthentication", action.id);
                        continue;
                    }
                    ReauthStep::Stop(outcome) => return outcome,
                },
                ErrorOutcome::InsufficientFunds(message) => {
                    drop(guard);
                    self.show_failure(slot, &message);
                    self.refresh_balance().await;
                    return SubmitOutcome::InsufficientFunds(message);
                }
                ErrorOutcome::Generic(message) => {
                    drop(guard);
                    self.show_failure(slot, &message);
                    return SubmitOutcome::Failed(message);
                }
            }
        }
    }

    /// Re-fetch the balance. A failure leaves the balance unknown.
    pub async fn refresh_balance(&self) -> Option<f64> {
        let epoch = self.session.epoch();
        let credential = self.session.credential();
        let result = self
            .gateway
            .call_as::<BalanceResponse>(
                HttpMethod::Get,
                endpoints::USERS_BALANCE,
                None,
                credential.as_ref(),
            )
            .await;
        if self.session.epoch() != epoch {
            return None;
        }

        let mut display = self.display.write();
        match result {
            Ok(balance) => {
                display.balance = balance.current_balance;
                display.balance_message.clear();
                balance.current_balance
            }
            Err(failure) => {
                log::warn!("Balance refresh failed: {}", failure);
                display.balance = None;
                display.balance_message = StatusLine::error(BALANCE_UNAVAILABLE_MESSAGE);
                None
            }
        }
    }

    pub async fn refresh_telegram_status(&self) {
        let epoch = self.session.epoch();
        let credential = self.session.credential();
        let status = telegram::fetch_status(&self.gateway, credential.as_ref()).await;
        if self.session.epoch() != epoch {
            return;
        }
        if let Some(status) = status {
            let mut display = self.display.write();
            display.telegram_status = Some(telegram::status_text(&status));
            display.telegram_linked = status.linked;
        }
    }

    /// Follow-up work after any successful authentication.
    pub async fn on_authenticated(&self) {
        self.update_display(DisplayState::clear_messages);
        self.refresh_balance().await;
        self.refresh_telegram_status().await;
    }

    async fn dispatch(&self, payload: &ActionPayload) -> Result<Value, GatewayFailure> {
        // read per dispatch so a re-send carries the credential from reauth
        let credential = self.session.credential();
        let (method, path, body) = payload.request();
        self.gateway
            .call(method, &path, body, credential.as_ref())
            .await
    }

    async fn settle_success(&self, slot: ActionSlot, body: Value) -> SubmitOutcome {
        let result = match slot {
            ActionSlot::Prediction => match serde_json::from_value::<Vec<Recommendation>>(body) {
                Ok(list) => {
                    self.update_display(|display| {
                        if list.is_empty() {
                            display.recommendations.clear();
                            display.prediction_message =
                                StatusLine::error(NO_RECOMMENDATIONS_MESSAGE);
                        } else {
                            display.recommendations = list.clone();
                            display.prediction_message =
                                StatusLine::success(RECOMMENDATIONS_READY_MESSAGE);
                            display.prompt_input.clear();
                        }
                    });
                    ActionResult::Recommendations(list)
                }
                Err(err) => {
                    let message = format!("Invalid response: {}", err);
                    self.show_failure(slot, &message);
                    return SubmitOutcome::Failed(message);
                }
            },
            ActionSlot::TopUp => {
                self.update_display(|display| {
                    display.top_up_input.clear();
                    display.balance_message.clear();
                });
                ActionResult::BalanceAdjusted
            }
        };

        self.refresh_balance().await;
        SubmitOutcome::Completed(result)
    }

    fn show_failure(&self, slot: ActionSlot, message: &str) {
        self.update_display(|display| {
            let line = StatusLine::error(message);
            match slot {
                ActionSlot::Prediction => display.prediction_message = line,
                ActionSlot::TopUp => display.balance_message = line,
            }
        });
    }

    async fn reauthenticate(&self, epoch: u64) -> ReauthStep {
        self.session.begin_reauth();
        let run = self
            .reauth
            .run(SESSION_EXPIRED_MESSAGE, |submission| {
                self.verify_submission(submission, epoch)
            })
            .await;

        if run.joined {
            return match run.result {
                ReauthResult::Restored if self.session.epoch() == epoch => ReauthStep::Resume,
                ReauthResult::Restored => ReauthStep::Stop(SubmitOutcome::Discarded),
                ReauthResult::Abandoned => ReauthStep::Stop(SubmitOutcome::Abandoned),
            };
        }
        if self.session.epoch() != epoch {
            log::info!("Session ended while the sign-in prompt was open");
            return ReauthStep::Stop(SubmitOutcome::Discarded);
        }
        match run.result {
            ReauthResult::Restored => {
                self.on_authenticated().await;
                ReauthStep::Resume
            }
            ReauthResult::Abandoned => {
                self.session.abandon_reauth();
                self.reset_display(StatusLine::error(SESSION_EXPIRED_MESSAGE));
                ReauthStep::Stop(SubmitOutcome::Abandoned)
            }
        }
    }

    /// Close an open reauth prompt; used when the session ends elsewhere.
    pub(crate) fn cancel_reauth(&self) {
        if self.reauth.cancel() {
            log::debug!("Closed the sign-in prompt of an ended session");
        }
    }

    async fn verify_submission(
        &self,
        submission: PromptSubmission,
        epoch: u64,
    ) -> Result<(), String> {
        use secrecy::ExposeSecret;

        self.validator
            .validate_credentials(&submission.identity, submission.secret.expose_secret())
            .map_err(|err| err.to_string())?;

        let authenticated = self
            .auth
            .authenticate(&submission.identity, &submission.secret)
            .await
            .map_err(|outcome| failure_text(&outcome, SIGNIN_FAILED_MESSAGE))?;
        // a sign-out during verification must not be undone
        if self.session.epoch() != epoch {
            return Err(SESSION_EXPIRED_MESSAGE.to_string());
        }
        self.session
            .complete_reauth(authenticated.credential, authenticated.identity);
        Ok(())
    }
}
