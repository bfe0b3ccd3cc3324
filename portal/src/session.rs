use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::credential::{Credential, CredentialStore};

/// Who the backend believes the user is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub user_id: Option<i64>,
    pub role: Option<String>,
}

impl Identity {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            user_id: None,
            role: None,
        }
    }

    pub fn with_account(mut self, user_id: i64, role: Option<String>) -> Self {
        self.user_id = Some(user_id);
        self.role = role;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(Identity),
    /// A call was rejected as unauthenticated and the reauth prompt is open.
    /// Carries the identity that was active before, if any.
    Reauthenticating(Option<Identity>),
}

/// UI regions whose visibility follows the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Region {
    AuthInputs,
    AuthStatus,
    BalanceCard,
    HistoryLinks,
    PredictionControls,
    TelegramControls,
    ReauthOverlay,
}

const AUTHENTICATED_REGIONS: [Region; 5] = [
    Region::AuthStatus,
    Region::BalanceCard,
    Region::HistoryLinks,
    Region::PredictionControls,
    Region::TelegramControls,
];

/// Pure projection of a session state onto visible regions.
pub fn visible_regions(state: &SessionState) -> BTreeSet<Region> {
    match state {
        SessionState::Anonymous => BTreeSet::from([Region::AuthInputs]),
        SessionState::Authenticated(_) => AUTHENTICATED_REGIONS.into_iter().collect(),
        SessionState::Reauthenticating(Some(_)) => AUTHENTICATED_REGIONS
            .into_iter()
            .chain([Region::ReauthOverlay])
            .collect(),
        SessionState::Reauthenticating(None) => {
            BTreeSet::from([Region::AuthInputs, Region::ReauthOverlay])
        }
    }
}

#[derive(Debug)]
struct SessionInner {
    state: SessionState,
    credential: Option<Credential>,
    /// Bumped whenever a session ends, so in-flight work can tell its
    /// results belong to an identity that is gone.
    epoch: u64,
}

/// Single writer of the active credential and the session state.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    inner: Arc<RwLock<SessionInner>>,
    store: CredentialStore,
    persist: bool,
}

impl SessionMachine {
    pub fn new(store: CredentialStore, persist: bool) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionInner {
                state: SessionState::Anonymous,
                credential: None,
                epoch: 0,
            })),
            store,
            persist,
        }
    }

    /// Re-derive the state from persisted credentials.
    pub fn restore(&self) -> SessionState {
        let loaded = if self.persist { self.store.load() } else { None };
        let mut inner = self.inner.write();
        match loaded {
            Some(credential) => {
                log::info!("Restored stored credentials for {}", credential.identity());
                inner.state = SessionState::Authenticated(Identity::named(credential.identity()));
                inner.credential = Some(credential);
            }
            None => {
                inner.state = SessionState::Anonymous;
                inner.credential = None;
            }
        }
        inner.state.clone()
    }

    pub fn state(&self) -> SessionState {
        self.inner.read().state.clone()
    }

    /// True while a credential is active, including during reauth.
    pub fn is_authenticated(&self) -> bool {
        !matches!(
            self.inner.read().state,
            SessionState::Anonymous | SessionState::Reauthenticating(None)
        )
    }

    pub fn is_reauthenticating(&self) -> bool {
        matches!(self.inner.read().state, SessionState::Reauthenticating(_))
    }

    pub fn identity(&self) -> Option<Identity> {
        match &self.inner.read().state {
            SessionState::Authenticated(identity) => Some(identity.clone()),
            SessionState::Reauthenticating(previous) => previous.clone(),
            SessionState::Anonymous => None,
        }
    }

    pub fn credential(&self) -> Option<Credential> {
        self.inner.read().credential.clone()
    }

    pub fn epoch(&self) -> u64 {
        self.inner.read().epoch
    }

    pub fn visible_regions(&self) -> BTreeSet<Region> {
        visible_regions(&self.inner.read().state)
    }

    /// Anonymous (or any state) -> Authenticated. Replaces any previous credential.
    pub fn establish(&self, credential: Credential, identity: Identity) {
        self.persist_credential(&credential);
        let mut inner = self.inner.write();
        log::info!("Session established for {}", identity.name);
        inner.state = SessionState::Authenticated(identity);
        inner.credential = Some(credential);
    }

    /// Authenticated -> Anonymous. Returns the identity that was signed out.
    pub fn sign_out(&self) -> Option<Identity> {
        self.store.clear();
        let mut inner = self.inner.write();
        let previous = match std::mem::replace(&mut inner.state, SessionState::Anonymous) {
            SessionState::Authenticated(identity) => Some(identity),
            SessionState::Reauthenticating(previous) => previous,
            SessionState::Anonymous => None,
        };
        inner.credential = None;
        inner.epoch += 1;
        if let Some(identity) = &previous {
            log::info!("Session ended for {}", identity.name);
        }
        previous
    }

    /// Enter the reauth sub-state. Returns `false` if already in it.
    pub fn begin_reauth(&self) -> bool {
        let mut inner = self.inner.write();
        let previous = match &inner.state {
            SessionState::Reauthenticating(_) => return false,
            SessionState::Authenticated(identity) => Some(identity.clone()),
            SessionState::Anonymous => None,
        };
        log::info!("Credentials rejected, reauthentication required");
        inner.state = SessionState::Reauthenticating(previous);
        true
    }

    /// Reauthenticating -> Authenticated with freshly verified credentials.
    pub fn complete_reauth(&self, credential: Credential, identity: Identity) {
        self.establish(credential, identity);
    }

    /// Reauthenticating -> Anonymous after the prompt was cancelled.
    pub fn abandon_reauth(&self) {
        if self.sign_out().is_none() {
            log::debug!("Reauthentication abandoned without a prior identity");
        }
    }

    /// Drop stored credentials locally without ending the in-memory session.
    pub fn forget(&self) {
        self.store.clear();
    }

    fn persist_credential(&self, credential: &Credential) {
        if !self.persist {
            return;
        }
        match credential {
            Credential::Basic { identity, secret } => {
                self.store.save(identity, secret);
            }
            // the cookie jar owns session credentials
            Credential::Session { .. } => self.store.clear(),
        }
    }
}
