// lib.rs - Core library structure for the portal client

pub mod api;
pub mod app_state;
pub mod auth;
pub mod classify;
pub mod config_store;
pub mod controller;
pub mod credential;
pub mod environment;
pub mod errors;
pub mod gateway;
pub mod pages;
pub mod portal;
pub mod reauth;
pub mod session;
pub mod storage;
pub mod telegram;
pub mod transport;
pub mod validation;
pub mod view;

// Re-export common types
pub use api::types::*;
pub use app_state::PortalContext;
pub use auth::{Authenticated, Authenticator};
pub use classify::{classify, ErrorOutcome};
pub use config_store::{AuthScheme, ConfigStore, PortalConfig};
pub use controller::{
    ActionController, ActionPayload, ActionResult, ActionSlot, PendingAction, SubmitOutcome,
};
pub use credential::{Credential, CredentialStore};
pub use environment::{EnvSettings, Environment};
pub use errors::{PortalError, PortalResult};
pub use gateway::{
    GatewayFailure, HttpMethod, HttpTransport, OutboundRequest, RawResponse, RequestGateway,
};
pub use pages::{ClientPage, ManagerPage};
pub use portal::{Portal, PortalOptions, SignInOutcome};
pub use reauth::{
    PromptOutcome, PromptSubmission, ReauthCoordinator, ReauthPrompt, ReauthResult,
};
pub use session::{Identity, Region, SessionMachine, SessionState};
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, PortalPaths};
pub use transport::ReqwestTransport;
pub use validation::InputValidator;
pub use view::{DisplayState, MessageTone, StatusLine};
