//! Role pages for clients and credit managers.
//!
//! Every request goes through the portal's gateway with the session
//! credential. A page load that comes back unauthenticated ends the
//! session instead of prompting.

use serde_json::json;

use crate::api::endpoints;
use crate::api::types::{
    ClientDashboard, ClientDetail, ClientPatch, ClientRecord, ClientSummary, CreditRecord,
    ScoreRecord,
};
use crate::errors::{PortalError, PortalResult};
use crate::gateway::{HttpMethod, HttpTransport};
use crate::portal::Portal;
use crate::reauth::ReauthPrompt;

pub struct ClientPage<'a, T, P> {
    portal: &'a Portal<T, P>,
}

impl<'a, T: HttpTransport, P: ReauthPrompt> ClientPage<'a, T, P> {
    pub(crate) fn new(portal: &'a Portal<T, P>) -> Self {
        Self { portal }
    }

    pub async fn dashboard(&self) -> PortalResult<ClientDashboard> {
        self.portal
            .page_call(HttpMethod::Get, endpoints::CLIENT_DASHBOARD, None)
            .await
    }

    /// Ask the backend for a fresh score.
    pub async fn rescore(&self) -> PortalResult<ScoreRecord> {
        self.portal
            .page_call(HttpMethod::Post, endpoints::CLIENT_SCORE, Some(json!({})))
            .await
    }

    /// `None` when the client has no credit on record.
    pub async fn credit(&self) -> PortalResult<Option<CreditRecord>> {
        self.portal
            .page_call(HttpMethod::Get, endpoints::CLIENT_CREDIT, None)
            .await
    }
}

pub struct ManagerPage<'a, T, P> {
    portal: &'a Portal<T, P>,
}

impl<'a, T: HttpTransport, P: ReauthPrompt> ManagerPage<'a, T, P> {
    pub(crate) fn new(portal: &'a Portal<T, P>) -> Self {
        Self { portal }
    }

    /// Clients assigned to the manager, or every client when `all` is set.
    pub async fn clients(&self, all: bool) -> PortalResult<Vec<ClientRecord>> {
        self.portal
            .page_call(HttpMethod::Get, &endpoints::manager_clients(all), None)
            .await
    }

    pub async fn summaries(&self, all: bool) -> PortalResult<Vec<ClientSummary>> {
        self.portal
            .page_call(HttpMethod::Get, &endpoints::manager_clients_summary(all), None)
            .await
    }

    pub async fn client(&self, client_id: i64) -> PortalResult<ClientDetail> {
        self.portal
            .page_call(HttpMethod::Get, &endpoints::manager_client(client_id), None)
            .await
    }

    pub async fn update_client(
        &self,
        client_id: i64,
        patch: &ClientPatch,
    ) -> PortalResult<ClientRecord> {
        let body = serde_json::to_value(patch)?;
        if body.as_object().map(|fields| fields.is_empty()).unwrap_or(true) {
            return Err(PortalError::ValidationError(
                "Nothing to update".to_string(),
            ));
        }
        self.portal
            .page_call(
                HttpMethod::Patch,
                &endpoints::manager_client(client_id),
                Some(body),
            )
            .await
    }

    /// Latest stored score, if any.
    pub async fn score(&self, client_id: i64) -> PortalResult<Option<ScoreRecord>> {
        self.portal
            .page_call(HttpMethod::Get, &endpoints::manager_client_score(client_id), None)
            .await
    }

    pub async fn rescore(&self, client_id: i64) -> PortalResult<ScoreRecord> {
        self.portal
            .page_call(
                HttpMethod::Post,
                &endpoints::manager_client_score(client_id),
                Some(json!({})),
            )
            .await
    }
}
