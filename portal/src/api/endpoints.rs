//! Backend paths consumed by the client.

use url::form_urlencoded::byte_serialize;

pub const AUTH_LOGIN: &str = "/auth/login";
pub const AUTH_LOGOUT: &str = "/auth/logout";
pub const AUTH_ME: &str = "/auth/me";

pub const USERS_SIGNUP: &str = "/api/users/signup";
pub const USERS_SIGNIN: &str = "/api/users/signin";
pub const USERS_BALANCE: &str = "/api/users/balance";
pub const USERS_BALANCE_ADJUST: &str = "/api/users/balance/adjust";

pub const TELEGRAM_LINK_STATUS: &str = "/api/users/telegram/link/status";
pub const TELEGRAM_LINK_INIT: &str = "/api/users/telegram/link/init";
pub const TELEGRAM_LINK_UNLINK: &str = "/api/users/telegram/link/unlink";

pub const CLIENT_DASHBOARD: &str = "/api/client/dashboard";
pub const CLIENT_SCORE: &str = "/api/client/score";
pub const CLIENT_CREDIT: &str = "/api/client/credit";

pub fn new_prediction(message: &str, top: u32) -> String {
    format!(
        "/api/events/prediction/new?message={}&top={}",
        encode_component(message),
        top
    )
}

pub fn manager_clients(all: bool) -> String {
    format!("/api/manager/clients?all={}", all)
}

pub fn manager_clients_summary(all: bool) -> String {
    format!("/api/manager/clients/summary?all={}", all)
}

pub fn manager_client(client_id: i64) -> String {
    format!("/api/manager/clients/{}", client_id)
}

pub fn manager_client_score(client_id: i64) -> String {
    format!("/api/manager/clients/{}/score", client_id)
}

// Percent-encodes spaces as %20 rather than '+'.
fn encode_component(raw: &str) -> String {
    byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
