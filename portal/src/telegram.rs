//! Telegram account linking.

use serde_json::Value;

use crate::api::endpoints;
use crate::api::types::{TelegramLinkInitRequest, TelegramLinkInitResponse, TelegramLinkStatus};
use crate::credential::Credential;
use crate::gateway::{GatewayFailure, HttpMethod, HttpTransport, RequestGateway};

pub const NOT_LINKED_TEXT: &str = "Telegram not linked";
pub const LINK_FAILED_TEXT: &str = "Failed to generate token";

pub fn status_text(status: &TelegramLinkStatus) -> String {
    if !status.linked {
        return NOT_LINKED_TEXT.to_string();
    }
    let id = match &status.telegram_id {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(text)) if text.is_empty() => "-".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    };
    format!("Telegram linked (id: {})", id)
}

pub fn token_instructions(token: &str) -> String {
    format!(
        "Token generated. In Telegram, send /start {} to the bot.",
        token
    )
}

/// Failures are swallowed; the status line just stays as it was.
pub async fn fetch_status<T: HttpTransport>(
    gateway: &RequestGateway<T>,
    credential: Option<&Credential>,
) -> Option<TelegramLinkStatus> {
    match gateway
        .call_as(HttpMethod::Get, endpoints::TELEGRAM_LINK_STATUS, None, credential)
        .await
    {
        Ok(status) => Some(status),
        Err(failure) => {
            log::debug!("Telegram status unavailable: {}", failure);
            None
        }
    }
}

/// Request a one-time link token for `phone`.
pub async fn init_link<T: HttpTransport>(
    gateway: &RequestGateway<T>,
    credential: Option<&Credential>,
    phone: &str,
) -> Result<String, GatewayFailure> {
    let request = TelegramLinkInitRequest {
        phone: phone.to_string(),
    };
    let body = serde_json::to_value(&request).map_err(|err| GatewayFailure {
        status: None,
        body: Value::Object(Default::default()),
        message: err.to_string(),
    })?;
    let response: TelegramLinkInitResponse = gateway
        .call_as(HttpMethod::Post, endpoints::TELEGRAM_LINK_INIT, Some(body), credential)
        .await?;
    Ok(response.token)
}

pub async fn unlink<T: HttpTransport>(
    gateway: &RequestGateway<T>,
    credential: Option<&Credential>,
) -> Result<(), GatewayFailure> {
    gateway
        .call(HttpMethod::Post, endpoints::TELEGRAM_LINK_UNLINK, None, credential)
        .await
        .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status(value: Value) -> TelegramLinkStatus {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn status_text_variants() {
        assert_eq!(status_text(&status(json!({"linked": false}))), NOT_LINKED_TEXT);
        assert_eq!(
            status_text(&status(json!({"linked": true, "telegram_id": 5551234}))),
            "Telegram linked (id: 5551234)"
        );
        assert_eq!(
            status_text(&status(json!({"linked": true, "telegram_id": "abc"}))),
            "Telegram linked (id: abc)"
        );
        assert_eq!(
            status_text(&status(json!({"linked": true, "telegram_id": null}))),
            "Telegram linked (id: -)"
        );
    }

    #[test]
    fn token_instructions_mention_start_command() {
        assert!(token_instructions("XYZ").contains("/start XYZ"));
    }
}
