//! Three-way classification of failed backend calls.
//!
//! Callers react to the outcome (re-prompt, balance refresh, plain message);
//! the wording shown to the user is left to the presentation layer.

use serde_json::Value;

/// Message used when a failed response carries neither `detail` nor `error`.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Request failed";
/// Message used for a 402 response without a `detail` field.
pub const DEFAULT_INSUFFICIENT_FUNDS_MESSAGE: &str = "Insufficient funds";

pub const STATUS_UNAUTHORIZED: u16 = 401;
pub const STATUS_PAYMENT_REQUIRED: u16 = 402;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorOutcome {
    Unauthenticated,
    InsufficientFunds(String),
    Generic(String),
}

impl ErrorOutcome {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ErrorOutcome::Unauthenticated)
    }

    /// Text to surface for terminal outcomes.
    pub fn message(&self) -> &str {
        match self {
            ErrorOutcome::Unauthenticated => "Not authenticated",
            ErrorOutcome::InsufficientFunds(msg) | ErrorOutcome::Generic(msg) => msg,
        }
    }
}

/// Classify a non-success response.
pub fn classify(status: u16, body: &Value) -> ErrorOutcome {
    match status {
        STATUS_UNAUTHORIZED => ErrorOutcome::Unauthenticated,
        STATUS_PAYMENT_REQUIRED => ErrorOutcome::InsufficientFunds(
            text_field(body, "detail")
                .unwrap_or_else(|| DEFAULT_INSUFFICIENT_FUNDS_MESSAGE.to_string()),
        ),
        _ => ErrorOutcome::Generic(failure_message(body)),
    }
}

/// `detail`, then `error`, then the fixed fallback.
pub fn failure_message(body: &Value) -> String {
    text_field(body, "detail")
        .or_else(|| text_field(body, "error"))
        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string())
}

fn text_field(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        // FastAPI validation errors carry a structured `detail`
        other => Some(other.to_string()),
    }
}
