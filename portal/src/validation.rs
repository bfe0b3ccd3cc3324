use crate::errors::{PortalError, PortalResult};
use regex::Regex;
use url::Url;

pub const MSG_ENTER_CREDENTIALS: &str = "Enter email & password";
pub const MSG_ENTER_REQUEST: &str = "Enter your request";
pub const MSG_ENTER_AMOUNT: &str = "Enter amount & be logged in";
pub const MSG_ENTER_PHONE: &str = "Enter phone";

/// Input checks performed before anything is sent to the backend.
#[derive(Debug, Clone)]
pub struct InputValidator {
    amount_pattern: Regex,
    phone_pattern: Regex,
}

impl InputValidator {
    pub fn new() -> PortalResult<Self> {
        let amount_pattern = Regex::new(r"^\d+(\.\d{1,2})?$")
            .map_err(|e| PortalError::ValidationError(format!("Invalid amount regex: {}", e)))?;
        let phone_pattern = Regex::new(r"^\+?[0-9][0-9 ()\-]{4,24}$")
            .map_err(|e| PortalError::ValidationError(format!("Invalid phone regex: {}", e)))?;

        Ok(InputValidator {
            amount_pattern,
            phone_pattern,
        })
    }

    /// Both halves must be present; the password is not trimmed.
    pub fn validate_credentials(&self, email: &str, password: &str) -> PortalResult<()> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(PortalError::ValidationError(
                MSG_ENTER_CREDENTIALS.to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the trimmed prompt text.
    pub fn validate_prompt(&self, text: &str) -> PortalResult<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(PortalError::ValidationError(MSG_ENTER_REQUEST.to_string()));
        }
        Ok(trimmed.to_string())
    }

    /// Parse a top-up amount; requires a signed-in identity.
    pub fn validate_top_up(&self, raw: &str, identity: Option<&str>) -> PortalResult<f64> {
        let raw = raw.trim();
        let signed_in = identity.map(|i| !i.is_empty()).unwrap_or(false);
        if raw.is_empty() || !signed_in {
            return Err(PortalError::ValidationError(MSG_ENTER_AMOUNT.to_string()));
        }

        if !self.amount_pattern.is_match(raw) {
            return Err(PortalError::InvalidAmount(
                "Amount format is invalid".to_string(),
            ));
        }

        let parsed: f64 = raw
            .parse()
            .map_err(|_| PortalError::InvalidAmount("Invalid number format".to_string()))?;

        if parsed <= 0.0 {
            return Err(PortalError::ValidationError(MSG_ENTER_AMOUNT.to_string()));
        }

        if parsed > 1_000_000_000.0 {
            return Err(PortalError::InvalidAmount("Amount too large".to_string()));
        }

        Ok(parsed)
    }

    pub fn validate_phone(&self, raw: &str) -> PortalResult<String> {
        let phone = raw.trim();
        if phone.is_empty() {
            return Err(PortalError::ValidationError(MSG_ENTER_PHONE.to_string()));
        }
        if !self.phone_pattern.is_match(phone) {
            return Err(PortalError::ValidationError(
                "Phone number format is invalid".to_string(),
            ));
        }
        Ok(phone.to_string())
    }
}

/// Trim, drop trailing slashes and require an http(s) URL with a host.
pub fn normalize_base_url(raw: &str) -> PortalResult<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(PortalError::ValidationError(
            "Base URL must not be empty".to_string(),
        ));
    }
    let invalid = |reason: String| {
        PortalError::ValidationError(format!(
            "Base URL must use http:// or https:// and include a host ({})",
            reason
        ))
    };
    let parsed = Url::parse(trimmed).map_err(|err| invalid(err.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("scheme `{}`", parsed.scheme())));
    }
    // the parser would read `http:///x` as host `x`
    let authority_present = trimmed
        .split_once("://")
        .map(|(_, rest)| !rest.starts_with('/'))
        .unwrap_or(false);
    if !authority_present || parsed.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(trimmed.to_string())
}
