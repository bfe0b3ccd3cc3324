use serde::{Deserialize, Serialize};
use std::fmt;

use crate::classify::ErrorOutcome;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PortalError {
    // Network errors
    NetworkError(String),
    ConnectionTimeout,
    InvalidResponse(String),

    // Storage errors
    StorageError(String),
    FileNotFound(String),
    PermissionDenied(String),

    // Validation errors
    ValidationError(String),
    InvalidAmount(String),

    // Backend outcomes
    Unauthenticated,
    InsufficientFunds(String),
    Request(String),

    // Application errors
    NotInitialized,
    NotFound(String),

    // Generic errors
    Unknown(String),
}

impl fmt::Display for PortalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PortalError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            PortalError::ConnectionTimeout => write!(f, "Connection timeout"),
            PortalError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),

            PortalError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            PortalError::FileNotFound(msg) => write!(f, "File not found: {}", msg),
            PortalError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),

            PortalError::ValidationError(msg) => write!(f, "{}", msg),
            PortalError::InvalidAmount(msg) => write!(f, "Invalid amount: {}", msg),

            PortalError::Unauthenticated => write!(f, "Not authenticated"),
            PortalError::InsufficientFunds(msg) => write!(f, "{}", msg),
            PortalError::Request(msg) => write!(f, "{}", msg),

            PortalError::NotInitialized => write!(f, "Portal not initialized"),
            PortalError::NotFound(msg) => write!(f, "Not found: {}", msg),

            PortalError::Unknown(msg) => write!(f, "Unknown error: {}", msg),
        }
    }
}

impl std::error::Error for PortalError {}

pub type PortalResult<T> = Result<T, PortalError>;

// Conversion helpers
impl From<std::io::Error> for PortalError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => PortalError::FileNotFound(error.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                PortalError::PermissionDenied(error.to_string())
            }
            _ => PortalError::StorageError(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(error: serde_json::Error) -> Self {
        PortalError::InvalidResponse(format!("JSON error: {}", error))
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            PortalError::ConnectionTimeout
        } else {
            PortalError::NetworkError(error.to_string())
        }
    }
}

impl From<ErrorOutcome> for PortalError {
    fn from(outcome: ErrorOutcome) -> Self {
        match outcome {
            ErrorOutcome::Unauthenticated => PortalError::Unauthenticated,
            ErrorOutcome::InsufficientFunds(msg) => PortalError::InsufficientFunds(msg),
            ErrorOutcome::Generic(msg) => PortalError::Request(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_by_kind() {
        let missing = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(PortalError::from(missing), PortalError::FileNotFound(_)));

        let other = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        assert!(matches!(PortalError::from(other), PortalError::StorageError(_)));
    }

    #[test]
    fn outcomes_keep_their_message() {
        let err = PortalError::from(ErrorOutcome::Generic("Client not found".into()));
        assert_eq!(err.to_string(), "Client not found");
        assert_eq!(
            PortalError::from(ErrorOutcome::Unauthenticated),
            PortalError::Unauthenticated
        );
    }
}
