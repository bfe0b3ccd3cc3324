//! Display state projected from server responses.
//!
//! Plain data: the front end reads a snapshot and renders it however it
//! likes. Only the action controller writes it.

use crate::api::types::Recommendation;

/// Shown in place of a balance that is unknown or not yet fetched.
pub const BALANCE_PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageTone {
    #[default]
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusLine {
    pub text: String,
    pub tone: MessageTone,
}

impl StatusLine {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: MessageTone::Info,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: MessageTone::Success,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tone: MessageTone::Error,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn clear(&mut self) {
        *self = StatusLine::default();
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisplayState {
    pub balance: Option<f64>,
    pub recommendations: Vec<Recommendation>,
    pub auth_message: StatusLine,
    pub prediction_message: StatusLine,
    pub balance_message: StatusLine,
    /// Text of the prompt input field.
    pub prompt_input: String,
    /// Text of the top-up amount field.
    pub top_up_input: String,
    pub telegram_status: Option<String>,
    pub telegram_linked: bool,
    pub telegram_token: Option<String>,
}

impl DisplayState {
    pub fn balance_text(&self) -> String {
        match self.balance {
            Some(value) if value.fract() == 0.0 => format!("{}", value as i64),
            Some(value) => format!("{:.2}", value),
            None => BALANCE_PLACEHOLDER.to_string(),
        }
    }

    /// Clear error messages after a successful authentication.
    pub fn clear_messages(&mut self) {
        self.auth_message.clear();
        self.prediction_message.clear();
        self.balance_message.clear();
    }

    /// Drop everything tied to the previous identity.
    pub fn reset(&mut self) {
        *self = DisplayState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_text_formats() {
        let mut state = DisplayState::default();
        assert_eq!(state.balance_text(), BALANCE_PLACEHOLDER);
        state.balance = Some(40.0);
        assert_eq!(state.balance_text(), "40");
        state.balance = Some(12.345);
        assert_eq!(state.balance_text(), "12.35");
    }

    #[test]
    fn reset_clears_inputs_and_results() {
        let mut state = DisplayState {
            balance: Some(3.0),
            prompt_input: "comedy".into(),
            telegram_linked: true,
            ..DisplayState::default()
        };
        state.prediction_message = StatusLine::error("Insufficient funds");
        state.reset();
        assert_eq!(state, DisplayState::default());
    }
}
