use crate::config_store::{AuthScheme, PortalConfig};
use crate::errors::{PortalError, PortalResult};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const KEY_LOG_LEVEL: &str = "LOG_LEVEL";
pub const KEY_BASE_URL: &str = "BASE_URL";
pub const KEY_REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT_SECS";
pub const KEY_PREDICTION_TOP: &str = "PREDICTION_TOP";
pub const KEY_AUTH_SCHEME: &str = "AUTH_SCHEME";
pub const KEY_PERSIST_CREDENTIALS: &str = "PERSIST_CREDENTIALS";

/// Environment types for different runtime configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" | "testing" => Environment::Test,
            _ => Environment::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }
}

/// Environment-driven settings layered over the persisted config.
#[derive(Debug, Clone)]
pub struct EnvSettings {
    environment: Environment,
    config_map: HashMap<String, String>,
}

impl EnvSettings {
    pub fn new(environment: Environment) -> Self {
        let mut settings = EnvSettings {
            environment,
            config_map: HashMap::new(),
        };
        settings.load_defaults();
        settings
    }

    /// Load settings from `PORTAL_*` environment variables
    pub fn from_env() -> PortalResult<Self> {
        let env_str =
            std::env::var("PORTAL_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        Self::from_environment(Environment::parse(&env_str))
    }

    pub fn from_environment(environment: Environment) -> PortalResult<Self> {
        let mut settings = Self::new(environment);
        settings.load_from_env_vars();
        settings.validate_required()?;
        Ok(settings)
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.config_map.get(key)
    }

    pub fn get_or_default(&self, key: &str, default: &str) -> String {
        self.config_map
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    pub fn get_bool_with_default(&self, key: &str, default: bool) -> PortalResult<bool> {
        match self.config_map.get(key) {
            Some(value) => parse_bool_flag(value, key),
            None => Ok(default),
        }
    }

    pub fn get_u32_with_default(&self, key: &str, default: u32) -> PortalResult<u32> {
        match self.config_map.get(key) {
            Some(value) => parse_u32_value(value, key),
            None => Ok(default),
        }
    }

    /// Set a value (for testing purposes)
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.config_map.insert(key.into(), value.into());
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn log_level(&self) -> String {
        self.get_or_default(KEY_LOG_LEVEL, "info").to_lowercase()
    }

    pub fn persist_credentials(&self) -> PortalResult<bool> {
        self.get_bool_with_default(KEY_PERSIST_CREDENTIALS, true)
    }

    /// Overlay explicitly provided settings onto a persisted config.
    pub fn apply_to(&self, config: &mut PortalConfig) -> PortalResult<()> {
        if let Some(base_url) = self.get(KEY_BASE_URL) {
            config.network.base_url = base_url.clone();
        }
        config.network.request_timeout_secs =
            self.get_u32_with_default(KEY_REQUEST_TIMEOUT, config.network.request_timeout_secs)?;
        config.prediction.top =
            self.get_u32_with_default(KEY_PREDICTION_TOP, config.prediction.top)?;
        if let Some(raw) = self.get(KEY_AUTH_SCHEME) {
            config.session.auth_scheme = AuthScheme::parse(raw).ok_or_else(|| {
                PortalError::ValidationError(format!("Unknown auth scheme '{}'", raw))
            })?;
        }
        Ok(())
    }

    pub fn validate_required(&self) -> PortalResult<()> {
        for key in [KEY_LOG_LEVEL, KEY_PERSIST_CREDENTIALS] {
            if !self.config_map.contains_key(key) {
                return Err(PortalError::ValidationError(format!(
                    "Required setting '{}' is missing for {} environment",
                    key,
                    self.environment.as_str()
                )));
            }
        }
        if let Some(top) = self.get(KEY_PREDICTION_TOP) {
            if parse_u32_value(top, KEY_PREDICTION_TOP)? == 0 {
                return Err(PortalError::ValidationError(
                    "PREDICTION_TOP must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn load_defaults(&mut self) {
        let (log_level, persist) = match self.environment {
            Environment::Production => ("INFO", "true"),
            Environment::Development => ("DEBUG", "true"),
            // tests never touch the user's stored credentials by default
            Environment::Test => ("WARN", "false"),
        };
        self.config_map
            .insert(KEY_LOG_LEVEL.to_string(), log_level.to_string());
        self.config_map
            .insert(KEY_PERSIST_CREDENTIALS.to_string(), persist.to_string());
    }

    fn load_from_env_vars(&mut self) {
        let env_mappings = [
            ("PORTAL_LOG_LEVEL", KEY_LOG_LEVEL),
            ("PORTAL_BASE_URL", KEY_BASE_URL),
            ("PORTAL_REQUEST_TIMEOUT_SECS", KEY_REQUEST_TIMEOUT),
            ("PORTAL_PREDICTION_TOP", KEY_PREDICTION_TOP),
            ("PORTAL_AUTH_SCHEME", KEY_AUTH_SCHEME),
            ("PORTAL_PERSIST_CREDENTIALS", KEY_PERSIST_CREDENTIALS),
        ];

        for (env_var, config_key) in &env_mappings {
            if let Ok(value) = std::env::var(env_var) {
                if value.trim().is_empty() {
                    log::warn!("Environment variable {} is empty", env_var);
                    continue;
                }

                if value.chars().any(|c| c.is_control()) {
                    log::warn!(
                        "Environment variable {} contains control characters, ignoring",
                        env_var
                    );
                    continue;
                }

                self.config_map.insert(config_key.to_string(), value);
                log::debug!(
                    "Loaded setting {} from environment variable {}",
                    config_key,
                    env_var
                );
            }
        }
    }
}

impl Default for EnvSettings {
    fn default() -> Self {
        Self::new(Environment::Development)
    }
}

fn parse_bool_flag(value: &str, key: &str) -> PortalResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(PortalError::ValidationError(format!(
            "Invalid boolean value '{}' for key '{}'",
            value, key
        ))),
    }
}

fn parse_u32_value(value: &str, key: &str) -> PortalResult<u32> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PortalError::ValidationError(format!(
            "Setting '{}' cannot be empty",
            key
        )));
    }

    trimmed.parse::<u32>().map_err(|_| {
        PortalError::ValidationError(format!(
            "Invalid numeric value '{}' for key '{}'",
            value, key
        ))
    })
}

static ENV_SETTINGS: OnceCell<EnvSettings> = OnceCell::new();

/// Initialize process-wide settings from the environment (first call wins).
pub fn init_env_settings() -> PortalResult<&'static EnvSettings> {
    ENV_SETTINGS.get_or_try_init(|| {
        let settings = EnvSettings::from_env()?;
        log::info!(
            "Settings initialized for {} environment",
            settings.environment.as_str()
        );
        Ok(settings)
    })
}

pub fn get_env_settings() -> PortalResult<&'static EnvSettings> {
    ENV_SETTINGS.get().ok_or(PortalError::NotInitialized)
}
