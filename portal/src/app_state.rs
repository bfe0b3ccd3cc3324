use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config_store::{ConfigStore, PortalConfig};
use crate::credential::CredentialStore;
use crate::environment::EnvSettings;
use crate::errors::PortalResult;
use crate::portal::{Portal, PortalOptions};
use crate::reauth::ReauthPrompt;
use crate::storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, PortalPaths};
use crate::transport::ReqwestTransport;
use crate::validation::normalize_base_url;

/// Everything a front end needs before it can talk to the backend.
#[derive(Debug)]
pub struct PortalContext {
    paths: PortalPaths,
    config_store: ConfigStore,
    config: PortalConfig,
    settings: EnvSettings,
    credentials: CredentialStore,
}

impl PortalContext {
    pub fn initialize(root_dir: PathBuf, settings: EnvSettings) -> PortalResult<Self> {
        let paths = PortalPaths::new(&root_dir)?;
        paths.ensure_directories()?;

        let config_store = ConfigStore::from_paths(&paths);
        let mut config = config_store.load_or_default(settings.environment().as_str())?;
        settings.apply_to(&mut config)?;
        config.network.base_url = normalize_base_url(&config.network.base_url)?;

        let backend: Arc<dyn KeyValueStore> = if settings.persist_credentials()? {
            Arc::new(FileKeyValueStore::from_paths(&paths))
        } else {
            Arc::new(MemoryKeyValueStore::new())
        };
        log::debug!(
            "Portal context ready at {} (backend {})",
            paths.root_dir().display(),
            config.network.base_url
        );

        Ok(Self {
            paths,
            config_store,
            config,
            settings,
            credentials: CredentialStore::new(backend),
        })
    }

    pub fn paths(&self) -> &PortalPaths {
        &self.paths
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.config_store
    }

    /// Effective configuration: persisted values with environment overrides.
    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn settings(&self) -> &EnvSettings {
        &self.settings
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn update_config<F>(&mut self, updater: F) -> PortalResult<PortalConfig>
    where
        F: FnOnce(&mut PortalConfig) -> PortalResult<()>,
    {
        let updated = self
            .config_store
            .update(self.settings.environment().as_str(), updater)?;
        let mut effective = updated.clone();
        self.settings.apply_to(&mut effective)?;
        effective.network.base_url = normalize_base_url(&effective.network.base_url)?;
        self.config = effective;
        Ok(updated)
    }

    pub fn options(&self) -> PortalResult<PortalOptions> {
        Ok(PortalOptions::from_config(
            &self.config,
            self.settings.persist_credentials()?,
        ))
    }

    /// Build a portal talking to the configured backend over HTTP.
    pub fn connect<P: ReauthPrompt>(&self, prompt: P) -> PortalResult<Portal<ReqwestTransport, P>> {
        let timeout = request_timeout(self.config.network.request_timeout_secs);
        let transport = ReqwestTransport::new(&self.config.network.base_url, timeout)?;
        Portal::new(transport, prompt, self.credentials.clone(), self.options()?)
    }
}

fn request_timeout(seconds: u32) -> Duration {
    Duration::from_secs(seconds.max(1) as u64)
}
