//! Client-held proof of identity and its persistence.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::storage::KeyValueStore;

/// Storage key of the identity half of the credential pair.
pub const KEY_IDENTITY: &str = "email";
/// Storage key of the secret half of the credential pair.
pub const KEY_SECRET: &str = "password";

/// Exactly one of these is active per client instance.
#[derive(Debug)]
pub enum Credential {
    /// Server-issued session; the cookie itself lives in the transport's
    /// cookie jar and is never visible here.
    Session { identity: String },
    /// Identifier/secret pair sent as HTTP Basic authorization.
    Basic {
        identity: String,
        secret: SecretString,
    },
}

impl Credential {
    pub fn basic(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Credential::Basic {
            identity: identity.into(),
            secret: SecretString::from(secret.into()),
        }
    }

    pub fn session(identity: impl Into<String>) -> Self {
        Credential::Session {
            identity: identity.into(),
        }
    }

    pub fn identity(&self) -> &str {
        match self {
            Credential::Session { identity } | Credential::Basic { identity, .. } => identity,
        }
    }

    pub fn is_session(&self) -> bool {
        matches!(self, Credential::Session { .. })
    }

    /// `Authorization` header value for secret pairs; `None` for cookie sessions.
    pub fn authorization_header(&self) -> Option<SecretString> {
        match self {
            Credential::Session { .. } => None,
            Credential::Basic { identity, secret } => {
                let raw = Zeroizing::new(format!("{}:{}", identity, secret.expose_secret()));
                Some(SecretString::from(format!(
                    "Basic {}",
                    BASE64.encode(raw.as_bytes())
                )))
            }
        }
    }
}

impl Clone for Credential {
    fn clone(&self) -> Self {
        match self {
            Credential::Session { identity } => Credential::Session {
                identity: identity.clone(),
            },
            Credential::Basic { identity, secret } => Credential::Basic {
                identity: identity.clone(),
                secret: SecretString::from(secret.expose_secret().to_owned()),
            },
        }
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Credential::Session { identity: a }, Credential::Session { identity: b }) => a == b,
            (
                Credential::Basic {
                    identity: a,
                    secret: sa,
                },
                Credential::Basic {
                    identity: b,
                    secret: sb,
                },
            ) => a == b && sa.expose_secret() == sb.expose_secret(),
            _ => false,
        }
    }
}

impl Eq for Credential {}

/// Persists the identifier/secret pair under two fixed keys.
///
/// Both keys are written and removed together. Storage failures are logged
/// and swallowed so sign-in and sign-out proceed regardless.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Returns whether the pair reached storage.
    pub fn save(&self, identity: &str, secret: &SecretString) -> bool {
        let entries = [
            (KEY_IDENTITY, identity),
            (KEY_SECRET, secret.expose_secret()),
        ];
        match self.backend.set_items(&entries) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Credential persistence skipped: {}", err);
                false
            }
        }
    }

    pub fn load(&self) -> Option<Credential> {
        let identity = self.read(KEY_IDENTITY)?;
        let secret = self.read(KEY_SECRET)?;
        Some(Credential::basic(identity, secret))
    }

    pub fn clear(&self) {
        if let Err(err) = self.backend.remove_items(&[KEY_IDENTITY, KEY_SECRET]) {
            log::warn!("Credential removal skipped: {}", err);
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get_item(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(err) => {
                log::debug!("Local storage read failed for {}: {}", key, err);
                None
            }
        }
    }
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryKeyValueStore, UnavailableKeyValueStore};

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    #[test]
    fn save_then_load_round_trip() {
        let store = CredentialStore::new(Arc::new(MemoryKeyValueStore::new()));
        assert!(store.save("ann@example.com", &secret("hunter2")));

        let loaded = store.load().expect("credential present");
        assert_eq!(loaded, Credential::basic("ann@example.com", "hunter2"));
    }

    #[test]
    fn clear_removes_both_keys() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        let store = CredentialStore::new(backend.clone());
        store.save("ann@example.com", &secret("hunter2"));
        store.clear();

        assert!(store.load().is_none());
        assert!(backend.is_empty());
    }

    #[test]
    fn half_a_pair_is_not_a_credential() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        backend.set_items(&[(KEY_IDENTITY, "ann@example.com")]).unwrap();
        let store = CredentialStore::new(backend);
        assert!(store.load().is_none());
    }

    #[test]
    fn unavailable_storage_is_tolerated() {
        let store = CredentialStore::new(Arc::new(UnavailableKeyValueStore));
        assert!(!store.save("ann@example.com", &secret("hunter2")));
        assert!(store.load().is_none());
        store.clear();
    }

    #[test]
    fn basic_header_is_base64_of_pair() {
        let credential = Credential::basic("ann@example.com", "hunter2");
        let header = credential.authorization_header().unwrap();
        assert_eq!(
            header.expose_secret(),
            "Basic YW5uQGV4YW1wbGUuY29tOmh1bnRlcjI="
        );
        assert!(Credential::session("42").authorization_header().is_none());
    }
}
