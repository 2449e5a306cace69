use std::sync::Arc;

use crate::types::{KEY_STORAGE_KEY, RELAYS_STORAGE_KEY};
use crate::{relays, ConfigError, Identity, RelayEndpoint, Result, StorageAdapter};

/// Saved identity and relay list. The secret key is stored as hex, the relay
/// list as the raw text the user entered.
#[derive(Clone)]
pub struct Settings {
    storage: Arc<dyn StorageAdapter>,
}

impl Settings {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Validate and persist both values. Nothing is written when the key is
    /// invalid.
    pub fn save(&self, key_hex: &str, relays_text: &str) -> Result<Identity> {
        let identity = Identity::from_hex(key_hex)?;
        self.storage.put(KEY_STORAGE_KEY, identity.secret_hex())?;
        self.set_relays_text(relays_text)?;
        Ok(identity)
    }

    pub fn save_identity(&self, identity: &Identity) -> Result<()> {
        self.storage.put(KEY_STORAGE_KEY, identity.secret_hex())
    }

    pub fn identity(&self) -> Option<Identity> {
        let stored = match self.storage.get(KEY_STORAGE_KEY) {
            Ok(stored) => stored?,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stored key");
                return None;
            }
        };
        match Identity::from_hex(&stored) {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring invalid stored key");
                None
            }
        }
    }

    /// Require a stored identity.
    pub fn require_identity(&self) -> Result<Identity> {
        self.identity().ok_or_else(|| ConfigError::NoIdentity.into())
    }

    pub fn clear_identity(&self) -> Result<()> {
        self.storage.del(KEY_STORAGE_KEY)
    }

    pub fn relays_text(&self) -> Result<Option<String>> {
        self.storage.get(RELAYS_STORAGE_KEY)
    }

    pub fn set_relays_text(&self, relays_text: &str) -> Result<()> {
        self.storage
            .put(RELAYS_STORAGE_KEY, relays_text.to_string())
    }

    pub fn relays(&self) -> Result<Vec<RelayEndpoint>> {
        Ok(self
            .relays_text()?
            .map(|text| relays::parse(&text))
            .unwrap_or_default())
    }
}
