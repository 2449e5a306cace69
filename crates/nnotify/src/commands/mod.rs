pub mod alerts;
pub mod history;
pub mod identity;
pub mod listen;
pub mod relays;

use anyhow::Result;
use nostr_notify::{
    AlertDispatcher, DecryptionEngine, FileStorageAdapter, RelayEndpoint, RelayPool, Settings,
    StorageAdapter, SubscriptionController,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::alerts::TerminalAlertSink;
use crate::config::Config;
use crate::relay_pool::SdkRelayPool;

/// Everything a command needs, opened from the data directory.
pub struct Context {
    pub data_dir: PathBuf,
    pub config: Config,
    pub settings: Settings,
    storage: Arc<dyn StorageAdapter>,
}

impl Context {
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let config = Config::load(data_dir)?;
        let storage: Arc<dyn StorageAdapter> =
            Arc::new(FileStorageAdapter::new(data_dir.to_path_buf())?);
        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            config,
            settings: Settings::new(storage.clone()),
            storage,
        })
    }

    /// Saved relay text, or the configured defaults when nothing was saved.
    pub fn relays_text(&self) -> Result<String> {
        Ok(self
            .settings
            .relays_text()?
            .unwrap_or_else(|| self.config.default_relays_text()))
    }

    pub fn relays(&self) -> Result<Vec<RelayEndpoint>> {
        Ok(nostr_notify::relays::parse(&self.relays_text()?))
    }

    pub fn controller_with(&self, pool: Arc<dyn RelayPool>) -> SubscriptionController {
        let sink = Arc::new(TerminalAlertSink::new(self.config.alerts));
        SubscriptionController::new(
            pool,
            self.storage.clone(),
            DecryptionEngine::new(),
            AlertDispatcher::new(sink),
            self.config.controller_config(),
        )
    }

    /// Controller over live relays.
    pub fn controller(&self) -> SubscriptionController {
        self.controller_with(Arc::new(SdkRelayPool::new()))
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::context;

    #[test]
    fn falls_back_to_default_relays() {
        let (_temp, ctx) = context();
        assert_eq!(ctx.relays().unwrap().len(), ctx.config.default_relays.len());
    }

    #[test]
    fn saved_relays_take_precedence() {
        let (_temp, ctx) = context();
        ctx.settings.set_relays_text("wss://only.example").unwrap();
        let relays = ctx.relays().unwrap();
        assert_eq!(relays.len(), 1);
        assert_eq!(relays[0].as_str(), "wss://only.example");
    }

    #[test]
    fn saved_but_empty_relays_stay_empty() {
        let (_temp, ctx) = context();
        ctx.settings.set_relays_text("").unwrap();
        assert!(ctx.relays().unwrap().is_empty());
    }
}
