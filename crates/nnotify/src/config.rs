use anyhow::{Context, Result};
use nostr_notify::{ControllerConfig, HISTORY_CAPACITY, NOTIFICATION_EVENT_KIND};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI configuration. Identity and relay list are kept separately in the
/// settings store; this covers runtime tuning only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Seconds between relay health checks
    #[serde(default = "default_health_poll_secs")]
    pub health_poll_secs: u64,

    /// Seconds between uptime updates
    #[serde(default = "default_uptime_tick_secs")]
    pub uptime_tick_secs: u64,

    /// Number of notifications kept in history
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Show terminal alerts for incoming notifications
    #[serde(default = "default_alerts")]
    pub alerts: bool,

    /// Relays used when none have been saved
    #[serde(default = "default_relays")]
    pub default_relays: Vec<String>,

    /// Path to the config file
    #[serde(skip)]
    pub path: PathBuf,
}

fn default_health_poll_secs() -> u64 {
    2
}

fn default_uptime_tick_secs() -> u64 {
    1
}

fn default_history_capacity() -> usize {
    HISTORY_CAPACITY
}

fn default_alerts() -> bool {
    true
}

fn default_relays() -> Vec<String> {
    vec![
        "wss://relay.damus.io".to_string(),
        "wss://nos.lol".to_string(),
        "wss://relay.primal.net".to_string(),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            health_poll_secs: default_health_poll_secs(),
            uptime_tick_secs: default_uptime_tick_secs(),
            history_capacity: default_history_capacity(),
            alerts: default_alerts(),
            default_relays: default_relays(),
            path: PathBuf::new(),
        }
    }
}

impl Config {
    /// Load config from the data directory
    pub fn load(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join("config.json");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            let mut config: Config = serde_json::from_str(&content)
                .context("Failed to parse config file")?;
            config.path = config_path;
            Ok(config)
        } else {
            Ok(Config {
                path: config_path,
                ..Default::default()
            })
        }
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .context("Failed to serialize config")?;
        std::fs::write(&self.path, content)
            .context("Failed to write config file")?;
        Ok(())
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            health_poll_interval: Duration::from_secs(self.health_poll_secs.max(1)),
            uptime_tick_interval: Duration::from_secs(self.uptime_tick_secs.max(1)),
            history_capacity: self.history_capacity.max(1),
            event_kind: NOTIFICATION_EVENT_KIND,
        }
    }

    pub fn default_relays_text(&self) -> String {
        self.default_relays.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.health_poll_secs, 2);
        assert_eq!(config.history_capacity, 100);
        assert!(config.alerts);
        assert!(!config.default_relays.is_empty());
    }

    #[test]
    fn test_config_load_nonexistent() {
        let temp = TempDir::new().unwrap();
        let config = Config::load(temp.path()).unwrap();
        assert_eq!(config.path, temp.path().join("config.json"));
        assert_eq!(config.uptime_tick_secs, 1);
    }

    #[test]
    fn test_config_save_and_load() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::load(temp.path()).unwrap();
        config.health_poll_secs = 5;
        config.alerts = false;
        config.save().unwrap();

        let loaded = Config::load(temp.path()).unwrap();
        assert_eq!(loaded.health_poll_secs, 5);
        assert!(!loaded.alerts);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.json"), r#"{"history_capacity": 10}"#).unwrap();

        let config = Config::load(temp.path()).unwrap();
        assert_eq!(config.history_capacity, 10);
        assert_eq!(config.health_poll_secs, 2);
    }

    #[test]
    fn test_controller_config_clamps_zero() {
        let config = Config {
            health_poll_secs: 0,
            uptime_tick_secs: 0,
            history_capacity: 0,
            ..Default::default()
        };
        let cc = config.controller_config();
        assert_eq!(cc.health_poll_interval, Duration::from_secs(1));
        assert_eq!(cc.uptime_tick_interval, Duration::from_secs(1));
        assert_eq!(cc.history_capacity, 1);
    }
}
