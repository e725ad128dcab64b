//! Configuration management for the GameStore bridge
//!
//! Configuration is loaded from `~/.gamestore/config.json` with environment
//! variable overrides. A missing file yields the defaults.

mod types;

pub use types::*;

use std::path::{Path, PathBuf};

use crate::error::{BridgeError, Result};

impl Config {
    /// Returns the configuration directory path (~/.gamestore)
    pub fn dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gamestore")
    }

    /// Returns the path to the config file (~/.gamestore/config.json)
    pub fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load configuration from the default path with environment overrides.
    ///
    /// Environment variables override config values using the pattern
    /// `GAMESTORE_SECTION_KEY`.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::path())
    }

    /// Load configuration from a specific path with environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        // Logging
        if let Ok(val) = std::env::var("GAMESTORE_LOGGING_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("GAMESTORE_LOGGING_FORMAT") {
            if let Ok(v) = serde_json::from_value(serde_json::Value::String(val.to_lowercase())) {
                self.logging.format = v;
            }
        }

        // Gateway
        override_u64("GAMESTORE_GATEWAY_POLL_INTERVAL_MS", &mut self.gateway.poll_interval_ms);
        override_u64("GAMESTORE_GATEWAY_IDLE_WAIT_MS", &mut self.gateway.idle_wait_ms);
        override_u64(
            "GAMESTORE_GATEWAY_SEARCH_TIMEOUT_SECS",
            &mut self.gateway.search_timeout_secs,
        );
        override_u64(
            "GAMESTORE_GATEWAY_LIST_TIMEOUT_SECS",
            &mut self.gateway.list_timeout_secs,
        );
        override_u64(
            "GAMESTORE_GATEWAY_COMBINED_TIMEOUT_SECS",
            &mut self.gateway.combined_timeout_secs,
        );
        override_u64(
            "GAMESTORE_GATEWAY_PENDING_TTL_SECS",
            &mut self.gateway.pending_ttl_secs,
        );
        override_u64(
            "GAMESTORE_GATEWAY_SWEEP_INTERVAL_SECS",
            &mut self.gateway.sweep_interval_secs,
        );

        // Agents
        if let Ok(val) = std::env::var("GAMESTORE_AGENTS_GATEWAY") {
            self.agents.gateway = val;
        }
        if let Ok(val) = std::env::var("GAMESTORE_AGENTS_PRIMARY") {
            self.agents.primary = val;
        }
        if let Ok(val) = std::env::var("GAMESTORE_AGENTS_SECONDARY") {
            self.agents.secondary = val;
        }
        if let Ok(val) = std::env::var("GAMESTORE_AGENTS_FALLBACK_ENABLED") {
            if let Ok(v) = val.parse() {
                self.agents.fallback_enabled = v;
            }
        }

        // Catalogs
        if let Ok(val) = std::env::var("GAMESTORE_CATALOGS_PRIMARY_PATH") {
            self.catalogs.primary_path = Some(val);
        }
        if let Ok(val) = std::env::var("GAMESTORE_CATALOGS_SECONDARY_PATH") {
            self.catalogs.secondary_path = Some(val);
        }
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::path())
    }

    /// Save configuration to a specific path as pretty JSON
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Checks values the runtime cannot work with.
    ///
    /// # Errors
    /// `BridgeError::Config` naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        let names = [
            ("agents.gateway", &self.agents.gateway),
            ("agents.primary", &self.agents.primary),
            ("agents.secondary", &self.agents.secondary),
        ];
        for (key, name) in names {
            if name.trim().is_empty() {
                return Err(BridgeError::Config(format!("{} must not be empty", key)));
            }
        }
        if self.agents.gateway == self.agents.primary
            || self.agents.gateway == self.agents.secondary
            || self.agents.primary == self.agents.secondary
        {
            return Err(BridgeError::Config(
                "agent names must be distinct".to_string(),
            ));
        }

        let gw = &self.gateway;
        if gw.poll_interval_ms == 0 {
            return Err(BridgeError::Config(
                "gateway.poll_interval_ms must be positive".to_string(),
            ));
        }
        if gw.search_timeout_secs == 0 || gw.list_timeout_secs == 0 || gw.combined_timeout_secs == 0
        {
            return Err(BridgeError::Config(
                "gateway timeouts must be positive".to_string(),
            ));
        }
        if gw.pending_ttl_secs > 0 && gw.pending_ttl_secs < gw.longest_timeout_secs() {
            return Err(BridgeError::Config(format!(
                "gateway.pending_ttl_secs ({}) is shorter than the longest caller timeout ({}s)",
                gw.pending_ttl_secs,
                gw.longest_timeout_secs()
            )));
        }
        Ok(())
    }
}

fn override_u64(var: &str, target: &mut u64) {
    if let Ok(val) = std::env::var(var) {
        if let Ok(v) = val.parse() {
            *target = v;
        }
    }
}

/// Expand ~ to home directory in a path string
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return match rest.strip_prefix('/') {
                Some(tail) => home.join(tail),
                None if rest.is_empty() => home,
                None => PathBuf::from(path),
            };
        }
    }
    PathBuf::from(path)
}
