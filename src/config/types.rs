//! Configuration type definitions for the GameStore bridge
//!
//! All types implement serde traits for JSON serialization and have sensible
//! defaults, so a partial config file only needs the keys it changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log output format and level
    pub logging: LoggingConfig,
    /// Gateway polling, caller timeouts and the pending sweep
    pub gateway: GatewayConfig,
    /// Agent names and provider wiring
    pub agents: AgentsConfig,
    /// Optional record files backing the providers
    pub catalogs: CatalogsConfig,
}

// ============================================================================
// Logging Configuration
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable, coloured
    Pretty,
    /// Compact text with a `component` field per subsystem
    #[default]
    Component,
    /// JSON lines for log aggregators
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// Append JSON logs to this file instead of stderr
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Component,
            level: "info".to_string(),
            file: None,
        }
    }
}

// ============================================================================
// Gateway Configuration
// ============================================================================

/// Gateway agent configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Ingress ticker interval
    pub poll_interval_ms: u64,
    /// Longest time an idle agent sleeps before re-checking its behaviors
    pub idle_wait_ms: u64,
    /// Caller deadline for a title search
    pub search_timeout_secs: u64,
    /// Caller deadline for a single-source listing
    pub list_timeout_secs: u64,
    /// Caller deadline for a two-source listing
    pub combined_timeout_secs: u64,
    /// Age after which unresolved entries are swept; 0 disables the sweep
    pub pending_ttl_secs: u64,
    /// How often the sweep runs
    pub sweep_interval_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            idle_wait_ms: 50,
            search_timeout_secs: 15,
            list_timeout_secs: 10,
            combined_timeout_secs: 15,
            pending_ttl_secs: 120,
            sweep_interval_secs: 30,
        }
    }
}

impl GatewayConfig {
    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }

    pub fn combined_timeout(&self) -> Duration {
        Duration::from_secs(self.combined_timeout_secs)
    }

    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }

    /// Longest deadline any caller may wait.
    pub fn longest_timeout_secs(&self) -> u64 {
        self.search_timeout_secs
            .max(self.list_timeout_secs)
            .max(self.combined_timeout_secs)
    }
}

// ============================================================================
// Agents Configuration
// ============================================================================

/// Agent names and provider wiring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub gateway: String,
    /// Provider answering searches; falls back to the secondary on a miss
    pub primary: String,
    pub secondary: String,
    /// Whether the primary asks the secondary when a title is not found locally
    pub fallback_enabled: bool,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            gateway: "apigateway".to_string(),
            primary: "gamestop".to_string(),
            secondary: "distributor".to_string(),
            fallback_enabled: true,
        }
    }
}

// ============================================================================
// Catalogs Configuration
// ============================================================================

/// Record files backing the providers. Unset means the built-in seed catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogsConfig {
    pub primary_path: Option<String>,
    pub secondary_path: Option<String>,
}
