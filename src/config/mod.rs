//! # Configuration Management Module
//!
//! TOML configuration for the gridstash binary and simulator.
//!
//! ## Configuration Structure
//!
//! - [`EngineConfig`] - Built-in inventory ids and the host bridge timeout
//! - [`CatalogConfig`] - Item definition seed file
//! - [`SimulationConfig`] - Behaviour of the simulated authority
//! - [`LoggingConfig`] - Log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use gridstash::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("gridstash.toml").await?;
//!     println!("Bridge timeout: {} ms", config.engine.bridge_timeout_ms);
//!
//!     Config::create_default("gridstash.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [engine]
//! bridge_timeout_ms = 5000
//! primary_id = "player1"
//! secondary_id = "shop1"
//! auxiliary_id = "backpack1"
//!
//! [catalog]
//! seed_path = "demos/items.json"
//!
//! [simulation]
//! approve_ratio = 1.0
//! reply_delay_ms = 0
//!
//! [logging]
//! level = "info"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long a pending operation waits for the authority before rolling back.
    #[serde(default = "default_bridge_timeout_ms")]
    pub bridge_timeout_ms: u64,
    #[serde(default = "default_primary_id")]
    pub primary_id: String,
    #[serde(default = "default_secondary_id")]
    pub secondary_id: String,
    #[serde(default = "default_auxiliary_id")]
    pub auxiliary_id: String,
}

fn default_bridge_timeout_ms() -> u64 {
    5000
}

fn default_primary_id() -> String {
    "player1".to_string()
}

fn default_secondary_id() -> String {
    "shop1".to_string()
}

fn default_auxiliary_id() -> String {
    "backpack1".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bridge_timeout_ms: default_bridge_timeout_ms(),
            primary_id: default_primary_id(),
            secondary_id: default_secondary_id(),
            auxiliary_id: default_auxiliary_id(),
        }
    }
}

impl EngineConfig {
    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_millis(self.bridge_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CatalogConfig {
    /// JSON array of item definitions loaded at startup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_path: Option<String>,
}

/// Simulated authority used by `gridstash simulate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Share of requests approved, 0.0 to 1.0.
    #[serde(default = "default_approve_ratio")]
    pub approve_ratio: f64,
    #[serde(default)]
    pub reply_delay_ms: u64,
    /// Fixed seed for reproducible verdicts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
}

fn default_approve_ratio() -> f64 {
    1.0
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            approve_ratio: default_approve_ratio(),
            reply_delay_ms: 0,
            rng_seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine.bridge_timeout_ms == 0 {
            return Err(anyhow!("engine.bridge_timeout_ms must be greater than zero"));
        }
        let ids = [
            &self.engine.primary_id,
            &self.engine.secondary_id,
            &self.engine.auxiliary_id,
        ];
        if ids.iter().any(|id| id.trim().is_empty()) {
            return Err(anyhow!("built-in inventory ids must not be empty"));
        }
        if ids[0] == ids[1] || ids[0] == ids[2] || ids[1] == ids[2] {
            return Err(anyhow!("built-in inventory ids must be distinct"));
        }
        let ratio = self.simulation.approve_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(anyhow!(
                "simulation.approve_ratio must be within 0.0..=1.0 (got {})",
                ratio
            ));
        }
        Ok(())
    }
}
