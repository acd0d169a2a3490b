//! Agent settings
//!
//! Configuration file: ~/.config/market-agent/config.toml (or platform equivalent),
//! or an explicit path passed with `--config`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for the market agent
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentSettings {
    /// Ledger CLI configuration
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Decision loop configuration
    #[serde(default)]
    pub agent: LoopConfig,
}

/// How to reach the ledger CLI and which market to trade on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Ledger program; also the marker every valid action must start with
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Ledger module hosting the auctions
    #[serde(default = "default_module")]
    pub module: String,

    /// Denomination counted as spendable balance
    #[serde(default = "default_denom")]
    pub denom: String,

    /// Timeout for a single ledger command in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

/// Decision loop timing and output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Delay between iterations in milliseconds
    #[serde(default = "default_loop_delay")]
    pub loop_delay_ms: u64,

    /// Directory holding the `<agent>.traj` audit file
    #[serde(default = "default_trajectory_dir")]
    pub trajectory_dir: PathBuf,
}

fn default_binary() -> String {
    "swechaind".to_string()
}

fn default_module() -> String {
    "issuemarket".to_string()
}

fn default_denom() -> String {
    "stake".to_string()
}

fn default_command_timeout() -> u64 {
    60
}

fn default_loop_delay() -> u64 {
    500
}

fn default_trajectory_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            module: default_module(),
            denom: default_denom(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            loop_delay_ms: default_loop_delay(),
            trajectory_dir: default_trajectory_dir(),
        }
    }
}

impl LedgerConfig {
    /// Program marker identifying a ledger command
    pub fn marker(&self) -> &str {
        &self.binary
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Balance query for an account
    pub fn balance_query(&self, account: &str) -> String {
        format!("{} query bank balances {} --output json", self.binary, account)
    }

    /// Full auction listing
    pub fn list_auctions(&self) -> String {
        format!("{} query {} list-auction --output json", self.binary, self.module)
    }

    /// Read-only market research query substituted whenever an action is rejected
    pub fn safe_default(&self) -> String {
        self.list_auctions()
    }
}

impl LoopConfig {
    pub fn loop_delay(&self) -> Duration {
        Duration::from_millis(self.loop_delay_ms)
    }
}

impl AgentSettings {
    /// Load settings from an explicit path, or the default location if it exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load settings from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("market-agent").join("config.toml"))
    }
}
