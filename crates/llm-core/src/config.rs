//! Configuration management for llm.toml

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ollama: OllamaConfig,
    pub models: ModelsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OllamaConfig {
    pub host: String,
    pub port: u16,
    /// Timeout for a single reasoning request in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Model consulted for market decisions
    pub reasoning: String,
    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_request_timeout() -> u64 {
    120
}

impl Config {
    /// Load configuration from llm.toml
    pub fn load() -> Result<Self> {
        Self::load_from(Self::find_config_path()?)
    }

    /// Try to load configuration, returning None if not found
    pub fn try_load() -> Option<Self> {
        Self::load().ok()
    }

    /// Create a minimal default configuration for when llm.toml is missing
    pub fn default_minimal() -> Self {
        Self {
            ollama: OllamaConfig {
                host: "127.0.0.1".to_string(),
                port: 11434,
                request_timeout_secs: default_request_timeout(),
            },
            models: ModelsConfig {
                reasoning: "llama3.2:3b".to_string(),
                temperature: None,
            },
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.as_ref().display()))
    }

    /// Find llm.toml by searching current directory and parents
    pub fn find_config_path() -> Result<PathBuf> {
        Self::find_config_path_from(std::env::current_dir()?)
    }

    fn find_config_path_from(mut current: PathBuf) -> Result<PathBuf> {
        for _ in 0..10 {
            let candidate = current.join("llm.toml");
            if candidate.exists() {
                return Ok(candidate);
            }
            if !current.pop() {
                break;
            }
        }

        anyhow::bail!("llm.toml not found in current directory or parents")
    }

    /// Get Ollama base URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.ollama.host, self.ollama.port)
    }
}
