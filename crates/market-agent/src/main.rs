//! market-agent: autonomous participant in an on-chain issue market
//!
//! Each cycle snapshots the market, asks a local model for the next ledger
//! command, guards it against the agent's balance and executes it.

mod agent;
mod config;
mod console;
mod ledger;
mod outcome;
mod reasoning;
mod snapshot;
mod tasks;
#[cfg(test)]
mod testing;
mod trajectory;
mod validator;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use llm_core::{Config, OllamaClient, OllamaStatus};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use agent::{record_shutdown, AgentConfig, AgentIdentity, MarketAgent};
use config::AgentSettings;
use console::{RESET, YELLOW};
use ledger::ShellRunner;
use reasoning::OllamaReasoner;

#[derive(Debug, Parser)]
#[command(name = "market-agent")]
#[command(about = "Autonomous agent trading on an issue market", version)]
struct Cli {
    /// JSONL file with the agent's issues
    data_file: PathBuf,

    /// Key name used for transactions and balance queries
    #[arg(default_value = "agent")]
    agent_name: String,

    /// Ledger address of the agent
    #[arg(default_value = "cosmos1default")]
    agent_address: String,

    /// Reasoning model (overrides llm.toml)
    #[arg(short, long, env = "CHAT_LLM")]
    model: Option<String>,

    /// Ollama base URL (overrides llm.toml)
    #[arg(long, env = "OLLAMA_HOST")]
    ollama_url: Option<String>,

    /// Agent settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress console progress (trajectory and logs are unaffected)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let llm = Config::try_load().unwrap_or_else(Config::default_minimal);
    let settings = AgentSettings::load(cli.config.as_deref())?;

    let base_url = cli
        .ollama_url
        .map(|url| normalize_base_url(&url))
        .unwrap_or_else(|| llm.ollama_url());
    let model = cli.model.unwrap_or(llm.models.reasoning.clone());

    let client = OllamaClient::with_timeout(
        base_url,
        Duration::from_secs(llm.ollama.request_timeout_secs),
    );
    check_reasoning_service(&client, &model).await;

    let reasoner = OllamaReasoner::new(client, model).with_temperature(llm.models.temperature);
    info!(model = reasoner.model(), "Reasoning service configured");
    let runner = ShellRunner::new(settings.ledger.command_timeout());

    let config = AgentConfig::new(
        AgentIdentity::new(cli.agent_name, cli.agent_address),
        cli.data_file,
    )
    .with_loop_delay(settings.agent.loop_delay())
    .with_echo(!cli.quiet);

    let mut agent = MarketAgent::new(
        config,
        settings.ledger.clone(),
        &settings.agent.trajectory_dir,
        Arc::new(runner),
        Arc::new(reasoner),
    );
    let recorder = agent.recorder().clone();
    info!(trajectory = %recorder.path().display(), "Recording trajectory");

    tokio::select! {
        _ = agent.run() => {}
        _ = tokio::signal::ctrl_c() => {
            println!("\n{}Agent shutting down gracefully...{}", YELLOW, RESET);
            record_shutdown(&recorder);
        }
    }

    Ok(())
}

/// Startup check of the reasoning service; problems are reported, never fatal
async fn check_reasoning_service(client: &OllamaClient, model: &str) {
    if client.status().await == OllamaStatus::Stopped {
        warn!(url = client.base_url(), "Ollama is not reachable, decisions will fall back");
        return;
    }

    match client.list_models().await {
        Ok(models) if models.iter().any(|m| m.name == model) => {
            info!(model, "Reasoning model available");
        }
        Ok(_) => warn!(model, "Reasoning model not found on the Ollama server"),
        Err(e) => warn!(error = %e, "Failed to list models"),
    }
}

/// `OLLAMA_HOST` is commonly given as `host:port`
fn normalize_base_url(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_positional_defaults() {
        let cli = Cli::try_parse_from(["market-agent", "alice.jsonl"]).unwrap();
        assert_eq!(cli.data_file, PathBuf::from("alice.jsonl"));
        assert_eq!(cli.agent_name, "agent");
        assert_eq!(cli.agent_address, "cosmos1default");
    }

    #[test]
    fn test_cli_requires_data_file() {
        assert!(Cli::try_parse_from(["market-agent"]).is_err());
    }

    #[test]
    fn test_cli_identity() {
        let cli =
            Cli::try_parse_from(["market-agent", "bob.jsonl", "bob", "cosmos1bob", "-v"]).unwrap();
        assert_eq!(cli.agent_name, "bob");
        assert_eq!(cli.agent_address, "cosmos1bob");
        assert!(cli.verbose);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_cli_quiet() {
        let cli = Cli::try_parse_from(["market-agent", "alice.jsonl", "--quiet"]).unwrap();
        assert!(cli.quiet);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("localhost:11434"), "http://localhost:11434");
        assert_eq!(normalize_base_url("http://10.0.0.2:11434/"), "http://10.0.0.2:11434");
        assert_eq!(normalize_base_url("https://llm.example"), "https://llm.example");
    }
}
