//! Append-only trajectory log
//!
//! Every decision, command, error and lifecycle event of an agent is written as
//! one JSON line to `<dir>/<agent>.traj`. The file is never read back by the
//! agent and never rewritten.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Kinds of trajectory records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrajectoryEvent {
    Startup,
    Shutdown,
    /// A ledger command was executed
    Command,
    /// A ledger command could not be run
    Error,
    Reasoning,
    ReasoningError,
    DataReload,
    DataCreated,
    DataError,
    BalanceCheckFailed,
    BalanceCheckPassed,
    InvalidAction,
}

impl TrajectoryEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Shutdown => "shutdown",
            Self::Command => "command",
            Self::Error => "error",
            Self::Reasoning => "reasoning",
            Self::ReasoningError => "reasoning_error",
            Self::DataReload => "data_reload",
            Self::DataCreated => "data_created",
            Self::DataError => "data_error",
            Self::BalanceCheckFailed => "balance_check_failed",
            Self::BalanceCheckPassed => "balance_check_passed",
            Self::InvalidAction => "invalid_action",
        }
    }
}

impl std::fmt::Display for TrajectoryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the trajectory file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryEntry {
    /// UTC, second precision
    pub timestamp: String,
    pub agent: String,
    pub event: TrajectoryEvent,
    pub data: Value,
}

/// Writer for an agent's trajectory file
#[derive(Debug, Clone)]
pub struct TrajectoryRecorder {
    agent: String,
    path: PathBuf,
}

impl TrajectoryRecorder {
    pub fn new(dir: impl AsRef<Path>, agent: impl Into<String>) -> Self {
        let agent = agent.into();
        let path = dir.as_ref().join(format!("{}.traj", agent));
        Self { agent, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record. I/O failures are reported on the console only.
    pub fn record(&self, event: TrajectoryEvent, data: Value) {
        let entry = TrajectoryEntry {
            timestamp: timestamp_now(),
            agent: self.agent.clone(),
            event,
            data,
        };

        if let Err(e) = self.append(&entry) {
            warn!(event = %event, path = %self.path.display(), error = %e, "Failed to write trajectory");
            eprintln!("Error logging to trajectory: {:#}", e);
        }
    }

    fn append(&self, entry: &TrajectoryEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry).context("Failed to serialize trajectory entry")?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        file.write_all(line.as_bytes())?;
        file.flush()?;
        file.sync_data()?;
        Ok(())
    }
}

/// Current UTC time in the trajectory timestamp format
pub fn timestamp_now() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
