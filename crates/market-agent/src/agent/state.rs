//! Agent session state

use std::path::PathBuf;
use std::time::Duration;

use crate::tasks::{Task, TaskLoad};

/// Who the agent is on the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    /// Key name used with `--from` and balance queries
    pub name: String,
    /// Bech32 account address
    pub address: String,
}

impl AgentIdentity {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Configuration for one agent process
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub identity: AgentIdentity,
    /// JSONL task source
    pub data_file: PathBuf,
    /// Pause between iterations
    pub loop_delay: Duration,
    /// Whether to print progress to the console
    pub echo: bool,
}

impl AgentConfig {
    pub fn new(identity: AgentIdentity, data_file: impl Into<PathBuf>) -> Self {
        Self {
            identity,
            data_file: data_file.into(),
            loop_delay: Duration::from_millis(500),
            echo: true,
        }
    }

    pub fn with_loop_delay(mut self, delay: Duration) -> Self {
        self.loop_delay = delay;
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }
}

/// State carried between iterations
#[derive(Debug, Default)]
pub struct AgentState {
    /// Current iteration
    pub iteration: usize,
    /// Task set from the most recent load
    pub tasks: Vec<Task>,
}

impl AgentState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_iteration(&mut self) {
        self.iteration += 1;
    }

    /// Replace the task set on a fresh load; keep it when unchanged
    pub fn apply_tasks(&mut self, load: TaskLoad) -> bool {
        match load {
            TaskLoad::Loaded(tasks) => {
                self.tasks = tasks;
                true
            }
            TaskLoad::Unchanged => false,
        }
    }
}
