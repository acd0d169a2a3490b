//! Test doubles for the ledger and the reasoning service

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;

use crate::agent::AgentIdentity;
use crate::ledger::{CommandOutput, CommandRunner};
use crate::reasoning::{Reasoner, Reasoning};
use crate::snapshot::Auction;
use crate::trajectory::TrajectoryEntry;

/// Ledger answering commands from a fixed script
///
/// The first response whose pattern occurs in the command wins; unmatched
/// commands produce empty output.
#[derive(Default)]
pub struct ScriptedLedger {
    responses: Vec<(String, String)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, pattern: &str, output: &str) -> Self {
        self.responses.push((pattern.to_string(), output.to_string()));
        self
    }

    /// Every command run so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRunner for ScriptedLedger {
    async fn run(&self, command: &str) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(command.to_string());

        let output = self
            .responses
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default();

        Ok(CommandOutput::stdout(output))
    }
}

/// Runner whose commands can never be launched
pub struct FailingRunner;

#[async_trait]
impl CommandRunner for FailingRunner {
    async fn run(&self, _command: &str) -> Result<CommandOutput> {
        anyhow::bail!("ledger unavailable")
    }
}

/// Reasoning service with a canned reply
pub struct StubReasoner {
    reply: std::result::Result<Reasoning, String>,
    prompts: Mutex<Vec<String>>,
}

impl StubReasoner {
    pub fn deciding(decision: &str) -> Self {
        Self {
            reply: Ok(Reasoning {
                reasoning: "Weighing balance against open auctions.".to_string(),
                decision: decision.to_string(),
            }),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            reply: Err(error.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Reasoner for StubReasoner {
    async fn reason(&self, situation: &str) -> Result<Reasoning> {
        self.prompts.lock().unwrap().push(situation.to_string());
        self.reply.clone().map_err(|e| anyhow::anyhow!(e))
    }
}

pub fn identity() -> AgentIdentity {
    AgentIdentity::new("alice", "cosmos1alice")
}

/// Parse every line of a trajectory file; a missing file has no entries
pub fn read_trajectory(path: &Path) -> Vec<TrajectoryEntry> {
    match std::fs::read_to_string(path) {
        Ok(raw) => raw
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Auction entry built from a JSON object
pub fn auction(value: serde_json::Value) -> Auction {
    serde_json::from_value(value).unwrap()
}
