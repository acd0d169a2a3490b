//! Decision gateway: market state in, one ledger command out

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::prompt::{build_decision_request, DecisionContext};
use super::Reasoner;
use crate::agent::AgentIdentity;
use crate::config::LedgerConfig;
use crate::console::{CYAN, RESET, YELLOW};
use crate::outcome::Outcome;
use crate::snapshot::MarketSnapshot;
use crate::tasks::Task;
use crate::trajectory::{TrajectoryEvent, TrajectoryRecorder};

/// First line of a decision that mentions the ledger program, trimmed
pub fn extract_command<'a>(decision: &'a str, marker: &str) -> Option<&'a str> {
    if marker.is_empty() {
        return None;
    }

    decision
        .lines()
        .find(|line| line.contains(marker))
        .map(str::trim)
}

/// Consults the reasoning service once per cycle
pub struct ReasoningGateway {
    reasoner: Arc<dyn Reasoner>,
    recorder: TrajectoryRecorder,
    ledger: LedgerConfig,
    echo: bool,
}

impl ReasoningGateway {
    pub fn new(reasoner: Arc<dyn Reasoner>, recorder: TrajectoryRecorder, ledger: LedgerConfig) -> Self {
        Self {
            reasoner,
            recorder,
            ledger,
            echo: true,
        }
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Ask for the next action. `Fallback` means no usable command was produced.
    pub async fn decide(
        &self,
        identity: &AgentIdentity,
        snapshot: &MarketSnapshot,
        tasks: &[Task],
    ) -> Outcome<String> {
        let prompt = build_decision_request(
            &DecisionContext {
                identity,
                snapshot,
                tasks,
                now: Utc::now(),
            },
            &self.ledger,
        );
        debug!(prompt_len = prompt.len(), "Built decision request");

        let reply = match self.reasoner.reason(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                let error = format!("{:#}", e);
                warn!(error = %error, "Reasoning failed");
                if self.echo {
                    println!("{}=== AGENT REASONING FAILED ==={}", YELLOW, RESET);
                    println!("Agent couldn't make a decision due to reasoning error: {}", error);
                }
                self.recorder.record(
                    TrajectoryEvent::ReasoningError,
                    json!({"prompt": prompt, "error": error}),
                );
                return Outcome::fallback(format!("reasoning failed: {}", error));
            }
        };

        if self.echo {
            println!();
            println!("{}=== AGENT REASONING ==={}", CYAN, RESET);
            println!("{}", reply.reasoning);
            println!("{}=== AGENT DECISION ==={}", CYAN, RESET);
            println!("{}", reply.decision);
        }
        self.recorder.record(
            TrajectoryEvent::Reasoning,
            json!({
                "prompt": prompt,
                "reasoning": reply.reasoning,
                "decision": reply.decision,
            }),
        );

        match extract_command(&reply.decision, self.ledger.marker()) {
            Some(command) => {
                info!(command, "Extracted action");
                Outcome::Ok(command.to_string())
            }
            None => {
                warn!(decision = %reply.decision, "Decision contains no ledger command");
                Outcome::fallback("decision contains no ledger command")
            }
        }
    }
}
