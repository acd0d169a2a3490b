//! Action validation and execution
//!
//! A proposed action passes two guards before it reaches the ledger, in this
//! order: a funds guard for bids (checked against a fresh balance read) and a
//! prefix guard requiring the ledger program to lead the command. Either guard
//! swaps the action for the read-only market research query.

use serde_json::json;
use tracing::{info, warn};

use crate::agent::AgentIdentity;
use crate::config::LedgerConfig;
use crate::console::{GREEN, RESET, YELLOW};
use crate::ledger::LedgerClient;
use crate::snapshot::SnapshotBuilder;
use crate::trajectory::{TrajectoryEvent, TrajectoryRecorder};

/// Amount assumed when a bid's amount cannot be read
pub const DEFAULT_BID_AMOUNT: u64 = 500;

const BID_MARKER: &str = "create-bid";

/// Quoted segments at or below this index hold the auction id and bidder fields
const BID_AMOUNT_MIN_INDEX: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Bid,
    Other,
}

/// Classify an action by its text
pub fn classify(action: &str) -> ActionKind {
    if action.contains(BID_MARKER) {
        ActionKind::Bid
    } else {
        ActionKind::Other
    }
}

/// Read the amount of a bid command
///
/// The command is split on double quotes; the first segment at index 4 or
/// later made only of ASCII digits is the amount. Earlier segments cover the
/// auction id and bidder. Returns `None` when no segment qualifies or the
/// number does not fit.
pub fn extract_bid_amount(command: &str) -> Option<u64> {
    command
        .split('"')
        .skip(BID_AMOUNT_MIN_INDEX)
        .find(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|part| part.parse().ok())
}

/// Why the executed command differs from the proposal, if it does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    InsufficientBalance { balance: u64, required: u64 },
    NotALedgerCommand,
}

/// What actually ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedAction {
    pub command: String,
    pub output: String,
    pub verdict: Verdict,
}

/// Applies policy guards and runs the surviving command
pub struct ActionExecutor {
    ledger: LedgerClient,
    snapshots: SnapshotBuilder,
    recorder: TrajectoryRecorder,
    commands: LedgerConfig,
    echo: bool,
}

impl ActionExecutor {
    pub fn new(
        ledger: LedgerClient,
        snapshots: SnapshotBuilder,
        recorder: TrajectoryRecorder,
        commands: LedgerConfig,
    ) -> Self {
        Self {
            ledger,
            snapshots,
            recorder,
            commands,
            echo: true,
        }
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Validate and execute one action
    pub async fn run(&self, identity: &AgentIdentity, action: &str) -> ExecutedAction {
        let mut command = action.to_string();
        let mut verdict = Verdict::Accepted;

        if classify(&command) == ActionKind::Bid {
            let required = extract_bid_amount(&command).unwrap_or(DEFAULT_BID_AMOUNT);
            let balance = self.snapshots.balance(identity).await.unwrap_or(0);

            if balance < required {
                warn!(balance, required, "Insufficient balance for bid");
                if self.echo {
                    println!(
                        "{}Insufficient balance ({}) for bidding {}! Checking market instead.{}",
                        YELLOW, balance, required, RESET
                    );
                }
                self.recorder.record(
                    TrajectoryEvent::BalanceCheckFailed,
                    json!({"balance": balance, "required": required, "action": command}),
                );
                command = self.commands.safe_default();
                verdict = Verdict::InsufficientBalance { balance, required };
            } else {
                if self.echo {
                    println!(
                        "{}Balance sufficient for bid: {} >= {}{}",
                        GREEN, balance, required, RESET
                    );
                }
                self.recorder.record(
                    TrajectoryEvent::BalanceCheckPassed,
                    json!({"balance": balance, "required": required}),
                );
            }
        }

        if !command.starts_with(self.commands.marker()) {
            warn!(action = %command, "Invalid action");
            if self.echo {
                println!("{}Invalid action: {}{}", YELLOW, command, RESET);
                println!("Agent couldn't make a valid decision. Doing market research instead.");
            }
            self.recorder.record(
                TrajectoryEvent::InvalidAction,
                json!({"action": command}),
            );
            command = self.commands.safe_default();
            verdict = Verdict::NotALedgerCommand;
        }

        let output = self.ledger.execute(&command).await;
        info!(command = %command, verdict = ?verdict, "Executed action");

        ExecutedAction {
            command,
            output,
            verdict,
        }
    }
}
