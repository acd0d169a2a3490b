//! Agent loop implementation

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::config::LedgerConfig;
use crate::console::{CYAN, RESET, YELLOW};
use crate::ledger::{CommandRunner, LedgerClient};
use crate::outcome::Outcome;
use crate::reasoning::{Reasoner, ReasoningGateway};
use crate::snapshot::{MarketSnapshot, SnapshotBuilder};
use crate::tasks::TaskStore;
use crate::trajectory::{timestamp_now, TrajectoryEvent, TrajectoryRecorder};
use crate::validator::{ActionExecutor, ExecutedAction};

use super::state::{AgentConfig, AgentState};

/// What one pass through the cycle observed and did
#[derive(Debug, Clone)]
pub struct IterationReport {
    pub iteration: usize,
    pub snapshot: MarketSnapshot,
    pub decision: Outcome<String>,
    pub executed: ExecutedAction,
}

/// The decision loop orchestrator
pub struct MarketAgent {
    config: AgentConfig,
    recorder: TrajectoryRecorder,
    tasks: TaskStore,
    snapshots: SnapshotBuilder,
    gateway: ReasoningGateway,
    executor: ActionExecutor,
    safe_default: String,
}

impl MarketAgent {
    /// Wire the cycle components around a ledger runner and a reasoning service
    pub fn new(
        config: AgentConfig,
        ledger: LedgerConfig,
        trajectory_dir: &Path,
        runner: Arc<dyn CommandRunner>,
        reasoner: Arc<dyn Reasoner>,
    ) -> Self {
        let recorder = TrajectoryRecorder::new(trajectory_dir, config.identity.name.clone());
        let client = LedgerClient::new(runner, recorder.clone()).with_echo(config.echo);
        let snapshots = SnapshotBuilder::new(client.clone(), ledger.clone());
        let gateway = ReasoningGateway::new(reasoner, recorder.clone(), ledger.clone())
            .with_echo(config.echo);
        let executor =
            ActionExecutor::new(client, snapshots.clone(), recorder.clone(), ledger.clone())
                .with_echo(config.echo);
        let tasks = TaskStore::new(config.data_file.clone(), recorder.clone());

        Self {
            safe_default: ledger.safe_default(),
            config,
            recorder,
            tasks,
            snapshots,
            gateway,
            executor,
        }
    }

    pub fn recorder(&self) -> &TrajectoryRecorder {
        &self.recorder
    }

    /// Record startup and perform the initial task load
    pub fn start(&mut self) -> AgentState {
        let identity = &self.config.identity;
        self.recorder.record(
            TrajectoryEvent::Startup,
            json!({
                "agent": identity.name,
                "address": identity.address,
                "data_file": self.config.data_file.display().to_string(),
            }),
        );

        let mut state = AgentState::new();
        state.apply_tasks(self.tasks.load());
        info!(
            agent = %identity.name,
            address = %identity.address,
            tasks = state.tasks.len(),
            "Agent started"
        );
        if self.config.echo {
            println!(
                "Agent {} started with {} issues",
                identity.name,
                state.tasks.len()
            );
        }

        state
    }

    /// Run one full cycle. Every stage degrades instead of failing.
    #[instrument(skip_all, fields(agent = %self.config.identity.name))]
    pub async fn run_iteration(&mut self, state: &mut AgentState) -> IterationReport {
        state.increment_iteration();
        if self.config.echo {
            println!(
                "\n{}=== ITERATION {} ({}) ==={}",
                CYAN,
                state.iteration,
                timestamp_now(),
                RESET
            );
        }
        debug!(iteration = state.iteration, "Starting iteration");

        let identity = &self.config.identity;

        if state.apply_tasks(self.tasks.load()) {
            debug!(tasks = state.tasks.len(), "Task set replaced");
        }

        let snapshot = self.snapshots.build(identity).await.unwrap_or_else(|reason| {
            warn!(reason, "Using empty market snapshot");
            MarketSnapshot::default()
        });

        let decision = self.gateway.decide(identity, &snapshot, &state.tasks).await;
        let action = match &decision {
            Outcome::Ok(command) => command.clone(),
            Outcome::Fallback(reason) => {
                warn!(reason = %reason, "No usable decision, falling back to market research");
                if self.config.echo {
                    println!(
                        "{}No valid command from agent: falling back to market research{}",
                        YELLOW, RESET
                    );
                }
                self.safe_default.clone()
            }
        };

        let executed = self.executor.run(identity, &action).await;

        IterationReport {
            iteration: state.iteration,
            snapshot,
            decision,
            executed,
        }
    }

    /// Run until the task is cancelled
    pub async fn run(&mut self) {
        let mut state = self.start();

        loop {
            let report = self.run_iteration(&mut state).await;
            debug!(
                iteration = report.iteration,
                balance = report.snapshot.balance,
                fallback = report.decision.is_fallback(),
                command = %report.executed.command,
                verdict = ?report.executed.verdict,
                "Iteration complete"
            );
            tokio::time::sleep(self.config.loop_delay).await;
        }
    }
}

/// Final audit record written when the operator interrupts the agent
pub fn record_shutdown(recorder: &TrajectoryRecorder) {
    recorder.record(TrajectoryEvent::Shutdown, json!({"reason": "user_interrupt"}));
}
