//! Market agent
//!
//! Implements the observe-decide-act cycle: load tasks, snapshot the market,
//! ask the reasoning service, validate the proposed action and execute it.

mod agent_loop;
mod state;

pub use agent_loop::{record_shutdown, IterationReport, MarketAgent};
pub use state::{AgentConfig, AgentIdentity};
