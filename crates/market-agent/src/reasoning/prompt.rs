//! Decision request document

use chrono::{DateTime, Utc};

use crate::agent::AgentIdentity;
use crate::config::LedgerConfig;
use crate::snapshot::MarketSnapshot;
use crate::tasks::Task;

/// Tasks shown to the reasoning service per cycle
pub const MAX_PROMPT_TASKS: usize = 2;

/// Everything one decision request is built from
pub struct DecisionContext<'a> {
    pub identity: &'a AgentIdentity,
    pub snapshot: &'a MarketSnapshot,
    pub tasks: &'a [Task],
    pub now: DateTime<Utc>,
}

/// Stand-in task list when the store holds none
const GENERIC_TASKS: &str = r#"[{"desc":"Generic issue","cost":5000}]"#;

/// Render the decision request for one cycle
pub fn build_decision_request(ctx: &DecisionContext<'_>, ledger: &LedgerConfig) -> String {
    let tasks = if ctx.tasks.is_empty() {
        GENERIC_TASKS.to_string()
    } else {
        to_json(&ctx.tasks[..ctx.tasks.len().min(MAX_PROMPT_TASKS)])
    };

    let name = &ctx.identity.name;
    let address = &ctx.identity.address;
    let bin = &ledger.binary;
    let module = &ledger.module;

    format!(
        r#"
Date: {now}
You are {name}, a profit-maximizing blockchain agent with address {address}.

YOUR MARKET STATUS:
- Current balance: {balance} tokens
- You have {own_count} active auctions
- There are {total} total auctions in the market
- Your issues to work on: {tasks}

MARKET OPPORTUNITIES:
- Open auctions to bid on: {others}
- Your own auctions: {own}

ECONOMIC INCENTIVES:
1. CREATE AUCTIONS to outsource your issues and save development costs
   - You pay winning bidders but save your time for more valuable work
   - Command: {bin} tx {module} create-auction "BUG-123" "Fix memory leak" "open" "" --from {name} --yes

2. PLACE BIDS to earn tokens by completing others' issues
   - Lower bids increase chances of winning but reduce profit
   - Higher bids increase profit but reduce chances of winning
   - Command: {bin} tx {module} create-bid "0" "0" {address} "500" "Will fix fast" --from {name} --yes

3. CLOSE YOUR AUCTIONS when ready to award to lowest bidder
   - Command: {bin} tx {module} update-auction 0 "BUG-123" "Fix memory leak" "closed" "" --from {name} --yes

4. MARKET RESEARCH actions:
   - Check market: {research}
   - Check balance: {balance_query}

Think economically! Balance creating auctions and bidding to maximize profit.
Return ONLY the exact command to execute.
"#,
        now = ctx.now.format("%Y-%m-%d %H:%M:%S"),
        balance = ctx.snapshot.balance,
        own_count = ctx.snapshot.own_auctions_count,
        total = ctx.snapshot.auctions_count,
        tasks = tasks,
        others = to_json(&ctx.snapshot.other_auctions),
        own = to_json(&ctx.snapshot.own_auctions),
        research = ledger.list_auctions(),
        balance_query = ledger.balance_query(name),
    )
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
}
