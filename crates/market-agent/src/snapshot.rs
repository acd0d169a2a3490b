//! Market snapshot
//!
//! A bounded, point-in-time view of the agent's balance and the auction
//! listing, rebuilt from fresh ledger queries every cycle.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::agent::AgentIdentity;
use crate::config::LedgerConfig;
use crate::ledger::LedgerClient;
use crate::outcome::Outcome;

/// Other agents' open auctions offered to the reasoning service
pub const MAX_OTHER_AUCTIONS: usize = 3;

/// An auction as listed by the ledger
///
/// Kept as the raw entry so every field the ledger returned reaches the
/// decision request untouched. Known fields are read leniently: a value of
/// an unexpected type counts as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Auction {
    fields: Map<String, Value>,
}

impl Auction {
    pub fn status(&self) -> Option<&str> {
        self.text(&["status"])
    }

    pub fn creator(&self) -> Option<&str> {
        self.text(&["creator"])
    }

    pub fn creator_address(&self) -> Option<&str> {
        self.text(&["creatorAddr", "creatorAddress", "creator_address"])
    }

    /// Created by this agent, matched on either name or address
    pub fn is_owned_by(&self, identity: &AgentIdentity) -> bool {
        self.creator() == Some(identity.name.as_str())
            || self.creator_address() == Some(identity.address.as_str())
    }

    pub fn is_open(&self) -> bool {
        self.status()
            .map_or(false, |status| status.eq_ignore_ascii_case("open"))
    }

    fn text(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|key| self.fields.get(*key).and_then(Value::as_str))
    }
}

/// Agent-relevant market state for one decision
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarketSnapshot {
    pub balance: u64,
    pub own_auctions: Vec<Auction>,
    pub other_auctions: Vec<Auction>,
    pub auctions_count: usize,
    pub own_auctions_count: usize,
}

impl MarketSnapshot {
    /// Partition a full listing into own and other-open auctions
    pub fn from_listing(identity: &AgentIdentity, auctions: Vec<Auction>, balance: u64) -> Self {
        let auctions_count = auctions.len();
        let (own_auctions, others): (Vec<Auction>, Vec<Auction>) = auctions
            .into_iter()
            .partition(|auction| auction.is_owned_by(identity));

        let other_auctions: Vec<Auction> = others
            .into_iter()
            .filter(Auction::is_open)
            .take(MAX_OTHER_AUCTIONS)
            .collect();

        Self {
            balance,
            own_auctions_count: own_auctions.len(),
            own_auctions,
            other_auctions,
            auctions_count,
        }
    }
}

/// Parse a balance listing, returning the amount held in `denom`
///
/// A listing without that denomination holds nothing.
pub fn parse_balance(output: &str, denom: &str) -> Result<u64> {
    #[derive(Deserialize)]
    struct Coin {
        denom: String,
        amount: Value,
    }

    #[derive(Deserialize)]
    struct Balances {
        #[serde(default)]
        balances: Vec<Coin>,
    }

    let listing: Balances =
        serde_json::from_str(output.trim()).context("Balance listing is not valid JSON")?;

    let Some(coin) = listing.balances.into_iter().find(|c| c.denom == denom) else {
        return Ok(0);
    };

    match coin.amount {
        Value::String(amount) => amount
            .trim()
            .parse()
            .with_context(|| format!("Invalid {} amount: {}", denom, amount)),
        Value::Number(amount) => amount
            .as_u64()
            .with_context(|| format!("Invalid {} amount: {}", denom, amount)),
        other => anyhow::bail!("Invalid {} amount: {}", denom, other),
    }
}

/// Parse an auction listing: a bare array, or an object wrapping it under `auctions`
pub fn parse_auctions(output: &str) -> Result<Vec<Auction>> {
    let value: Value =
        serde_json::from_str(output.trim()).context("Auction listing is not valid JSON")?;

    let list = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => match map.remove("auctions") {
            Some(list) => list,
            None => return Ok(Vec::new()),
        },
        _ => return Ok(Vec::new()),
    };

    serde_json::from_value(list).context("Auction listing has malformed entries")
}

/// Builds market snapshots from ledger queries
#[derive(Clone)]
pub struct SnapshotBuilder {
    ledger: LedgerClient,
    commands: LedgerConfig,
}

impl SnapshotBuilder {
    pub fn new(ledger: LedgerClient, commands: LedgerConfig) -> Self {
        Self { ledger, commands }
    }

    /// Snapshot the market; any malformed listing falls back as a whole
    pub async fn build(&self, identity: &AgentIdentity) -> Outcome<MarketSnapshot> {
        let listing = self.ledger.query(&self.commands.list_auctions()).await;
        let auctions = match parse_auctions(&listing) {
            Ok(auctions) => auctions,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Error getting market snapshot");
                return Outcome::fallback(format!("{:#}", e));
            }
        };

        let balance = self.balance(identity).await.unwrap_or(0);
        let snapshot = MarketSnapshot::from_listing(identity, auctions, balance);
        debug!(
            balance = snapshot.balance,
            auctions = snapshot.auctions_count,
            own = snapshot.own_auctions_count,
            other_open = snapshot.other_auctions.len(),
            "Built market snapshot"
        );

        Outcome::Ok(snapshot)
    }

    /// Fresh balance read for the agent's account
    pub async fn balance(&self, identity: &AgentIdentity) -> Outcome<u64> {
        let output = self
            .ledger
            .query(&self.commands.balance_query(&identity.name))
            .await;

        match parse_balance(&output, &self.commands.denom) {
            Ok(balance) => Outcome::Ok(balance),
            Err(e) => {
                debug!(error = %format!("{:#}", e), "Balance unavailable");
                Outcome::fallback(format!("{:#}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{auction, identity, FailingRunner, ScriptedLedger};
    use serde_json::json;
    use crate::trajectory::TrajectoryRecorder;
    use std::sync::Arc;

    fn builder(ledger: impl crate::ledger::CommandRunner + 'static) -> (SnapshotBuilder, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let recorder = TrajectoryRecorder::new(dir.path(), "alice");
        let client = LedgerClient::new(Arc::new(ledger), recorder).with_echo(false);
        (SnapshotBuilder::new(client, LedgerConfig::default()), dir)
    }

    const FIVE_AUCTIONS: &str = r#"[
        {"id": "0", "title": "BUG-1", "status": "open", "creator": "alice"},
        {"id": 1, "title": "BUG-2", "status": "closed", "creatorAddr": "cosmos1alice"},
        {"id": "2", "title": "BUG-3", "status": "OPEN", "creator": "bob"},
        {"id": "3", "title": "BUG-4", "status": "closed", "creator": "carol"},
        {"id": "4", "title": "BUG-5", "status": "open", "creator": "dave"}
    ]"#;

    #[test]
    fn test_parse_balance() {
        let output = r#"{"balances":[{"denom":"token","amount":"7"},{"denom":"stake","amount":"1000"}]}"#;
        assert_eq!(parse_balance(output, "stake").unwrap(), 1000);
        assert_eq!(parse_balance(output, "atom").unwrap(), 0);
        assert_eq!(parse_balance(r#"{"balances":[]}"#, "stake").unwrap(), 0);
        assert_eq!(parse_balance("{}", "stake").unwrap(), 0);
    }

    #[test]
    fn test_parse_balance_malformed() {
        assert!(parse_balance("Error: key not found", "stake").is_err());
        assert!(parse_balance("", "stake").is_err());
        assert!(parse_balance(r#"{"balances":[{"denom":"stake","amount":"lots"}]}"#, "stake").is_err());
    }

    #[test]
    fn test_parse_auctions_shapes() {
        assert_eq!(parse_auctions(FIVE_AUCTIONS).unwrap().len(), 5);

        let wrapped = r#"{"auctions":[{"id":"9","creator":"bob"}],"pagination":{}}"#;
        let auctions = parse_auctions(wrapped).unwrap();
        assert_eq!(auctions, vec![auction(json!({"id": "9", "creator": "bob"}))]);

        assert!(parse_auctions(r#"{"pagination":{}}"#).unwrap().is_empty());
        assert!(parse_auctions("42").unwrap().is_empty());
    }

    #[test]
    fn test_parse_auctions_malformed() {
        assert!(parse_auctions("not json at all").is_err());
        assert!(parse_auctions(r#"["just a string"]"#).is_err());
        assert!(parse_auctions(r#"{"auctions": null}"#).is_err());
    }

    #[test]
    fn test_parse_auctions_keeps_extra_fields() {
        let auctions = parse_auctions(
            r#"[{"id":"3","title":"BUG-7","status":"open","creator":"bob","deadline":"2025-01-01","minBid":"250"}]"#,
        )
        .unwrap();

        let rendered = serde_json::to_string(&auctions).unwrap();
        assert!(rendered.contains(r#""deadline":"2025-01-01""#));
        assert!(rendered.contains(r#""minBid":"250""#));
    }

    #[test]
    fn test_parse_auctions_tolerates_odd_field_types() {
        let listing = r#"[
            {"id": "3", "title": "BUG-7", "status": "open", "creator": "bob"},
            {"id": "4", "title": 42, "status": "open", "creator": 7},
            {"id": "5", "status": null, "creator": ["alice"]}
        ]"#;
        let auctions = parse_auctions(listing).unwrap();
        assert_eq!(auctions.len(), 3);

        let snapshot = MarketSnapshot::from_listing(&identity(), auctions, 0);
        assert_eq!(snapshot.own_auctions_count, 0);
        assert_eq!(snapshot.other_auctions.len(), 2);
        assert!(!snapshot.other_auctions.iter().any(|a| a.status().is_none()));
    }

    #[test]
    fn test_ownership_either_field() {
        let me = identity();
        let by_name = auction(json!({"creator": "alice"}));
        let by_address = auction(json!({"creator": "someone-else", "creatorAddr": "cosmos1alice"}));
        let by_alias = auction(json!({"creatorAddress": "cosmos1alice"}));
        let numeric = auction(json!({"creator": 1, "creatorAddr": 2}));
        let neither = Auction::default();

        assert!(by_name.is_owned_by(&me));
        assert!(by_address.is_owned_by(&me));
        assert!(by_alias.is_owned_by(&me));
        assert!(!numeric.is_owned_by(&me));
        assert!(!neither.is_owned_by(&me));
    }

    #[test]
    fn test_other_auctions_capped_in_ledger_order() {
        let auctions: Vec<Auction> = (0..6)
            .map(|i| auction(json!({"id": i.to_string(), "status": "open", "creator": "bob"})))
            .collect();

        let snapshot = MarketSnapshot::from_listing(&identity(), auctions, 10);
        let ids: Vec<_> = snapshot
            .other_auctions
            .iter()
            .map(|a| serde_json::to_value(a).unwrap()["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!("0"), json!("1"), json!("2")]);
        assert_eq!(snapshot.auctions_count, 6);
    }

    #[tokio::test]
    async fn test_build_partitions_listing() {
        let ledger = ScriptedLedger::new()
            .respond("list-auction", FIVE_AUCTIONS)
            .respond("bank balances", r#"{"balances":[{"denom":"stake","amount":"1000"}]}"#);
        let (builder, _dir) = builder(ledger);

        let snapshot = builder.build(&identity()).await.ok().unwrap();
        assert_eq!(snapshot.balance, 1000);
        assert_eq!(snapshot.auctions_count, 5);
        assert_eq!(snapshot.own_auctions_count, 2);
        assert_eq!(snapshot.other_auctions.len(), 2);
        assert!(snapshot.other_auctions.iter().all(Auction::is_open));
    }

    #[tokio::test]
    async fn test_build_malformed_listing_is_zero_snapshot() {
        for listing in ["", "Error: connection refused", "{\"auctions\": 5}", "[1, 2]"] {
            let ledger = ScriptedLedger::new()
                .respond("list-auction", listing)
                .respond("bank balances", r#"{"balances":[{"denom":"stake","amount":"1000"}]}"#);
            let (builder, _dir) = builder(ledger);

            let outcome = builder.build(&identity()).await;
            assert!(outcome.is_fallback(), "listing {:?} should fall back", listing);
            assert_eq!(outcome.unwrap_or(MarketSnapshot::default()), MarketSnapshot::default());
        }
    }

    #[tokio::test]
    async fn test_build_with_unreachable_ledger() {
        let (builder, _dir) = builder(FailingRunner);
        let outcome = builder.build(&identity()).await;
        assert_eq!(outcome.unwrap_or(MarketSnapshot::default()), MarketSnapshot::default());
    }

    #[tokio::test]
    async fn test_bad_balance_keeps_auctions() {
        let ledger = ScriptedLedger::new()
            .respond("list-auction", FIVE_AUCTIONS)
            .respond("bank balances", "Error: rpc error");
        let (builder, _dir) = builder(ledger);

        let snapshot = builder.build(&identity()).await.ok().unwrap();
        assert_eq!(snapshot.balance, 0);
        assert_eq!(snapshot.auctions_count, 5);
    }
}
