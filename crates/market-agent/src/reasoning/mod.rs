//! Reasoning service integration
//!
//! The reasoning service receives one situation document per cycle and returns
//! two fields: a free-text rationale and a decision. Turning the decision into
//! a ledger command happens in [`gateway`].

pub mod gateway;
pub mod prompt;

use anyhow::Result;
use async_trait::async_trait;
use llm_core::{ChatMessage, ChatOptions, OllamaClient};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub use gateway::ReasoningGateway;

/// Structured reply of the reasoning service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reasoning {
    /// Step-by-step reasoning about the market situation
    pub reasoning: String,
    /// Final decision as an exact command
    pub decision: String,
}

/// A natural-language decision engine
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn reason(&self, situation: &str) -> Result<Reasoning>;
}

const SYSTEM_PROMPT: &str = "You are the decision engine of an autonomous market agent. \
Read the situation and reply with a JSON object holding two string fields: \
\"reasoning\" with your step-by-step reasoning about the market situation, and \
\"decision\" with the final decision as one exact command.";

/// Reasoner backed by a local Ollama model
pub struct OllamaReasoner {
    client: OllamaClient,
    model: String,
    options: ChatOptions,
}

impl OllamaReasoner {
    pub fn new(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            options: ChatOptions::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.options.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// JSON schema constraining the model reply
pub fn reply_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "reasoning": {
                "type": "string",
                "description": "Step-by-step reasoning about market situation"
            },
            "decision": {
                "type": "string",
                "description": "Final decision as exact command"
            }
        },
        "required": ["reasoning", "decision"]
    })
}

#[async_trait]
impl Reasoner for OllamaReasoner {
    async fn reason(&self, situation: &str) -> Result<Reasoning> {
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(situation)];
        self.client
            .chat_structured(&self.model, &messages, &reply_schema(), Some(&self.options))
            .await
    }
}
