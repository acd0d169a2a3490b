//! llm-core: Shared library for the local reasoning model
//!
//! Provides:
//! - Configuration loading (llm.toml)
//! - Ollama API client (with JSON-schema constrained replies)

pub mod config;
pub mod ollama;

pub use config::Config;
pub use ollama::{
    ChatMessage, ChatOptions, ChatResponse, Model, OllamaClient, OllamaStatus, Role,
};
