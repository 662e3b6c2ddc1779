//! AI primitives for tool-agent.
//!
//! This crate provides:
//!
//! - **Completion backend**: the interface to a chat-completions model, and
//!   an OpenAI-compatible HTTP implementation
//! - **Orchestrator**: the bounded loop that alternates between the model and
//!   the tool registry until the model answers

pub mod backend;
pub mod error;
pub mod openai;
pub mod orchestrator;

pub use backend::{Completion, CompletionBackend};
pub use error::{LlmError, OrchestratorError};
pub use openai::{OpenAiBackend, OpenAiConfig};
pub use orchestrator::{
    ChatOutcome, LimitPolicy, Orchestrator, OrchestratorConfig, StopReason, LIMIT_FALLBACK_MESSAGE,
};
