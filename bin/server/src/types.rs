//! Request and response bodies for the HTTP API.

use serde::{Deserialize, Serialize};
use tool_agent_ai::ChatOutcome;
use tool_agent_conversation::ChatMessage;

/// Body of `POST /chat`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    /// The user's new message.
    pub message: String,
    /// Prior transcript, as returned by a previous call.
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}

/// Response of `POST /chat`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub used_tools: Vec<String>,
    pub messages: Vec<ChatMessage>,
}

impl From<ChatOutcome> for ChatResponse {
    fn from(outcome: ChatOutcome) -> Self {
        Self {
            response: outcome.content,
            used_tools: outcome.used_tools,
            messages: outcome.messages.into_messages(),
        }
    }
}

/// Response of `GET /`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceInfo {
    pub message: String,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthStatus {
    pub status: String,
}
