//! Completion backend abstraction.
//!
//! The orchestrator only needs one capability from a model: given the
//! transcript and the tool declarations, either answer or ask for tools.

use crate::error::LlmError;
use async_trait::async_trait;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use tool_agent_conversation::{ChatMessage, ToolCall, ToolSchema};

/// A single completion returned by a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Free-text answer, if any.
    pub content: Option<String>,
    /// Tools the model wants run before it answers, in order.
    pub tool_calls: Vec<ToolCall>,
}

impl Completion {
    /// Creates a final-answer completion.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Creates a completion requesting tool calls.
    #[must_use]
    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls,
        }
    }

    /// Returns true if the model requested tools.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

impl From<ChatMessage> for Completion {
    fn from(message: ChatMessage) -> Self {
        Self {
            content: (!message.content.is_empty()).then_some(message.content),
            tool_calls: message.tool_calls,
        }
    }
}

/// Trait for completion backends.
///
/// One call is one blocking round-trip with no partial output. Backends are
/// shared by concurrent runs and must not keep per-run state.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Completes the conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<Completion, Report<LlmError>>;

    /// Returns the model name.
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_constructors() {
        assert!(!Completion::text("4").has_tool_calls());

        let calls = Completion::tool_calls(vec![ToolCall::new("c1", "search_web", "{}")]);
        assert!(calls.has_tool_calls());
        assert!(calls.content.is_none());
    }

    #[test]
    fn completion_from_response_message() {
        let completion = Completion::from(ChatMessage::assistant_with_tool_calls(
            "",
            vec![ToolCall::new("c1", "search_web", "{}")],
        ));
        assert!(completion.content.is_none());
        assert_eq!(completion.tool_calls.len(), 1);

        let answer = Completion::from(ChatMessage::assistant("done"));
        assert_eq!(answer.content.as_deref(), Some("done"));
    }
}
