//! Chat-completions wire format.
//!
//! Completion backends speak the OpenAI chat-completions message shape. The
//! conversion here is lossless for role and content; tool call data is only
//! carried on the message kinds that use it.

use crate::history::ConversationHistory;
use crate::message::{ChatMessage, MessageRole, ToolCall};
use crate::tool::ToolSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

const FUNCTION_TYPE: &str = "function";

fn function_type() -> String {
    FUNCTION_TYPE.to_string()
}

/// A message as sent to or received from the completion backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Message role.
    pub role: MessageRole,
    /// Content; `null` for assistant turns that only carry tool calls.
    #[serde(default)]
    pub content: Option<String>,
    /// Requested tool calls (assistant only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    /// Answered tool call (tool only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// A tool call in wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireToolCall {
    /// Correlation id.
    pub id: String,
    /// Always `"function"`.
    #[serde(rename = "type", default = "function_type")]
    pub kind: String,
    /// Function name and serialized arguments.
    pub function: WireFunctionCall,
}

/// The function part of a wire tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireFunctionCall {
    /// Tool name.
    pub name: String,
    /// JSON-encoded arguments.
    #[serde(default)]
    pub arguments: String,
}

/// A tool declaration in wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTool {
    /// Always `"function"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Function declaration.
    pub function: WireFunctionDefinition,
}

/// The function part of a wire tool declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFunctionDefinition {
    /// Tool name.
    pub name: String,
    /// What the tool does, for the model.
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: JsonValue,
}

impl From<&ToolCall> for WireToolCall {
    fn from(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            kind: function_type(),
            function: WireFunctionCall {
                name: call.name.clone(),
                arguments: call.arguments.clone(),
            },
        }
    }
}

impl From<WireToolCall> for ToolCall {
    fn from(call: WireToolCall) -> Self {
        Self {
            id: call.id,
            name: call.function.name,
            arguments: call.function.arguments,
        }
    }
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        let carries_calls = message.role == MessageRole::Assistant && message.has_tool_calls();

        let content = if carries_calls && message.content.is_empty() {
            None
        } else {
            Some(message.content.clone())
        };

        let tool_calls =
            carries_calls.then(|| message.tool_calls.iter().map(WireToolCall::from).collect());

        let tool_call_id = if message.role == MessageRole::Tool {
            message.tool_call_id.clone()
        } else {
            None
        };

        Self {
            role: message.role,
            content,
            tool_calls,
            tool_call_id,
        }
    }
}

impl From<WireMessage> for ChatMessage {
    fn from(message: WireMessage) -> Self {
        let tool_calls = match (message.role, message.tool_calls) {
            (MessageRole::Assistant, Some(calls)) => calls.into_iter().map(ToolCall::from).collect(),
            _ => Vec::new(),
        };
        let tool_call_id = match message.role {
            MessageRole::Tool => message.tool_call_id,
            _ => None,
        };

        Self {
            role: message.role,
            content: message.content.unwrap_or_default(),
            tool_calls,
            tool_call_id,
        }
    }
}

impl From<&ToolSchema> for WireTool {
    fn from(schema: &ToolSchema) -> Self {
        Self {
            kind: function_type(),
            function: WireFunctionDefinition {
                name: schema.name.clone(),
                description: schema.description.clone(),
                parameters: schema.to_json_schema(),
            },
        }
    }
}

/// Converts a transcript to wire messages, preserving order.
#[must_use]
pub fn to_wire(history: &ConversationHistory) -> Vec<WireMessage> {
    history.iter().map(WireMessage::from).collect()
}

/// Converts tool schemas to wire declarations, preserving order.
#[must_use]
pub fn tools_to_wire(schemas: &[ToolSchema]) -> Vec<WireTool> {
    schemas.iter().map(WireTool::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{ParameterKind, ParameterSpec};
    use serde_json::json;

    #[test]
    fn plain_messages_round_trip() {
        for message in [
            ChatMessage::system("be brief"),
            ChatMessage::user("What is 2+2?"),
            ChatMessage::assistant("4"),
        ] {
            let back = ChatMessage::from(WireMessage::from(&message));
            assert_eq!(back, message);
        }
    }

    #[test]
    fn tool_call_turn_sends_null_content() {
        let msg = ChatMessage::assistant_with_tool_calls(
            "",
            vec![ToolCall::new("c1", "search_web", r#"{"query":"X"}"#)],
        );
        let json = serde_json::to_value(WireMessage::from(&msg)).expect("serialize");

        assert_eq!(
            json,
            json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "c1",
                    "type": "function",
                    "function": {"name": "search_web", "arguments": "{\"query\":\"X\"}"}
                }]
            })
        );
        assert_eq!(ChatMessage::from(WireMessage::from(&msg)), msg);
    }

    #[test]
    fn tool_message_carries_call_id() {
        let msg = ChatMessage::tool("c1", "results");
        let wire = WireMessage::from(&msg);

        assert_eq!(wire.tool_call_id.as_deref(), Some("c1"));
        assert!(wire.tool_calls.is_none());
        assert_eq!(ChatMessage::from(wire), msg);
    }

    #[test]
    fn misplaced_tool_fields_are_dropped() {
        let mut msg = ChatMessage::user("hi");
        msg.tool_call_id = Some("stray".to_string());
        msg.tool_calls = vec![ToolCall::new("c1", "search_web", "{}")];

        let wire = WireMessage::from(&msg);
        assert!(wire.tool_call_id.is_none());
        assert!(wire.tool_calls.is_none());
        assert_eq!(wire.content.as_deref(), Some("hi"));
    }

    #[test]
    fn backend_response_message_parses() {
        let wire: WireMessage = serde_json::from_value(json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_abc",
                "type": "function",
                "function": {"name": "search_web", "arguments": "{\"query\": \"rust\"}"}
            }]
        }))
        .expect("deserialize");

        let msg = ChatMessage::from(wire);
        assert_eq!(msg.content, "");
        assert_eq!(msg.tool_calls, vec![ToolCall::new("call_abc", "search_web", "{\"query\": \"rust\"}")]);
    }

    #[test]
    fn schema_renders_as_function_tool() {
        let schema = ToolSchema::new("search_web", "Searches the web")
            .with_parameter(ParameterSpec::required("query", ParameterKind::String, "The query"));
        let json = serde_json::to_value(WireTool::from(&schema)).expect("serialize");

        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "search_web");
        assert_eq!(json["function"]["parameters"]["required"], json!(["query"]));
    }

    #[test]
    fn history_converts_in_order() {
        let history = ConversationHistory::new()
            .with_message(ChatMessage::user("a"))
            .with_message(ChatMessage::assistant("b"));
        let wire = to_wire(&history);

        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, MessageRole::User);
        assert_eq!(wire[1].content.as_deref(), Some("b"));
    }
}
