//! Conversation model for tool-agent.
//!
//! This crate provides:
//!
//! - **Message model**: chat turns, tool calls and tool results
//! - **Conversation history**: the append-only transcript of one run
//! - **Wire format**: conversion to and from the chat-completions wire shape
//! - **Tool registry**: the closed set of tools the model may call

pub mod error;
pub mod history;
pub mod message;
pub mod tool;
pub mod wire;

pub use error::ToolError;
pub use history::ConversationHistory;
pub use message::{ChatMessage, MessageRole, ToolCall, ToolResult};
pub use tool::{
    BuiltinTool, ParameterKind, ParameterSpec, ToolArguments, ToolRegistry, ToolSchema,
    WebSearchTool,
};
pub use wire::{WireFunctionCall, WireMessage, WireTool, WireToolCall};
