//! Error types for the conversation crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ToolError`: Errors from a single tool invocation. These never leave the
//!   registry as errors; they are rendered into tagged tool results.
//! - `RegistryError`: Errors from building a registry

use std::fmt;

/// Prefix marking tool result content as an error report.
pub const ERROR_TAG: &str = "Error:";

/// Errors from tool execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// No tool with this name is registered.
    NotFound { name: String },
    /// Arguments were not valid JSON or did not match the tool's parameters.
    InvalidArguments { name: String, reason: String },
    /// The tool ran and its underlying operation failed.
    ExecutionFailed { name: String, reason: String },
}

impl ToolError {
    /// Returns the tool name the error refers to.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        match self {
            Self::NotFound { name }
            | Self::InvalidArguments { name, .. }
            | Self::ExecutionFailed { name, .. } => name,
        }
    }

    /// Renders the error as the content handed back to the model.
    #[must_use]
    pub fn to_tool_content(&self) -> String {
        format!("{ERROR_TAG} {self}")
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { name } => write!(f, "Tool '{name}' not found"),
            Self::InvalidArguments { name, reason } => {
                write!(f, "Invalid arguments for tool '{name}': {reason}")
            }
            Self::ExecutionFailed { name, reason } => {
                write!(f, "Tool '{name}' failed: {reason}")
            }
        }
    }
}

impl std::error::Error for ToolError {}

/// Errors from registry construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two tools share a name.
    DuplicateTool { name: String },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateTool { name } => {
                write!(f, "tool '{name}' registered more than once")
            }
        }
    }
}

impl std::error::Error for RegistryError {}
