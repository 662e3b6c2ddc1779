//! Error types for the AI crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `LlmError`: Low-level completion backend operations
//! - `OrchestratorError`: Run-level context wrapped around backend failures

use std::fmt;
use tool_agent_core::ChatRunId;

/// Errors from completion backend operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Provider could not be reached.
    ProviderUnavailable { provider: String, reason: String },
    /// Provider rejected the credential.
    AuthenticationFailed { provider: String },
    /// Request failed with a non-success status.
    RequestFailed { status: u16, reason: String },
    /// Response parsing failed.
    ResponseParseFailed { reason: String },
    /// Timeout waiting for response.
    Timeout,
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// Invalid configuration.
    InvalidConfig { reason: String },
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProviderUnavailable { provider, reason } => {
                write!(f, "LLM provider '{provider}' unavailable: {reason}")
            }
            Self::AuthenticationFailed { provider } => {
                write!(f, "LLM provider '{provider}' rejected the API key")
            }
            Self::RequestFailed { status, reason } => {
                write!(f, "LLM request failed with status {status}: {reason}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse LLM response: {reason}")
            }
            Self::Timeout => write!(f, "LLM request timed out"),
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid LLM configuration: {reason}")
            }
        }
    }
}

impl std::error::Error for LlmError {}

/// Run-level orchestration errors.
///
/// Use these to add context when wrapping lower-level errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// The completion backend call failed (use as context wrapper).
    ///
    /// `reason` is the backend error's own message.
    CompletionFailed {
        run_id: ChatRunId,
        iteration: u32,
        reason: String,
    },
}

impl OrchestratorError {
    /// Short description safe to show to clients.
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::CompletionFailed { reason, .. } => reason,
        }
    }
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CompletionFailed {
                run_id, iteration, ..
            } => {
                write!(f, "completion failed in run {run_id} at iteration {iteration}")
            }
        }
    }
}

impl std::error::Error for OrchestratorError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_error_display() {
        let err = LlmError::ProviderUnavailable {
            provider: "openai".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("openai"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn rate_limited_display() {
        let err = LlmError::RateLimited {
            retry_after_secs: Some(20),
        };
        assert_eq!(err.to_string(), "rate limited, retry after 20s");
    }

    #[test]
    fn orchestrator_error_names_run_and_iteration() {
        let run_id = ChatRunId::new();
        let err = OrchestratorError::CompletionFailed {
            run_id,
            iteration: 3,
            reason: LlmError::Timeout.to_string(),
        };
        assert!(err.to_string().contains(&run_id.to_string()));
        assert!(err.to_string().contains("iteration 3"));
        assert_eq!(err.reason(), "LLM request timed out");
    }
}
