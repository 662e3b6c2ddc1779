//! Tool-calling orchestration loop.
//!
//! One run drives the conversation to an answer:
//! 1. Append the user's message to the transcript
//! 2. Ask the completion backend, offering the registry's tools
//! 3. If it answers, stop
//! 4. Otherwise run every requested tool, in order, and append the results
//! 5. Repeat from 2 until it answers or the iteration bound is hit
//!
//! Tool problems never end a run; they come back to the model as tagged tool
//! results. A failed backend call ends the run with an error.

use crate::backend::{Completion, CompletionBackend};
use crate::error::OrchestratorError;
use chrono::{DateTime, Utc};
use rootcause::prelude::ResultExt;
use serde::{Deserialize, Serialize};
use tool_agent_conversation::{ChatMessage, ConversationHistory, ToolCall, ToolRegistry, ToolSchema};
use tool_agent_core::{ChatRunId, Result};
use tracing::{debug, info, instrument, warn};

/// Content returned when a run hits the iteration bound.
pub const LIMIT_FALLBACK_MESSAGE: &str =
    "Sorry, I encountered an issue processing your request. Please try again.";

/// Default bound on completion calls per run.
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

/// What a run that hits the iteration bound returns as its transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitPolicy {
    /// Return an empty transcript. Callers that replay the returned history
    /// start over rather than resending a half-finished tool exchange.
    #[default]
    DiscardHistory,
    /// Return everything appended before the bound was hit.
    KeepPartialHistory,
}

/// Configuration for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum completion calls per run. Always at least 1.
    #[serde(deserialize_with = "deserialize_max_iterations")]
    pub max_iterations: u32,
    /// Transcript returned when the bound is hit.
    pub limit_policy: LimitPolicy,
}

impl OrchestratorConfig {
    /// Creates a configuration with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            limit_policy: LimitPolicy::default(),
        }
    }

    /// Sets the iteration bound, clamped to at least 1.
    #[must_use]
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// Sets the limit policy.
    #[must_use]
    pub fn with_limit_policy(mut self, policy: LimitPolicy) -> Self {
        self.limit_policy = policy;
        self
    }
}

fn deserialize_max_iterations<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    u32::deserialize(deserializer).map(|max| max.max(1))
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model produced a final answer.
    Completed,
    /// The iteration bound was reached while the model still wanted tools.
    IterationLimit,
}

/// The result of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOutcome {
    /// Run identifier.
    pub run_id: ChatRunId,
    /// Final answer, or the fallback message.
    pub content: String,
    /// Tools the model asked for, each once, in first-use order.
    pub used_tools: Vec<String>,
    /// The updated transcript (see [`LimitPolicy`] for the limit case).
    pub messages: ConversationHistory,
    /// Number of completion calls made.
    pub iterations: u32,
    /// Why the run stopped.
    pub stop_reason: StopReason,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run ended.
    pub finished_at: DateTime<Utc>,
}

impl ChatOutcome {
    /// Returns true if the model produced a final answer.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.stop_reason == StopReason::Completed
    }

    /// Returns the total duration of the run.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// States of the run loop.
#[derive(Debug)]
enum RunPhase {
    AwaitingModel,
    ExecutingTools(Vec<ToolCall>),
    Done(String),
    FailedLimit,
}

/// Mutable state of one run, owned by that run only.
#[derive(Debug)]
struct RunState {
    run_id: ChatRunId,
    iteration: u32,
    completion_calls: u32,
    used_tools: Vec<String>,
    history: ConversationHistory,
    started_at: DateTime<Utc>,
}

impl RunState {
    fn new(history: ConversationHistory) -> Self {
        Self {
            run_id: ChatRunId::new(),
            iteration: 0,
            completion_calls: 0,
            used_tools: Vec::new(),
            history,
            started_at: Utc::now(),
        }
    }

    fn record_tool(&mut self, name: &str) {
        if !self.used_tools.iter().any(|used| used == name) {
            self.used_tools.push(name.to_string());
        }
    }

    fn into_outcome(self, content: String, stop_reason: StopReason, messages: ConversationHistory) -> ChatOutcome {
        ChatOutcome {
            run_id: self.run_id,
            content,
            used_tools: self.used_tools,
            messages,
            iterations: self.completion_calls,
            stop_reason,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }

    fn finish(mut self, content: String) -> ChatOutcome {
        let messages = std::mem::take(&mut self.history);
        self.into_outcome(content, StopReason::Completed, messages)
    }

    fn fail_limit(mut self, policy: LimitPolicy) -> ChatOutcome {
        let partial = std::mem::take(&mut self.history);
        let messages = match policy {
            LimitPolicy::DiscardHistory => ConversationHistory::new(),
            LimitPolicy::KeepPartialHistory => partial,
        };
        self.into_outcome(
            LIMIT_FALLBACK_MESSAGE.to_string(),
            StopReason::IterationLimit,
            messages,
        )
    }
}

/// Drives conversations between a completion backend and the tool registry.
///
/// Holds no per-run state, so one instance can serve concurrent runs.
#[derive(Debug)]
pub struct Orchestrator<B: CompletionBackend> {
    backend: B,
    registry: ToolRegistry,
    config: OrchestratorConfig,
}

impl<B: CompletionBackend> Orchestrator<B> {
    /// Creates a new orchestrator.
    #[must_use]
    pub fn new(backend: B, registry: ToolRegistry, config: OrchestratorConfig) -> Self {
        Self {
            backend,
            registry,
            config,
        }
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the tool registry.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs one user turn to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if a completion backend call fails. Tool failures and
    /// hitting the iteration bound are not errors.
    #[instrument(skip_all, fields(run_id = tracing::field::Empty, model = self.backend.model()))]
    pub async fn run(
        &self,
        user_message: impl Into<String>,
        history: ConversationHistory,
    ) -> Result<ChatOutcome, OrchestratorError> {
        let mut state = RunState::new(history.with_message(ChatMessage::user(user_message)));
        tracing::Span::current().record("run_id", tracing::field::display(state.run_id));

        let schemas = self.registry.schemas();
        let mut phase = RunPhase::AwaitingModel;
        loop {
            phase = match phase {
                RunPhase::AwaitingModel => self.await_model(&mut state, &schemas).await?,
                RunPhase::ExecutingTools(calls) => {
                    self.execute_tools(&mut state, &calls).await;
                    RunPhase::AwaitingModel
                }
                RunPhase::Done(content) => {
                    let outcome = state.finish(content);
                    info!(
                        iterations = outcome.iterations,
                        used_tools = ?outcome.used_tools,
                        duration_ms = outcome.duration().num_milliseconds(),
                        "run completed"
                    );
                    return Ok(outcome);
                }
                RunPhase::FailedLimit => {
                    warn!(
                        max_iterations = self.config.max_iterations,
                        used_tools = ?state.used_tools,
                        policy = ?self.config.limit_policy,
                        "run hit iteration limit"
                    );
                    return Ok(state.fail_limit(self.config.limit_policy));
                }
            };
        }
    }

    async fn await_model(
        &self,
        state: &mut RunState,
        schemas: &[ToolSchema],
    ) -> Result<RunPhase, OrchestratorError> {
        state.iteration += 1;
        if state.iteration > self.config.max_iterations {
            return Ok(RunPhase::FailedLimit);
        }

        debug!(iteration = state.iteration, messages = state.history.len(), "requesting completion");
        state.completion_calls += 1;
        let completion = match self.backend.complete(state.history.messages(), schemas).await {
            Ok(completion) => completion,
            Err(report) => {
                let reason = report.current_context().to_string();
                return Err(report).context(OrchestratorError::CompletionFailed {
                    run_id: state.run_id,
                    iteration: state.iteration,
                    reason,
                });
            }
        };
        let Completion {
            content,
            tool_calls,
        } = completion;

        let content = content.unwrap_or_default();
        if tool_calls.is_empty() {
            state.history.append(ChatMessage::assistant(content.clone()));
            return Ok(RunPhase::Done(content));
        }

        debug!(iteration = state.iteration, tool_calls = tool_calls.len(), "model requested tools");
        state
            .history
            .append(ChatMessage::assistant_with_tool_calls(content, tool_calls.clone()));
        Ok(RunPhase::ExecutingTools(tool_calls))
    }

    /// Runs the batch sequentially in the order the model listed it.
    async fn execute_tools(&self, state: &mut RunState, calls: &[ToolCall]) {
        for call in calls {
            state.record_tool(&call.name);
            let result = self.registry.execute(call).await;
            state.history.append(result.into_message());
        }
    }
}
