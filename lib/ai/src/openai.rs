//! OpenAI-compatible chat-completions backend.

use crate::backend::{Completion, CompletionBackend};
use crate::error::LlmError;
use async_trait::async_trait;
use reqwest::StatusCode;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tool_agent_conversation::wire::{self, WireMessage, WireTool};
use tool_agent_conversation::{ChatMessage, ToolSchema};
use tracing::{debug, instrument};

/// Default API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const PROVIDER: &str = "openai";

/// Configuration for an OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Base URL, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl OpenAiConfig {
    /// Creates a configuration for the public API with the default model.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

impl<'a> ChatCompletionRequest<'a> {
    fn new(model: &'a str, messages: &[ChatMessage], tools: &[ToolSchema]) -> Self {
        let tools = wire::tools_to_wire(tools);
        let tool_choice = (!tools.is_empty()).then_some("auto");
        Self {
            model,
            messages: messages.iter().map(WireMessage::from).collect(),
            tools,
            tool_choice,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: WireMessage,
}

impl ChatCompletionResponse {
    fn into_completion(self) -> Result<Completion, LlmError> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ResponseParseFailed {
                reason: "response contained no choices".to_string(),
            })?;
        Ok(Completion::from(ChatMessage::from(choice.message)))
    }
}

/// Chat-completions client for OpenAI and compatible servers.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    http: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    /// Creates a new backend.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::InvalidConfig`] if the API key is blank or the
    /// HTTP client cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self, Report<LlmError>> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::InvalidConfig {
                reason: "OPENAI_API_KEY environment variable not set".to_string(),
            }
            .into());
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: e.to_string(),
            })?;

        Ok(Self { http, config })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

fn transport_error(err: &reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::ProviderUnavailable {
            provider: PROVIDER.to_string(),
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    #[instrument(skip(self, messages, tools), fields(model = %self.config.model, messages = messages.len()))]
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<Completion, Report<LlmError>> {
        let request = ChatCompletionRequest::new(&self.config.model, messages, tools);

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LlmError::AuthenticationFailed {
                provider: PROVIDER.to_string(),
            }
            .into());
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(LlmError::RateLimited { retry_after_secs }.into());
        }
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed {
                status: status.as_u16(),
                reason,
            }
            .into());
        }

        let body: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;
        let completion = body.into_completion()?;

        debug!(
            tool_calls = completion.tool_calls.len(),
            has_content = completion.content.is_some(),
            "completion received"
        );
        Ok(completion)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
