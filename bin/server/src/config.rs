//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables. Nested sections
//! use `__` as separator, e.g. `LLM__MODEL` or `AGENT__MAX_ITERATIONS`.

use crate::error::ServerError;
use rootcause::prelude::Report;
use serde::Deserialize;
use std::time::Duration;
use tool_agent_ai::{LimitPolicy, OpenAiConfig, OrchestratorConfig};
use tool_agent_integration::ExaConfig;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// API key for the completion backend (`OPENAI_API_KEY`).
    pub openai_api_key: String,

    /// API key for the web search provider (`EXA_API_KEY`).
    /// Without it the search tool stays registered and reports the
    /// missing key to the model.
    #[serde(default)]
    pub exa_api_key: Option<String>,

    /// Completion backend settings.
    #[serde(default)]
    pub llm: LlmSettings,

    /// Web search settings.
    #[serde(default)]
    pub search: SearchSettings,

    /// Orchestration settings.
    #[serde(default)]
    pub agent: AgentSettings,

    /// HTTP listener settings.
    #[serde(default)]
    pub http: HttpSettings,
}

/// Completion backend settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Web search settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Results requested per search.
    #[serde(default = "default_num_results")]
    pub num_results: u32,
}

/// Orchestration settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    /// Completion calls allowed per request.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Return the partial transcript instead of an empty one when the
    /// iteration bound is hit.
    #[serde(default)]
    pub keep_partial_history: bool,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Whole-run timeout for `POST /chat`. Unbounded when unset.
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,
}

fn default_model() -> String {
    tool_agent_ai::openai::DEFAULT_MODEL.to_string()
}

fn default_llm_base_url() -> String {
    tool_agent_ai::openai::DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_search_base_url() -> String {
    tool_agent_integration::exa::DEFAULT_BASE_URL.to_string()
}

fn default_num_results() -> u32 {
    tool_agent_integration::search::DEFAULT_NUM_RESULTS
}

fn default_max_iterations() -> u32 {
    tool_agent_ai::orchestrator::DEFAULT_MAX_ITERATIONS
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_llm_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            num_results: default_num_results(),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            keep_partial_history: false,
        }
    }
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            run_timeout_secs: None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if required configuration is missing
    /// or invalid, including a blank `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self, Report<ServerError>> {
        Self::load(config::Config::builder().add_source(
            config::Environment::default()
                .separator("__")
                .try_parsing(true),
        ))
    }

    fn load(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, Report<ServerError>> {
        let config: Self = builder
            .build()
            .and_then(config::Config::try_deserialize)
            .map_err(|e| ServerError::Config {
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ServerError> {
        if self.openai_api_key.trim().is_empty() {
            return Err(ServerError::Config {
                reason: "OPENAI_API_KEY environment variable not set".to_string(),
            });
        }
        Ok(())
    }

    /// Completion backend configuration.
    #[must_use]
    pub fn openai_config(&self) -> OpenAiConfig {
        OpenAiConfig::new(self.openai_api_key.clone())
            .with_model(self.llm.model.clone())
            .with_base_url(self.llm.base_url.clone())
            .with_timeout(Duration::from_secs(self.llm.request_timeout_secs))
    }

    /// Web search connector configuration.
    #[must_use]
    pub fn exa_config(&self) -> ExaConfig {
        ExaConfig::new(self.exa_api_key.clone()).with_base_url(self.search.base_url.clone())
    }

    /// Orchestrator configuration.
    #[must_use]
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let policy = if self.agent.keep_partial_history {
            LimitPolicy::KeepPartialHistory
        } else {
            LimitPolicy::DiscardHistory
        };
        OrchestratorConfig::new()
            .with_max_iterations(self.agent.max_iterations)
            .with_limit_policy(policy)
    }

    /// Whole-run timeout for chat requests, if configured.
    #[must_use]
    pub fn run_timeout(&self) -> Option<Duration> {
        self.http.run_timeout_secs.map(Duration::from_secs)
    }
}
