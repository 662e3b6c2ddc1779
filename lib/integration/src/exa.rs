//! Exa search API connector.

use crate::error::ConnectorError;
use crate::search::{SearchHit, SearchRequest, WebSearch};
use async_trait::async_trait;
use reqwest::StatusCode;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Default Exa API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.exa.ai";

/// Environment variable holding the Exa credential.
pub const API_KEY_VARIABLE: &str = "EXA_API_KEY";

/// Configuration for the Exa connector.
#[derive(Debug, Clone)]
pub struct ExaConfig {
    /// API key. Searches fail with a missing-credential error when unset.
    pub api_key: Option<String>,
    /// Base URL for the API.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ExaConfig {
    /// Creates a configuration against the public endpoint.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Overrides the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExaSearchBody<'a> {
    query: &'a str,
    num_results: u32,
    contents: ExaContents,
}

#[derive(Debug, Serialize)]
struct ExaContents {
    text: bool,
}

#[derive(Debug, Deserialize)]
struct ExaSearchResponse {
    #[serde(default)]
    results: Vec<ExaResult>,
}

#[derive(Debug, Deserialize)]
struct ExaResult {
    #[serde(default)]
    title: Option<String>,
    url: String,
    #[serde(default)]
    text: Option<String>,
}

impl From<ExaResult> for SearchHit {
    fn from(result: ExaResult) -> Self {
        Self {
            title: result.title,
            url: result.url,
            text: result.text.filter(|text| !text.is_empty()),
        }
    }
}

/// Web search backed by the Exa API.
#[derive(Debug, Clone)]
pub struct ExaClient {
    http: reqwest::Client,
    config: ExaConfig,
}

impl ExaClient {
    /// Creates a new client.
    ///
    /// A missing API key is not an error here; it surfaces on each search so
    /// the tool can report it to the model.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ExaConfig) -> Result<Self, Report<ConnectorError>> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConnectorError::ConnectionFailed {
                reason: e.to_string(),
            })?;

        Ok(Self { http, config })
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl WebSearch for ExaClient {
    #[instrument(skip(self, request), fields(num_results = request.num_results))]
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, Report<ConnectorError>> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(ConnectorError::MissingCredential {
                variable: API_KEY_VARIABLE.to_string(),
            }
            .into());
        };

        let body = ExaSearchBody {
            query: &request.query,
            num_results: request.num_results,
            contents: ExaContents { text: true },
        };

        let response = self
            .http
            .post(self.search_url())
            .header("x-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ConnectorError::from_transport(&e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ConnectorError::AuthenticationFailed {
                reason: format!("Exa rejected the API key ({status})"),
            }
            .into());
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            return Err(ConnectorError::RateLimited { retry_after_secs }.into());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectorError::ServiceError {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed: ExaSearchResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::ProtocolError {
                reason: e.to_string(),
            })?;

        debug!(hits = parsed.results.len(), "Exa search completed");
        Ok(parsed.results.into_iter().map(SearchHit::from).collect())
    }

    fn provider(&self) -> &str {
        "exa"
    }
}
