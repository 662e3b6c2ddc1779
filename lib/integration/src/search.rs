//! Web search connector trait and related types.

use crate::error::ConnectorError;
use async_trait::async_trait;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};

/// Number of results requested when the caller does not say otherwise.
pub const DEFAULT_NUM_RESULTS: u32 = 5;

/// A search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// The search query string.
    pub query: String,
    /// Maximum number of results to return.
    pub num_results: u32,
}

impl SearchRequest {
    /// Creates a new request with the default result count.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            num_results: DEFAULT_NUM_RESULTS,
        }
    }

    /// Sets the maximum number of results.
    #[must_use]
    pub fn with_num_results(mut self, num_results: u32) -> Self {
        self.num_results = num_results;
        self
    }
}

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Page title, when the service knows one.
    pub title: Option<String>,
    /// Page URL.
    pub url: String,
    /// Extracted page text, when requested and available.
    pub text: Option<String>,
}

impl SearchHit {
    /// Creates a hit with only a URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            title: None,
            url: url.into(),
            text: None,
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the page text.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }
}

/// Trait for web search providers.
///
/// Implementations must be safe to share between concurrent chat runs.
#[async_trait]
pub trait WebSearch: Send + Sync {
    /// Runs a search and returns hits in relevance order.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is unconfigured, unreachable, or
    /// answers with something other than a result list.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, Report<ConnectorError>>;

    /// Returns the provider name, used in logs.
    fn provider(&self) -> &str;
}
