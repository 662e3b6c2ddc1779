//! Tool registry for conversation mode.
//!
//! The set of tools is closed: every tool is a [`BuiltinTool`] variant that
//! pairs its schema with its executor. The registry is built once at startup
//! and only read afterwards, so it can be shared by concurrent runs.
//!
//! [`ToolRegistry::execute`] is the error boundary between tools and the
//! orchestration loop. Unknown names, malformed arguments, executor errors
//! and executor panics all come back as tagged [`ToolResult`]s.

use crate::error::{RegistryError, ToolError};
use crate::message::{ToolCall, ToolResult};
use futures::FutureExt;
use rootcause::prelude::Report;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tool_agent_integration::{SearchHit, SearchRequest, WebSearch};
use tracing::{debug, instrument, warn};

/// Primitive types a tool parameter may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    /// JSON string.
    String,
    /// JSON number without a fractional part.
    Integer,
    /// Any JSON number.
    Number,
    /// JSON boolean.
    Boolean,
}

impl ParameterKind {
    /// Returns the JSON Schema type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    /// Returns whether `value` satisfies this type.
    #[must_use]
    pub fn accepts(self, value: &JsonValue) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// One named parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name.
    pub name: String,
    /// Accepted type.
    pub kind: ParameterKind,
    /// Description for the model.
    pub description: String,
    /// Whether the parameter must be present.
    pub required: bool,
}

impl ParameterSpec {
    /// Creates a required parameter.
    #[must_use]
    pub fn required(name: impl Into<String>, kind: ParameterKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
        }
    }

    /// Creates an optional parameter.
    #[must_use]
    pub fn optional(name: impl Into<String>, kind: ParameterKind, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// Declaration of a tool, as shown to the completion backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool name.
    pub name: String,
    /// What the tool does and when to use it.
    pub description: String,
    /// Parameters, in declaration order.
    pub parameters: Vec<ParameterSpec>,
}

impl ToolSchema {
    /// Creates a schema with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Renders the parameter contract as a JSON Schema object.
    #[must_use]
    pub fn to_json_schema(&self) -> JsonValue {
        let properties: Map<String, JsonValue> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    serde_json::json!({
                        "type": p.kind.as_str(),
                        "description": p.description,
                    }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Parses serialized arguments and checks them against the parameters.
    ///
    /// Blank input is treated as an empty object. Keys the schema does not
    /// declare are kept but not checked.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArguments`] when the text is not a JSON
    /// object, a required parameter is missing or null, or a value has the
    /// wrong type.
    pub fn parse_arguments(&self, raw: &str) -> Result<ToolArguments, ToolError> {
        let invalid = |reason: String| ToolError::InvalidArguments {
            name: self.name.clone(),
            reason,
        };

        let value: JsonValue = if raw.trim().is_empty() {
            JsonValue::Object(Map::new())
        } else {
            serde_json::from_str(raw).map_err(|e| invalid(format!("malformed JSON: {e}")))?
        };
        let JsonValue::Object(values) = value else {
            return Err(invalid("expected a JSON object".to_string()));
        };

        for parameter in &self.parameters {
            match values.get(&parameter.name) {
                None | Some(JsonValue::Null) if parameter.required => {
                    return Err(invalid(format!("missing required parameter '{}'", parameter.name)));
                }
                None | Some(JsonValue::Null) => {}
                Some(value) if !parameter.kind.accepts(value) => {
                    return Err(invalid(format!(
                        "parameter '{}' must be of type {}",
                        parameter.name,
                        parameter.kind.as_str()
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(ToolArguments { values })
    }
}

/// Arguments that passed schema validation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolArguments {
    values: Map<String, JsonValue>,
}

impl ToolArguments {
    /// Returns a raw argument value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.values.get(name)
    }

    /// Returns a string argument.
    #[must_use]
    pub fn str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(JsonValue::as_str)
    }

    /// Returns all arguments.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, JsonValue> {
        &self.values
    }
}

/// Characters of page text kept per search hit.
const SNIPPET_CHARS: usize = 300;

/// The `search_web` tool.
#[derive(Clone)]
pub struct WebSearchTool {
    search: Arc<dyn WebSearch>,
    num_results: u32,
}

impl WebSearchTool {
    /// Tool name exposed to the model.
    pub const NAME: &'static str = "search_web";

    /// Creates the tool over a search connector.
    #[must_use]
    pub fn new(search: Arc<dyn WebSearch>) -> Self {
        Self {
            search,
            num_results: tool_agent_integration::search::DEFAULT_NUM_RESULTS,
        }
    }

    /// Sets how many results each search requests.
    #[must_use]
    pub fn with_num_results(mut self, num_results: u32) -> Self {
        self.num_results = num_results.max(1);
        self
    }

    fn schema() -> ToolSchema {
        ToolSchema::new(
            Self::NAME,
            "Searches the web for information on a given query. Use this when you need current \
             information about a topic, recent events, or data that may not be in your training data.",
        )
        .with_parameter(ParameterSpec::required(
            "query",
            ParameterKind::String,
            "The search query string",
        ))
    }

    async fn invoke(&self, arguments: &ToolArguments) -> Result<String, ToolError> {
        let query = arguments.str("query").unwrap_or_default().trim();
        if query.is_empty() {
            return Err(ToolError::InvalidArguments {
                name: Self::NAME.to_string(),
                reason: "parameter 'query' must not be empty".to_string(),
            });
        }

        let request = SearchRequest::new(query).with_num_results(self.num_results);
        let hits = self
            .search
            .search(&request)
            .await
            .map_err(|report| ToolError::ExecutionFailed {
                name: Self::NAME.to_string(),
                reason: report.current_context().to_string(),
            })?;

        debug!(provider = self.search.provider(), hits = hits.len(), "web search returned");
        Ok(format_search_results(query, &hits))
    }
}

impl fmt::Debug for WebSearchTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSearchTool")
            .field("provider", &self.search.provider())
            .field("num_results", &self.num_results)
            .finish()
    }
}

/// Formats search hits as the text handed back to the model.
#[must_use]
pub fn format_search_results(query: &str, hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return format!("No search results found for query: '{query}'");
    }

    let entries: Vec<String> = hits
        .iter()
        .enumerate()
        .map(|(idx, hit)| {
            let mut entry = format!(
                "{}. {}\n   URL: {}",
                idx + 1,
                hit.title.as_deref().unwrap_or("(untitled)"),
                hit.url
            );
            if let Some(text) = hit.text.as_deref().filter(|text| !text.is_empty()) {
                entry.push_str("\n   ");
                entry.push_str(&truncate_snippet(text));
            }
            entry
        })
        .collect();

    format!("Search results for '{query}':\n\n{}", entries.join("\n\n"))
}

fn truncate_snippet(text: &str) -> String {
    if text.chars().count() > SNIPPET_CHARS {
        let mut snippet: String = text.chars().take(SNIPPET_CHARS).collect();
        snippet.push_str("...");
        snippet
    } else {
        text.to_string()
    }
}

/// The closed set of tools the agent can offer.
#[derive(Debug, Clone)]
pub enum BuiltinTool {
    /// Web search.
    SearchWeb(WebSearchTool),
}

impl BuiltinTool {
    /// Returns the tool's schema.
    #[must_use]
    pub fn schema(&self) -> ToolSchema {
        match self {
            Self::SearchWeb(_) => WebSearchTool::schema(),
        }
    }

    /// Runs the tool with validated arguments.
    async fn invoke(&self, arguments: &ToolArguments) -> Result<String, ToolError> {
        match self {
            Self::SearchWeb(tool) => tool.invoke(arguments).await,
        }
    }
}

/// Registry of available tools.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    entries: Vec<(ToolSchema, BuiltinTool)>,
}

impl ToolRegistry {
    /// Creates a registry with no tools.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a registry from a fixed set of tools, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns an error if two tools share a name.
    pub fn new(tools: Vec<BuiltinTool>) -> Result<Self, Report<RegistryError>> {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(tools.len());
        for tool in tools {
            let schema = tool.schema();
            if !seen.insert(schema.name.clone()) {
                return Err(RegistryError::DuplicateTool { name: schema.name }.into());
            }
            entries.push((schema, tool));
        }
        Ok(Self { entries })
    }

    /// Returns the schemas of all tools, in registration order.
    #[must_use]
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.entries.iter().map(|(schema, _)| schema.clone()).collect()
    }

    /// Returns the registered tool names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(schema, _)| schema.name.as_str())
    }

    /// Looks up a tool and its schema by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<(&ToolSchema, &BuiltinTool)> {
        self.entries
            .iter()
            .find(|(schema, _)| schema.name == name)
            .map(|(schema, tool)| (schema, tool))
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up, validates and runs a tool.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] describing why the tool produced no output.
    pub async fn try_execute(&self, name: &str, arguments: &str) -> Result<String, ToolError> {
        let (schema, tool) = self.get(name).ok_or_else(|| ToolError::NotFound {
            name: name.to_string(),
        })?;
        let arguments = schema.parse_arguments(arguments)?;

        match AssertUnwindSafe(tool.invoke(&arguments)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(ToolError::ExecutionFailed {
                name: name.to_string(),
                reason: format!("tool panicked: {}", panic_message(panic.as_ref())),
            }),
        }
    }

    /// Executes a tool call, always producing a result for its id.
    #[instrument(skip(self, call), fields(tool = %call.name, tool_call_id = %call.id))]
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        match self.try_execute(&call.name, &call.arguments).await {
            Ok(content) => ToolResult::success(call.id.clone(), content),
            Err(err) => {
                warn!(error = %err, "tool call recovered as error result");
                ToolResult::failure(call.id.clone(), err.to_tool_content())
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tool_agent_integration::ConnectorError;

    /// Scripted search connector for testing.
    #[derive(Default)]
    struct FakeSearch {
        hits: Vec<SearchHit>,
        failure: Option<ConnectorError>,
        panics: bool,
        requests: Mutex<Vec<SearchRequest>>,
    }

    #[async_trait]
    impl WebSearch for FakeSearch {
        async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, Report<ConnectorError>> {
            self.requests.lock().unwrap().push(request.clone());
            if self.panics {
                panic!("search backend exploded");
            }
            match &self.failure {
                Some(err) => Err(err.clone().into()),
                None => Ok(self.hits.clone()),
            }
        }

        fn provider(&self) -> &str {
            "fake"
        }
    }

    fn registry_with(search: FakeSearch) -> (ToolRegistry, Arc<FakeSearch>) {
        let search = Arc::new(search);
        let tool = WebSearchTool::new(search.clone());
        let registry = ToolRegistry::new(vec![BuiltinTool::SearchWeb(tool)]).expect("registry");
        (registry, search)
    }

    #[test]
    fn schema_contract_renders_json_schema() {
        let schema = WebSearchTool::schema();
        let json = schema.to_json_schema();

        assert_eq!(json["type"], "object");
        assert_eq!(json["properties"]["query"]["type"], "string");
        assert_eq!(json["required"], serde_json::json!(["query"]));
    }

    #[test]
    fn parse_arguments_checks_contract() {
        let schema = ToolSchema::new("t", "test")
            .with_parameter(ParameterSpec::required("q", ParameterKind::String, "query"))
            .with_parameter(ParameterSpec::optional("n", ParameterKind::Integer, "count"));

        assert!(schema.parse_arguments(r#"{"q": "x", "n": 3}"#).is_ok());
        assert!(schema.parse_arguments(r#"{"q": "x", "extra": true}"#).is_ok());

        let missing = schema.parse_arguments("{}").unwrap_err();
        assert!(missing.to_string().contains("missing required parameter 'q'"));

        let wrong_type = schema.parse_arguments(r#"{"q": "x", "n": 1.5}"#).unwrap_err();
        assert!(wrong_type.to_string().contains("must be of type integer"));

        let not_object = schema.parse_arguments("[1, 2]").unwrap_err();
        assert!(not_object.to_string().contains("expected a JSON object"));

        let malformed = schema.parse_arguments("{\"q\": ").unwrap_err();
        assert!(malformed.to_string().contains("malformed JSON"));
    }

    #[test]
    fn blank_arguments_mean_empty_object() {
        let schema = ToolSchema::new("noop", "no parameters");
        let args = schema.parse_arguments("  ").expect("blank is empty object");
        assert!(args.as_map().is_empty());
    }

    #[test]
    fn duplicate_tools_are_rejected() {
        let search: Arc<dyn WebSearch> = Arc::new(FakeSearch::default());
        let result = ToolRegistry::new(vec![
            BuiltinTool::SearchWeb(WebSearchTool::new(search.clone())),
            BuiltinTool::SearchWeb(WebSearchTool::new(search)),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn registry_lists_schemas_in_order() {
        let (registry, _) = registry_with(FakeSearch::default());

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.names().collect::<Vec<_>>(), ["search_web"]);
        assert_eq!(registry.schemas()[0].name, "search_web");
        assert!(ToolRegistry::empty().is_empty());
    }

    #[tokio::test]
    async fn executes_search_and_formats_results() {
        let (registry, search) = registry_with(FakeSearch {
            hits: vec![
                SearchHit::new("https://rust-lang.org")
                    .with_title("Rust")
                    .with_text("A language empowering everyone"),
                SearchHit::new("https://example.com"),
            ],
            ..FakeSearch::default()
        });

        let result = registry
            .execute(&ToolCall::new("c1", "search_web", r#"{"query": "rust"}"#))
            .await;

        assert!(result.is_success());
        assert_eq!(result.tool_call_id, "c1");
        assert_eq!(
            result.content,
            "Search results for 'rust':\n\n\
             1. Rust\n   URL: https://rust-lang.org\n   A language empowering everyone\n\n\
             2. (untitled)\n   URL: https://example.com"
        );
        assert_eq!(search.requests.lock().unwrap()[0].num_results, 5);
    }

    #[tokio::test]
    async fn empty_search_reports_no_results() {
        let (registry, _) = registry_with(FakeSearch::default());
        let result = registry
            .execute(&ToolCall::new("c1", "search_web", r#"{"query": "zzz"}"#))
            .await;

        assert!(result.is_success());
        assert_eq!(result.content, "No search results found for query: 'zzz'");
    }

    #[tokio::test]
    async fn unknown_tool_is_recovered() {
        let (registry, _) = registry_with(FakeSearch::default());
        let result = registry
            .execute(&ToolCall::new("c2", "unknown_tool", "{}"))
            .await;

        assert!(!result.is_success());
        assert_eq!(result.tool_call_id, "c2");
        assert_eq!(result.content, "Error: Tool 'unknown_tool' not found");
    }

    #[tokio::test]
    async fn malformed_arguments_are_recovered() {
        let (registry, search) = registry_with(FakeSearch::default());
        let result = registry
            .execute(&ToolCall::new("c3", "search_web", "{not json"))
            .await;

        assert!(!result.is_success());
        assert!(result.content.starts_with("Error: Invalid arguments for tool 'search_web'"));
        assert!(search.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn connector_failure_is_recovered() {
        let (registry, _) = registry_with(FakeSearch {
            failure: Some(ConnectorError::MissingCredential {
                variable: "EXA_API_KEY".to_string(),
            }),
            ..FakeSearch::default()
        });
        let result = registry
            .execute(&ToolCall::new("c4", "search_web", r#"{"query": "x"}"#))
            .await;

        assert!(!result.is_success());
        assert_eq!(
            result.content,
            "Error: Tool 'search_web' failed: EXA_API_KEY not set in environment variables"
        );
    }

    #[tokio::test]
    async fn panicking_tool_is_recovered() {
        let (registry, _) = registry_with(FakeSearch {
            panics: true,
            ..FakeSearch::default()
        });
        let result = registry
            .execute(&ToolCall::new("c5", "search_web", r#"{"query": "x"}"#))
            .await;

        assert!(!result.is_success());
        assert!(result.content.contains("tool panicked: search backend exploded"));
    }

    #[test]
    fn empty_snippet_adds_no_line() {
        let formatted = format_search_results(
            "q",
            &[SearchHit::new("https://example.com").with_title("T").with_text("")],
        );
        assert_eq!(formatted, "Search results for 'q':\n\n1. T\n   URL: https://example.com");
    }

    #[test]
    fn long_snippets_are_truncated() {
        let text = "a".repeat(400);
        let formatted = format_search_results(
            "q",
            &[SearchHit::new("https://example.com").with_title("T").with_text(text)],
        );
        assert!(formatted.ends_with(&format!("{}...", "a".repeat(300))));
    }
}
