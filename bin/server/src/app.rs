//! HTTP routes and application state.

use crate::config::ServerConfig;
use crate::error::{ApiError, ServerError};
use crate::types::{ChatRequest, ChatResponse, HealthStatus, ServiceInfo};
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use rootcause::prelude::{Report, ResultExt};
use std::sync::Arc;
use std::time::Duration;
use tool_agent_ai::{CompletionBackend, OpenAiBackend, Orchestrator};
use tool_agent_conversation::{BuiltinTool, ConversationHistory, ToolRegistry, WebSearchTool};
use tool_agent_integration::ExaClient;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Shared state for the handlers.
pub struct AppState<B: CompletionBackend> {
    orchestrator: Arc<Orchestrator<B>>,
    run_timeout: Option<Duration>,
}

impl<B: CompletionBackend> AppState<B> {
    /// Creates the state around a ready orchestrator.
    #[must_use]
    pub fn new(orchestrator: Orchestrator<B>, run_timeout: Option<Duration>) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            run_timeout,
        }
    }

    /// Returns the orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> &Orchestrator<B> {
        &self.orchestrator
    }
}

impl<B: CompletionBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: Arc::clone(&self.orchestrator),
            run_timeout: self.run_timeout,
        }
    }
}

/// Builds the production orchestrator: Exa-backed web search and the
/// OpenAI-compatible completion backend.
///
/// # Errors
///
/// Returns [`ServerError::Initialization`] if a collaborator cannot be built.
pub fn build_orchestrator(
    config: &ServerConfig,
) -> Result<Orchestrator<OpenAiBackend>, Report<ServerError>> {
    let search = ExaClient::new(config.exa_config()).context(ServerError::Initialization {
        component: "web search connector",
    })?;
    if config.exa_api_key.is_none() {
        warn!("EXA_API_KEY not set; search_web will report the missing key");
    }

    let tool = WebSearchTool::new(Arc::new(search)).with_num_results(config.search.num_results);
    let registry =
        ToolRegistry::new(vec![BuiltinTool::SearchWeb(tool)]).context(ServerError::Initialization {
            component: "tool registry",
        })?;

    let backend = OpenAiBackend::new(config.openai_config()).context(ServerError::Initialization {
        component: "completion backend",
    })?;

    info!(
        model = %config.llm.model,
        tools = ?registry.names().collect::<Vec<_>>(),
        max_iterations = config.agent.max_iterations,
        "orchestrator ready"
    );
    Ok(Orchestrator::new(backend, registry, config.orchestrator_config()))
}

/// Builds the router with request tracing.
pub fn router<B: CompletionBackend + 'static>(state: AppState<B>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/chat", post(chat::<B>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "AI Agent API is running".to_string(),
    })
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
    })
}

async fn chat<B: CompletionBackend + 'static>(
    State(state): State<AppState<B>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest {
            detail: "Message cannot be empty".to_string(),
        });
    }
    debug!(
        history = request.conversation_history.len(),
        "chat request received"
    );

    let history = ConversationHistory::from_messages(request.conversation_history);
    let run = state.orchestrator.run(request.message, history);
    let result = match state.run_timeout {
        Some(after) => tokio::time::timeout(after, run).await.map_err(|_| {
            warn!(timeout_secs = after.as_secs(), "chat run timed out");
            ApiError::Timeout { after }
        })?,
        None => run.await,
    };

    let outcome = result.map_err(|report| {
        error!(error = %report, "chat run failed");
        ApiError::Upstream {
            detail: report.current_context().reason().to_string(),
        }
    })?;

    Ok(Json(ChatResponse::from(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use tool_agent_ai::{Completion, LlmError, OrchestratorConfig};
    use tool_agent_conversation::{ChatMessage, ToolSchema};
    use tower::ServiceExt;

    /// Backend answering every call the same way, optionally after a delay.
    struct FakeBackend {
        reply: Result<Completion, LlmError>,
        delay: Option<Duration>,
        seen: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    }

    impl FakeBackend {
        fn answering(text: &str) -> Self {
            Self {
                reply: Ok(Completion::text(text)),
                delay: None,
                seen: Arc::default(),
            }
        }

        fn failing(err: LlmError) -> Self {
            Self {
                reply: Err(err),
                delay: None,
                seen: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl CompletionBackend for FakeBackend {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _tools: &[ToolSchema],
        ) -> Result<Completion, Report<LlmError>> {
            self.seen.lock().unwrap().push(messages.to_vec());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.reply.clone().map_err(Report::from)
        }

        fn model(&self) -> &str {
            "fake"
        }
    }

    fn app(backend: FakeBackend, run_timeout: Option<Duration>) -> Router {
        let orchestrator = Orchestrator::new(backend, ToolRegistry::empty(), OrchestratorConfig::new());
        router(AppState::new(orchestrator, run_timeout))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_chat(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    #[tokio::test]
    async fn root_and_health() {
        let (status, body) = send(app(FakeBackend::answering("4"), None), get_request("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "AI Agent API is running"}));

        let (status, body) = send(app(FakeBackend::answering("4"), None), get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "healthy"}));
    }

    #[tokio::test]
    async fn chat_returns_answer_and_transcript() {
        let (status, body) = send(
            app(FakeBackend::answering("4"), None),
            post_chat(&json!({"message": "What is 2+2?"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "response": "4",
                "used_tools": [],
                "messages": [
                    {"role": "user", "content": "What is 2+2?"},
                    {"role": "assistant", "content": "4"}
                ]
            })
        );
    }

    #[tokio::test]
    async fn chat_forwards_prior_history() {
        let backend = FakeBackend::answering("Sure");
        let seen = Arc::clone(&backend.seen);

        let (status, body) = send(
            app(backend, None),
            post_chat(&json!({
                "message": "Help me",
                "conversation_history": [
                    {"role": "user", "content": "Hi"},
                    {"role": "assistant", "content": "Hello!"}
                ]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(4));
        assert_eq!(
            seen.lock().unwrap()[0],
            vec![
                ChatMessage::user("Hi"),
                ChatMessage::assistant("Hello!"),
                ChatMessage::user("Help me"),
            ]
        );
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let backend = FakeBackend::answering("unused");
        let seen = Arc::clone(&backend.seen);

        let (status, body) = send(app(backend, None), post_chat(&json!({"message": "   "}))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"detail": "Message cannot be empty"}));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_message_field_is_rejected_by_extractor() {
        let (status, _) = send(
            app(FakeBackend::answering("unused"), None),
            post_chat(&json!({"conversation_history": []})),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn backend_failure_is_bad_gateway() {
        let (status, body) = send(
            app(FakeBackend::failing(LlmError::Timeout), None),
            post_chat(&json!({"message": "What is 2+2?"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            body,
            json!({"detail": "Error processing request: LLM request timed out"})
        );
    }

    #[tokio::test]
    async fn slow_run_times_out() {
        let mut backend = FakeBackend::answering("too late");
        backend.delay = Some(Duration::from_secs(10));

        let (status, body) = send(
            app(backend, Some(Duration::from_millis(20))),
            post_chat(&json!({"message": "What is 2+2?"})),
        )
        .await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(body["detail"].is_string());
    }

    #[test]
    fn production_orchestrator_builds_without_search_key() {
        let config: ServerConfig = serde_json::from_value(json!({
            "openai_api_key": "sk-test",
            "agent": {"max_iterations": 3}
        }))
        .expect("config");

        let orchestrator = build_orchestrator(&config).expect("orchestrator");
        assert_eq!(orchestrator.registry().names().collect::<Vec<_>>(), ["search_web"]);
        assert_eq!(orchestrator.config().max_iterations, 3);
        assert_eq!(orchestrator.backend().model(), "gpt-4o-mini");
    }
}
