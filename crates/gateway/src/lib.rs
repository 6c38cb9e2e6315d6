//! HTTP gateway for QuranLens.
//!
//! Routes:
//! - `GET  /health`: liveness
//! - `POST /api/llm-requests/generate`: run the agent, stream SSE frames
//! - `GET  /api/tools`: tool catalog
//! - `GET  /api/models`: provider model list
//!
//! Built on Axum.

pub mod api;
pub mod generate;

use axum::{
    Router,
    http::{Method, header},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use quranlens_agent::{AgentSettings, ResearchAgent};
use quranlens_config::AppConfig;
use quranlens_core::provider::Provider;
use quranlens_core::store::{QuranStore, RequestStore};
use quranlens_core::tool::ToolExecutor;
use quranlens_store::{InMemoryStore, PostgresStore};
use quranlens_tools::{QueryEmbedder, QuranTools};

/// Shared application state for the gateway.
pub struct AppState {
    pub agent: Arc<ResearchAgent>,
    pub requests: Arc<dyn RequestStore>,
    /// Completion provider, for the model list
    pub provider: Arc<dyn Provider>,
    pub tools: Arc<dyn ToolExecutor>,
}

pub type SharedState = Arc<AppState>;

/// `{"success": false, "error": …}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(api::health_handler))
        .route("/api/llm-requests/generate", post(generate::generate_handler))
        .route("/api/tools", get(api::tools_handler))
        .route("/api/models", get(api::models_handler))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire providers, store, tools and agent from configuration.
///
/// Without a database URL the gateway runs on an empty in-memory store.
pub async fn build_state(config: &AppConfig) -> Result<SharedState, Box<dyn std::error::Error>> {
    let provider = quranlens_providers::completion_provider(&config.provider)?;
    let embeddings = quranlens_providers::embedding_provider(&config.embedding)?;

    let (quran, requests): (Arc<dyn QuranStore>, Arc<dyn RequestStore>) = match &config.database.url {
        Some(url) => {
            let store = Arc::new(PostgresStore::connect(url, config.database.max_connections).await?);
            (store.clone() as Arc<dyn QuranStore>, store as Arc<dyn RequestStore>)
        }
        None => {
            warn!("No database configured, serving from an empty in-memory store");
            let store = Arc::new(InMemoryStore::new());
            (store.clone() as Arc<dyn QuranStore>, store as Arc<dyn RequestStore>)
        }
    };

    let embedder = QueryEmbedder::new(
        embeddings,
        config.embedding.model.clone(),
        Some(config.embedding.dimensions),
    );
    let tools: Arc<dyn ToolExecutor> = Arc::new(QuranTools::new(quran, embedder));

    let settings = AgentSettings::from_config(&config.agent, config.provider.default_model.clone());
    let agent = Arc::new(ResearchAgent::new(provider.clone(), tools.clone(), settings));

    Ok(Arc::new(AppState {
        agent,
        requests,
        provider,
        tools,
    }))
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = build_state(&config).await?;
    let app = build_router(state);

    info!(addr = %addr, model = %config.provider.default_model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use quranlens_core::error::{CompletionError, StorageError};
    use quranlens_core::message::{Message, MessageToolCall};
    use quranlens_core::provider::{ProviderRequest, ProviderResponse, Usage};
    use quranlens_core::quran::AyahKey;
    use quranlens_core::store::RequestId;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Replays scripted turns and records what it was asked.
    struct ScriptedProvider {
        turns: Mutex<Vec<ProviderResponse>>,
        requests: Mutex<Vec<ProviderRequest>>,
    }

    impl ScriptedProvider {
        fn new(mut turns: Vec<ProviderResponse>) -> Self {
            turns.reverse();
            Self {
                turns: Mutex::new(turns),
                requests: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, CompletionError> {
            self.requests.lock().unwrap().push(request);
            self.turns
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| CompletionError::Network("script exhausted".into()))
        }

        async fn list_models(&self) -> Result<Vec<String>, CompletionError> {
            Ok(vec!["openai/gpt-4o".into(), "anthropic/claude-3.5-sonnet".into()])
        }
    }

    /// Knows every request but cannot save.
    struct ReadOnlyRequests;

    #[async_trait]
    impl RequestStore for ReadOnlyRequests {
        async fn request_exists(&self, _id: RequestId) -> Result<bool, StorageError> {
            Ok(true)
        }
        async fn save_response(&self, _id: RequestId, _response: &str) -> Result<(), StorageError> {
            Err(StorageError::QueryFailed("read-only".into()))
        }
    }

    struct BrokenRequests;

    #[async_trait]
    impl RequestStore for BrokenRequests {
        async fn request_exists(&self, _id: RequestId) -> Result<bool, StorageError> {
            Err(StorageError::Unavailable("connection refused".into()))
        }
        async fn save_response(&self, _id: RequestId, _response: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("connection refused".into()))
        }
    }

    fn text_turn(text: &str) -> ProviderResponse {
        ProviderResponse {
            message: Message::assistant(text),
            finish_reason: Some("stop".into()),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock-model".into(),
        }
    }

    fn tool_turn(name: &str, args: Value) -> ProviderResponse {
        let call = MessageToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments: args.to_string(),
        };
        ProviderResponse {
            message: Message::assistant_with_tools("", vec![call]),
            ..text_turn("")
        }
    }

    async fn seeded_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.insert_request(RequestId(1)).await;
        store
            .insert_ayah(
                1,
                AyahKey { surah: 2, ayah: 255 },
                "اللَّهُ لَا إِلَٰهَ إِلَّا هُوَ الْحَيُّ الْقَيُّومُ",
                None,
            )
            .await;
        store
    }

    fn state_with(
        provider: Arc<dyn Provider>,
        store: Arc<InMemoryStore>,
        requests: Arc<dyn RequestStore>,
    ) -> SharedState {
        let embedder = QueryEmbedder::new(provider.clone(), "test-embed", None);
        let tools: Arc<dyn ToolExecutor> = Arc::new(QuranTools::new(store, embedder));
        let agent = Arc::new(ResearchAgent::new(
            provider.clone(),
            tools.clone(),
            AgentSettings::default(),
        ));
        Arc::new(AppState {
            agent,
            requests,
            provider,
            tools,
        })
    }

    async fn test_state(turns: Vec<ProviderResponse>) -> (SharedState, Arc<InMemoryStore>) {
        let store = seeded_store().await;
        let state = state_with(Arc::new(ScriptedProvider::new(turns)), store.clone(), store.clone());
        (state, store)
    }

    fn generate_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/llm-requests/generate")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    /// Split an SSE body into its JSON frames, checking the wire format.
    async fn sse_frames(response: axum::response::Response) -> Vec<Value> {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.ends_with("\n\n"), "frames end with a blank line: {text:?}");
        text.split("\n\n")
            .filter(|frame| !frame.is_empty())
            .map(|frame| {
                let data = frame
                    .strip_prefix("data: ")
                    .unwrap_or_else(|| panic!("bare data frame expected, got {frame:?}"));
                assert!(!data.contains('\n'));
                serde_json::from_str(data).unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (state, _) = test_state(vec![]).await;
        let app = build_router(state);

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn generate_streams_answer_and_persists_it() {
        let (state, store) = test_state(vec![text_turn("الحمد لله رب العالمين")]).await;
        let app = build_router(state);

        let response = app
            .oneshot(generate_request(json!({
                "requestId": 1,
                "model": "openai/gpt-4o",
                "prompt": "ما هي الفاتحة؟"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/event-stream");
        assert_eq!(response.headers()["cache-control"], "no-cache");

        let frames = sse_frames(response).await;
        let streamed: String = frames
            .iter()
            .filter(|f| f["type"] == "chunk")
            .map(|f| f["content"].as_str().unwrap())
            .collect();
        assert_eq!(streamed, "الحمد لله رب العالمين");

        let done = frames.last().unwrap();
        assert_eq!(done["type"], "done");
        assert_eq!(done["requestId"], 1);
        assert_eq!(done["fullResponse"], streamed);
        assert_eq!(done["usage"]["total_tokens"], 15);
        assert_eq!(done["toolCalls"], json!([]));

        assert_eq!(store.response_for(RequestId(1)).await.as_deref(), Some(streamed.as_str()));
    }

    #[tokio::test]
    async fn generate_reports_tool_calls() {
        let (state, _) = test_state(vec![
            tool_turn("get_ayah_by_reference", json!({"ayah_key": "2:255"})),
            text_turn("هذه آية الكرسي"),
        ])
        .await;
        let app = build_router(state);

        let response = app
            .oneshot(generate_request(json!({
                "requestId": "1",
                "model": "openai/gpt-4o",
                "prompt": "ما هي آية الكرسي؟",
                "conversationHistory": [
                    {"role": "user", "content": "السلام عليكم"},
                    {"role": "assistant", "content": "وعليكم السلام"}
                ]
            })))
            .await
            .unwrap();
        let frames = sse_frames(response).await;

        let tool_frames: Vec<_> = frames.iter().filter(|f| f["type"] == "tool_call").collect();
        assert_eq!(tool_frames.len(), 1);
        assert_eq!(tool_frames[0]["data"]["tool"], "get_ayah_by_reference");
        assert_eq!(tool_frames[0]["data"]["result"]["ayah_key"], "2:255");
        assert!(tool_frames[0]["data"]["timestamp"].is_string());

        let done = frames.last().unwrap();
        assert_eq!(done["toolCalls"].as_array().unwrap().len(), 1);
        assert!(done["fullResponse"].as_str().unwrap().contains("جاري جلب الآية"));
    }

    #[tokio::test]
    async fn generate_rejects_missing_fields() {
        let (state, _) = test_state(vec![]).await;
        let app = build_router(state);

        for body in [
            json!({"model": "m", "prompt": "p"}),
            json!({"requestId": 1, "prompt": "p"}),
            json!({"requestId": 1, "model": "m", "prompt": ""}),
        ] {
            let response = app.clone().oneshot(generate_request(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let json = body_json(response).await;
            assert_eq!(json["success"], false);
            assert_eq!(
                json["error"],
                "Missing required fields: requestId, model, and prompt are required"
            );
        }
    }

    #[tokio::test]
    async fn generate_rejects_unknown_request() {
        let (state, _) = test_state(vec![]).await;
        let app = build_router(state);

        let response = app
            .oneshot(generate_request(json!({"requestId": 404, "model": "m", "prompt": "p"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({"success": false, "error": "Request not found"})
        );
    }

    #[tokio::test]
    async fn generate_reports_store_failure() {
        let store = seeded_store().await;
        let state = state_with(Arc::new(ScriptedProvider::new(vec![])), store, Arc::new(BrokenRequests));
        let app = build_router(state);

        let response = app
            .oneshot(generate_request(json!({"requestId": 1, "model": "m", "prompt": "p"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn persistence_failure_still_sends_done() {
        let store = seeded_store().await;
        let provider = Arc::new(ScriptedProvider::new(vec![text_turn("جواب")]));
        let state = state_with(provider, store, Arc::new(ReadOnlyRequests));
        let app = build_router(state);

        let response = app
            .oneshot(generate_request(json!({"requestId": 1, "model": "m", "prompt": "p"})))
            .await
            .unwrap();
        let frames = sse_frames(response).await;

        assert_eq!(frames.last().unwrap()["type"], "done");
        assert_eq!(frames.last().unwrap()["fullResponse"], "جواب");
    }

    #[tokio::test]
    async fn completion_failure_becomes_error_frame() {
        let (state, store) = test_state(vec![]).await;
        let app = build_router(state);

        let response = app
            .oneshot(generate_request(json!({"requestId": 1, "model": "m", "prompt": "p"})))
            .await
            .unwrap();
        let frames = sse_frames(response).await;

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["type"], "error");
        assert!(frames[0]["error"].as_str().unwrap().contains("script exhausted"));
        assert_eq!(store.response_for(RequestId(1)).await, None);
    }

    #[tokio::test]
    async fn closed_client_cancels_run() {
        let (_events_tx, events_rx) = tokio::sync::mpsc::channel(1);
        let (frames_tx, frames_rx) = tokio::sync::mpsc::channel(1);
        drop(frames_rx);
        let cancel = tokio_util::sync::CancellationToken::new();

        generate::forward_events(
            events_rx,
            frames_tx,
            Arc::new(ReadOnlyRequests),
            RequestId(1),
            cancel.clone(),
        )
        .await;

        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn agent_without_terminal_event_yields_error_frame() {
        let (events_tx, events_rx) = tokio::sync::mpsc::channel(1);
        let (frames_tx, mut frames_rx) = tokio::sync::mpsc::channel(1);
        drop(events_tx);

        let forward = tokio::spawn(generate::forward_events(
            events_rx,
            frames_tx,
            Arc::new(ReadOnlyRequests),
            RequestId(1),
            tokio_util::sync::CancellationToken::new(),
        ));

        assert!(frames_rx.recv().await.is_some());
        assert!(frames_rx.recv().await.is_none());
        forward.await.unwrap();
    }

    #[tokio::test]
    async fn tools_endpoint_lists_catalog() {
        let (state, _) = test_state(vec![]).await;
        let app = build_router(state);

        let req = Request::builder().uri("/api/tools").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        let tools = json["data"].as_array().unwrap();
        assert_eq!(tools.len(), 7);
        assert!(tools.iter().any(|t| t["name"] == "get_tafsir_for_ayah"));
    }

    #[tokio::test]
    async fn models_endpoint_lists_provider_models() {
        let (state, _) = test_state(vec![]).await;
        let app = build_router(state);

        let req = Request::builder().uri("/api/models").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"][0], "openai/gpt-4o");
    }
}
