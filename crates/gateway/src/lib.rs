//! WebSocket chat gateway for Skylark.
//!
//! One WebSocket connection per client id at `/ws/{client_id}`, plus a
//! small HTTP surface for health, recent logs, and retrieval backend
//! status. Built on Axum.

pub mod broadcast;
pub mod protocol;
pub mod ws;

use axum::{
    Router,
    extract::State,
    response::Json,
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use broadcast::{ConnectionManager, LogBuffer};
use protocol::ServerMessage;
use skylark_agent::AgentLoop;
use skylark_core::session::SessionRegistry;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: Arc<AgentLoop>,
    pub sessions: Arc<SessionRegistry>,
    pub connections: ConnectionManager,
    pub logs: LogBuffer,
    pub retrieval_configured: bool,
}

impl GatewayState {
    /// Record a log line and mirror it to every connected client as a
    /// `log` frame.
    pub async fn log_event(&self, level: &str, message: String) {
        self.logs.push(message.clone());
        self.connections
            .broadcast(&ServerMessage::log(message, level))
            .await;
    }
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/ws/{client_id}", get(ws::ws_handler))
        .route("/api/health", get(health_handler))
        .route("/api/logs", get(logs_handler))
        .route("/api/vector-store-info", get(vector_store_info_handler))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(config: skylark_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let provider = skylark_providers::build_provider(&config)?;
    let tools = Arc::new(skylark_tools::default_registry(&config));
    let instruction = config
        .agent
        .system_instruction_override
        .clone()
        .unwrap_or_else(|| skylark_agent::SYSTEM_INSTRUCTION.to_string());

    let mut agent = AgentLoop::new(
        provider,
        &config.provider.model,
        config.provider.temperature,
        tools,
        instruction,
    )
    .with_max_iterations(config.agent.max_iterations)
    .with_tool_timeout(config.agent.tool_timeout_secs);
    if let Some(max_tokens) = config.provider.max_tokens {
        agent = agent.with_max_tokens(max_tokens);
    }

    let state = Arc::new(GatewayState {
        agent: Arc::new(agent),
        sessions: Arc::new(SessionRegistry::new()),
        connections: ConnectionManager::new(),
        logs: LogBuffer::default(),
        retrieval_configured: config.retrieval.api_url.is_some(),
    });

    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
    timestamp: chrono::DateTime<chrono::Utc>,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "Skylark server is running",
        timestamp: chrono::Utc::now(),
    })
}

#[derive(Serialize)]
struct LogsResponse {
    logs: Vec<String>,
}

async fn logs_handler(State(state): State<Arc<GatewayState>>) -> Json<LogsResponse> {
    Json(LogsResponse {
        logs: state.logs.recent(),
    })
}

#[derive(Serialize)]
struct VectorStoreInfoResponse {
    r#type: &'static str,
    configured: bool,
    message: &'static str,
}

async fn vector_store_info_handler(
    State(state): State<Arc<GatewayState>>,
) -> Json<VectorStoreInfoResponse> {
    let info = if state.retrieval_configured {
        VectorStoreInfoResponse {
            r#type: "http",
            configured: true,
            message: "Knowledge retrieval backend is configured and ready",
        }
    } else {
        VectorStoreInfoResponse {
            r#type: "none",
            configured: false,
            message: "No knowledge retrieval backend configured",
        }
    };
    Json(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use skylark_core::error::ProviderError;
    use skylark_core::message::Message;
    use skylark_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use skylark_core::tool::ToolRegistry;
    use tower::ServiceExt;

    struct MockProvider;

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                message: Message::assistant("ok"),
                usage: None,
                model: "mock-model".into(),
            })
        }
    }

    fn test_state() -> Arc<GatewayState> {
        let agent = AgentLoop::new(
            Arc::new(MockProvider),
            "mock-model",
            0.7,
            Arc::new(ToolRegistry::new()),
            "test instruction",
        );
        Arc::new(GatewayState {
            agent: Arc::new(agent),
            sessions: Arc::new(SessionRegistry::new()),
            connections: ConnectionManager::new(),
            logs: LogBuffer::default(),
            retrieval_configured: false,
        })
    }

    async fn get_json(state: Arc<GatewayState>, uri: &str) -> (StatusCode, serde_json::Value) {
        let app = build_router(state);
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (status, json) = get_json(test_state(), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "OK");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn logs_endpoint_returns_recent_lines() {
        let state = test_state();
        state.logs.push("first line");
        state.logs.push("second line");

        let (status, json) = get_json(state, "/api/logs").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["logs"][0], "first line");
        assert_eq!(json["logs"][1], "second line");
    }

    #[tokio::test]
    async fn vector_store_info_endpoint() {
        let (status, json) = get_json(test_state(), "/api/vector-store-info").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["configured"], false);
        assert_eq!(json["type"], "none");
    }

    #[tokio::test]
    async fn log_event_feeds_buffer_and_broadcast() {
        let state = test_state();
        let (_tx, mut rx) = state.connections.register("watcher").await;

        state.log_event("info", "something happened".into()).await;

        assert_eq!(state.logs.recent(), vec!["something happened"]);
        assert!(matches!(
            rx.recv().await,
            Some(ServerMessage::Log { .. })
        ));
    }
}
