//! HTTP transport for the MCP server.
//!
//! JSON-RPC requests are POSTed to `/mcp` and forwarded over a channel to the
//! single task that owns the [`McpServer`](crate::McpServer), so commands are
//! handled one at a time in arrival order.

use crate::error::McpError;
use crate::protocol::{INTERNAL_ERROR, JsonRpcRequest, JsonRpcResponse};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::trace::TraceLayer;

/// A request paired with the channel its response goes back on.
pub type RequestEnvelope = (JsonRpcRequest, mpsc::Sender<JsonRpcResponse>);

/// HTTP transport handler state.
pub struct HttpTransportState {
    request_tx: mpsc::Sender<RequestEnvelope>,
}

impl HttpTransportState {
    pub fn new(request_tx: mpsc::Sender<RequestEnvelope>) -> Self {
        Self { request_tx }
    }
}

/// Create the HTTP router for MCP.
pub fn create_router(state: Arc<HttpTransportState>) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp_post))
        .route("/health", get(handle_health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn handle_mcp_post(
    State(state): State<Arc<HttpTransportState>>,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    let notification = request.is_notification();
    let (response_tx, mut response_rx) = mpsc::channel(1);

    if state.request_tx.send((request, response_tx)).await.is_err() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(JsonRpcResponse::error(None, INTERNAL_ERROR, "MCP server unavailable")),
        )
            .into_response();
    }

    match response_rx.recv().await {
        Some(_) if notification => StatusCode::ACCEPTED.into_response(),
        Some(response) => (StatusCode::OK, Json(response)).into_response(),
        None => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(JsonRpcResponse::error(
                None,
                INTERNAL_ERROR,
                "No response from MCP server",
            )),
        )
            .into_response(),
    }
}

async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "tablegate-mcp",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// HTTP server for MCP transport.
pub struct HttpServer {
    bind_address: String,
    state: Arc<HttpTransportState>,
}

impl HttpServer {
    pub fn new(bind_address: impl Into<String>, request_tx: mpsc::Sender<RequestEnvelope>) -> Self {
        Self {
            bind_address: bind_address.into(),
            state: Arc::new(HttpTransportState::new(request_tx)),
        }
    }

    /// Run the HTTP server until the listener fails.
    pub async fn run(self) -> Result<(), McpError> {
        let app = create_router(self.state);

        let listener = tokio::net::TcpListener::bind(&self.bind_address)
            .await
            .map_err(|e| {
                McpError::StartupFailed(format!("Failed to bind to {}: {}", self.bind_address, e))
            })?;

        tracing::info!(address = %self.bind_address, "MCP HTTP server listening");

        axum::serve(listener, app)
            .await
            .map_err(|e| McpError::TransportError(e.to_string()))?;

        Ok(())
    }
}
