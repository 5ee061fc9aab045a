//! MCP server implementation.
//!
//! Exposes the gateway commands as MCP tools over stdio or HTTP. Requests are
//! handled one at a time: the stdio loop awaits each command before reading
//! the next line, and the HTTP transport funnels every request through a
//! single handler task.

use crate::context::{ContextInjector, wrap_schema};
use crate::error::McpError;
use crate::http_transport::{HttpServer, RequestEnvelope};
use crate::protocol::*;
use crate::render::render_result;
use crate::router::CommandRouter;
use crate::tools::ToolRegistry;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tablegate_core::{CommandRequest, CommandResult, McpConfig, Transport};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, mpsc};

/// Agent name used when the client does not identify itself.
pub const DEFAULT_AGENT: &str = "default";

/// The MCP server.
pub struct McpServer {
    config: McpConfig,
    tools: ToolRegistry,
    router: Arc<CommandRouter>,
    context: Option<Arc<ContextInjector>>,
    /// Schema summaries per agent, each built once per server session.
    summaries: Mutex<HashMap<String, String>>,
}

impl McpServer {
    pub fn new(config: McpConfig, router: Arc<CommandRouter>) -> Self {
        Self {
            config,
            tools: ToolRegistry::new(),
            router,
            context: None,
            summaries: Mutex::new(HashMap::new()),
        }
    }

    /// Attach a context injector; its summary is sent at `initialize` when enabled.
    pub fn with_context(mut self, context: Arc<ContextInjector>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn router(&self) -> &Arc<CommandRouter> {
        &self.router
    }

    /// Start the MCP server on the configured transport.
    pub async fn run(self) -> Result<(), McpError> {
        match self.config.transport {
            Transport::Stdio => self.run_stdio().await,
            Transport::Http => self.run_http().await,
        }
    }

    async fn run_stdio(&self) -> Result<(), McpError> {
        tracing::info!("Starting MCP server with stdio transport");
        self.serve_lines(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve newline-delimited JSON-RPC until the reader is exhausted.
    pub async fn serve_lines<R, W>(&self, reader: R, mut writer: W) -> Result<(), McpError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(line) {
                Ok(request) if request.is_notification() => {
                    self.handle_request(request).await;
                    continue;
                }
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Unparseable JSON-RPC message");
                    JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {}", e))
                }
            };

            let mut payload = serde_json::to_vec(&response)?;
            payload.push(b'\n');
            writer.write_all(&payload).await?;
            writer.flush().await?;
        }

        tracing::info!("Input closed; MCP server stopping");
        Ok(())
    }

    async fn run_http(self) -> Result<(), McpError> {
        let address = self.config.bind_address();
        tracing::info!(address = %address, "Starting MCP server with HTTP transport");

        let (request_tx, mut request_rx) = mpsc::channel::<RequestEnvelope>(100);
        let handler = Arc::new(self);
        tokio::spawn(async move {
            while let Some((request, response_tx)) = request_rx.recv().await {
                let response = handler.handle_request(request).await;
                let _ = response_tx.send(response).await;
            }
        });

        HttpServer::new(address, request_tx).run().await
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        tracing::debug!(method = %request.method, "Handling MCP request");

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params).await,
            "initialized" | "notifications/initialized" => JsonRpcResponse::success(id, json!({})),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "shutdown" => self.handle_shutdown(id),
            _ => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    async fn handle_initialize(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: InitializeParams = params
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();

        let mut result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": "tablegate-mcp",
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            }
        });

        let agent = params
            .client_info
            .map(|info| info.name)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AGENT.to_string());

        if let Some(summary) = self.session_summary(&agent).await {
            result["instructions"] = Value::String(wrap_schema(&summary));
        }
        JsonRpcResponse::success(id, result)
    }

    /// Schema summary for `agent`, built on its first `initialize`.
    async fn session_summary(&self, agent: &str) -> Option<String> {
        let context = self.context.as_ref().filter(|c| c.config().enabled)?;

        let mut summaries = self.summaries.lock().await;
        if !summaries.contains_key(agent) {
            let summary = context.summary_for_agent(agent).await;
            tracing::info!(agent, bytes = summary.len(), "Built session schema summary");
            summaries.insert(agent.to_string(), summary);
        }
        summaries.get(agent).filter(|s| !s.is_empty()).cloned()
    }

    fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        let tools: Vec<&ToolDefinition> = self.tools.list();
        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn handle_call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {}", e));
                }
            },
            None => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params"),
        };

        let Some(operation) = self.tools.operation(&params.name) else {
            let error = McpError::ToolNotFound { name: params.name };
            return JsonRpcResponse::error(id, INVALID_PARAMS, error.to_string());
        };

        let result = match CommandRequest::from_arguments(operation, params.arguments) {
            Ok(request) => self.router.dispatch(request).await,
            Err(e) => CommandResult::failure(e),
        };

        let response = CallToolResponse {
            content: vec![
                ToolContent::Text {
                    text: render_result(operation, &result),
                },
                ToolContent::Json {
                    json: serde_json::to_value(&result).unwrap_or(Value::Null),
                },
            ],
            is_error: !result.success,
        };

        match serde_json::to_value(&response) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
        }
    }

    fn handle_shutdown(&self, id: Option<Value>) -> JsonRpcResponse {
        tracing::info!("MCP server shutdown requested");
        JsonRpcResponse::success(id, json!(null))
    }
}
