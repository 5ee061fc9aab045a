//! `tablegate serve`: run the MCP server.

use super::Gateway;
use anyhow::Result;
use std::sync::Arc;
use tablegate_core::Transport;
use tablegate_mcp::{ContextInjector, McpServer};

pub async fn run(gateway: Gateway, transport: Option<Transport>, port: Option<u16>) -> Result<()> {
    let mut mcp = gateway.config.mcp.clone();
    if let Some(transport) = transport {
        mcp.transport = transport;
    }
    if let Some(port) = port {
        mcp.port = port;
    }

    let context = Arc::new(ContextInjector::new(
        gateway.introspector.clone(),
        gateway.config.context.clone(),
    ));
    McpServer::new(mcp, gateway.router.clone())
        .with_context(context)
        .run()
        .await?;
    Ok(())
}
