//! # tablegate-mcp
//!
//! Command surface of the Tablegate gateway, exposed to agents over MCP.
//!
//! - **Command Router**: validates a request and sends row operations to the
//!   managed client, schema questions to the introspector and raw SQL to the
//!   direct connection.
//! - **Context Injector**: builds a compact schema summary once per agent
//!   session and places it in the agent's system context.
//! - **MCP server**: JSON-RPC over stdio or HTTP, one tool per command.
//!
//! ## Architecture
//!
//! ```text
//! AI Agent
//!       │
//!       │ MCP protocol (tools/list, tools/call)
//!       ▼
//! ┌──────────────────────┐
//! │ McpServer            │
//! │  1. Parse arguments  │
//! │  2. Validate         │  ← RequestValidator, SqlGuard
//! │  3. Dispatch         │  ← CommandRouter
//! │  4. Render           │  ← text + JSON result
//! └─────────┬────────────┘
//!           │
//!     ┌─────┴───────────────┐
//!     ▼                     ▼
//! SchemaIntrospector    DataClient
//! (direct → managed)    (managed)
//! ```
//!
//! Every command returns a [`CommandResult`](tablegate_core::CommandResult);
//! failures are reported in-band and never abort the session.
//!
//! ## Example Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use tablegate_mcp::{CommandRouter, ContextInjector, McpServer};
//!
//! let router = Arc::new(CommandRouter::new(introspector.clone(), config.timeouts.clone()));
//! let context = Arc::new(ContextInjector::new(introspector, config.context.clone()));
//! McpServer::new(config.mcp.clone(), router)
//!     .with_context(context)
//!     .run()
//!     .await?;
//! ```

pub mod context;
pub mod error;
pub mod http_transport;
pub mod protocol;
pub mod render;
pub mod router;
pub mod server;
pub mod tools;
pub mod validator;

pub use context::{
    AgentSettings, ChatMessage, ContextInjector, MessageContent, clean_schema_from_messages,
    extract_schema_info, wrap_schema,
};
pub use error::McpError;
pub use render::render_result;
pub use router::CommandRouter;
pub use server::McpServer;
pub use tools::ToolRegistry;
pub use validator::{RequestValidator, SqlGuard};
