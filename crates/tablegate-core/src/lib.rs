//! # tablegate-core
//!
//! Types shared across the Tablegate crates: configuration, schema
//! descriptors, the command request/result contract and error kinds.

pub mod command;
pub mod config;
pub mod error;
pub mod schema;

pub use command::{
    CommandRequest, CommandResult, Filters, Operation, OrderBy, Record, ResultMetadata,
};
pub use config::{
    ConnectionConfig, ContextConfig, GatewayConfig, McpConfig, PoolConfig, TimeoutConfig, Transport,
};
pub use error::{ErrorInfo, ErrorKind, GatewayError};
pub use schema::{BackendSource, ColumnDescriptor, ForeignKeyRef, TableDescriptor};
