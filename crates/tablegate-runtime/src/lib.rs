//! # tablegate-runtime
//!
//! Backend capability traits and the two components built on them:
//!
//! - [`ConnectionManager`] opens the managed client (required) and the
//!   direct connection (optional) once and hands out shared handles.
//! - [`SchemaIntrospector`] answers schema questions, preferring the direct
//!   connection and falling back to the managed client with a degraded marker.
//!
//! ```text
//!            SchemaIntrospector
//!              │ ordered try
//!      ┌───────┴────────┐
//!      ▼                ▼
//!  DirectBackend   ManagedBackend ◄── row operations (DataClient)
//!  (optional)      (required)
//! ```

pub mod backend;
pub mod connection;
pub mod introspector;

pub use backend::{
    BackendConnector, DataClient, DirectBackend, ManagedBackend, RawQueryExecutor, SchemaBackend,
    SelectQuery,
};
pub use connection::{BackendState, ConnectionManager};
pub use introspector::{Introspected, SchemaIntrospector};
