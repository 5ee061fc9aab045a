//! Error types shared by every Tablegate crate.
//!
//! Backends report failures as [`GatewayError`]; the command layer converts
//! them into the serializable [`ErrorInfo`] carried in-band by command results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by configuration loading, backends and request validation.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Required managed-service credentials are missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A backend could not be reached (or is not configured).
    #[error("connection error: {0}")]
    Connection(String),

    /// The request was rejected before any backend call.
    #[error("validation error: {0}")]
    Validation(String),

    /// The backend reported a failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// The backend did not answer within the call deadline.
    #[error("{operation} timed out after {}ms", after.as_millis())]
    Timeout { operation: String, after: Duration },

    /// The backend cannot perform this operation at all.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// The requested object does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl GatewayError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn timeout(operation: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            after,
        }
    }

    /// The serializable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::ConfigurationError,
            Self::Connection(_) => ErrorKind::ConnectionError,
            Self::Validation(_) => ErrorKind::ValidationError,
            Self::Backend(_) => ErrorKind::BackendError,
            Self::Timeout { .. } => ErrorKind::TimeoutError,
            Self::Unsupported(_) => ErrorKind::UnsupportedError,
            Self::NotFound(_) => ErrorKind::NotFoundError,
        }
    }

    /// Message without the kind prefix added by `Display`.
    pub fn message(&self) -> String {
        match self {
            Self::Configuration(m)
            | Self::Connection(m)
            | Self::Validation(m)
            | Self::Backend(m)
            | Self::Unsupported(m)
            | Self::NotFound(m) => m.clone(),
            Self::Timeout { .. } => self.to_string(),
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported(_))
    }
}

/// Error kinds reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    ConfigurationError,
    ConnectionError,
    ValidationError,
    BackendError,
    TimeoutError,
    UnsupportedError,
    NotFoundError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ConfigurationError => "ConfigurationError",
            Self::ConnectionError => "ConnectionError",
            Self::ValidationError => "ValidationError",
            Self::BackendError => "BackendError",
            Self::TimeoutError => "TimeoutError",
            Self::UnsupportedError => "UnsupportedError",
            Self::NotFoundError => "NotFoundError",
        };
        f.write_str(s)
    }
}

/// In-band error carried by a failed command result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&GatewayError> for ErrorInfo {
    fn from(err: &GatewayError) -> Self {
        Self {
            kind: err.kind(),
            message: err.message(),
        }
    }
}

impl From<GatewayError> for ErrorInfo {
    fn from(err: GatewayError) -> Self {
        Self::from(&err)
    }
}
