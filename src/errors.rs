use thiserror::Error;

use crate::mcp::transport::ErrorCode;

/// Errors that can occur while answering metadata queries.
#[derive(Error, Debug)]
pub enum TypeLensError {
    #[error("invalid cursor: {reason}")]
    InvalidCursor { reason: String },

    #[error("missing required parameter: {name}")]
    MissingArgument { name: String },

    #[error("invalid parameter '{name}': {message}")]
    InvalidArgument { name: String, message: String },

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("method not found: {method}")]
    UnknownMethod { method: String },

    #[error("invalid JSON-RPC request: {message}")]
    Framing { message: String },

    #[error("metadata error: {message}")]
    Metadata { message: String },

    #[error("config error: {message}")]
    Config { message: String },

    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TypeLensError {
    /// Shorthand for a `NotFound` error.
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Shorthand for a `MissingArgument` error.
    pub fn missing(name: &str) -> Self {
        Self::MissingArgument {
            name: name.to_string(),
        }
    }

    /// The JSON-RPC error code this error is reported with.
    pub fn rpc_code(&self) -> ErrorCode {
        match self {
            Self::UnknownMethod { .. } => ErrorCode::MethodNotFound,
            _ => ErrorCode::InternalError,
        }
    }

    /// Whether a tool should report this error as an error-flagged result
    /// instead of failing the whole RPC call.
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::Metadata { .. } | Self::Json(_))
    }
}

/// Convenience alias for results using `TypeLensError`.
pub type Result<T> = std::result::Result<T, TypeLensError>;
