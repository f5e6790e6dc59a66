// Error taxonomy
//
// Every failure the server can observe, with its JSON-RPC code.

use thiserror::Error;

/// JSON-RPC 2.0 error codes used on the response stream.
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Errors that can occur while serving tool calls.
#[derive(Debug, Error)]
pub enum ParleyError {
    /// An input line was not a JSON-RPC request. Logged and dropped.
    #[error("parse error: {0}")]
    Parse(String),

    /// A request named a method this server does not implement.
    #[error("method not found: {method}")]
    UnknownMethod { method: String },

    /// `call-tool` named a tool that is not in the registry.
    #[error("unknown tool: {name}")]
    UnknownTool { name: String },

    /// Request params were missing or had the wrong shape.
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// A tool handler returned an error or panicked.
    #[error("{0}")]
    HandlerFault(String),

    /// No answer arrived before the waiter's deadline.
    #[error("no answer for request {request_id} within {timeout_secs}s")]
    Timeout { request_id: String, timeout_secs: u64 },

    /// The UI host could not be asked for input.
    #[error("input collaborator unavailable: {reason}")]
    CollaboratorUnavailable { reason: String },

    /// The native dialog fallback failed as well.
    #[error("fallback dialog failed: {reason}")]
    FallbackExhausted { reason: String },

    /// Two tools were registered under the same name.
    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),
}

impl ParleyError {
    /// JSON-RPC error code reported for this error.
    pub fn code(&self) -> i64 {
        match self {
            ParleyError::Parse(_) => codes::PARSE_ERROR,
            ParleyError::UnknownMethod { .. } => codes::METHOD_NOT_FOUND,
            ParleyError::UnknownTool { .. } | ParleyError::InvalidParams(_) => {
                codes::INVALID_PARAMS
            }
            _ => codes::INTERNAL_ERROR,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        ParleyError::CollaboratorUnavailable {
            reason: reason.into(),
        }
    }

    pub fn fallback(reason: impl Into<String>) -> Self {
        ParleyError::FallbackExhausted {
            reason: reason.into(),
        }
    }
}
