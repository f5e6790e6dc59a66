// JSON-RPC 2.0 message types for the stdio surface

use crate::errors::ParleyError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Method names. The MCP spellings are accepted as aliases.
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "initialized";
    pub const LIST_TOOLS: &str = "list-tools";
    pub const CALL_TOOL: &str = "call-tool";
    pub const CANCELLED: &str = "cancelled";
    pub const PING: &str = "ping";

    pub const MCP_INITIALIZED: &str = "notifications/initialized";
    pub const MCP_LIST_TOOLS: &str = "tools/list";
    pub const MCP_CALL_TOOL: &str = "tools/call";
    pub const MCP_CANCELLED: &str = "notifications/cancelled";
}

/// Methods the dispatcher understands, after alias folding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Initialize,
    Initialized,
    ListTools,
    CallTool,
    Cancelled,
    Ping,
}

impl Method {
    pub fn from_name(name: &str) -> Option<Self> {
        use methods::*;
        match name {
            INITIALIZE => Some(Method::Initialize),
            INITIALIZED | MCP_INITIALIZED => Some(Method::Initialized),
            LIST_TOOLS | MCP_LIST_TOOLS => Some(Method::ListTools),
            CALL_TOOL | MCP_CALL_TOOL => Some(Method::CallTool),
            CANCELLED | MCP_CANCELLED => Some(Method::Cancelled),
            PING => Some(Method::Ping),
            _ => None,
        }
    }

    /// Acknowledged without a response, even when an id is present.
    pub fn is_silent(self) -> bool {
        matches!(self, Method::Initialized | Method::Cancelled)
    }
}

/// Inbound request. A missing `id` makes it a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<Value>, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            id: Some(id.into()),
            method: method.to_string(),
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        matches!(self.id, None | Some(Value::Null))
    }

    /// `params`, or an empty object when absent
    pub fn params_or_empty(&self) -> Value {
        self.params
            .clone()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()))
    }
}

/// Outbound response: exactly one of `result` / `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn from_error(id: Value, err: &ParleyError) -> Self {
        Self::failure(id, JsonRpcError::from(err))
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<&ParleyError> for JsonRpcError {
    fn from(err: &ParleyError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            data: None,
        }
    }
}

/// Stable string key for an RPC id, used to tag waiters with the call that
/// created them. `7` and `"7"` deliberately map to the same key.
pub fn request_key(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
