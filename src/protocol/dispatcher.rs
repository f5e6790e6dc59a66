// Dispatcher - routes one JSON-RPC request to its handler
//
// Nothing a request does may escape as a panic or an `Err`: every outcome is
// a response, or deliberately no response.

use super::types::{request_key, JsonRpcRequest, JsonRpcResponse, Method};
use crate::broker::CorrelationBroker;
use crate::config::constants::DEFAULT_PROTOCOL_VERSION;
use crate::errors::ParleyError;
use crate::tools::{ToolCallResult, ToolContext, ToolRegistry};
use futures::FutureExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    broker: CorrelationBroker,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, broker: CorrelationBroker) -> Self {
        Self { registry, broker }
    }

    pub fn broker(&self) -> &CorrelationBroker {
        &self.broker
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Parse one input line. Blank lines are `Ok(None)`.
    pub fn parse_line(line: &str) -> Result<Option<JsonRpcRequest>, ParleyError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        serde_json::from_str(trimmed)
            .map(Some)
            .map_err(|e| ParleyError::Parse(e.to_string()))
    }

    /// Requests that may wait on a human and so must not hold up the loop.
    pub fn is_deferred(request: &JsonRpcRequest) -> bool {
        Method::from_name(&request.method) == Some(Method::CallTool)
    }

    /// Parse and handle a raw line. Malformed input is logged and dropped.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        match Self::parse_line(line) {
            Ok(Some(request)) => self.handle(request).await,
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Dropping malformed input line");
                None
            }
        }
    }

    #[instrument(skip(self, request), fields(method = %request.method, id = ?request.id))]
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(method) = Method::from_name(&request.method) else {
            if request.is_notification() {
                debug!("Ignoring unknown notification");
                return None;
            }
            warn!("Unknown method");
            let err = ParleyError::UnknownMethod {
                method: request.method.clone(),
            };
            return Some(JsonRpcResponse::from_error(
                request.id.unwrap_or(Value::Null),
                &err,
            ));
        };

        let outcome = match method {
            Method::Initialized => {
                info!("Client initialized");
                return None;
            }
            Method::Cancelled => {
                self.cancelled(&request.params_or_empty());
                return None;
            }
            Method::Initialize => Ok(self.initialize(&request.params_or_empty())),
            Method::Ping => Ok(json!({})),
            Method::ListTools => self.list_tools(),
            Method::CallTool => self.call_tool(&request).await,
        };

        let id = match request.id {
            Some(id) if !id.is_null() => id,
            // Notification: run it, but nobody is listening for the answer
            _ => return None,
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                if matches!(e, ParleyError::HandlerFault(_)) {
                    error!(error = %e, "Tool handler failed");
                }
                JsonRpcResponse::from_error(id, &e)
            }
        })
    }

    fn initialize(&self, params: &Value) -> Value {
        let version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);
        let client = params
            .pointer("/clientInfo/name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        info!(client = %client, protocol_version = %version, "Initialize");

        json!({
            "protocolVersion": version,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            }
        })
    }

    fn list_tools(&self) -> Result<Value, ParleyError> {
        let tools = serde_json::to_value(self.registry.definitions())
            .map_err(|e| ParleyError::HandlerFault(e.to_string()))?;
        Ok(json!({ "tools": tools }))
    }

    async fn call_tool(&self, request: &JsonRpcRequest) -> Result<Value, ParleyError> {
        let params: CallToolParams = serde_json::from_value(request.params_or_empty())
            .map_err(|e| ParleyError::InvalidParams(format!("call-tool: {}", e)))?;

        let tool = self
            .registry
            .get(&params.name)
            .ok_or_else(|| ParleyError::UnknownTool {
                name: params.name.clone(),
            })?;

        let origin = request.id.as_ref().map(request_key);
        let context = ToolContext {
            origin: origin.as_deref(),
        };
        let arguments = params
            .arguments
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));

        info!(tool = %params.name, "Calling tool");
        let outcome = AssertUnwindSafe(tool.execute(arguments, &context))
            .catch_unwind()
            .await;

        let text = match outcome {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return Err(ParleyError::HandlerFault(format!("{:#}", e))),
            Err(panic) => {
                return Err(ParleyError::HandlerFault(format!(
                    "tool '{}' panicked: {}",
                    params.name,
                    panic_message(panic.as_ref())
                )))
            }
        };

        serde_json::to_value(ToolCallResult::text(text))
            .map_err(|e| ParleyError::HandlerFault(e.to_string()))
    }

    /// `{requestId}` names either an RPC call (cancel all its waiters) or a
    /// correlation id (cancel that waiter).
    fn cancelled(&self, params: &Value) {
        let Some(target) = params.get("requestId").filter(|v| !v.is_null()) else {
            debug!("cancelled without requestId ignored");
            return;
        };
        let key = request_key(target);
        let by_origin = self.broker.cancel_origin(&key);
        let direct = usize::from(self.broker.cancel(&key));
        info!(request_id = %key, cancelled = by_origin + direct, "Cancel requested");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
