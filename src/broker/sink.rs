// Out-of-band sink - the side stream used to ask a collaborator for input
//
// Messages on this stream are line-delimited JSON of the form
// `{"method":"collect-input","params":{"command":..,"arguments":[requestId, payload]}}`.
// It must never share a stream with RPC responses.

use crate::errors::ParleyError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

/// Method name of a request for input.
pub const COLLECT_INPUT_METHOD: &str = "collect-input";

/// Method name of a fire-and-forget notification.
pub const NOTIFY_METHOD: &str = "notify";

/// A single message on the out-of-band stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutOfBandMessage {
    pub method: String,
    pub params: OutOfBandParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutOfBandParams {
    pub command: String,
    pub arguments: Vec<Value>,
}

impl OutOfBandMessage {
    /// Ask the collaborator to run `command` and answer `request_id`.
    pub fn collect_input(command: &str, request_id: &str, payload: Value) -> Self {
        Self {
            method: COLLECT_INPUT_METHOD.to_string(),
            params: OutOfBandParams {
                command: command.to_string(),
                arguments: vec![Value::String(request_id.to_string()), payload],
            },
        }
    }

    /// Tell the collaborator something; no answer is expected.
    pub fn notify(command: &str, payload: Value) -> Self {
        Self {
            method: NOTIFY_METHOD.to_string(),
            params: OutOfBandParams {
                command: command.to_string(),
                arguments: vec![payload],
            },
        }
    }

    /// Correlation id carried by a `collect-input` message
    pub fn request_id(&self) -> Option<&str> {
        if self.method != COLLECT_INPUT_METHOD {
            return None;
        }
        self.params.arguments.first().and_then(Value::as_str)
    }

    /// Payload carried after the correlation id (or first, for `notify`)
    pub fn payload(&self) -> Option<&Value> {
        if self.method == COLLECT_INPUT_METHOD {
            self.params.arguments.get(1)
        } else {
            self.params.arguments.first()
        }
    }
}

/// Transport adapter for the out-of-band stream.
///
/// `emit` must not block: adapters hand the message to a writer task and
/// report `CollaboratorUnavailable` when nobody is listening.
pub trait OutOfBandSink: Send + Sync {
    fn emit(&self, message: OutOfBandMessage) -> Result<(), ParleyError>;
}

/// In-process sink backed by an unbounded channel
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<OutOfBandMessage>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutOfBandMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl OutOfBandSink for ChannelSink {
    fn emit(&self, message: OutOfBandMessage) -> Result<(), ParleyError> {
        self.tx
            .send(message)
            .map_err(|_| ParleyError::unavailable("in-process collaborator has gone away"))
    }
}

/// Sink used when no UI host is configured; every emit fails so callers
/// go straight to the fallback.
pub struct DisconnectedSink;

impl OutOfBandSink for DisconnectedSink {
    fn emit(&self, _message: OutOfBandMessage) -> Result<(), ParleyError> {
        Err(ParleyError::unavailable("no UI host configured"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collect_input_wire_shape() {
        let msg = OutOfBandMessage::collect_input("collect-confirm", "abc-1", json!({"message": "Proceed?"}));
        let wire = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            wire,
            json!({
                "method": "collect-input",
                "params": {
                    "command": "collect-confirm",
                    "arguments": ["abc-1", {"message": "Proceed?"}]
                }
            })
        );
        assert_eq!(msg.request_id(), Some("abc-1"));
        assert_eq!(msg.payload().unwrap()["message"], "Proceed?");
    }

    #[test]
    fn test_notify_has_no_request_id() {
        let msg = OutOfBandMessage::notify("show-notification", json!({"message": "hi"}));
        assert_eq!(msg.method, NOTIFY_METHOD);
        assert!(msg.request_id().is_none());
        assert_eq!(msg.payload().unwrap()["message"], "hi");
    }

    #[test]
    fn test_channel_sink_delivers() {
        let (sink, mut rx) = ChannelSink::new();
        sink.emit(OutOfBandMessage::notify("x", Value::Null)).unwrap();
        assert_eq!(rx.try_recv().unwrap().params.command, "x");
    }

    #[test]
    fn test_channel_sink_fails_when_receiver_dropped() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        let err = sink.emit(OutOfBandMessage::notify("x", Value::Null)).unwrap_err();
        assert!(matches!(err, ParleyError::CollaboratorUnavailable { .. }));
    }

    #[test]
    fn test_disconnected_sink_always_fails() {
        let err = DisconnectedSink
            .emit(OutOfBandMessage::notify("x", Value::Null))
            .unwrap_err();
        assert!(matches!(err, ParleyError::CollaboratorUnavailable { .. }));
    }
}
