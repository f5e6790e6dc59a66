// Integration tests for the UI host -> native dialog -> default chain

use async_trait::async_trait;
use parley::broker::{ChannelSink, CorrelationBroker, DisconnectedSink, OutOfBandSink};
use parley::dialog::{DialogAnswer, DialogBackend, DialogKind, DialogRequest, InputResolver};
use parley::protocol::{Dispatcher, JsonRpcRequest};
use parley::tools::ToolRegistry;
use parley::ParleyError;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Native dialog stand-in that records what it was asked
struct FakeDialog {
    answer: Option<DialogAnswer>,
    asked: Mutex<Vec<DialogRequest>>,
}

impl FakeDialog {
    fn answering(answer: DialogAnswer) -> Arc<Self> {
        Arc::new(Self {
            answer: Some(answer),
            asked: Mutex::new(Vec::new()),
        })
    }

    fn broken() -> Arc<Self> {
        Arc::new(Self {
            answer: None,
            asked: Mutex::new(Vec::new()),
        })
    }

    fn asked(&self) -> Vec<DialogRequest> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl DialogBackend for FakeDialog {
    fn name(&self) -> &str {
        "fake"
    }

    async fn show(&self, request: &DialogRequest) -> Result<DialogAnswer, ParleyError> {
        self.asked.lock().unwrap().push(request.clone());
        self.answer
            .clone()
            .ok_or_else(|| ParleyError::fallback("dialog process exited with status 2"))
    }

    fn notify(&self, _title: &str, _body: &str) -> Result<(), ParleyError> {
        Ok(())
    }
}

fn dispatcher(sink: Arc<dyn OutOfBandSink>, dialog: Arc<FakeDialog>) -> Dispatcher {
    let broker = CorrelationBroker::new(sink, Duration::from_secs(30));
    let resolver = Arc::new(InputResolver::new(
        broker.clone(),
        Some(dialog as Arc<dyn DialogBackend>),
        Duration::from_secs(30),
        "Parley",
    ));
    Dispatcher::new(Arc::new(ToolRegistry::builtin(resolver).unwrap()), broker)
}

async fn call_text(dispatcher: &Dispatcher, tool: &str, arguments: Value) -> String {
    let response = dispatcher
        .handle(JsonRpcRequest::new(
            1,
            "call-tool",
            Some(json!({"name": tool, "arguments": arguments})),
        ))
        .await
        .unwrap();
    response.result.unwrap()["content"][0]["text"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_no_ui_host_asks_native_dialog() {
    let dialog = FakeDialog::answering(DialogAnswer::Text("from the dialog".to_string()));
    let d = dispatcher(Arc::new(DisconnectedSink), dialog.clone());

    let text = call_text(&d, "collect-input", json!({"prompt": "What now?"})).await;
    assert_eq!(text, "from the dialog");

    let asked = dialog.asked();
    assert_eq!(asked.len(), 1);
    assert_eq!(asked[0].kind, DialogKind::Text);
    assert_eq!(asked[0].body, "What now?");
}

#[tokio::test]
async fn test_failed_dialog_gives_conservative_default() {
    let d = dispatcher(Arc::new(DisconnectedSink), FakeDialog::broken());
    assert_eq!(
        call_text(&d, "collect-confirm", json!({"message": "Delete it?"})).await,
        "declined"
    );
    let text = call_text(&d, "continue-session", json!({"reason": "done"})).await;
    assert!(text.contains("PARLEY_CONTINUE: false"));
}

#[tokio::test(start_paused = true)]
async fn test_silent_ui_host_times_out_into_dialog() {
    let (sink, _rx) = ChannelSink::new();
    let dialog = FakeDialog::answering(DialogAnswer::Confirmed(true));
    let d = dispatcher(Arc::new(sink), dialog.clone());

    assert_eq!(
        call_text(&d, "collect-confirm", json!({"message": "Proceed?"})).await,
        "confirmed"
    );
    assert_eq!(dialog.asked().len(), 1);
    assert_eq!(d.broker().pending_count(), 0);
}

#[tokio::test]
async fn test_continue_dialog_allows_attachments() {
    let dialog = FakeDialog::answering(DialogAnswer::Text(String::new()));
    let d = dispatcher(Arc::new(DisconnectedSink), dialog.clone());

    let text = call_text(&d, "continue-session", json!({"reason": "step 1 done"})).await;
    assert!(text.contains("PARLEY_CONTINUE: true"));
    assert!(!text.contains("<<<INSTRUCTION"));
    assert!(dialog.asked()[0].allow_attachment);
}

#[tokio::test]
async fn test_dismissed_notice() {
    let d = dispatcher(
        Arc::new(DisconnectedSink),
        FakeDialog::answering(DialogAnswer::Dismissed),
    );
    assert_eq!(
        call_text(&d, "collect-notice", json!({"message": "FYI"})).await,
        "dismissed"
    );
}

#[tokio::test(start_paused = true)]
async fn test_call_then_immediate_eof_defaults_without_dialog() {
    use parley::protocol::{JsonRpcResponse, StdioServer, StopReason};
    use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader};

    let (sink, _rx) = ChannelSink::new();
    let dialog = FakeDialog::answering(DialogAnswer::Confirmed(true));
    let d = dispatcher(Arc::new(sink), dialog.clone());
    let broker = d.broker().clone();
    let server = StdioServer::new(d);

    let (mut client_in, server_in) = duplex(8192);
    let (server_out, client_out) = duplex(8192);
    client_in
        .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"call-tool\",\"params\":{\"name\":\"collect-confirm\",\"arguments\":{\"message\":\"Ship it?\"}}}\n")
        .await
        .unwrap();
    drop(client_in);

    let started = tokio::time::Instant::now();
    let reason = server
        .run(server_in, server_out, std::future::pending())
        .await;
    assert_eq!(reason, StopReason::EndOfInput);
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(dialog.asked().is_empty());
    assert_eq!(broker.pending_count(), 0);

    let mut lines = BufReader::new(client_out).lines();
    let response: JsonRpcResponse =
        serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(
        response.result.unwrap()["content"][0]["text"],
        "declined"
    );
}
