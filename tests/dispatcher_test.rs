// Integration tests for the JSON-RPC dispatcher and stdio loop

use parley::broker::{ChannelSink, CorrelationBroker, OutOfBandMessage};
use parley::dialog::InputResolver;
use parley::protocol::{Dispatcher, JsonRpcRequest, JsonRpcResponse, StdioServer, StopReason};
use parley::session::{ContinueDecision, LoopState};
use parley::tools::ToolRegistry;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

fn build(timeout: Duration) -> (Dispatcher, UnboundedReceiver<OutOfBandMessage>) {
    let (sink, rx) = ChannelSink::new();
    let broker = CorrelationBroker::new(Arc::new(sink), timeout);
    let resolver = Arc::new(InputResolver::new(
        broker.clone(),
        None,
        timeout,
        "Parley",
    ));
    let registry = ToolRegistry::builtin(resolver).unwrap();
    (Dispatcher::new(Arc::new(registry), broker), rx)
}

/// A dispatcher whose simulated UI host answers every question with `answer`.
fn answering(answer: Value) -> Dispatcher {
    let (dispatcher, mut rx) = build(Duration::from_secs(30));
    let broker = dispatcher.broker().clone();
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Some(id) = msg.request_id() {
                broker.resolve(id, answer.clone());
            }
        }
    });
    dispatcher
}

fn call(id: i64, tool: &str, arguments: Value) -> JsonRpcRequest {
    JsonRpcRequest::new(id, "call-tool", Some(json!({"name": tool, "arguments": arguments})))
}

fn result_text(response: &JsonRpcResponse) -> String {
    let result = response.result.as_ref().expect("expected a result");
    assert_eq!(result["isError"], false);
    result["content"][0]["text"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_confirm_answered_true_is_confirmed() {
    let dispatcher = answering(json!(true));
    let response = dispatcher
        .handle(call(1, "collect-confirm", json!({"message": "Proceed?"})))
        .await
        .unwrap();
    assert_eq!(response.id, json!(1));
    assert_eq!(result_text(&response), "confirmed");
}

#[tokio::test]
async fn test_continue_declined_ends() {
    let dispatcher = answering(json!({"continue": false}));
    let response = dispatcher
        .handle(call(2, "continue-session", json!({"reason": "done"})))
        .await
        .unwrap();
    let text = result_text(&response);
    assert!(text.contains("PARLEY_CONTINUE: false"));
    assert_eq!(ContinueDecision::parse(&text).unwrap().state(), LoopState::End);
}

#[tokio::test]
async fn test_continue_with_instruction() {
    let dispatcher = answering(json!({"continue": true, "instruction": "next step"}));
    let response = dispatcher
        .handle(call(3, "continue-session", json!({"reason": "done"})))
        .await
        .unwrap();
    let text = result_text(&response);
    assert!(text.contains("PARLEY_CONTINUE: true"));
    assert!(text.contains("next step"));
    assert_eq!(
        ContinueDecision::parse(&text).unwrap().state(),
        LoopState::ContinueWithInstruction("next step".to_string())
    );
}

#[tokio::test]
async fn test_free_text_answer_round_trips_verbatim() {
    let answer = "  multi\nline answer with \"quotes\"  ";
    let dispatcher = answering(json!(answer));
    let response = dispatcher
        .handle(call(4, "collect-input", json!({"prompt": "Anything else?"})))
        .await
        .unwrap();
    assert_eq!(result_text(&response), answer);
}

#[tokio::test]
async fn test_malformed_line_then_valid_line() {
    let (dispatcher, _rx) = build(Duration::from_secs(30));
    assert!(dispatcher.handle_line("this is not json").await.is_none());
    let response = dispatcher
        .handle_line(r#"{"jsonrpc":"2.0","id":9,"method":"list-tools"}"#)
        .await
        .unwrap();
    let tools = response.result.unwrap()["tools"].as_array().unwrap().len();
    assert_eq!(tools, 5);
}

#[tokio::test]
async fn test_unknown_tool_error_names_it() {
    let (dispatcher, _rx) = build(Duration::from_secs(30));
    let response = dispatcher
        .handle(call(5, "launch-rockets", json!({})))
        .await
        .unwrap();
    let error = response.error.unwrap();
    assert_eq!(error.code, -32602);
    assert!(error.message.contains("launch-rockets"));
}

#[tokio::test]
async fn test_list_tools_exposes_schemas() {
    let (dispatcher, _rx) = build(Duration::from_secs(30));
    let response = dispatcher
        .handle(JsonRpcRequest::new(1, "tools/list", None))
        .await
        .unwrap();
    let tools = response.result.unwrap()["tools"].clone();
    let confirm = tools
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["name"] == "collect-confirm")
        .unwrap()
        .clone();
    assert_eq!(confirm["inputSchema"]["required"], json!(["message"]));
}

#[tokio::test]
async fn test_notification_tool_creates_no_waiter() {
    let (dispatcher, mut rx) = build(Duration::from_secs(30));
    let response = dispatcher
        .handle(call(6, "send-notification", json!({"message": "Deployed"})))
        .await
        .unwrap();
    assert_eq!(result_text(&response), "Notification sent.");
    assert_eq!(dispatcher.broker().pending_count(), 0);
    assert_eq!(rx.recv().await.unwrap().method, "notify");
}

#[tokio::test]
async fn test_cancel_by_originating_call_over_stdio() {
    let (dispatcher, mut rx) = build(Duration::from_secs(30));
    let server = StdioServer::new(dispatcher);

    let (mut client_in, server_in) = duplex(8192);
    let (server_out, client_out) = duplex(8192);
    let serving = tokio::spawn(async move {
        server
            .run(server_in, server_out, std::future::pending())
            .await
    });

    client_in
        .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":\"call-1\",\"method\":\"tools/call\",\"params\":{\"name\":\"collect-input\",\"arguments\":{\"prompt\":\"Name?\"}}}\n")
        .await
        .unwrap();

    // Waiter is registered once the collect-input message goes out
    let asked = rx.recv().await.unwrap();
    assert_eq!(asked.params.command, "collect-input");

    client_in
        .write_all(b"{\"jsonrpc\":\"2.0\",\"method\":\"notifications/cancelled\",\"params\":{\"requestId\":\"call-1\"}}\n")
        .await
        .unwrap();

    let mut lines = BufReader::new(client_out).lines();
    let line = lines.next_line().await.unwrap().unwrap();
    let response: JsonRpcResponse = serde_json::from_str(&line).unwrap();
    assert_eq!(response.id, json!("call-1"));
    assert!(result_text(&response).contains("cancelled"));

    drop(client_in);
    assert_eq!(serving.await.unwrap(), StopReason::EndOfInput);
}

#[tokio::test]
async fn test_eof_flushes_pending_waiters() {
    let (dispatcher, mut rx) = build(Duration::from_secs(30));
    let broker = dispatcher.broker().clone();
    let server = StdioServer::new(dispatcher);

    let (mut client_in, server_in) = duplex(8192);
    let (server_out, client_out) = duplex(8192);
    let serving = tokio::spawn(async move {
        server
            .run(server_in, server_out, std::future::pending())
            .await
    });

    client_in
        .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"call-tool\",\"params\":{\"name\":\"collect-confirm\",\"arguments\":{\"message\":\"Ship it?\"}}}\n")
        .await
        .unwrap();
    rx.recv().await.unwrap();
    assert_eq!(broker.pending_count(), 1);

    drop(client_in);
    assert_eq!(serving.await.unwrap(), StopReason::EndOfInput);
    assert_eq!(broker.pending_count(), 0);

    let mut lines = BufReader::new(client_out).lines();
    let response: JsonRpcResponse =
        serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(result_text(&response), "declined");
}
