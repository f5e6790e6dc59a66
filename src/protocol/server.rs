// Stdio server - line-delimited JSON-RPC in, responses out
//
// Requests are dispatched in arrival order. `call-tool` may wait on a human,
// so it runs as its own task and the loop keeps reading; its response is
// written whenever it settles. Only the writer task touches the output.

use super::dispatcher::Dispatcher;
use super::types::JsonRpcResponse;
use futures::{SinkExt, StreamExt};
use std::future::Future;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, warn};

/// Longest accepted request line
pub const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfInput,
    Shutdown,
    ReadError,
}

pub struct StdioServer {
    dispatcher: Dispatcher,
}

impl StdioServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Serve until EOF, a read error, or `shutdown` completes. Pending
    /// waiters are flushed and in-flight calls answered before returning.
    pub async fn run<R, W, S>(&self, reader: R, writer: W, shutdown: S) -> StopReason
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
        S: Future<Output = ()>,
    {
        let (tx, rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
        let writer_task = tokio::spawn(write_responses(writer, rx));

        let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_BYTES));
        let mut inflight: JoinSet<()> = JoinSet::new();
        tokio::pin!(shutdown);

        let reason = loop {
            tokio::select! {
                _ = &mut shutdown => break StopReason::Shutdown,
                Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Tool call task failed");
                    }
                }
                next = lines.next() => match next {
                    None => break StopReason::EndOfInput,
                    Some(Ok(line)) => self.dispatch(line, &tx, &mut inflight).await,
                    Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                        warn!(limit = MAX_LINE_BYTES, "Dropping oversized input line");
                    }
                    Some(Err(LinesCodecError::Io(e))) => {
                        error!(error = %e, "Reading input failed");
                        break StopReason::ReadError;
                    }
                },
            }
        };

        info!(reason = ?reason, "Stopping");
        self.dispatcher.broker().flush_all();
        while let Some(joined) = inflight.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Tool call task failed");
            }
        }

        drop(tx);
        if let Err(e) = writer_task.await {
            error!(error = %e, "Response writer failed");
        }
        reason
    }

    async fn dispatch(
        &self,
        line: String,
        tx: &mpsc::UnboundedSender<JsonRpcResponse>,
        inflight: &mut JoinSet<()>,
    ) {
        let request = match Dispatcher::parse_line(&line) {
            Ok(Some(request)) => request,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Dropping malformed input line");
                return;
            }
        };

        if Dispatcher::is_deferred(&request) {
            let dispatcher = self.dispatcher.clone();
            let tx = tx.clone();
            inflight.spawn(async move {
                if let Some(response) = dispatcher.handle(request).await {
                    deliver(&tx, response);
                }
            });
        } else if let Some(response) = self.dispatcher.handle(request).await {
            deliver(&tx, response);
        }
    }
}

/// Queue a response for the writer. Returns false if the writer is gone.
fn deliver(tx: &mpsc::UnboundedSender<JsonRpcResponse>, response: JsonRpcResponse) -> bool {
    match tx.send(response) {
        Ok(()) => true,
        Err(mpsc::error::SendError(response)) => {
            warn!(id = %response.id, "Response writer has stopped, dropping response");
            false
        }
    }
}

async fn write_responses<W>(writer: W, mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>)
where
    W: AsyncWrite + Unpin,
{
    let mut out = FramedWrite::new(writer, LinesCodec::new());
    while let Some(response) = rx.recv().await {
        let line = match serde_json::to_string(&response) {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "Could not serialize response");
                continue;
            }
        };
        debug!(bytes = line.len(), "Writing response");
        if let Err(e) = out.send(line).await {
            error!(error = %e, "Writing response failed");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::DisconnectedSink;
    use crate::broker::CorrelationBroker;
    use crate::tools::ToolRegistry;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn server() -> StdioServer {
        let broker = CorrelationBroker::new(Arc::new(DisconnectedSink), Duration::from_secs(30));
        StdioServer::new(Dispatcher::new(Arc::new(ToolRegistry::new()), broker))
    }

    #[tokio::test]
    async fn test_eof_stops_and_answers_in_order() {
        let (mut client_in, server_in) = duplex(4096);
        let (server_out, client_out) = duplex(4096);

        client_in
            .write_all(b"garbage\n{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"list-tools\"}\n")
            .await
            .unwrap();
        drop(client_in);

        let reason = server()
            .run(server_in, server_out, std::future::pending())
            .await;
        assert_eq!(reason, StopReason::EndOfInput);

        let mut lines = BufReader::new(client_out).lines();
        let first: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        let second: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(first["id"], 1);
        assert_eq!(second["id"], 2);
        assert!(lines.next_line().await.unwrap().is_none());
    }

    #[test]
    fn test_deliver_after_writer_stopped() {
        let (tx, rx) = mpsc::unbounded_channel();
        assert!(deliver(&tx, JsonRpcResponse::success(Value::from(1), Value::Null)));
        drop(rx);
        assert!(!deliver(&tx, JsonRpcResponse::success(Value::from(2), Value::Null)));
    }

    #[tokio::test]
    async fn test_shutdown_future_stops_loop() {
        let (_client_in, server_in) = duplex(64);
        let (server_out, _client_out) = duplex(64);
        let reason = server().run(server_in, server_out, async {}).await;
        assert_eq!(reason, StopReason::Shutdown);
    }
}
