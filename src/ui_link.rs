// UI host link - TCP adapter for the out-of-band stream
//
// The UI host connects to a local listener. The newest connection becomes
// the active out-of-band stream and receives `collect-input` / `notify`
// lines; any connection may send answers back:
//
//   {"method":"resolve","params":{"requestId":"..","value":..}}
//   {"method":"cancel","params":{"requestId":".."}}
//   {"requestId":"..","value":..}            (shorthand for resolve)
//
// This stream is separate from stdout, so RPC framing is never disturbed.

use crate::broker::{CorrelationBroker, DisconnectedSink, OutOfBandMessage, OutOfBandSink};
use crate::errors::ParleyError;
use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info, warn};

const MAX_LINE_BYTES: usize = 1024 * 1024;

type Outbox = Option<mpsc::UnboundedSender<String>>;

/// An answer from the UI host
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Resolve { request_id: String, value: Value },
    Cancel { request_id: String },
}

impl Inbound {
    pub fn parse(line: &str) -> Result<Self, ParleyError> {
        let message: Value =
            serde_json::from_str(line).map_err(|e| ParleyError::Parse(e.to_string()))?;

        let method = message
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("resolve");
        let body = message.get("params").unwrap_or(&message);

        let request_id = match body.get("requestId") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(ParleyError::InvalidParams("missing requestId".to_string())),
        };

        match method {
            "resolve" => Ok(Inbound::Resolve {
                request_id,
                value: body.get("value").cloned().unwrap_or(Value::Null),
            }),
            "cancel" => Ok(Inbound::Cancel { request_id }),
            other => Err(ParleyError::UnknownMethod {
                method: other.to_string(),
            }),
        }
    }

    /// Apply to the broker. Unknown or settled ids are a no-op.
    pub fn apply(self, broker: &CorrelationBroker) -> bool {
        match self {
            Inbound::Resolve { request_id, value } => broker.resolve(&request_id, value),
            Inbound::Cancel { request_id } => broker.cancel(&request_id),
        }
    }
}

/// Out-of-band sink writing to whichever UI host is connected.
#[derive(Clone)]
pub struct UiLinkSink {
    current: watch::Receiver<Outbox>,
}

impl UiLinkSink {
    pub fn is_connected(&self) -> bool {
        self.current.borrow().is_some()
    }
}

impl OutOfBandSink for UiLinkSink {
    fn emit(&self, message: OutOfBandMessage) -> Result<(), ParleyError> {
        let line = serde_json::to_string(&message)
            .map_err(|e| ParleyError::unavailable(format!("cannot encode message: {}", e)))?;
        match self.current.borrow().as_ref() {
            Some(tx) => tx
                .send(line)
                .map_err(|_| ParleyError::unavailable("UI host disconnected")),
            None => Err(ParleyError::unavailable("no UI host connected")),
        }
    }
}

pub struct UiLink {
    listener: TcpListener,
    current: Arc<watch::Sender<Outbox>>,
}

impl UiLink {
    /// Bind the listener. The sink can be handed to the broker before
    /// `serve` starts; until a host connects every emit is unavailable.
    pub async fn bind(address: &str) -> Result<(Self, UiLinkSink)> {
        let listener = TcpListener::bind(address)
            .await
            .with_context(|| format!("Failed to bind UI host listener on {}", address))?;
        let (tx, rx) = watch::channel(None);
        Ok((
            Self {
                listener,
                current: Arc::new(tx),
            },
            UiLinkSink { current: rx },
        ))
    }

    /// Like `bind`, but a listener that cannot be bound (port taken, bad
    /// address) leaves the server running without a UI host: every question
    /// goes straight to the native dialog fallback.
    pub async fn bind_or_offline(address: &str) -> (Option<Self>, Arc<dyn OutOfBandSink>) {
        match Self::bind(address).await {
            Ok((link, sink)) => (Some(link), Arc::new(sink)),
            Err(e) => {
                warn!(
                    address = %address,
                    error = %format!("{:#}", e),
                    "UI host listener unavailable, continuing without it"
                );
                (None, Arc::new(DisconnectedSink))
            }
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("UI host listener has no local address")
    }

    /// Accept UI host connections until the task is dropped or aborted.
    pub async fn serve(self, broker: CorrelationBroker) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    info!(peer = %peer, "UI host connected");
                    tokio::spawn(handle_connection(
                        stream,
                        peer,
                        broker.clone(),
                        self.current.clone(),
                    ));
                }
                Err(e) => {
                    warn!(error = %e, "Accepting UI host connection failed");
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    broker: CorrelationBroker,
    current: Arc<watch::Sender<Outbox>>,
) {
    let (tx, mut outbox) = mpsc::unbounded_channel::<String>();
    current.send_replace(Some(tx.clone()));

    let (mut sink, mut lines) =
        Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_BYTES)).split();

    loop {
        tokio::select! {
            out = outbox.recv() => match out {
                Some(line) => {
                    if let Err(e) = sink.send(line).await {
                        warn!(peer = %peer, error = %e, "Writing to UI host failed");
                        break;
                    }
                }
                None => break,
            },
            inbound = lines.next() => match inbound {
                Some(Ok(line)) if line.trim().is_empty() => {}
                Some(Ok(line)) => match Inbound::parse(&line) {
                    Ok(message) => {
                        let settled = message.clone().apply(&broker);
                        debug!(peer = %peer, message = ?message, settled, "UI host answer");
                    }
                    Err(e) => warn!(peer = %peer, error = %e, "Ignoring UI host line"),
                },
                Some(Err(e)) => {
                    warn!(peer = %peer, error = %e, "Reading from UI host failed");
                    break;
                }
                None => break,
            },
        }
    }

    // Only clear the slot if a newer connection has not taken it
    current.send_if_modified(|slot| match slot {
        Some(active) if active.same_channel(&tx) => {
            *slot = None;
            true
        }
        _ => false,
    });
    info!(peer = %peer, "UI host disconnected");
}
