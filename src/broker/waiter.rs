// Pending waiters and the tickets that await them

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

/// How a waiter was settled. Every waiter reaches exactly one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement {
    /// The collaborator answered with this value
    Fulfilled(Value),
    /// The deadline passed first
    TimedOut,
    /// An explicit cancel arrived first
    Cancelled,
    /// The process is shutting down
    Flushed,
}

impl Settlement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Settlement::Fulfilled(_) => "fulfilled",
            Settlement::TimedOut => "timed_out",
            Settlement::Cancelled => "cancelled",
            Settlement::Flushed => "flushed",
        }
    }
}

/// An outstanding request, owned by the broker's table.
pub(crate) struct PendingWaiter {
    pub request_id: String,
    pub command: String,
    /// Key of the RPC call that created this waiter, for cancellation
    pub origin: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started: Instant,
    pub tx: oneshot::Sender<Settlement>,
    pub timer: Option<AbortHandle>,
}

impl PendingWaiter {
    /// Deliver the outcome. Consumes the waiter, so it can only happen once.
    pub fn settle(self, settlement: Settlement) {
        if let Some(timer) = &self.timer {
            timer.abort();
        }

        tracing::debug!(
            request_id = %self.request_id,
            command = %self.command,
            outcome = settlement.as_str(),
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Waiter settled"
        );

        // The ticket may have been dropped; nothing is waiting then.
        let _ = self.tx.send(settlement);
    }

    pub fn info(&self) -> WaiterInfo {
        WaiterInfo {
            request_id: self.request_id.clone(),
            command: self.command.clone(),
            origin: self.origin.clone(),
            created_at: self.created_at,
            age_secs: self.started.elapsed().as_secs(),
        }
    }
}

/// Serializable view of a pending waiter.
#[derive(Debug, Clone, Serialize)]
pub struct WaiterInfo {
    pub request_id: String,
    pub command: String,
    pub origin: Option<String>,
    pub created_at: DateTime<Utc>,
    pub age_secs: u64,
}

/// The suspension point handed back by `CorrelationBroker::request`.
#[derive(Debug)]
pub struct Ticket {
    request_id: String,
    rx: oneshot::Receiver<Settlement>,
}

impl Ticket {
    pub(crate) fn new(request_id: String, rx: oneshot::Receiver<Settlement>) -> Self {
        Self { request_id, rx }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Suspend until the waiter is settled.
    pub async fn wait(self) -> Settlement {
        // A dropped sender means the broker itself went away.
        self.rx.await.unwrap_or(Settlement::Flushed)
    }
}
