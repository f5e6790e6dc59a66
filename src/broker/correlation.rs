// CorrelationBroker - the pending-waiter table and its entry points

use super::sink::{OutOfBandMessage, OutOfBandSink};
use super::timeout::TimeoutSupervisor;
use super::waiter::{PendingWaiter, Settlement, Ticket, WaiterInfo};
use crate::errors::ParleyError;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

struct BrokerInner {
    /// request id -> waiter. Removal is the single settlement point.
    pending: DashMap<String, PendingWaiter>,
    sink: Arc<dyn OutOfBandSink>,
    supervisor: TimeoutSupervisor,
    /// Random per process, so answers meant for an earlier run never match
    id_prefix: String,
    next_id: AtomicU64,
    /// Set by the shutdown flush; later requests settle as flushed at once
    closed: AtomicBool,
}

impl BrokerInner {
    /// Remove and settle. Whoever removes the entry wins; everyone else
    /// gets `false`.
    fn settle(&self, request_id: &str, settlement: Settlement) -> bool {
        match self.pending.remove(request_id) {
            Some((_, waiter)) => {
                waiter.settle(settlement);
                true
            }
            None => false,
        }
    }
}

/// Thread-safe handle to the broker. Cloning shares the same table.
#[derive(Clone)]
pub struct CorrelationBroker {
    inner: Arc<BrokerInner>,
}

impl CorrelationBroker {
    pub fn new(sink: Arc<dyn OutOfBandSink>, timeout: Duration) -> Self {
        let prefix = Uuid::new_v4().simple().to_string();
        Self {
            inner: Arc::new(BrokerInner {
                pending: DashMap::new(),
                sink,
                supervisor: TimeoutSupervisor::new(timeout),
                id_prefix: prefix[..8].to_string(),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Deadline applied to every new waiter
    pub fn timeout(&self) -> Duration {
        self.inner.supervisor.deadline()
    }

    fn next_request_id(&self) -> String {
        let n = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.inner.id_prefix, n)
    }

    /// Register a waiter, ask the collaborator to run `command`, and return
    /// the ticket to wait on.
    ///
    /// Fails with `CollaboratorUnavailable` when the out-of-band sink cannot
    /// take the message; no waiter is left behind in that case.
    pub fn request(
        &self,
        command: &str,
        payload: Value,
        origin: Option<String>,
    ) -> Result<Ticket, ParleyError> {
        let request_id = self.next_request_id();
        let (tx, rx) = oneshot::channel();

        self.inner.pending.insert(
            request_id.clone(),
            PendingWaiter {
                request_id: request_id.clone(),
                command: command.to_string(),
                origin,
                created_at: Utc::now(),
                started: Instant::now(),
                tx,
                timer: None,
            },
        );

        // Checked after the insert: a flush running concurrently either
        // sees the entry or this load sees the flag.
        if self.inner.closed.load(Ordering::SeqCst) {
            self.inner.settle(&request_id, Settlement::Flushed);
            debug!(request_id = %request_id, command = %command, "Broker closed, request flushed");
            return Ok(Ticket::new(request_id, rx));
        }

        let weak: Weak<BrokerInner> = Arc::downgrade(&self.inner);
        let expired_id = request_id.clone();
        let timer = self.inner.supervisor.arm(move || {
            if let Some(inner) = weak.upgrade() {
                if inner.settle(&expired_id, Settlement::TimedOut) {
                    warn!(request_id = %expired_id, "Waiter timed out");
                }
            }
        });

        match self.inner.pending.get_mut(&request_id) {
            Some(mut waiter) => waiter.timer = Some(timer),
            // Settled between insert and here
            None => timer.abort(),
        }

        let message = OutOfBandMessage::collect_input(command, &request_id, payload);
        if let Err(e) = self.inner.sink.emit(message) {
            if let Some((_, waiter)) = self.inner.pending.remove(&request_id) {
                if let Some(timer) = waiter.timer {
                    timer.abort();
                }
            }
            debug!(request_id = %request_id, error = %e, "Could not emit collect-input");
            return Err(e);
        }

        info!(request_id = %request_id, command = %command, "Waiting for input");
        Ok(Ticket::new(request_id, rx))
    }

    /// Send a fire-and-forget message on the out-of-band stream.
    pub fn notify(&self, command: &str, payload: Value) -> Result<(), ParleyError> {
        self.inner.sink.emit(OutOfBandMessage::notify(command, payload))
    }

    /// Settle `request_id` with `value`.
    ///
    /// Unknown, timed-out or already-settled ids are a silent no-op;
    /// returns whether a waiter was settled.
    pub fn resolve(&self, request_id: &str, value: Value) -> bool {
        let settled = self
            .inner
            .settle(request_id, Settlement::Fulfilled(value));
        if !settled {
            debug!(request_id = %request_id, "resolve for unknown or settled request ignored");
        }
        settled
    }

    /// Settle `request_id` as cancelled. No-op if it is not pending.
    pub fn cancel(&self, request_id: &str) -> bool {
        self.inner.settle(request_id, Settlement::Cancelled)
    }

    /// Cancel every waiter created by the RPC call keyed `origin`.
    pub fn cancel_origin(&self, origin: &str) -> usize {
        // Collect first: settling while iterating would deadlock the shard.
        let ids: Vec<String> = self
            .inner
            .pending
            .iter()
            .filter(|entry| entry.origin.as_deref() == Some(origin))
            .map(|entry| entry.key().clone())
            .collect();

        ids.iter()
            .filter(|id| self.inner.settle(id, Settlement::Cancelled))
            .count()
    }

    /// Settle every pending waiter as flushed and close the broker, so
    /// requests made afterwards are flushed immediately. Called at shutdown.
    pub fn flush_all(&self) -> usize {
        self.inner.closed.store(true, Ordering::SeqCst);
        let ids: Vec<String> = self
            .inner
            .pending
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        let flushed = ids
            .iter()
            .filter(|id| self.inner.settle(id, Settlement::Flushed))
            .count();
        if flushed > 0 {
            info!(count = flushed, "Flushed pending waiters");
        }
        flushed
    }

    /// Whether `flush_all` has run
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    pub fn is_pending(&self, request_id: &str) -> bool {
        self.inner.pending.contains_key(request_id)
    }

    /// Snapshot of outstanding waiters, oldest first.
    pub fn pending(&self) -> Vec<WaiterInfo> {
        let mut waiters: Vec<WaiterInfo> = self
            .inner
            .pending
            .iter()
            .map(|entry| entry.info())
            .collect();
        waiters.sort_by_key(|w| w.created_at);
        waiters
    }
}
