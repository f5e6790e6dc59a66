// Timeout supervisor - bounds the lifetime of every pending waiter
//
// Arming returns an AbortHandle so a settled waiter can disarm its timer.
// Disarming is an optimisation only: the expiry callback goes through the
// same remove-then-settle path as every other outcome, so a late firing
// finds nothing to remove and does nothing.

use std::time::Duration;
use tokio::task::AbortHandle;

#[derive(Debug, Clone, Copy)]
pub struct TimeoutSupervisor {
    deadline: Duration,
}

impl TimeoutSupervisor {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run `on_expire` once the deadline passes, unless aborted first.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn arm<F>(&self, on_expire: F) -> AbortHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let deadline = self.deadline;
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            on_expire();
        })
        .abort_handle()
    }
}
