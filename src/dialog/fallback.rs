// InputResolver - asks the UI host first, a native dialog second, and
// settles on a conservative default if both fail
//
//   Primary  --ok-->  Done
//      |
//    fail (unavailable / timed out)
//      v
//   Fallback --ok-->  Done
//      |
//    fail
//      v
//   Default (false / empty)

use super::{DialogBackend, DialogRequest};
use crate::broker::{CorrelationBroker, Settlement};
use crate::errors::ParleyError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Where an answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSource {
    Collaborator,
    NativeDialog,
}

/// Final outcome of collecting one answer. Never an error: the worst case
/// is `Defaulted`.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Answered { value: Value, source: AnswerSource },
    Cancelled,
    Defaulted { reason: String },
}

/// Everything needed to ask one question either way.
#[derive(Debug, Clone)]
pub struct InputPrompt {
    /// UI command the collaborator should run
    pub command: String,
    /// Payload sent after the correlation id
    pub payload: Value,
    /// The same question for the native dialog
    pub dialog: DialogRequest,
    /// Key of the RPC call asking, for cancellation
    pub origin: Option<String>,
}

/// How a fire-and-forget notification was delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Collaborator,
    NativeNotification,
    Dropped,
}

enum Stage {
    Primary,
    Fallback { cause: ParleyError },
    Default { reason: String },
}

pub struct InputResolver {
    broker: CorrelationBroker,
    dialogs: Option<Arc<dyn DialogBackend>>,
    dialog_timeout: Duration,
    title: String,
}

impl InputResolver {
    pub fn new(
        broker: CorrelationBroker,
        dialogs: Option<Arc<dyn DialogBackend>>,
        dialog_timeout: Duration,
        title: impl Into<String>,
    ) -> Self {
        Self {
            broker,
            dialogs,
            dialog_timeout,
            title: title.into(),
        }
    }

    pub fn broker(&self) -> &CorrelationBroker {
        &self.broker
    }

    /// Title for native dialogs
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Collect one answer.
    pub async fn collect(&self, prompt: InputPrompt) -> Resolution {
        let mut stage = Stage::Primary;
        loop {
            stage = match stage {
                Stage::Primary => match self.primary(&prompt).await {
                    Ok(resolution) => return resolution,
                    Err(cause) => Stage::Fallback { cause },
                },
                Stage::Fallback { cause } => {
                    warn!(command = %prompt.command, error = %cause, "Falling back to native dialog");
                    match self.fallback(&prompt.dialog).await {
                        Ok(value) => {
                            return Resolution::Answered {
                                value,
                                source: AnswerSource::NativeDialog,
                            }
                        }
                        Err(e) => Stage::Default {
                            reason: e.to_string(),
                        },
                    }
                }
                Stage::Default { reason } => {
                    warn!(command = %prompt.command, reason = %reason, "Using conservative default");
                    return Resolution::Defaulted { reason };
                }
            };
        }
    }

    async fn primary(&self, prompt: &InputPrompt) -> Result<Resolution, ParleyError> {
        let ticket = self.broker.request(
            &prompt.command,
            prompt.payload.clone(),
            prompt.origin.clone(),
        )?;
        let request_id = ticket.request_id().to_string();

        match ticket.wait().await {
            Settlement::Fulfilled(value) => Ok(Resolution::Answered {
                value,
                source: AnswerSource::Collaborator,
            }),
            Settlement::Cancelled => {
                info!(request_id = %request_id, "Request cancelled");
                Ok(Resolution::Cancelled)
            }
            // Shutting down: no dialogs now
            Settlement::Flushed => Ok(Resolution::Defaulted {
                reason: "server shutting down".to_string(),
            }),
            Settlement::TimedOut => Err(ParleyError::Timeout {
                request_id,
                timeout_secs: self.broker.timeout().as_secs(),
            }),
        }
    }

    async fn fallback(&self, request: &DialogRequest) -> Result<Value, ParleyError> {
        let backend = self
            .dialogs
            .as_ref()
            .ok_or_else(|| ParleyError::fallback("no native dialog available"))?;

        match tokio::time::timeout(self.dialog_timeout, backend.show(request)).await {
            Ok(Ok(answer)) => {
                info!(backend = backend.name(), "Native dialog answered");
                Ok(answer.into_value())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ParleyError::fallback(format!(
                "{} dialog not answered within {}s",
                backend.name(),
                self.dialog_timeout.as_secs()
            ))),
        }
    }

    /// Fire-and-forget notification: UI host if connected, else a desktop
    /// notification, else dropped with a log line.
    pub fn notify(&self, command: &str, payload: Value, body: &str) -> NotifyOutcome {
        if self.broker.notify(command, payload).is_ok() {
            return NotifyOutcome::Collaborator;
        }
        if let Some(backend) = &self.dialogs {
            match backend.notify(&self.title, body) {
                Ok(()) => return NotifyOutcome::NativeNotification,
                Err(e) => warn!(error = %e, "Desktop notification failed"),
            }
        }
        NotifyOutcome::Dropped
    }
}
