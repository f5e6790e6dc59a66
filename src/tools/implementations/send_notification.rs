// SendNotification tool - tell the user something without waiting

use crate::dialog::{InputResolver, NotifyOutcome};
use crate::tools::registry::Tool;
use crate::tools::types::{ToolContext, ToolInputSchema};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// UI command the collaborator runs for a notification
pub const SHOW_NOTIFICATION_COMMAND: &str = "show-notification";

#[derive(Debug, Deserialize)]
struct NotificationInput {
    message: String,
    #[serde(default)]
    level: Option<String>,
}

pub struct SendNotificationTool {
    resolver: Arc<InputResolver>,
}

impl SendNotificationTool {
    pub fn new(resolver: Arc<InputResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Tool for SendNotificationTool {
    fn name(&self) -> &str {
        "send-notification"
    }

    fn description(&self) -> &str {
        "Show the user a short notification. Does not wait for a response."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::simple(vec![("message", "Notification text")]).with_optional(
            "level",
            json!({
                "type": "string",
                "enum": ["info", "warning", "error"],
                "description": "Severity, defaults to info"
            }),
        )
    }

    async fn execute(&self, input: Value, _context: &ToolContext<'_>) -> Result<String> {
        let input: NotificationInput = serde_json::from_value(input)
            .context("send-notification: expected {\"message\": string}")?;

        if input.message.trim().is_empty() {
            bail!("send-notification: message must not be empty");
        }

        let level = input.level.unwrap_or_else(|| "info".to_string());
        let payload = json!({ "message": input.message, "level": level });

        let outcome = self
            .resolver
            .notify(SHOW_NOTIFICATION_COMMAND, payload, &input.message);
        debug!(outcome = ?outcome, "Notification handled");

        Ok(match outcome {
            NotifyOutcome::Collaborator | NotifyOutcome::NativeNotification => {
                "Notification sent.".to_string()
            }
            NotifyOutcome::Dropped => {
                "Notification could not be delivered: no UI host or desktop notifier available."
                    .to_string()
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{ChannelSink, CorrelationBroker, DisconnectedSink};
    use std::time::Duration;

    #[tokio::test]
    async fn test_notification_reaches_collaborator_without_waiter() {
        let (sink, mut rx) = ChannelSink::new();
        let broker = CorrelationBroker::new(Arc::new(sink), Duration::from_secs(30));
        let resolver = Arc::new(InputResolver::new(
            broker.clone(),
            None,
            Duration::from_secs(30),
            "Parley",
        ));
        let tool = SendNotificationTool::new(resolver);

        let out = tool
            .execute(json!({"message": "Build finished"}), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(out, "Notification sent.");
        assert_eq!(broker.pending_count(), 0);

        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.method, "notify");
        assert_eq!(msg.params.command, SHOW_NOTIFICATION_COMMAND);
        assert_eq!(msg.payload().unwrap()["level"], "info");
    }

    #[tokio::test]
    async fn test_dropped_notification_is_reported() {
        let broker = CorrelationBroker::new(Arc::new(DisconnectedSink), Duration::from_secs(30));
        let resolver = Arc::new(InputResolver::new(broker, None, Duration::from_secs(30), "Parley"));
        let tool = SendNotificationTool::new(resolver);

        let out = tool
            .execute(json!({"message": "hello", "level": "warning"}), &ToolContext::default())
            .await
            .unwrap();
        assert!(out.starts_with("Notification could not be delivered"));
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let broker = CorrelationBroker::new(Arc::new(DisconnectedSink), Duration::from_secs(30));
        let resolver = Arc::new(InputResolver::new(broker, None, Duration::from_secs(30), "Parley"));
        let tool = SendNotificationTool::new(resolver);
        assert!(tool
            .execute(json!({"message": "  "}), &ToolContext::default())
            .await
            .is_err());
    }
}
