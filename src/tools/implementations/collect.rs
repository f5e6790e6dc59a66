// Collect tools - ask the user for free text, a yes/no answer, or an
// acknowledgement
//
// One implementation backs `collect-input`, `collect-confirm` and
// `collect-notice`; the dialog kind decides the schema, the UI command and
// how the raw answer is read.

use crate::dialog::{DialogKind, DialogRequest, InputPrompt, InputResolver, Resolution};
use crate::tools::registry::Tool;
use crate::tools::types::{ToolContext, ToolInputSchema};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub const CONFIRMED: &str = "confirmed";
pub const DECLINED: &str = "declined";
pub const ACKNOWLEDGED: &str = "acknowledged";
pub const DISMISSED: &str = "dismissed";
pub const NO_ANSWER: &str = "No answer was received from the user.";
pub const CANCELLED: &str = "The request was cancelled before the user answered.";

#[derive(Debug, Deserialize)]
struct CollectInput {
    /// `prompt` for free text, `message` for confirm/notice; either is accepted
    #[serde(alias = "prompt")]
    message: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    placeholder: Option<String>,
}

pub struct CollectTool {
    kind: DialogKind,
    resolver: Arc<InputResolver>,
}

impl CollectTool {
    pub fn text(resolver: Arc<InputResolver>) -> Self {
        Self {
            kind: DialogKind::Text,
            resolver,
        }
    }

    pub fn confirm(resolver: Arc<InputResolver>) -> Self {
        Self {
            kind: DialogKind::Confirm,
            resolver,
        }
    }

    pub fn notice(resolver: Arc<InputResolver>) -> Self {
        Self {
            kind: DialogKind::Notice,
            resolver,
        }
    }

    /// Turn the outcome into the tool's text result.
    fn render(&self, resolution: Resolution) -> String {
        match resolution {
            Resolution::Answered { value, .. } => match self.kind {
                DialogKind::Text => match answer_text(&value) {
                    Some(text) => text,
                    None => NO_ANSWER.to_string(),
                },
                DialogKind::Confirm => {
                    if is_confirmation(&value) {
                        CONFIRMED.to_string()
                    } else {
                        DECLINED.to_string()
                    }
                }
                DialogKind::Notice => {
                    if value.is_null() || value == Value::Bool(false) {
                        DISMISSED.to_string()
                    } else {
                        ACKNOWLEDGED.to_string()
                    }
                }
            },
            Resolution::Cancelled => CANCELLED.to_string(),
            Resolution::Defaulted { .. } => match self.kind {
                DialogKind::Text => NO_ANSWER.to_string(),
                DialogKind::Confirm => DECLINED.to_string(),
                DialogKind::Notice => DISMISSED.to_string(),
            },
        }
    }
}

/// Free-text answer, verbatim. Accepts a bare string or `{text}`/`{value}`.
fn answer_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Object(map) => map
            .get("text")
            .or_else(|| map.get("value"))
            .and_then(Value::as_str)
            .map(String::from),
        other => Some(other.to_string()),
    }
}

/// Read a yes/no answer. Anything unrecognised counts as no.
fn is_confirmation(value: &Value) -> bool {
    match value {
        Value::Bool(yes) => *yes,
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "yes" | "y" | "true" | "ok" | "confirm" | "confirmed"
        ),
        Value::Object(map) => map
            .get("confirmed")
            .or_else(|| map.get("value"))
            .map(is_confirmation)
            .unwrap_or(false),
        _ => false,
    }
}

#[async_trait]
impl Tool for CollectTool {
    fn name(&self) -> &str {
        match self.kind {
            DialogKind::Text => "collect-input",
            DialogKind::Confirm => "collect-confirm",
            DialogKind::Notice => "collect-notice",
        }
    }

    fn description(&self) -> &str {
        match self.kind {
            DialogKind::Text => {
                "Ask the user a question and wait for a free-text answer. \
                 Returns the answer verbatim."
            }
            DialogKind::Confirm => {
                "Ask the user a yes/no question. Returns 'confirmed' or 'declined'. \
                 No answer counts as declined."
            }
            DialogKind::Notice => {
                "Show the user a message and wait until they acknowledge it. \
                 Returns 'acknowledged' or 'dismissed'."
            }
        }
    }

    fn input_schema(&self) -> ToolInputSchema {
        let title = json!({
            "type": "string",
            "description": "Optional window title"
        });
        match self.kind {
            DialogKind::Text => ToolInputSchema::simple(vec![("prompt", "The question to ask")])
                .with_optional("title", title)
                .with_optional(
                    "placeholder",
                    json!({"type": "string", "description": "Optional pre-filled answer"}),
                ),
            DialogKind::Confirm => {
                ToolInputSchema::simple(vec![("message", "The yes/no question to ask")])
                    .with_optional("title", title)
            }
            DialogKind::Notice => {
                ToolInputSchema::simple(vec![("message", "The message to show")])
                    .with_optional("title", title)
            }
        }
    }

    async fn execute(&self, input: Value, context: &ToolContext<'_>) -> Result<String> {
        let input: CollectInput = serde_json::from_value(input)
            .with_context(|| format!("{}: expected {{\"message\": string}}", self.name()))?;

        if input.message.trim().is_empty() {
            bail!("{}: message must not be empty", self.name());
        }

        let title = input
            .title
            .clone()
            .unwrap_or_else(|| self.resolver.title().to_string());

        let mut dialog = DialogRequest::new(title.clone(), input.message.clone(), self.kind);
        dialog.default_text = input.placeholder.clone();

        let prompt = InputPrompt {
            command: self.name().to_string(),
            payload: json!({
                "kind": self.kind,
                "title": title,
                "message": input.message,
                "placeholder": input.placeholder,
            }),
            dialog,
            origin: context.origin.map(String::from),
        };

        let resolution = self.resolver.collect(prompt).await;
        Ok(self.render(resolution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{CorrelationBroker, DisconnectedSink};
    use crate::dialog::AnswerSource;
    use std::time::Duration;

    fn offline(kind: fn(Arc<InputResolver>) -> CollectTool) -> CollectTool {
        let broker = CorrelationBroker::new(Arc::new(DisconnectedSink), Duration::from_secs(1));
        kind(Arc::new(InputResolver::new(
            broker,
            None,
            Duration::from_secs(1),
            "Parley",
        )))
    }

    fn answered(value: Value) -> Resolution {
        Resolution::Answered {
            value,
            source: AnswerSource::Collaborator,
        }
    }

    #[test]
    fn test_tool_names() {
        assert_eq!(offline(CollectTool::text).name(), "collect-input");
        assert_eq!(offline(CollectTool::confirm).name(), "collect-confirm");
        assert_eq!(offline(CollectTool::notice).name(), "collect-notice");
    }

    #[test]
    fn test_text_answer_is_verbatim() {
        let tool = offline(CollectTool::text);
        assert_eq!(tool.render(answered(json!("  spaced out  "))), "  spaced out  ");
        assert_eq!(tool.render(answered(json!({"text": "from object"}))), "from object");
        assert_eq!(tool.render(answered(Value::Null)), NO_ANSWER);
    }

    #[test]
    fn test_confirm_mapping() {
        let tool = offline(CollectTool::confirm);
        assert_eq!(tool.render(answered(json!(true))), CONFIRMED);
        assert_eq!(tool.render(answered(json!("Yes"))), CONFIRMED);
        assert_eq!(tool.render(answered(json!({"confirmed": true}))), CONFIRMED);
        assert_eq!(tool.render(answered(json!(false))), DECLINED);
        assert_eq!(tool.render(answered(json!("maybe"))), DECLINED);
        assert_eq!(tool.render(answered(Value::Null)), DECLINED);
    }

    #[test]
    fn test_defaults_are_conservative() {
        let reason = || Resolution::Defaulted {
            reason: "no dialog".to_string(),
        };
        assert_eq!(offline(CollectTool::text).render(reason()), NO_ANSWER);
        assert_eq!(offline(CollectTool::confirm).render(reason()), DECLINED);
        assert_eq!(offline(CollectTool::notice).render(reason()), DISMISSED);
        assert_eq!(offline(CollectTool::confirm).render(Resolution::Cancelled), CANCELLED);
    }

    #[tokio::test]
    async fn test_missing_message_is_an_error() {
        let tool = offline(CollectTool::confirm);
        let err = tool
            .execute(json!({"title": "x"}), &ToolContext::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("collect-confirm"));
    }

    #[tokio::test]
    async fn test_prompt_alias_accepted_and_offline_defaults() {
        let tool = offline(CollectTool::text);
        let out = tool
            .execute(json!({"prompt": "Your name?"}), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(out, NO_ANSWER);
    }
}
