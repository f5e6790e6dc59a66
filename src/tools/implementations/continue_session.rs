// ContinueSession tool - ask whether the agent should keep going
//
// The agent calls this at the end of each unit of work. The answer comes
// back in the PARLEY_CONTINUE text format (see session::decision) so the
// agent can tell "stop", "keep going" and "keep going, and do this" apart.

use crate::dialog::{DialogKind, DialogRequest, InputPrompt, InputResolver, Resolution};
use crate::session::{ContinueAnswer, ContinueDecision};
use crate::tools::registry::Tool;
use crate::tools::types::{ToolContext, ToolInputSchema};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

const DIALOG_HINT: &str =
    "Type a new instruction to continue, leave empty to just continue, or cancel to end the session.";

#[derive(Debug, Deserialize)]
struct ContinueInput {
    #[serde(default)]
    reason: String,
}

pub struct ContinueSessionTool {
    resolver: Arc<InputResolver>,
}

impl ContinueSessionTool {
    pub fn new(resolver: Arc<InputResolver>) -> Self {
        Self { resolver }
    }
}

/// Map the outcome of the prompt onto a decision. Anything but an answer ends.
fn decide(resolution: Resolution) -> ContinueDecision {
    match resolution {
        Resolution::Answered { value, .. } => {
            ContinueDecision::from_answer(ContinueAnswer::from_value(&value))
        }
        Resolution::Cancelled | Resolution::Defaulted { .. } => ContinueDecision::end(),
    }
}

#[async_trait]
impl Tool for ContinueSessionTool {
    fn name(&self) -> &str {
        "continue-session"
    }

    fn description(&self) -> &str {
        "Ask the user whether to continue after finishing a step. The result contains \
         'PARLEY_CONTINUE: true|false' and, optionally, a new instruction between \
         <<<INSTRUCTION and INSTRUCTION>>>. Stop when it is false."
    }

    fn input_schema(&self) -> ToolInputSchema {
        ToolInputSchema::simple(vec![("reason", "Summary of what was just done")])
    }

    async fn execute(&self, input: Value, context: &ToolContext<'_>) -> Result<String> {
        let input: ContinueInput =
            serde_json::from_value(input).context("continue-session: expected {\"reason\": string}")?;

        let body = if input.reason.trim().is_empty() {
            DIALOG_HINT.to_string()
        } else {
            format!("{}\n\n{}", input.reason, DIALOG_HINT)
        };
        let mut dialog = DialogRequest::new(self.resolver.title(), body, DialogKind::Text);
        dialog.allow_attachment = true;

        let prompt = InputPrompt {
            command: self.name().to_string(),
            payload: json!({ "reason": input.reason, "allowAttachment": true }),
            dialog,
            origin: context.origin.map(String::from),
        };

        let decision = decide(self.resolver.collect(prompt).await);
        info!(
            should_continue = decision.should_continue,
            has_instruction = decision.instruction.is_some(),
            "Continue decision"
        );
        Ok(decision.render())
    }
}
