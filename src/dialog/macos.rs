// macOS dialogs via osascript

use super::process::{stderr_text, stdout_text, DialogCommand};
use super::{DialogAnswer, DialogBackend, DialogKind, DialogRequest};
use crate::errors::ParleyError;
use async_trait::async_trait;

pub struct MacDialog;

/// Quote a string as an AppleScript literal.
fn applescript_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn script_for(request: &DialogRequest) -> String {
    let title = applescript_string(&request.title);
    let body = applescript_string(&request.body);
    match request.kind {
        DialogKind::Text => {
            let default = applescript_string(request.default_text.as_deref().unwrap_or(""));
            format!(
                "text returned of (display dialog {body} default answer {default} with title {title} \
                 buttons {{\"Cancel\", \"OK\"}} default button \"OK\")"
            )
        }
        DialogKind::Confirm => format!(
            "button returned of (display dialog {body} with title {title} \
             buttons {{\"No\", \"Yes\"}} default button \"Yes\")"
        ),
        DialogKind::Notice => format!(
            "button returned of (display dialog {body} with title {title} \
             buttons {{\"OK\"}} default button \"OK\")"
        ),
    }
}

fn interpret(kind: DialogKind, status_ok: bool, stdout: String, stderr: &str) -> Result<DialogAnswer, ParleyError> {
    if !status_ok {
        // -128 is "User canceled."
        if stderr.contains("-128") {
            return Ok(DialogAnswer::Dismissed);
        }
        return Err(ParleyError::fallback(format!("osascript failed: {}", stderr)));
    }
    Ok(match kind {
        DialogKind::Text => DialogAnswer::Text(stdout),
        DialogKind::Confirm => DialogAnswer::Confirmed(stdout.trim() == "Yes"),
        DialogKind::Notice => DialogAnswer::Acknowledged,
    })
}

#[async_trait]
impl DialogBackend for MacDialog {
    fn name(&self) -> &str {
        "macos"
    }

    async fn show(&self, request: &DialogRequest) -> Result<DialogAnswer, ParleyError> {
        let output = DialogCommand::new("osascript")
            .arg("-e")
            .arg(script_for(request))
            .output()
            .await
            .map_err(|e| ParleyError::fallback(format!("failed to run osascript: {}", e)))?;

        interpret(
            request.kind,
            output.status.success(),
            stdout_text(&output),
            &stderr_text(&output),
        )
    }

    fn notify(&self, title: &str, body: &str) -> Result<(), ParleyError> {
        let script = format!(
            "display notification {} with title {}",
            applescript_string(body),
            applescript_string(title)
        );
        DialogCommand::new("osascript")
            .arg("-e")
            .arg(script)
            .spawn_detached()
    }
}
