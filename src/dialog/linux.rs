// Linux / BSD dialogs via zenity, falling back to kdialog

use super::process::{stderr_text, stdout_text, DialogCommand};
use super::{DialogAnswer, DialogBackend, DialogKind, DialogRequest};
use crate::errors::ParleyError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Output;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tool {
    Zenity,
    Kdialog,
}

impl Tool {
    fn program(self) -> &'static str {
        match self {
            Tool::Zenity => "zenity",
            Tool::Kdialog => "kdialog",
        }
    }
}

pub struct LinuxDialog {
    tools: Vec<Tool>,
}

impl LinuxDialog {
    pub fn new() -> Self {
        Self {
            tools: vec![Tool::Zenity, Tool::Kdialog],
        }
    }
}

impl Default for LinuxDialog {
    fn default() -> Self {
        Self::new()
    }
}

fn build_command(tool: Tool, request: &DialogRequest) -> DialogCommand {
    let cmd = DialogCommand::new(tool.program());
    match tool {
        Tool::Zenity => {
            let cmd = match request.kind {
                DialogKind::Text => cmd.arg("--entry"),
                DialogKind::Confirm => cmd.arg("--question"),
                DialogKind::Notice => cmd.arg("--info"),
            };
            let cmd = cmd
                .arg("--title")
                .arg(&request.title)
                .arg("--text")
                .arg(&request.body);
            match (&request.kind, &request.default_text) {
                (DialogKind::Text, Some(text)) => cmd.arg("--entry-text").arg(text),
                _ => cmd,
            }
        }
        Tool::Kdialog => {
            let cmd = cmd.arg("--title").arg(&request.title);
            match request.kind {
                DialogKind::Text => cmd
                    .arg("--inputbox")
                    .arg(&request.body)
                    .arg(request.default_text.clone().unwrap_or_default()),
                DialogKind::Confirm => cmd.arg("--yesno").arg(&request.body),
                DialogKind::Notice => cmd.arg("--msgbox").arg(&request.body),
            }
        }
    }
}

/// Both tools exit 0 for OK/Yes and 1 for Cancel/No/closed.
fn interpret(tool: Tool, kind: DialogKind, output: &Output) -> Result<DialogAnswer, ParleyError> {
    match (output.status.code(), kind) {
        (Some(0), DialogKind::Text) => Ok(DialogAnswer::Text(stdout_text(output))),
        (Some(0), DialogKind::Confirm) => Ok(DialogAnswer::Confirmed(true)),
        (Some(0), DialogKind::Notice) => Ok(DialogAnswer::Acknowledged),
        (Some(1), DialogKind::Confirm) => Ok(DialogAnswer::Confirmed(false)),
        (Some(1), _) => Ok(DialogAnswer::Dismissed),
        (code, _) => Err(ParleyError::fallback(format!(
            "{} exited with {:?}: {}",
            tool.program(),
            code,
            stderr_text(output)
        ))),
    }
}

#[async_trait]
impl DialogBackend for LinuxDialog {
    fn name(&self) -> &str {
        "linux"
    }

    async fn show(&self, request: &DialogRequest) -> Result<DialogAnswer, ParleyError> {
        for tool in &self.tools {
            let command = build_command(*tool, request);
            match command.output().await {
                Ok(output) => return interpret(*tool, request.kind, &output),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::debug!(tool = tool.program(), "Dialog tool not installed");
                    continue;
                }
                Err(e) => {
                    return Err(ParleyError::fallback(format!(
                        "failed to run {}: {}",
                        tool.program(),
                        e
                    )))
                }
            }
        }
        Err(ParleyError::fallback(
            "no dialog tool found (install zenity or kdialog)",
        ))
    }

    fn notify(&self, title: &str, body: &str) -> Result<(), ParleyError> {
        DialogCommand::new("notify-send")
            .arg(title)
            .arg(body)
            .spawn_detached()
    }
}
