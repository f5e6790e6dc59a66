// Running dialog helper processes

use crate::errors::ParleyError;
use std::process::{Output, Stdio};
use tokio::process::Command;

/// A program invocation built by a back-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DialogCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl DialogCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Run to completion and capture output. The child is killed if the
    /// future is dropped (e.g. the fallback deadline passes).
    pub async fn output(&self) -> std::io::Result<Output> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
    }

    /// Start without waiting; for notifications.
    pub fn spawn_detached(&self) -> Result<(), ParleyError> {
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|e| ParleyError::fallback(format!("failed to spawn {}: {}", self.program, e)))
    }
}

pub(crate) fn stdout_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}

pub(crate) fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}
