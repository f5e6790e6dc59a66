// Native dialog fallback
//
// When the UI host cannot answer (not connected, or the waiter timed out)
// the question is asked through a short-lived OS-native dialog process
// instead, so the tool call still completes.
//
// Back-ends:
// - macOS: osascript (`display dialog`)
// - Linux/BSD: zenity, then kdialog
// - Windows: PowerShell (WinForms / VisualBasic InputBox), answer written
//   to a scratch file
//
// None of the back-ends can collect attachments; `allow_attachment` is
// honoured only by the UI host.

pub mod fallback;
mod linux;
mod macos;
pub mod platform;
mod process;
mod windows;

pub use fallback::{AnswerSource, InputPrompt, InputResolver, NotifyOutcome, Resolution};
pub use linux::LinuxDialog;
pub use macos::MacDialog;
pub use platform::{backend_for, Platform};
pub use windows::WindowsDialog;

use crate::errors::ParleyError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What kind of answer the dialog collects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DialogKind {
    /// Free-text entry
    Text,
    /// Yes/no question
    Confirm,
    /// Acknowledge-only notice
    Notice,
}

/// A single question to put in front of the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogRequest {
    pub title: String,
    pub body: String,
    pub kind: DialogKind,
    #[serde(default)]
    pub allow_attachment: bool,
    /// Pre-filled text for `DialogKind::Text`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_text: Option<String>,
}

impl DialogRequest {
    pub fn new(title: impl Into<String>, body: impl Into<String>, kind: DialogKind) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            kind,
            allow_attachment: false,
            default_text: None,
        }
    }
}

/// What the user did with a native dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogAnswer {
    Text(String),
    Confirmed(bool),
    Acknowledged,
    /// Closed or cancelled without answering
    Dismissed,
}

impl DialogAnswer {
    /// Same value shape the UI host answers with, so handlers map one shape.
    /// A dismissed dialog is `null`.
    pub fn into_value(self) -> Value {
        match self {
            DialogAnswer::Text(text) => Value::String(text),
            DialogAnswer::Confirmed(yes) => Value::Bool(yes),
            DialogAnswer::Acknowledged => Value::Bool(true),
            DialogAnswer::Dismissed => Value::Null,
        }
    }
}

/// An OS-native way of asking the user something.
#[async_trait]
pub trait DialogBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Show the dialog and wait for the user.
    async fn show(&self, request: &DialogRequest) -> Result<DialogAnswer, ParleyError>;

    /// Pop a desktop notification without waiting for it.
    fn notify(&self, title: &str, body: &str) -> Result<(), ParleyError>;
}
