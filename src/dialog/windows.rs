// Windows dialogs via PowerShell
//
// PowerShell's stdout encoding is unreliable across code pages, so the
// script writes the answer to a scratch file which is read back as UTF-8.
// The scratch file is deleted when `show` returns, on every path.

use super::process::{stderr_text, DialogCommand};
use super::{DialogAnswer, DialogBackend, DialogKind, DialogRequest};
use crate::errors::ParleyError;
use async_trait::async_trait;
use std::path::Path;

pub struct WindowsDialog;

const TEXT_OK_PREFIX: &str = "OK:";

/// Quote a string as a single-quoted PowerShell literal.
fn ps_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn script_for(request: &DialogRequest, answer_path: &Path) -> String {
    let title = ps_string(&request.title);
    let body = ps_string(&request.body);
    let out = ps_string(&answer_path.display().to_string());
    let ask = match request.kind {
        DialogKind::Text => {
            let default = ps_string(request.default_text.as_deref().unwrap_or(""));
            format!(
                "Add-Type -AssemblyName System.Windows.Forms; \
                 $f = New-Object System.Windows.Forms.Form; $f.Text = {title}; \
                 $f.Width = 420; $f.Height = 180; $f.TopMost = $true; \
                 $f.FormBorderStyle = 'FixedDialog'; $f.StartPosition = 'CenterScreen'; \
                 $l = New-Object System.Windows.Forms.Label; $l.Text = {body}; \
                 $l.Left = 10; $l.Top = 10; $l.Width = 380; $l.Height = 40; \
                 $t = New-Object System.Windows.Forms.TextBox; $t.Text = {default}; \
                 $t.Left = 10; $t.Top = 55; $t.Width = 380; \
                 $ok = New-Object System.Windows.Forms.Button; $ok.Text = 'OK'; \
                 $ok.Left = 230; $ok.Top = 95; $ok.DialogResult = 'OK'; \
                 $no = New-Object System.Windows.Forms.Button; $no.Text = 'Cancel'; \
                 $no.Left = 315; $no.Top = 95; $no.DialogResult = 'Cancel'; \
                 $f.Controls.AddRange(@($l, $t, $ok, $no)); \
                 $f.AcceptButton = $ok; $f.CancelButton = $no; \
                 if ($f.ShowDialog() -eq 'OK') {{ $answer = 'OK:' + $t.Text }} else {{ $answer = 'CANCEL' }}"
            )
        }
        DialogKind::Confirm => format!(
            "Add-Type -AssemblyName System.Windows.Forms; \
             $answer = [System.Windows.Forms.MessageBox]::Show({body}, {title}, 'YesNo', 'Question')"
        ),
        DialogKind::Notice => format!(
            "Add-Type -AssemblyName System.Windows.Forms; \
             $answer = [System.Windows.Forms.MessageBox]::Show({body}, {title}, 'OK', 'Information')"
        ),
    };
    format!("{ask}; Set-Content -LiteralPath {out} -Value ([string]$answer) -Encoding UTF8 -NoNewline")
}

/// The text form writes `OK:<text>` for OK and `CANCEL` otherwise, so an
/// empty answer submitted with OK stays an empty answer.
fn interpret(kind: DialogKind, raw: &str) -> DialogAnswer {
    let answer = raw.trim_start_matches('\u{feff}').trim_end_matches(['\r', '\n']);
    match kind {
        DialogKind::Text => match answer.strip_prefix(TEXT_OK_PREFIX) {
            Some(text) => DialogAnswer::Text(text.to_string()),
            None => DialogAnswer::Dismissed,
        },
        DialogKind::Confirm => DialogAnswer::Confirmed(answer == "Yes"),
        DialogKind::Notice => DialogAnswer::Acknowledged,
    }
}

#[async_trait]
impl DialogBackend for WindowsDialog {
    fn name(&self) -> &str {
        "windows"
    }

    async fn show(&self, request: &DialogRequest) -> Result<DialogAnswer, ParleyError> {
        let scratch = tempfile::Builder::new()
            .prefix("parley-dialog-")
            .suffix(".txt")
            .tempfile()
            .map_err(|e| ParleyError::fallback(format!("failed to create scratch file: {}", e)))?;

        let output = DialogCommand::new("powershell")
            .arg("-NoProfile")
            .arg("-NonInteractive")
            .arg("-ExecutionPolicy")
            .arg("Bypass")
            .arg("-Command")
            .arg(script_for(request, scratch.path()))
            .output()
            .await
            .map_err(|e| ParleyError::fallback(format!("failed to run powershell: {}", e)))?;

        if !output.status.success() {
            return Err(ParleyError::fallback(format!(
                "powershell dialog failed: {}",
                stderr_text(&output)
            )));
        }

        let raw = tokio::fs::read_to_string(scratch.path())
            .await
            .map_err(|e| ParleyError::fallback(format!("failed to read dialog answer: {}", e)))?;

        Ok(interpret(request.kind, &raw))
    }

    fn notify(&self, title: &str, body: &str) -> Result<(), ParleyError> {
        let script = format!(
            "Add-Type -AssemblyName System.Windows.Forms; \
             $n = New-Object System.Windows.Forms.NotifyIcon; \
             $n.Icon = [System.Drawing.SystemIcons]::Information; $n.Visible = $true; \
             $n.ShowBalloonTip(5000, {}, {}, 'Info'); Start-Sleep -Seconds 6; $n.Dispose()",
            ps_string(title),
            ps_string(body)
        );
        DialogCommand::new("powershell")
            .arg("-NoProfile")
            .arg("-WindowStyle")
            .arg("Hidden")
            .arg("-Command")
            .arg(script)
            .spawn_detached()
    }
}
