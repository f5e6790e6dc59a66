// Continue decision state machine and its text contract
//
// Text format (stable; agents parse it):
//
//   <one human-readable line>
//   PARLEY_CONTINUE: true|false
//   <<<INSTRUCTION
//   ...instruction, verbatim, may span lines...
//   INSTRUCTION>>>
//   <<<ATTACHMENTS
//   ...one attachment per line...
//   ATTACHMENTS>>>
//
// The instruction and attachment blocks are present only when non-empty.
// Inside a block, a line that would read as a sentinel or as the marker
// line is written with one extra leading backslash, removed again by
// `parse`, so block content can never close its block early.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Marker token that starts the machine-readable line.
pub const DECISION_MARKER: &str = "PARLEY_CONTINUE";

const INSTRUCTION_OPEN: &str = "<<<INSTRUCTION";
const INSTRUCTION_CLOSE: &str = "INSTRUCTION>>>";
const ATTACHMENTS_OPEN: &str = "<<<ATTACHMENTS";
const ATTACHMENTS_CLOSE: &str = "ATTACHMENTS>>>";

/// Does this block line need escaping? Leading backslashes are ignored so
/// the escape itself round-trips.
fn looks_structural(line: &str) -> bool {
    let bare = line.trim_end_matches('\r').trim_start_matches('\\');
    [INSTRUCTION_OPEN, INSTRUCTION_CLOSE, ATTACHMENTS_OPEN, ATTACHMENTS_CLOSE].contains(&bare)
        || bare.starts_with(DECISION_MARKER)
}

fn escape_block(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            if looks_structural(line) {
                format!("\\{}", line)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn unescape_line(line: &str) -> &str {
    match line.strip_prefix('\\') {
        Some(rest) if looks_structural(line) => rest,
        _ => line,
    }
}

/// States of one continue/end prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    AwaitingDecision,
    ContinueWithInstruction(String),
    ContinueIdle,
    End,
}

impl LoopState {
    /// Apply the user's answer. Only `AwaitingDecision` moves; the other
    /// states are terminal.
    pub fn decide(self, answer: &ContinueAnswer) -> LoopState {
        if self != LoopState::AwaitingDecision {
            return self;
        }
        if !answer.proceed {
            return LoopState::End;
        }
        match answer.instruction.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => LoopState::ContinueWithInstruction(text.to_string()),
            _ => LoopState::ContinueIdle,
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self != LoopState::AwaitingDecision
    }
}

/// The answer to a continue prompt, normalised from whatever the UI host
/// or native dialog sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContinueAnswer {
    pub proceed: bool,
    pub instruction: Option<String>,
    pub attachments: Vec<String>,
}

impl ContinueAnswer {
    pub fn declined() -> Self {
        Self::default()
    }

    /// Accepted shapes:
    /// - `null` (dismissed) → declined
    /// - `true` / `false`
    /// - `"text"` → continue with that instruction (empty → idle)
    /// - `{"continue": bool, "instruction": "...", "attachments": [...]}`;
    ///   a missing `continue` means true
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Bool(proceed) => Self {
                proceed: *proceed,
                ..Self::default()
            },
            Value::String(text) => Self {
                proceed: true,
                instruction: Some(text.clone()),
                attachments: Vec::new(),
            },
            Value::Object(map) => Self {
                proceed: map.get("continue").and_then(Value::as_bool).unwrap_or(true),
                instruction: map
                    .get("instruction")
                    .or_else(|| map.get("text"))
                    .and_then(Value::as_str)
                    .map(String::from),
                attachments: map
                    .get("attachments")
                    .and_then(Value::as_array)
                    .map(|items| items.iter().filter_map(attachment_name).collect())
                    .unwrap_or_default(),
            },
            _ => Self::declined(),
        }
    }
}

/// Attachments arrive as plain strings or `{ "path": ... }` objects.
fn attachment_name(item: &Value) -> Option<String> {
    let name = match item {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("path")
            .or_else(|| map.get("name"))
            .and_then(Value::as_str)?
            .to_string(),
        _ => return None,
    };
    // One attachment per line in the rendered text
    if name.trim().is_empty() || name.contains(['\n', '\r']) {
        return None;
    }
    Some(name)
}

/// Derived result of the continue prompt. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinueDecision {
    pub should_continue: bool,
    pub instruction: Option<String>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

impl ContinueDecision {
    pub fn from_answer(answer: ContinueAnswer) -> Self {
        let state = LoopState::AwaitingDecision.decide(&answer);
        match state {
            LoopState::ContinueWithInstruction(instruction) => Self {
                should_continue: true,
                instruction: Some(instruction),
                attachments: answer.attachments,
            },
            LoopState::ContinueIdle => Self {
                should_continue: true,
                instruction: None,
                attachments: answer.attachments,
            },
            LoopState::End | LoopState::AwaitingDecision => Self::end(),
        }
    }

    /// Conservative default: stop.
    pub fn end() -> Self {
        Self {
            should_continue: false,
            instruction: None,
            attachments: Vec::new(),
        }
    }

    pub fn state(&self) -> LoopState {
        match (self.should_continue, &self.instruction) {
            (false, _) => LoopState::End,
            (true, Some(instruction)) => LoopState::ContinueWithInstruction(instruction.clone()),
            (true, None) => LoopState::ContinueIdle,
        }
    }

    pub fn render(&self) -> String {
        let summary = match self.state() {
            LoopState::End => "The user ended the session. Stop here.",
            LoopState::ContinueWithInstruction(_) => {
                "The user wants to continue with a new instruction. Carry it out, then call continue-session again."
            }
            _ => "The user wants to continue. Call continue-session again when this step is done.",
        };

        let mut text = format!("{}\n{}: {}", summary, DECISION_MARKER, self.should_continue);

        if let Some(instruction) = &self.instruction {
            text.push_str(&format!(
                "\n{}\n{}\n{}",
                INSTRUCTION_OPEN,
                escape_block(instruction),
                INSTRUCTION_CLOSE
            ));
        }
        if !self.attachments.is_empty() {
            text.push_str(&format!(
                "\n{}\n{}\n{}",
                ATTACHMENTS_OPEN,
                escape_block(&self.attachments.join("\n")),
                ATTACHMENTS_CLOSE
            ));
        }
        text
    }

    /// Read a decision back out of rendered text. Returns `None` if the
    /// marker line is missing or malformed.
    pub fn parse(text: &str) -> Option<Self> {
        let marker = format!("{}:", DECISION_MARKER);
        let mut should_continue = None;
        let mut instruction: Option<Vec<&str>> = None;
        let mut attachments: Option<Vec<&str>> = None;

        #[derive(Clone, Copy)]
        enum Block {
            None,
            Instruction,
            Attachments,
        }
        let mut block = Block::None;

        for line in text.lines() {
            match block {
                Block::Instruction if line == INSTRUCTION_CLOSE => block = Block::None,
                Block::Instruction => instruction
                    .get_or_insert_with(Vec::new)
                    .push(unescape_line(line)),
                Block::Attachments if line == ATTACHMENTS_CLOSE => block = Block::None,
                Block::Attachments => attachments
                    .get_or_insert_with(Vec::new)
                    .push(unescape_line(line)),
                Block::None if line == INSTRUCTION_OPEN => {
                    instruction = Some(Vec::new());
                    block = Block::Instruction;
                }
                Block::None if line == ATTACHMENTS_OPEN => {
                    attachments = Some(Vec::new());
                    block = Block::Attachments;
                }
                Block::None => {
                    if let Some(rest) = line.strip_prefix(&marker) {
                        // A second marker line is ambiguous
                        if should_continue.is_some() {
                            return None;
                        }
                        should_continue = match rest.trim() {
                            "true" => Some(true),
                            "false" => Some(false),
                            _ => return None,
                        };
                    }
                }
            }
        }

        Some(Self {
            should_continue: should_continue?,
            instruction: instruction.map(|lines| lines.join("\n")),
            attachments: attachments
                .map(|lines| lines.into_iter().map(String::from).collect())
                .unwrap_or_default(),
        })
    }
}
