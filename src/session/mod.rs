// Continue-loop decisions
//
// Turns the answer to "continue or end this session?" into an explicit
// decision, and renders it in the fixed text format the calling agent
// parses to pick its next action.

pub mod decision;

pub use decision::{ContinueAnswer, ContinueDecision, LoopState, DECISION_MARKER};
