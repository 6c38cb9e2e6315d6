//! Answers for runs where the model never produced one: the iteration
//! budget ran out, or the final turn came back empty.

use crate::prompt::{BUDGET_EXHAUSTED_HEADER, EMPTY_ANSWER, NOTHING_TO_SHOW, tool_label};
use serde_json::Value;

/// The most recent successful tool result of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct LastToolResult {
    pub tool: String,
    /// The payload the model saw
    pub payload: Value,
}

/// Build the budget-exhausted answer. Never empty.
pub fn budget_exhausted_answer(
    last_assistant_text: Option<&str>,
    last_tool_result: Option<&LastToolResult>,
) -> String {
    let body = salvage(last_assistant_text, last_tool_result).unwrap_or_else(|| NOTHING_TO_SHOW.to_string());
    format!("{BUDGET_EXHAUSTED_HEADER}\n\n{body}")
}

/// Build the answer for a final turn that came back empty. Never empty.
pub fn empty_turn_answer(
    last_assistant_text: Option<&str>,
    last_tool_result: Option<&LastToolResult>,
) -> String {
    salvage(last_assistant_text, last_tool_result).unwrap_or_else(|| EMPTY_ANSWER.to_string())
}

/// The last non-empty assistant text, else the last tool result.
fn salvage(last_assistant_text: Option<&str>, last_tool_result: Option<&LastToolResult>) -> Option<String> {
    match (last_assistant_text.map(str::trim), last_tool_result) {
        (Some(text), _) if !text.is_empty() => Some(text.to_string()),
        (_, Some(last)) => Some(format_tool_result(last)),
        _ => None,
    }
}

fn format_tool_result(last: &LastToolResult) -> String {
    let label = tool_label(&last.tool);
    let rendered = match &last.payload {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    };
    format!("{label}:\n{rendered}")
}
