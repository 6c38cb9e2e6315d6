//! Events a research run emits while it works.
//!
//! The gateway forwards these to the browser as SSE frames:
//! - `chunk`     : a piece of user-visible text
//! - `tool_call` : a tool finished, with its arguments and full result
//! - `done`      : the run finished, with accumulated usage
//! - `error`     : the run failed

use chrono::{SecondsFormat, Utc};
use quranlens_core::provider::Usage;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Chunk { content: String },

    ToolCall { data: ToolCallRecord },

    /// `full_response` is every chunk of the run, concatenated.
    Done { usage: Usage, full_response: String },

    Error { error: String },
}

impl AgentEvent {
    /// `done` and `error` end a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

/// One executed tool call as reported to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool: String,
    pub arguments: Value,
    /// The full result, or `{"error": …}` when the tool failed
    pub result: Value,
    /// RFC 3339
    pub timestamp: String,
}

impl ToolCallRecord {
    pub fn new(tool: impl Into<String>, arguments: Value, result: Value) -> Self {
        Self {
            tool: tool.into(),
            arguments,
            result,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}
