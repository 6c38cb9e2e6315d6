//! Shared test helpers for agent tests.

use async_trait::async_trait;
use quranlens_core::error::{CompletionError, ToolError};
use quranlens_core::message::{Message, MessageToolCall};
use quranlens_core::provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
use quranlens_core::tool::{ToolExecutor, ToolOutput};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::Notify;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request. Panics if more calls are made than responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<Result<ProviderResponse, CompletionError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self::scripted(responses.into_iter().map(Ok).collect())
    }

    pub fn scripted(responses: Vec<Result<ProviderResponse, CompletionError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(vec![]),
        }
    }

    /// A provider that answers once with plain text.
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, CompletionError> {
        let mut requests = self.requests.lock().unwrap();
        let responses = self.responses.lock().unwrap();
        let call = requests.len();
        let response = responses.get(call).cloned().unwrap_or_else(|| {
            panic!(
                "SequentialMockProvider: no more responses (call #{call}, have {})",
                responses.len()
            )
        });
        requests.push(request);
        response
    }
}

/// A provider whose completions never finish.
pub struct PendingProvider;

#[async_trait]
impl Provider for PendingProvider {
    fn name(&self) -> &str {
        "pending"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, CompletionError> {
        std::future::pending().await
    }
}

pub fn usage(prompt_tokens: u32, completion_tokens: u32) -> Usage {
    Usage {
        prompt_tokens,
        completion_tokens,
        total_tokens: prompt_tokens + completion_tokens,
    }
}

/// A plain text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        finish_reason: Some("stop".into()),
        usage: Some(usage(10, 5)),
        model: "mock-model".into(),
    }
}

/// A response requesting tool calls, with optional accompanying text.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_tools(thought, tool_calls),
        finish_reason: Some("tool_calls".into()),
        usage: Some(usage(10, 5)),
        model: "mock-model".into(),
    }
}

/// A tool call with a deterministic id.
pub fn make_tool_call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

/// A tool executor with canned results per tool name.
#[derive(Default)]
pub struct ScriptedTools {
    results: HashMap<String, Result<ToolOutput, ToolError>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedTools {
    pub fn with(mut self, name: &str, result: Result<ToolOutput, ToolError>) -> Self {
        self.results.insert(name.to_string(), result);
        self
    }

    /// `(name, arguments)` of every executed call, in order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutor for ScriptedTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        let mut names: Vec<_> = self.results.keys().cloned().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| ToolDefinition {
                name,
                description: "scripted".into(),
                parameters: serde_json::json!({"type": "object", "properties": {}}),
            })
            .collect()
    }

    async fn execute(&self, name: &str, arguments: &str) -> Result<ToolOutput, ToolError> {
        self.calls
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.to_string()));
        self.results
            .get(name)
            .cloned()
            .unwrap_or_else(|| Err(ToolError::UnknownTool(name.to_string())))
    }
}

/// A tool executor whose calls never finish. `started` fires when one begins.
#[derive(Default)]
pub struct PendingTools {
    pub started: Notify,
}

#[async_trait]
impl ToolExecutor for PendingTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        Vec::new()
    }

    async fn execute(&self, _name: &str, _arguments: &str) -> Result<ToolOutput, ToolError> {
        self.started.notify_one();
        std::future::pending().await
    }
}
