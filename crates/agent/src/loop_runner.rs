//! The research loop implementation.

use crate::fallback::{LastToolResult, budget_exhausted_answer, empty_turn_answer};
use crate::prompt;
use crate::stream_event::{AgentEvent, ToolCallRecord};
use quranlens_config::{AgentConfig, OutputTokenLimits};
use quranlens_core::error::CompletionError;
use quranlens_core::message::{Message, MessageToolCall, Role, Transcript};
use quranlens_core::provider::{Provider, ProviderRequest, Usage};
use quranlens_core::tool::ToolExecutor;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Events buffered between a spawned run and its consumer. One, so a slow
/// consumer holds the run back.
const EVENT_BUFFER: usize = 1;

/// Tunables of a research run.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    /// Model used when a run does not name one
    pub default_model: String,
    pub max_iterations: u32,
    pub temperature: f32,
    /// Records of a list result forwarded to the model
    pub max_tool_results: usize,
    pub system_prompt: String,
    pub output_tokens: OutputTokenLimits,
}

impl AgentSettings {
    pub fn from_config(config: &AgentConfig, default_model: impl Into<String>) -> Self {
        Self {
            default_model: default_model.into(),
            max_iterations: config.max_iterations,
            temperature: config.temperature,
            max_tool_results: config.max_tool_results,
            system_prompt: config
                .system_prompt_override
                .clone()
                .unwrap_or_else(|| prompt::SYSTEM_PROMPT.to_string()),
            output_tokens: config.output_tokens.clone(),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default(), "openai/gpt-4o-mini")
    }
}

/// What a run is asked to answer.
#[derive(Debug, Clone, Default)]
pub struct RunInput {
    pub prompt: String,
    /// Overrides [`AgentSettings::default_model`]
    pub model: Option<String>,
    /// Earlier turns; only user and assistant messages are kept
    pub history: Vec<Message>,
}

impl RunInput {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The model produced a final answer.
    Completed { full_response: String, usage: Usage },
    /// The iteration budget ran out; a fallback answer was sent.
    BudgetExhausted { full_response: String, usage: Usage },
    /// A completion call failed; an `error` event was sent.
    Failed(CompletionError),
    /// The consumer went away or the token was cancelled.
    Cancelled,
}

/// The run was cancelled; stop without emitting anything else.
struct Cancelled;

/// Per-run bookkeeping and the event sink.
struct RunState<'a> {
    events: &'a mpsc::Sender<AgentEvent>,
    cancel: &'a CancellationToken,
    full_response: String,
    usage: Usage,
    last_assistant_text: Option<String>,
    last_tool_result: Option<LastToolResult>,
}

impl RunState<'_> {
    async fn emit(&self, event: AgentEvent) -> Result<(), Cancelled> {
        if self.cancel.is_cancelled() {
            return Err(Cancelled);
        }
        if self.events.send(event).await.is_err() {
            debug!("Event consumer dropped, cancelling run");
            self.cancel.cancel();
            return Err(Cancelled);
        }
        Ok(())
    }

    async fn chunk(&mut self, content: impl Into<String>) -> Result<(), Cancelled> {
        let content = content.into();
        self.full_response.push_str(&content);
        self.emit(AgentEvent::Chunk { content }).await
    }

    async fn done(&self) -> Result<(), Cancelled> {
        self.emit(AgentEvent::Done {
            usage: self.usage,
            full_response: self.full_response.clone(),
        })
        .await
    }

    fn check(&self) -> Result<(), Cancelled> {
        if self.cancel.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A tool-calling agent that researches Quran questions.
///
/// Each run alternates model turns and tool executions until the model
/// answers in plain text or the iteration budget is spent.
pub struct ResearchAgent {
    provider: Arc<dyn Provider>,
    tools: Arc<dyn ToolExecutor>,
    settings: AgentSettings,
}

impl ResearchAgent {
    pub fn new(provider: Arc<dyn Provider>, tools: Arc<dyn ToolExecutor>, settings: AgentSettings) -> Self {
        Self {
            provider,
            tools,
            settings,
        }
    }

    /// Start a run on its own task and hand back its event stream.
    ///
    /// Dropping the receiver cancels the run at its next event.
    pub fn run_stream(self: &Arc<Self>, input: RunInput, cancel: CancellationToken) -> mpsc::Receiver<AgentEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let agent = Arc::clone(self);
        tokio::spawn(async move {
            agent.run(input, &tx, &cancel).await;
        });
        rx
    }

    /// Drive one run to completion, sending its events to `events`.
    pub async fn run(
        &self,
        input: RunInput,
        events: &mpsc::Sender<AgentEvent>,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let mut state = RunState {
            events,
            cancel,
            full_response: String::new(),
            usage: Usage::default(),
            last_assistant_text: None,
            last_tool_result: None,
        };

        match self.drive(input, &mut state).await {
            Ok(outcome) => outcome,
            Err(Cancelled) => {
                info!("Research run cancelled");
                RunOutcome::Cancelled
            }
        }
    }

    async fn drive(&self, input: RunInput, state: &mut RunState<'_>) -> Result<RunOutcome, Cancelled> {
        let model = input
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.settings.default_model.clone());
        let max_tokens = self.settings.output_tokens.for_model(&model);

        let mut transcript = Transcript::new(self.settings.system_prompt.clone());
        for message in input.history {
            match message.role {
                Role::User | Role::Assistant => transcript.push(message),
                role => warn!(?role, "Dropping history message with unsupported role"),
            }
        }
        transcript.push(Message::user(input.prompt));

        info!(
            model = %model,
            max_tokens,
            history = transcript.len() - 2,
            "Starting research run"
        );

        let tool_definitions = self.tools.definitions();
        let mut iteration = 0;

        loop {
            iteration += 1;

            if iteration > self.settings.max_iterations {
                warn!(
                    max_iterations = self.settings.max_iterations,
                    "Max iterations reached without a final answer"
                );
                break;
            }

            state.check()?;
            debug!(iteration, messages = transcript.len(), "Research loop iteration");

            let request = ProviderRequest {
                model: model.clone(),
                messages: transcript.messages().to_vec(),
                temperature: self.settings.temperature,
                max_tokens: Some(max_tokens),
                tools: tool_definitions.clone(),
            };

            let result = tokio::select! {
                biased;
                _ = state.cancel.cancelled() => return Err(Cancelled),
                result = self.provider.complete(request) => result,
            };

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    error!(iteration, error = %e, "Completion failed");
                    state.emit(AgentEvent::Error { error: e.to_string() }).await?;
                    return Ok(RunOutcome::Failed(e));
                }
            };

            if let Some(usage) = &response.usage {
                state.usage.accumulate(usage);
            }

            let message = response.message;
            let text = message.content.trim();
            if !text.is_empty() {
                state.last_assistant_text = Some(text.to_string());
            }

            if !message.wants_tools() {
                let answer = message.content.clone();
                transcript.push(message);

                if answer.trim().is_empty() {
                    warn!(iteration, "Model returned an empty final answer");
                    let stand_in = empty_turn_answer(
                        state.last_assistant_text.as_deref(),
                        state.last_tool_result.as_ref(),
                    );
                    state.chunk(stand_in).await?;
                } else {
                    for piece in answer.split_inclusive(char::is_whitespace) {
                        state.chunk(piece).await?;
                    }
                }
                state.done().await?;

                info!(
                    iterations = iteration,
                    total_tokens = state.usage.total_tokens,
                    "Research run complete"
                );
                return Ok(RunOutcome::Completed {
                    full_response: state.full_response.clone(),
                    usage: state.usage,
                });
            }

            debug!(tool_count = message.tool_calls.len(), "Executing tool calls");
            let tool_calls = message.tool_calls.clone();
            transcript.push(message);

            for call in &tool_calls {
                self.execute_tool_call(call, &mut transcript, state).await?;
            }

            // Loop back: the model sees the tool results next turn
        }

        let answer = budget_exhausted_answer(
            state.last_assistant_text.as_deref(),
            state.last_tool_result.as_ref(),
        );
        state.chunk(answer).await?;
        state.done().await?;

        Ok(RunOutcome::BudgetExhausted {
            full_response: state.full_response.clone(),
            usage: state.usage,
        })
    }

    /// Run one tool call and append exactly one tool message for it.
    async fn execute_tool_call(
        &self,
        call: &MessageToolCall,
        transcript: &mut Transcript,
        state: &mut RunState<'_>,
    ) -> Result<(), Cancelled> {
        state.chunk(prompt::tool_started(&call.name)).await?;
        state.check()?;

        let result = tokio::select! {
            biased;
            _ = state.cancel.cancelled() => return Err(Cancelled),
            result = self.tools.execute(&call.name, &call.arguments) => result,
        };

        let arguments: Value = serde_json::from_str(&call.arguments)
            .unwrap_or_else(|_| Value::String(call.arguments.clone()));

        match result {
            Ok(output) => {
                let payload = output.for_model(self.settings.max_tool_results);
                debug!(
                    tool = %call.name,
                    results = output.result_count(),
                    payload_bytes = payload.to_string().len(),
                    "Tool result ready"
                );

                state
                    .emit(AgentEvent::ToolCall {
                        data: ToolCallRecord::new(&call.name, arguments, output.to_value()),
                    })
                    .await?;
                state.chunk(prompt::tool_finished(output.result_count())).await?;

                transcript.push(Message::tool_result(&call.id, &call.name, payload.to_string()));
                state.last_tool_result = Some(LastToolResult {
                    tool: call.name.clone(),
                    payload,
                });
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                let failure = json!({ "error": e.to_string() });

                state
                    .emit(AgentEvent::ToolCall {
                        data: ToolCallRecord::new(&call.name, arguments, failure.clone()),
                    })
                    .await?;
                state.chunk(prompt::TOOL_FAILED).await?;

                // Report the error to the model so it can recover
                transcript.push(Message::tool_result(&call.id, &call.name, failure.to_string()));
            }
        }
        Ok(())
    }
}
