//! `POST /api/llm-requests/generate`: run the research agent for a stored
//! request and stream its progress as server-sent events.
//!
//! Every frame is a bare `data: <json>` event (no `event:` line):
//! - `{"type":"chunk","content":…}`
//! - `{"type":"tool_call","data":{"tool","arguments","result","timestamp"}}`
//! - `{"type":"done","requestId","fullResponse","usage","toolCalls"}`
//! - `{"type":"error","error":…}`

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, Sse};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use quranlens_agent::{AgentEvent, RunInput, ToolCallRecord};
use quranlens_core::message::Message;
use quranlens_core::provider::Usage;
use quranlens_core::store::{RequestId, RequestStore};

use crate::{ErrorResponse, SharedState};

const MISSING_FIELDS: &str = "Missing required fields: requestId, model, and prompt are required";

/// Request body; every field is optional here so missing ones get a JSON 400.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub request_id: Option<RequestId>,
    pub model: Option<String>,
    pub prompt: Option<String>,
    #[serde(default)]
    pub conversation_history: Option<Vec<HistoryEntry>>,
}

/// One earlier turn as the browser sends it.
#[derive(Debug, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

impl HistoryEntry {
    fn into_message(self) -> Option<Message> {
        match self.role.as_str() {
            "user" => Some(Message::user(self.content)),
            "assistant" => Some(Message::assistant(self.content)),
            other => {
                warn!(role = other, "Ignoring history entry with unsupported role");
                None
            }
        }
    }
}

/// One SSE frame on the wire.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Frame {
    Chunk {
        content: String,
    },
    ToolCall {
        data: ToolCallRecord,
    },
    #[serde(rename_all = "camelCase")]
    Done {
        request_id: RequestId,
        full_response: String,
        usage: Usage,
        tool_calls: Vec<ToolCallRecord>,
    },
    Error {
        error: String,
    },
}

impl Frame {
    fn to_sse(&self) -> Result<SseEvent, Infallible> {
        Ok(SseEvent::default().json_data(self).unwrap_or_else(|e| {
            error!(error = %e, "Failed to serialize SSE frame");
            SseEvent::default().data(r#"{"type":"error","error":"Failed to serialize event"}"#)
        }))
    }
}

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message)))
}

pub(crate) async fn generate_handler(
    State(state): State<SharedState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Sse<ReceiverStream<Result<SseEvent, Infallible>>>, (StatusCode, Json<ErrorResponse>)> {
    let Json(payload) = payload.map_err(|rejection| {
        debug!(error = %rejection.body_text(), "Rejected generate body");
        bad_request(MISSING_FIELDS)
    })?;

    let present = |field: Option<String>| field.filter(|value| !value.trim().is_empty());
    let (Some(request_id), Some(model), Some(prompt)) =
        (payload.request_id, present(payload.model), present(payload.prompt))
    else {
        return Err(bad_request(MISSING_FIELDS));
    };

    match state.requests.request_exists(request_id).await {
        Ok(true) => {}
        Ok(false) => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new("Request not found")),
            ));
        }
        Err(e) => {
            error!(request_id = %request_id, error = %e, "Request lookup failed");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(e.to_string())),
            ));
        }
    }

    let history: Vec<Message> = payload
        .conversation_history
        .unwrap_or_default()
        .into_iter()
        .filter_map(HistoryEntry::into_message)
        .collect();

    info!(
        request_id = %request_id,
        model = %model,
        history = history.len(),
        "Starting generation"
    );

    let cancel = CancellationToken::new();
    let input = RunInput::new(prompt).with_model(model).with_history(history);
    let events = state.agent.run_stream(input, cancel.clone());

    let (frame_tx, frame_rx) = mpsc::channel(1);
    tokio::spawn(forward_events(
        events,
        frame_tx,
        Arc::clone(&state.requests),
        request_id,
        cancel,
    ));

    Ok(Sse::new(ReceiverStream::new(frame_rx)))
}

/// Relay agent events to the client until a terminal event.
///
/// Persists the answer before the `done` frame. A closed client cancels the run.
pub(crate) async fn forward_events(
    mut events: mpsc::Receiver<AgentEvent>,
    frames: mpsc::Sender<Result<SseEvent, Infallible>>,
    requests: Arc<dyn RequestStore>,
    request_id: RequestId,
    cancel: CancellationToken,
) {
    let mut tool_calls = Vec::new();

    loop {
        let event = tokio::select! {
            _ = frames.closed() => {
                info!(request_id = %request_id, "Client disconnected, cancelling run");
                cancel.cancel();
                return;
            }
            event = events.recv() => event,
        };

        let Some(event) = event else {
            warn!(request_id = %request_id, "Agent stopped without a terminal event");
            let frame = Frame::Error {
                error: "Agent stopped unexpectedly".into(),
            };
            let _ = frames.send(frame.to_sse()).await;
            return;
        };

        let terminal = event.is_terminal();
        let frame = match event {
            AgentEvent::Chunk { content } => Frame::Chunk { content },
            AgentEvent::ToolCall { data } => {
                tool_calls.push(data.clone());
                Frame::ToolCall { data }
            }
            AgentEvent::Done {
                usage,
                full_response,
            } => {
                if let Err(e) = requests.save_response(request_id, &full_response).await {
                    error!(request_id = %request_id, error = %e, "Failed to persist response");
                }
                info!(
                    request_id = %request_id,
                    total_tokens = usage.total_tokens,
                    tool_calls = tool_calls.len(),
                    "Generation complete"
                );
                Frame::Done {
                    request_id,
                    full_response,
                    usage,
                    tool_calls: std::mem::take(&mut tool_calls),
                }
            }
            AgentEvent::Error { error } => {
                warn!(request_id = %request_id, error = %error, "Generation failed");
                Frame::Error { error }
            }
        };

        if frames.send(frame.to_sse()).await.is_err() {
            cancel.cancel();
            return;
        }
        if terminal {
            return;
        }
    }
}
