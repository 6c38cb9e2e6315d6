//! Error types for the QuranLens domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

// --- Bounded context errors ---

/// A failed call to a chat-completion or embedding provider.
///
/// Never retried by the caller that receives it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// A failure reported by the relational store.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// What went wrong underneath a tool.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("query embedding failed: {0}")]
    Embedding(#[from] CompletionError),
}

/// A tool invocation that could not produce a result.
///
/// The agent reports these to the model as a tool result; they never end a run.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Tool {tool} failed: {source}")]
    Backend {
        tool: String,
        #[source]
        source: BackendError,
    },
}

impl ToolError {
    pub fn invalid(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    pub fn backend(tool: impl Into<String>, source: impl Into<BackendError>) -> Self {
        Self::Backend {
            tool: tool.into(),
            source: source.into(),
        }
    }
}
