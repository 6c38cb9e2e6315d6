//! # QuranLens Core
//!
//! Domain types, traits, and error definitions for the QuranLens research agent.
//! This crate has no framework dependencies: it defines the domain model that
//! the provider, store, tool, agent and gateway crates implement against.
//!
//! ## Seams
//!
//! - [`Provider`]: chat completions and embeddings from an LLM backend
//! - [`ToolExecutor`]: the retrieval tool catalog the agent may call
//! - [`QuranStore`] / [`RequestStore`]: the data sources behind the tools and
//!   the persistence collaborator behind the streaming endpoint

pub mod arabic;
pub mod error;
pub mod message;
pub mod provider;
pub mod quran;
pub mod store;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{BackendError, CompletionError, StorageError, ToolError};
pub use message::{Message, MessageToolCall, Role, Transcript};
pub use provider::{
    EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse,
    ToolDefinition, Usage,
};
pub use quran::{Ayah, AyahKey, Surah, TafsirChunk};
pub use store::{QuranStore, RequestId, RequestStore};
pub use tool::{ToolExecutor, ToolName, ToolOutput};
