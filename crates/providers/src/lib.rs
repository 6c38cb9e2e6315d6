//! LLM provider implementations for QuranLens.
//!
//! All providers implement the `quranlens_core::Provider` trait. Two are
//! built from configuration: the chat-completion provider driving the agent
//! and the embedding provider behind semantic verse search.

pub mod openai_compat;

use std::sync::Arc;
use quranlens_config::{EmbeddingConfig, ProviderConfig};
use quranlens_core::{CompletionError, Provider};

pub use openai_compat::OpenAiCompatProvider;

/// Build the chat-completion provider.
///
/// A missing API key is not an error here; the first request fails with
/// `AuthenticationFailed` instead, so the gateway can still start.
pub fn completion_provider(config: &ProviderConfig) -> Result<Arc<dyn Provider>, CompletionError> {
    if config.api_key.is_none() {
        tracing::warn!(provider = %config.name, "No API key configured for the completion provider");
    }
    let provider = OpenAiCompatProvider::new(
        &config.name,
        &config.base_url,
        config.api_key.clone().unwrap_or_default(),
    )?
    .with_app_identity(config.referer.clone(), Some(config.title.clone()));
    Ok(Arc::new(provider))
}

/// Build the embedding provider used for semantic search.
pub fn embedding_provider(config: &EmbeddingConfig) -> Result<Arc<dyn Provider>, CompletionError> {
    if config.api_key.is_none() {
        tracing::warn!(model = %config.model, "No API key configured for the embedding provider");
    }
    let provider = OpenAiCompatProvider::new(
        "embeddings",
        &config.base_url,
        config.api_key.clone().unwrap_or_default(),
    )?;
    Ok(Arc::new(provider))
}
