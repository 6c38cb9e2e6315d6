//! Query embedding for semantic verse search.

use quranlens_core::arabic;
use quranlens_core::error::CompletionError;
use quranlens_core::provider::{EmbeddingRequest, Provider};
use std::sync::Arc;
use tracing::debug;

/// Turns a search query into a unit-length vector comparable with the stored
/// verse embeddings.
#[derive(Clone)]
pub struct QueryEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
    dimensions: Option<u32>,
}

impl QueryEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, dimensions: Option<u32>) -> Self {
        Self {
            provider,
            model: model.into(),
            dimensions,
        }
    }

    pub async fn embed(&self, query: &str) -> Result<Vec<f32>, CompletionError> {
        let normalized = arabic::normalize(query);
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: vec![normalized],
                dimensions: self.dimensions,
            })
            .await?;

        let embedding = response.embeddings.into_iter().next().ok_or_else(|| {
            CompletionError::MalformedResponse("embedding response contained no vectors".into())
        })?;
        if let Some(expected) = self.dimensions
            && embedding.len() != expected as usize
        {
            return Err(CompletionError::MalformedResponse(format!(
                "expected {expected} embedding dimensions, got {}",
                embedding.len()
            )));
        }

        debug!(model = %self.model, dimensions = embedding.len(), "Embedded search query");
        Ok(l2_normalize(embedding))
    }
}

fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
    vector
}
